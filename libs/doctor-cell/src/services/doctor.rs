use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info, warn};

use appointment_cell::services::AppointmentGuard;
use shared_database::{AppState, Database};

use crate::models::{CreateDoctorRequest, Doctor, DoctorError, DoctorQuery, UpdateDoctorRequest};

const DOCTOR_COLUMNS: &str = "id, name, specialty, phone, email, price_per_consultation";

pub struct DoctorService {
    db: Database,
    guard: AppointmentGuard,
}

impl DoctorService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            guard: AppointmentGuard::new(),
        }
    }

    pub async fn create_doctor(&self, request: CreateDoctorRequest) -> Result<Doctor, DoctorError> {
        debug!("Creating doctor: {} ({})", request.name, request.specialty);

        request.validate()?;

        let doctor: Doctor = sqlx::query_as(&format!(
            "INSERT INTO doctor (name, specialty, phone, email, price_per_consultation) \
             VALUES (?, ?, ?, ?, ?) RETURNING {}",
            DOCTOR_COLUMNS
        ))
        .bind(&request.name)
        .bind(&request.specialty)
        .bind(&request.phone)
        .bind(&request.email)
        .bind(request.price_per_consultation)
        .fetch_one(self.db.pool())
        .await?;

        info!("Doctor created with ID: {}", doctor.id);
        Ok(doctor)
    }

    pub async fn get_doctor(&self, doctor_id: i64) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor: {}", doctor_id);

        sqlx::query_as(&format!("SELECT {} FROM doctor WHERE id = ?", DOCTOR_COLUMNS))
            .bind(doctor_id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(DoctorError::NotFound)
    }

    pub async fn list_doctors(&self, query: DoctorQuery) -> Result<Vec<Doctor>, DoctorError> {
        debug!("Listing doctors with filters: {:?}", query);

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM doctor", DOCTOR_COLUMNS));

        if let Some(specialty) = query.specialty {
            builder.push(" WHERE specialty = ").push_bind(specialty);
        }
        builder.push(" ORDER BY id");

        let doctors = builder
            .build_query_as::<Doctor>()
            .fetch_all(self.db.pool())
            .await?;

        Ok(doctors)
    }

    /// Sparse update: only the fields present in `request` change.
    pub async fn update_doctor(
        &self,
        doctor_id: i64,
        request: UpdateDoctorRequest,
    ) -> Result<Doctor, DoctorError> {
        debug!("Patching doctor: {}", doctor_id);

        let mut tx = self.db.begin_immediate().await?;

        let mut doctor: Doctor = sqlx::query_as(&format!("SELECT {} FROM doctor WHERE id = ?", DOCTOR_COLUMNS))
            .bind(doctor_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DoctorError::NotFound)?;

        request.apply_to(&mut doctor);
        doctor.validate()?;

        sqlx::query(
            "UPDATE doctor SET name = ?, specialty = ?, phone = ?, email = ?, price_per_consultation = ? \
             WHERE id = ?",
        )
        .bind(&doctor.name)
        .bind(&doctor.specialty)
        .bind(&doctor.phone)
        .bind(&doctor.email)
        .bind(doctor.price_per_consultation)
        .bind(doctor_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!("Doctor {} updated", doctor_id);
        Ok(doctor)
    }

    /// Full replace. Optional fields missing from `request` are cleared.
    pub async fn replace_doctor(
        &self,
        doctor_id: i64,
        request: CreateDoctorRequest,
    ) -> Result<Doctor, DoctorError> {
        debug!("Replacing doctor: {}", doctor_id);

        request.validate()?;

        let doctor: Doctor = sqlx::query_as(&format!(
            "UPDATE doctor SET name = ?, specialty = ?, phone = ?, email = ?, price_per_consultation = ? \
             WHERE id = ? RETURNING {}",
            DOCTOR_COLUMNS
        ))
        .bind(&request.name)
        .bind(&request.specialty)
        .bind(&request.phone)
        .bind(&request.email)
        .bind(request.price_per_consultation)
        .bind(doctor_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or(DoctorError::NotFound)?;

        info!("Doctor {} replaced", doctor_id);
        Ok(doctor)
    }

    /// Deletes the doctor together with its slots and remaining appointments,
    /// unless a scheduled appointment lies after `now`.
    pub async fn delete_doctor(&self, doctor_id: i64, now: DateTime<Utc>) -> Result<(), DoctorError> {
        debug!("Deleting doctor: {}", doctor_id);

        let mut tx = self.db.begin_immediate().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM doctor WHERE id = ?)")
            .bind(doctor_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(DoctorError::NotFound);
        }

        if !self.guard.can_delete_doctor(&mut tx, doctor_id, now).await? {
            warn!("Refusing to delete doctor {}: future appointments exist", doctor_id);
            return Err(DoctorError::HasFutureAppointments);
        }

        sqlx::query("DELETE FROM doctor WHERE id = ?")
            .bind(doctor_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!("Doctor {} deleted", doctor_id);
        Ok(())
    }
}
