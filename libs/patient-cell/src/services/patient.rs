use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::{debug, info};

use shared_database::{AppState, Database};

use crate::models::{
    CreatePatientRequest, Patient, PatientError, PatientId, PatientQuery, ReplacePatientRequest,
    UpdatePatientRequest,
};

const PATIENT_COLUMNS: &str = "id, name, age, phone, email, is_active";

pub struct PatientService {
    db: Database,
}

impl PatientService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
        }
    }

    pub async fn create_patient(&self, request: CreatePatientRequest) -> Result<Patient, PatientError> {
        debug!("Creating patient: {}", request.id);

        request.validate()?;

        let patient: Patient = sqlx::query_as(&format!(
            "INSERT INTO patient (id, name, age, phone, email, is_active) \
             VALUES (?, ?, ?, ?, ?, 1) RETURNING {}",
            PATIENT_COLUMNS
        ))
        .bind(&request.id)
        .bind(&request.name)
        .bind(request.age)
        .bind(&request.phone)
        .bind(&request.email)
        .fetch_one(self.db.pool())
        .await?;

        info!("Patient {} created", patient.id);
        Ok(patient)
    }

    pub async fn get_patient(&self, patient_id: &PatientId) -> Result<Patient, PatientError> {
        debug!("Fetching patient: {}", patient_id);

        let mut conn = self.db.pool().acquire().await?;
        fetch_patient(&mut conn, patient_id).await
    }

    pub async fn list_patients(&self, query: PatientQuery) -> Result<Vec<Patient>, PatientError> {
        debug!("Listing patients with filters: {:?}", query);

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM patient", PATIENT_COLUMNS));

        if let Some(active) = query.active {
            builder.push(" WHERE is_active = ").push_bind(active);
        }
        builder.push(" ORDER BY name, id");

        let patients = builder
            .build_query_as::<Patient>()
            .fetch_all(self.db.pool())
            .await?;

        Ok(patients)
    }

    pub async fn update_patient(
        &self,
        patient_id: &PatientId,
        request: UpdatePatientRequest,
    ) -> Result<Patient, PatientError> {
        debug!("Patching patient: {}", patient_id);

        let mut tx = self.db.begin_immediate().await?;

        let mut patient = fetch_patient(&mut tx, patient_id).await?;
        request.apply_to(&mut patient);
        patient.validate()?;

        store_patient(&mut tx, &patient).await?;
        tx.commit().await?;

        info!("Patient {} updated", patient_id);
        Ok(patient)
    }

    /// Overwrites every updatable field. The lifecycle flag is left alone.
    pub async fn replace_patient(
        &self,
        patient_id: &PatientId,
        request: ReplacePatientRequest,
    ) -> Result<Patient, PatientError> {
        debug!("Replacing patient: {}", patient_id);

        request.validate()?;

        let mut tx = self.db.begin_immediate().await?;

        let mut patient = fetch_patient(&mut tx, patient_id).await?;
        patient.name = request.name;
        patient.age = request.age;
        patient.phone = request.phone;
        patient.email = request.email;

        store_patient(&mut tx, &patient).await?;
        tx.commit().await?;

        info!("Patient {} replaced", patient_id);
        Ok(patient)
    }

    /// Marks the patient inactive. Deleting an inactive patient succeeds
    /// without touching the store.
    pub async fn soft_delete_patient(&self, patient_id: &PatientId) -> Result<Patient, PatientError> {
        debug!("Soft-deleting patient: {}", patient_id);

        let mut tx = self.db.begin_immediate().await?;

        let mut patient = fetch_patient(&mut tx, patient_id).await?;
        let mut status = patient.status();
        if !status.soft_delete() {
            debug!("Patient {} already inactive", patient_id);
            return Ok(patient);
        }
        patient.set_status(status);

        store_patient(&mut tx, &patient).await?;
        tx.commit().await?;

        info!("Patient {} deactivated", patient_id);
        Ok(patient)
    }

    pub async fn restore_patient(&self, patient_id: &PatientId) -> Result<Patient, PatientError> {
        debug!("Restoring patient: {}", patient_id);

        let mut tx = self.db.begin_immediate().await?;

        let mut patient = fetch_patient(&mut tx, patient_id).await?;
        let mut status = patient.status();
        if !status.restore() {
            debug!("Patient {} already active", patient_id);
            return Ok(patient);
        }
        patient.set_status(status);

        store_patient(&mut tx, &patient).await?;
        tx.commit().await?;

        info!("Patient {} restored", patient_id);
        Ok(patient)
    }
}

async fn fetch_patient(conn: &mut SqliteConnection, patient_id: &PatientId) -> Result<Patient, PatientError> {
    sqlx::query_as(&format!("SELECT {} FROM patient WHERE id = ?", PATIENT_COLUMNS))
        .bind(patient_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(PatientError::NotFound)
}

async fn store_patient(conn: &mut SqliteConnection, patient: &Patient) -> Result<(), PatientError> {
    sqlx::query("UPDATE patient SET name = ?, age = ?, phone = ?, email = ?, is_active = ? WHERE id = ?")
        .bind(&patient.name)
        .bind(patient.age)
        .bind(&patient.phone)
        .bind(&patient.email)
        .bind(patient.is_active)
        .bind(&patient.id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
