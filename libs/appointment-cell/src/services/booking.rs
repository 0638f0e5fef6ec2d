// libs/appointment-cell/src/services/booking.rs
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info};

use shared_database::{AppState, Database};
use shared_utils::validation::is_valid_patient_id;

use crate::models::{
    Appointment, AppointmentError, AppointmentQuery, AppointmentStatus,
    CreateAppointmentRequest, UpdateAppointmentRequest,
};
use crate::services::{AppointmentGuard, AppointmentLifecycleService};

const APPOINTMENT_COLUMNS: &str = "id, doctor_id, patient_id, appointment_datetime, status, notes";

pub struct BookingService {
    db: Database,
    guard: AppointmentGuard,
    lifecycle: AppointmentLifecycleService,
}

impl BookingService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            guard: AppointmentGuard::new(),
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    /// Book an appointment. The guard checks and the insert share one transaction.
    pub async fn book_appointment(
        &self,
        request: CreateAppointmentRequest,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        debug!(
            "Booking doctor {} for patient {} at {}",
            request.doctor_id, request.patient_id, request.appointment_datetime
        );

        let mut tx = self.db.begin_immediate().await?;

        self.guard
            .check_booking(
                &mut *tx,
                request.doctor_id,
                &request.patient_id,
                request.appointment_datetime,
                now,
                None,
            )
            .await?;

        let appointment: Appointment = sqlx::query_as(&format!(
            "INSERT INTO appointments (doctor_id, patient_id, appointment_datetime, status, notes) \
             VALUES (?, ?, ?, ?, ?) RETURNING {}",
            APPOINTMENT_COLUMNS
        ))
        .bind(request.doctor_id)
        .bind(&request.patient_id)
        .bind(request.appointment_datetime)
        .bind(AppointmentStatus::Scheduled)
        .bind(&request.notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!("Appointment {} booked for doctor {}", appointment.id, appointment.doctor_id);
        Ok(appointment)
    }

    pub async fn get_appointment(&self, appointment_id: i64) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment: {}", appointment_id);

        sqlx::query_as(&format!("SELECT {} FROM appointments WHERE id = ?", APPOINTMENT_COLUMNS))
            .bind(appointment_id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    pub async fn list_appointments(&self, query: AppointmentQuery) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Listing appointments with filters: {:?}", query);

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM appointments WHERE 1 = 1", APPOINTMENT_COLUMNS));

        if let Some(doctor_id) = query.doctor_id {
            builder.push(" AND doctor_id = ").push_bind(doctor_id);
        }
        if let Some(patient_id) = query.patient_id {
            if !is_valid_patient_id(&patient_id) {
                return Err(AppointmentError::InvalidPatientId(patient_id));
            }
            builder.push(" AND patient_id = ").push_bind(patient_id);
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status);
        }
        builder.push(" ORDER BY appointment_datetime, id");

        let appointments = builder
            .build_query_as::<Appointment>()
            .fetch_all(self.db.pool())
            .await?;

        Ok(appointments)
    }

    /// Partial update. A new timestamp re-runs the booking checks against
    /// every other appointment.
    pub async fn update_appointment(
        &self,
        appointment_id: i64,
        request: UpdateAppointmentRequest,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Updating appointment: {}", appointment_id);

        let mut tx = self.db.begin_immediate().await?;

        let mut appointment: Appointment =
            sqlx::query_as(&format!("SELECT {} FROM appointments WHERE id = ?", APPOINTMENT_COLUMNS))
                .bind(appointment_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(AppointmentError::NotFound)?;

        if let Some(status) = request.status {
            self.lifecycle.validate_status_transition(appointment.status, status)?;
        }

        if let Some(at) = request.appointment_datetime {
            if at != appointment.appointment_datetime {
                self.lifecycle.can_reschedule(appointment.status)?;
                self.guard
                    .check_booking(
                        &mut *tx,
                        appointment.doctor_id,
                        &appointment.patient_id,
                        at,
                        now,
                        Some(appointment_id),
                    )
                    .await?;
            }
        }

        request.apply_to(&mut appointment);

        sqlx::query("UPDATE appointments SET appointment_datetime = ?, status = ?, notes = ? WHERE id = ?")
            .bind(appointment.appointment_datetime)
            .bind(appointment.status)
            .bind(&appointment.notes)
            .bind(appointment_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!("Appointment {} updated (status {})", appointment_id, appointment.status);
        Ok(appointment)
    }

    pub async fn delete_appointment(&self, appointment_id: i64) -> Result<(), AppointmentError> {
        debug!("Deleting appointment: {}", appointment_id);

        let result = sqlx::query("DELETE FROM appointments WHERE id = ?")
            .bind(appointment_id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppointmentError::NotFound);
        }

        info!("Appointment {} deleted", appointment_id);
        Ok(())
    }
}
