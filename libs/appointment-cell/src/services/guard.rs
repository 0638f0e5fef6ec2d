// libs/appointment-cell/src/services/guard.rs
use chrono::{DateTime, Datelike, NaiveTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, warn};

use shared_utils::validation::is_valid_patient_id;

use crate::models::{AppointmentError, AppointmentStatus};

/// Consistency rules over existing appointments. Every check runs on the
/// caller's connection so it shares the caller's transaction.
#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentGuard;

impl AppointmentGuard {
    pub fn new() -> Self {
        Self
    }

    /// False iff the doctor has a scheduled appointment strictly after `now`.
    pub async fn can_delete_doctor(
        &self,
        conn: &mut SqliteConnection,
        doctor_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        debug!("Checking future appointments for doctor {} after {}", doctor_id, now);

        let blocking: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM appointments
            WHERE doctor_id = ?
              AND status = ?
              AND appointment_datetime > ?
            LIMIT 1
            "#,
        )
        .bind(doctor_id)
        .bind(AppointmentStatus::Scheduled)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(appointment_id) = blocking {
            warn!(
                "Doctor {} has future scheduled appointment {}, deletion blocked",
                doctor_id, appointment_id
            );
            return Ok(false);
        }

        Ok(true)
    }

    /// Decides whether `patient_id` may see `doctor_id` at `at`.
    /// `exclude_appointment_id` skips the appointment being rescheduled.
    pub async fn check_booking(
        &self,
        conn: &mut SqliteConnection,
        doctor_id: i64,
        patient_id: &str,
        at: DateTime<Utc>,
        now: DateTime<Utc>,
        exclude_appointment_id: Option<i64>,
    ) -> Result<(), AppointmentError> {
        debug!("Checking booking of doctor {} for patient {} at {}", doctor_id, patient_id, at);

        if !is_valid_patient_id(patient_id) {
            return Err(AppointmentError::InvalidPatientId(patient_id.to_string()));
        }

        if at <= now {
            return Err(AppointmentError::InPast);
        }

        let doctor_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM doctor WHERE id = ?)")
            .bind(doctor_id)
            .fetch_one(&mut *conn)
            .await?;
        if !doctor_exists {
            return Err(AppointmentError::DoctorNotFound);
        }

        let patient_active: Option<bool> = sqlx::query_scalar("SELECT is_active FROM patient WHERE id = ?")
            .bind(patient_id)
            .fetch_optional(&mut *conn)
            .await?;
        match patient_active {
            None => return Err(AppointmentError::PatientNotFound),
            Some(false) => return Err(AppointmentError::PatientInactive),
            Some(true) => {}
        }

        if !self.within_weekly_slot(conn, doctor_id, at).await? {
            warn!("Doctor {} has no weekly slot covering {}", doctor_id, at);
            return Err(AppointmentError::OutsideSchedule);
        }

        let doctor_taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM appointments
                WHERE doctor_id = ? AND status = ? AND appointment_datetime = ?
                  AND (? IS NULL OR id <> ?)
            )
            "#,
        )
        .bind(doctor_id)
        .bind(AppointmentStatus::Scheduled)
        .bind(at)
        .bind(exclude_appointment_id)
        .bind(exclude_appointment_id)
        .fetch_one(&mut *conn)
        .await?;
        if doctor_taken {
            return Err(AppointmentError::DoctorUnavailable);
        }

        let patient_taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM appointments
                WHERE patient_id = ? AND status = ? AND appointment_datetime = ?
                  AND (? IS NULL OR id <> ?)
            )
            "#,
        )
        .bind(patient_id)
        .bind(AppointmentStatus::Scheduled)
        .bind(at)
        .bind(exclude_appointment_id)
        .bind(exclude_appointment_id)
        .fetch_one(&mut *conn)
        .await?;
        if patient_taken {
            return Err(AppointmentError::PatientDoubleBooked);
        }

        Ok(())
    }

    /// Slots are half-open: a booking at a slot's end belongs to the next one.
    async fn within_weekly_slot(
        &self,
        conn: &mut SqliteConnection,
        doctor_id: i64,
        at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let weekday = at.weekday().num_days_from_monday() as i32;
        let time = at.time();

        let slots: Vec<(NaiveTime, NaiveTime)> = sqlx::query_as(
            "SELECT start_time, end_time FROM doctor_schedules WHERE doctor_id = ? AND weekday = ?",
        )
        .bind(doctor_id)
        .bind(weekday)
        .fetch_all(&mut *conn)
        .await?;

        Ok(slots.iter().any(|(start, end)| *start <= time && time < *end))
    }
}
