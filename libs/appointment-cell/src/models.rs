// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shared_models::error::AppError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Appointment {
    pub id: i64,
    pub doctor_id: i64,
    pub patient_id: String,
    pub appointment_datetime: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Cancelled,
    Completed,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Timestamps may carry any offset; they are normalised to UTC on the way in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub doctor_id: i64,
    pub patient_id: String,
    pub appointment_datetime: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub appointment_datetime: Option<DateTime<Utc>>,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
}

impl UpdateAppointmentRequest {
    /// Copies the present fields onto `appointment`.
    pub fn apply_to(&self, appointment: &mut Appointment) {
        if let Some(at) = self.appointment_datetime {
            appointment.appointment_datetime = at;
        }
        if let Some(status) = self.status {
            appointment.status = status;
        }
        if let Some(notes) = &self.notes {
            appointment.notes = Some(notes.clone());
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentQuery {
    pub doctor_id: Option<i64>,
    pub patient_id: Option<String>,
    pub status: Option<AppointmentStatus>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Patient id must be exactly 13 digits, got '{0}'")]
    InvalidPatientId(String),

    #[error("Patient is inactive")]
    PatientInactive,

    #[error("Appointment time must be in the future")]
    InPast,

    #[error("Appointment time is outside the doctor's weekly availability")]
    OutsideSchedule,

    #[error("Doctor already has an appointment at this time")]
    DoctorUnavailable,

    #[error("Patient already has an appointment at this time")]
    PatientDoubleBooked,

    #[error("Cannot change appointment status from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Only scheduled appointments can be rescheduled (current status: {0})")]
    NotReschedulable(AppointmentStatus),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound
            | AppointmentError::DoctorNotFound
            | AppointmentError::PatientNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::InvalidPatientId(_) | AppointmentError::InPast => {
                AppError::ValidationError(err.to_string())
            }
            AppointmentError::PatientInactive
            | AppointmentError::OutsideSchedule
            | AppointmentError::DoctorUnavailable
            | AppointmentError::PatientDoubleBooked
            | AppointmentError::InvalidStatusTransition { .. }
            | AppointmentError::NotReschedulable(_) => AppError::Conflict(err.to_string()),
            AppointmentError::Database(e) => AppError::from(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn appointment(status: AppointmentStatus, at: DateTime<Utc>) -> Appointment {
        Appointment {
            id: 1,
            doctor_id: 1,
            patient_id: "1234567890123".to_string(),
            appointment_datetime: at,
            status,
            notes: None,
        }
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(AppointmentStatus::Cancelled).unwrap(), "cancelled");
        let parsed: AppointmentStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(parsed, AppointmentStatus::Completed);
        assert_eq!(AppointmentStatus::default(), AppointmentStatus::Scheduled);
    }

    #[test]
    fn offset_timestamps_are_normalised_to_utc() {
        let request: CreateAppointmentRequest = serde_json::from_value(serde_json::json!({
            "doctor_id": 1,
            "patient_id": "1234567890123",
            "appointment_datetime": "2030-01-07T11:00:00+02:00",
        }))
        .unwrap();
        assert_eq!(
            request.appointment_datetime,
            Utc.with_ymd_and_hms(2030, 1, 7, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn apply_to_only_touches_present_fields() {
        let at = Utc.with_ymd_and_hms(2030, 1, 7, 9, 0, 0).unwrap();
        let mut stored = appointment(AppointmentStatus::Scheduled, at);

        UpdateAppointmentRequest {
            notes: Some("bring x-rays".into()),
            ..Default::default()
        }
        .apply_to(&mut stored);

        assert_eq!(stored.notes.as_deref(), Some("bring x-rays"));
        assert_eq!(stored.status, AppointmentStatus::Scheduled);
        assert_eq!(stored.appointment_datetime, at);
    }

    #[test]
    fn errors_map_to_http_kinds() {
        assert!(matches!(AppError::from(AppointmentError::DoctorNotFound), AppError::NotFound(_)));
        assert!(matches!(AppError::from(AppointmentError::InPast), AppError::ValidationError(_)));
        assert!(matches!(
            AppError::from(AppointmentError::InvalidPatientId("abc".into())),
            AppError::ValidationError(_)
        ));
        assert!(matches!(AppError::from(AppointmentError::OutsideSchedule), AppError::Conflict(_)));
    }
}
