use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use shared_models::error::AppError;
use shared_utils::validation::{validate_email, validate_required};

// ==============================================================================
// DOCTOR MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Doctor {
    pub id: i64,
    pub name: String,
    pub specialty: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub price_per_consultation: f64,
}

impl Doctor {
    pub fn validate(&self) -> Result<(), DoctorError> {
        validate_doctor_fields(&self.name, &self.specialty, self.email.as_deref(), self.price_per_consultation)
    }
}

/// Body of `POST /doctors` and `PUT /doctors/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub name: String,
    pub specialty: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub price_per_consultation: f64,
}

impl CreateDoctorRequest {
    pub fn validate(&self) -> Result<(), DoctorError> {
        validate_doctor_fields(&self.name, &self.specialty, self.email.as_deref(), self.price_per_consultation)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDoctorRequest {
    pub name: Option<String>,
    pub specialty: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub price_per_consultation: Option<f64>,
}

impl UpdateDoctorRequest {
    pub fn apply_to(&self, doctor: &mut Doctor) {
        if let Some(name) = &self.name {
            doctor.name = name.clone();
        }
        if let Some(specialty) = &self.specialty {
            doctor.specialty = specialty.clone();
        }
        if let Some(phone) = &self.phone {
            doctor.phone = Some(phone.clone());
        }
        if let Some(email) = &self.email {
            doctor.email = Some(email.clone());
        }
        if let Some(price) = self.price_per_consultation {
            doctor.price_per_consultation = price;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorQuery {
    pub specialty: Option<String>,
}

fn validate_doctor_fields(
    name: &str,
    specialty: &str,
    email: Option<&str>,
    price: f64,
) -> Result<(), DoctorError> {
    validate_required("name", name).map_err(DoctorError::Validation)?;
    validate_required("specialty", specialty).map_err(DoctorError::Validation)?;
    validate_email("email", email).map_err(DoctorError::Validation)?;

    if !price.is_finite() || price < 0.0 {
        return Err(DoctorError::Validation(
            "price_per_consultation must be a non-negative number".to_string(),
        ));
    }

    Ok(())
}

// ==============================================================================
// WEEKLY SCHEDULE MODELS
// ==============================================================================

/// Recurring weekly window. `weekday` counts from 0 = Monday to 6 = Sunday.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct DoctorSchedule {
    pub id: i64,
    pub doctor_id: i64,
    pub weekday: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduleRequest {
    pub weekday: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateScheduleRequest {
    pub weekday: Option<i32>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

impl UpdateScheduleRequest {
    pub fn apply_to(&self, schedule: &mut DoctorSchedule) {
        if let Some(weekday) = self.weekday {
            schedule.weekday = weekday;
        }
        if let Some(start_time) = self.start_time {
            schedule.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            schedule.end_time = end_time;
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Schedule not found")]
    ScheduleNotFound,

    #[error("Doctor has future scheduled appointments and cannot be deleted")]
    HasFutureAppointments,

    #[error("start_time must be before end_time")]
    InvalidTimeRange,

    #[error("Overlaps an existing weekly slot")]
    ScheduleOverlap,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound | DoctorError::ScheduleNotFound => AppError::NotFound(err.to_string()),
            DoctorError::HasFutureAppointments
            | DoctorError::InvalidTimeRange
            | DoctorError::ScheduleOverlap => AppError::Conflict(err.to_string()),
            DoctorError::Validation(msg) => AppError::ValidationError(msg),
            DoctorError::Database(e) => AppError::from(e),
        }
    }
}
