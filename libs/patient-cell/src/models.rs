use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use shared_models::error::AppError;
use shared_utils::validation::{is_valid_patient_id, validate_email, validate_required};

// ==============================================================================
// PATIENT IDENTITY
// ==============================================================================

/// 13-digit national id. Only constructible through validation, so a
/// `PatientId` in hand is always well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(try_from = "String", into = "String")]
#[sqlx(transparent)]
pub struct PatientId(String);

impl PatientId {
    pub fn parse(raw: &str) -> Result<Self, PatientError> {
        if !is_valid_patient_id(raw) {
            return Err(PatientError::InvalidId(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PatientId {
    type Error = PatientError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl FromStr for PatientId {
    type Err = PatientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<PatientId> for String {
    fn from(id: PatientId) -> Self {
        id.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ==============================================================================
// CORE PATIENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Patient {
    pub id: PatientId,
    pub name: String,
    pub age: i64,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
}

impl Patient {
    pub fn status(&self) -> PatientStatus {
        PatientStatus::from_flag(self.is_active)
    }

    pub fn set_status(&mut self, status: PatientStatus) {
        self.is_active = status.is_active();
    }

    pub fn validate(&self) -> Result<(), PatientError> {
        validate_patient_fields(&self.name, self.age, self.email.as_deref())
    }
}

/// Soft-delete lifecycle. Transitions report whether anything changed, so
/// repeating one is a harmless no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientStatus {
    Active,
    Inactive,
}

impl PatientStatus {
    pub fn from_flag(is_active: bool) -> Self {
        if is_active {
            PatientStatus::Active
        } else {
            PatientStatus::Inactive
        }
    }

    pub fn is_active(self) -> bool {
        self == PatientStatus::Active
    }

    pub fn soft_delete(&mut self) -> bool {
        let changed = *self == PatientStatus::Active;
        *self = PatientStatus::Inactive;
        changed
    }

    pub fn restore(&mut self) -> bool {
        let changed = *self == PatientStatus::Inactive;
        *self = PatientStatus::Active;
        changed
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    pub id: PatientId,
    pub name: String,
    #[serde(default)]
    pub age: i64,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl CreatePatientRequest {
    pub fn validate(&self) -> Result<(), PatientError> {
        validate_patient_fields(&self.name, self.age, self.email.as_deref())
    }
}

/// Body of `PUT /patients/{id}`. Any id in the body is ignored in favour of
/// the path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplacePatientRequest {
    pub name: String,
    #[serde(default)]
    pub age: i64,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl ReplacePatientRequest {
    pub fn validate(&self) -> Result<(), PatientError> {
        validate_patient_fields(&self.name, self.age, self.email.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl UpdatePatientRequest {
    pub fn apply_to(&self, patient: &mut Patient) {
        if let Some(name) = &self.name {
            patient.name = name.clone();
        }
        if let Some(age) = self.age {
            patient.age = age;
        }
        if let Some(phone) = &self.phone {
            patient.phone = Some(phone.clone());
        }
        if let Some(email) = &self.email {
            patient.email = Some(email.clone());
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientQuery {
    pub active: Option<bool>,
}

fn validate_patient_fields(name: &str, age: i64, email: Option<&str>) -> Result<(), PatientError> {
    validate_required("name", name).map_err(PatientError::Validation)?;
    validate_email("email", email).map_err(PatientError::Validation)?;

    if age < 0 {
        return Err(PatientError::Validation("age must not be negative".to_string()));
    }

    Ok(())
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Patient id '{0}' must be exactly 13 digits")]
    InvalidId(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound => AppError::NotFound(err.to_string()),
            PatientError::InvalidId(_) => AppError::ValidationError(err.to_string()),
            PatientError::Validation(msg) => AppError::ValidationError(msg),
            PatientError::Database(e) => AppError::from(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn patient_id_round_trips_through_json() {
        let id: PatientId = serde_json::from_str("\"1234567890123\"").unwrap();
        assert_eq!(id.as_str(), "1234567890123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"1234567890123\"");
    }

    #[test]
    fn malformed_patient_ids_are_rejected() {
        assert_matches!(PatientId::parse("123"), Err(PatientError::InvalidId(_)));
        assert_matches!("12345678901x3".parse::<PatientId>(), Err(PatientError::InvalidId(_)));
        assert!(serde_json::from_str::<PatientId>("\"12345678901234\"").is_err());
    }

    #[test]
    fn soft_delete_and_restore_are_idempotent() {
        let mut status = PatientStatus::Active;
        assert!(status.soft_delete());
        assert!(!status.soft_delete());
        assert_eq!(status, PatientStatus::Inactive);

        assert!(status.restore());
        assert!(!status.restore());
        assert!(status.is_active());
    }

    #[test]
    fn create_request_defaults_age_to_zero() {
        let request: CreatePatientRequest = serde_json::from_value(serde_json::json!({
            "id": "1234567890123",
            "name": "Jane Doe"
        }))
        .unwrap();

        assert_eq!(request.age, 0);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn negative_age_and_blank_name_are_rejected() {
        let request = ReplacePatientRequest {
            name: "Jane".to_string(),
            age: -1,
            phone: None,
            email: None,
        };
        assert_matches!(request.validate(), Err(PatientError::Validation(msg)) if msg.contains("age"));

        let request = ReplacePatientRequest {
            name: String::new(),
            age: 3,
            ..request
        };
        assert_matches!(request.validate(), Err(PatientError::Validation(msg)) if msg.contains("name"));
    }

    #[test]
    fn patch_leaves_missing_fields_alone() {
        let mut patient = Patient {
            id: PatientId::parse("1234567890123").unwrap(),
            name: "Jane".to_string(),
            age: 40,
            phone: Some("555-0000".to_string()),
            email: None,
            is_active: true,
        };

        UpdatePatientRequest {
            age: Some(41),
            ..Default::default()
        }
        .apply_to(&mut patient);

        assert_eq!(patient.age, 41);
        assert_eq!(patient.name, "Jane");
        assert_eq!(patient.phone.as_deref(), Some("555-0000"));
        assert_eq!(patient.status(), PatientStatus::Active);
    }
}
