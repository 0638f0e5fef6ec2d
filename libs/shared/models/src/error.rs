use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlx::error::ErrorKind;
use thiserror::Error;

/// Message raised by the `doctor_schedules` overlap triggers.
pub const SCHEDULE_OVERLAP_MARKER: &str = "schedule overlaps an existing weekly slot";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    fn message(&self) -> &str {
        match self {
            AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Internal(msg)
            | AppError::Database(msg)
            | AppError::ValidationError(msg)
            | AppError::Conflict(msg) => msg,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.message();

        if status.is_server_error() {
            tracing::error!("Error: {}: {}", status, message);
        } else {
            tracing::warn!("Rejected: {}: {}", status, message);
        }

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();

                if message.contains(SCHEDULE_OVERLAP_MARKER) {
                    return AppError::Conflict("Overlaps an existing weekly slot".to_string());
                }

                match db_err.kind() {
                    ErrorKind::UniqueViolation => AppError::Conflict(message),
                    ErrorKind::CheckViolation => AppError::ValidationError(message),
                    ErrorKind::ForeignKeyViolation => AppError::Conflict(message),
                    _ if message.contains("UNIQUE constraint failed") => AppError::Conflict(message),
                    _ if message.contains("CHECK constraint failed") => AppError::ValidationError(message),
                    _ => AppError::Database(message),
                }
            }
            other => AppError::Database(other.to_string()),
        }
    }
}

/// Extractor rejections keep their status class: 422 stays a validation
/// error, 5xx becomes `Internal`, everything else is a bad request.
fn from_rejection(status: StatusCode, message: String) -> AppError {
    if status == StatusCode::UNPROCESSABLE_ENTITY {
        AppError::ValidationError(message)
    } else if status.is_server_error() {
        AppError::Internal(message)
    } else {
        AppError::BadRequest(message)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        from_rejection(rejection.status(), rejection.body_text())
    }
}
