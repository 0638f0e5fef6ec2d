// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use shared_database::AppState;
use shared_models::error::AppError;
use shared_utils::extract::{AppJson, AppPath, AppQuery};

use crate::models::{AppointmentQuery, CreateAppointmentRequest, UpdateAppointmentRequest};
use crate::services::BookingService;

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = BookingService::new(&state);

    let appointment = service.book_appointment(request, Utc::now()).await?;

    Ok((StatusCode::CREATED, Json(json!(appointment))))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<AppointmentQuery>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);

    let appointments = service.list_appointments(query).await?;

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    AppPath(appointment_id): AppPath<i64>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);

    let appointment = service.get_appointment(appointment_id).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppState>>,
    AppPath(appointment_id): AppPath<i64>,
    AppJson(request): AppJson<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);

    let appointment = service
        .update_appointment(appointment_id, request, Utc::now())
        .await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    AppPath(appointment_id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    let service = BookingService::new(&state);

    service.delete_appointment(appointment_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
