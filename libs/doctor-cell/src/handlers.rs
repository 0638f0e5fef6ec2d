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

use crate::models::{
    CreateDoctorRequest, CreateScheduleRequest, DoctorQuery, UpdateDoctorRequest,
    UpdateScheduleRequest,
};
use crate::services::{AvailabilityService, DoctorService};

// ==============================================================================
// DOCTOR HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service.create_doctor(request).await?;

    Ok((StatusCode::CREATED, Json(json!(doctor))))
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<DoctorQuery>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctors = doctor_service.list_doctors(query).await?;

    Ok(Json(json!(doctors)))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppState>>,
    AppPath(doctor_id): AppPath<i64>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service.get_doctor(doctor_id).await?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(state): State<Arc<AppState>>,
    AppPath(doctor_id): AppPath<i64>,
    AppJson(request): AppJson<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service.update_doctor(doctor_id, request).await?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn replace_doctor(
    State(state): State<Arc<AppState>>,
    AppPath(doctor_id): AppPath<i64>,
    AppJson(request): AppJson<CreateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service.replace_doctor(doctor_id, request).await?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn delete_doctor(
    State(state): State<Arc<AppState>>,
    AppPath(doctor_id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    let doctor_service = DoctorService::new(&state);

    doctor_service.delete_doctor(doctor_id, Utc::now()).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// WEEKLY SCHEDULE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_schedules(
    State(state): State<Arc<AppState>>,
    AppPath(doctor_id): AppPath<i64>,
) -> Result<Json<Value>, AppError> {
    let availability_service = AvailabilityService::new(&state);

    let schedules = availability_service.list_schedules(doctor_id).await?;

    Ok(Json(json!(schedules)))
}

#[axum::debug_handler]
pub async fn create_schedule(
    State(state): State<Arc<AppState>>,
    AppPath(doctor_id): AppPath<i64>,
    AppJson(request): AppJson<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let availability_service = AvailabilityService::new(&state);

    let schedule = availability_service.create_schedule(doctor_id, request).await?;

    Ok((StatusCode::CREATED, Json(json!(schedule))))
}

#[axum::debug_handler]
pub async fn update_schedule(
    State(state): State<Arc<AppState>>,
    AppPath((doctor_id, schedule_id)): AppPath<(i64, i64)>,
    AppJson(request): AppJson<UpdateScheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let availability_service = AvailabilityService::new(&state);

    let schedule = availability_service
        .update_schedule(doctor_id, schedule_id, request)
        .await?;

    Ok(Json(json!(schedule)))
}

#[axum::debug_handler]
pub async fn delete_schedule(
    State(state): State<Arc<AppState>>,
    AppPath((doctor_id, schedule_id)): AppPath<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    let availability_service = AvailabilityService::new(&state);

    availability_service.delete_schedule(doctor_id, schedule_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
