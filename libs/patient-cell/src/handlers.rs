use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_database::AppState;
use shared_models::error::AppError;
use shared_utils::extract::{AppJson, AppPath, AppQuery};

use crate::models::{
    CreatePatientRequest, PatientId, PatientQuery, ReplacePatientRequest, UpdatePatientRequest,
};
use crate::services::PatientService;

#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<CreatePatientRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = PatientService::new(&state);

    let patient = service.create_patient(request).await?;

    Ok((StatusCode::CREATED, Json(json!(patient))))
}

#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<PatientQuery>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&state);

    let patients = service.list_patients(query).await?;

    Ok(Json(json!(patients)))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<Arc<AppState>>,
    AppPath(patient_id): AppPath<String>,
) -> Result<Json<Value>, AppError> {
    let patient_id = PatientId::parse(&patient_id)?;
    let service = PatientService::new(&state);

    let patient = service.get_patient(&patient_id).await?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<Arc<AppState>>,
    AppPath(patient_id): AppPath<String>,
    AppJson(request): AppJson<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let patient_id = PatientId::parse(&patient_id)?;
    let service = PatientService::new(&state);

    let patient = service.update_patient(&patient_id, request).await?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn replace_patient(
    State(state): State<Arc<AppState>>,
    AppPath(patient_id): AppPath<String>,
    AppJson(request): AppJson<ReplacePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let patient_id = PatientId::parse(&patient_id)?;
    let service = PatientService::new(&state);

    let patient = service.replace_patient(&patient_id, request).await?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<Arc<AppState>>,
    AppPath(patient_id): AppPath<String>,
) -> Result<StatusCode, AppError> {
    let patient_id = PatientId::parse(&patient_id)?;
    let service = PatientService::new(&state);

    service.soft_delete_patient(&patient_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn restore_patient(
    State(state): State<Arc<AppState>>,
    AppPath(patient_id): AppPath<String>,
) -> Result<Json<Value>, AppError> {
    let patient_id = PatientId::parse(&patient_id)?;
    let service = PatientService::new(&state);

    let patient = service.restore_patient(&patient_id).await?;

    Ok(Json(json!(patient)))
}
