//! Drop-in replacements for axum's `Json`, `Path` and `Query` extractors
//! whose rejections render as `{"error": ...}` like every other failure.

use axum::extract::{FromRequest, FromRequestParts};

use shared_models::error::AppError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);
