use std::sync::Arc;

use axum::{routing::get, Router};
use tower::Layer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::Level;

use appointment_cell::router::appointment_routes;
use doctor_cell::router::doctor_routes;
use patient_cell::router::create_patient_router;
use shared_database::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .merge(doctor_routes(state.clone()))
        .merge(create_patient_router(state.clone()))
        .merge(appointment_routes(state))
}

/// Full HTTP stack. Trailing slashes are trimmed before routing so that
/// `/doctors/` and `/doctors` reach the same handler.
pub fn create_app(state: Arc<AppState>) -> NormalizePath<Router> {
    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    NormalizePathLayer::trim_trailing_slash().layer(router)
}
