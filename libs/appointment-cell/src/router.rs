// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{routing::get, Router};

use shared_database::AppState;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/appointments",
            get(handlers::list_appointments).post(handlers::book_appointment),
        )
        .route(
            "/appointments/{appointment_id}",
            get(handlers::get_appointment)
                .patch(handlers::update_appointment)
                .delete(handlers::delete_appointment),
        )
        .with_state(state)
}
