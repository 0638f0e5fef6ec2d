use std::sync::Arc;

use axum::{
    routing::{get, patch},
    Router,
};

use shared_database::AppState;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppState>) -> Router {
    // Doctor profile management
    let profile_routes = Router::new()
        .route("/doctors", get(handlers::list_doctors).post(handlers::create_doctor))
        .route(
            "/doctors/{doctor_id}",
            get(handlers::get_doctor)
                .patch(handlers::update_doctor)
                .put(handlers::replace_doctor)
                .delete(handlers::delete_doctor),
        );

    // Weekly availability slots
    let schedule_routes = Router::new()
        .route(
            "/doctors/{doctor_id}/schedules",
            get(handlers::list_schedules).post(handlers::create_schedule),
        )
        .route(
            "/doctors/{doctor_id}/schedules/{schedule_id}",
            patch(handlers::update_schedule).delete(handlers::delete_schedule),
        );

    Router::new()
        .merge(profile_routes)
        .merge(schedule_routes)
        .with_state(state)
}
