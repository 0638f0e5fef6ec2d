use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use shared_database::AppState;

use crate::handlers::*;

pub fn create_patient_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/patients", get(list_patients).post(create_patient))
        .route(
            "/patients/{patient_id}",
            get(get_patient)
                .patch(update_patient)
                .put(replace_patient)
                .delete(delete_patient),
        )
        .route("/patients/{patient_id}/restore", post(restore_patient))
        .with_state(state)
}
