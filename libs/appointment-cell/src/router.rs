use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppState>) -> Router {
    // All appointment operations require authentication
    let protected_routes = Router::new()
        .route("/create", post(handlers::create_appointment))
        .route("/user-appointments", get(handlers::get_patient_appointments))
        .route("/available-slots", get(handlers::get_available_slots))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/update/{appointment_id}", put(handlers::update_appointment))
        .route("/cancel/{appointment_id}", delete(handlers::cancel_appointment))
        .route("/confirm/{appointment_id}", put(handlers::confirm_appointment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
