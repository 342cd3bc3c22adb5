use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn schedule_routes(state: Arc<AppState>) -> Router {
    // Schedule maintenance is clinic administration; everything requires auth.
    let protected_routes = Router::new()
        .route("/create", post(handlers::create_schedule))
        .route("/doctor-schedules/{doctor_id}", get(handlers::get_doctor_schedules))
        .route("/{schedule_id}", get(handlers::get_schedule))
        .route("/update/{schedule_id}", put(handlers::update_schedule))
        .route("/delete/{schedule_id}", delete(handlers::delete_schedule))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
