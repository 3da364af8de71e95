// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::state::AppState;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppState>) -> Router {
    // All appointment operations require authentication
    let protected_routes = Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/mine", get(handlers::list_my_appointments))
        .route("/pending", get(handlers::list_pending_requests))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}", delete(handlers::cancel_appointment))
        .route("/{appointment_id}/approve", post(handlers::approve_appointment))
        .route("/{appointment_id}/reject", post(handlers::reject_appointment))
        .route("/{appointment_id}/complete", post(handlers::complete_appointment))
        .route("/{appointment_id}/reschedule", patch(handlers::reschedule_appointment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}

pub fn slot_routes(state: Arc<AppState>) -> Router {
    let protected_routes = Router::new()
        .route("/available/{doctor_id}", get(handlers::get_bookable_slots))
        .route("/mine", get(handlers::get_my_slots))
        .route("/generate", post(handlers::generate_slots))
        .route("/check-conflict", post(handlers::check_slot_conflict))
        .route("/{slot_id}", delete(handlers::delete_slot))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
