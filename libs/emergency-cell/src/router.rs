// libs/emergency-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::state::AppState;

use crate::handlers;

pub fn emergency_routes(state: Arc<AppState>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::create_emergency_request))
        .route("/mine", get(handlers::list_my_emergency_requests))
        .route("/pending", get(handlers::list_pending_emergencies))
        .route("/{request_id}", delete(handlers::cancel_emergency_request))
        .route("/{request_id}/accept", post(handlers::accept_emergency_request))
        .route("/{request_id}/reject", post(handlers::reject_emergency_request))
        .route("/{request_id}/complete", post(handlers::complete_emergency_request))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
