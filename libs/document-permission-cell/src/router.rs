// libs/document-permission-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::state::AppState;

use crate::handlers;

pub fn document_permission_routes(state: Arc<AppState>) -> Router {
    let protected_routes = Router::new()
        // Doctor side
        .route("/request", post(handlers::request_permission))
        .route("/appointment/{appointment_id}/access", get(handlers::get_appointment_access))
        .route(
            "/check-access/{document_id}/{appointment_id}",
            get(handlers::check_document_access),
        )
        // Patient side
        .route("/mine", get(handlers::list_my_requests))
        .route("/{request_id}/respond", post(handlers::respond_to_request))
        .route("/{request_id}/revoke", post(handlers::revoke_grant))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
