use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use appointment_cell::{appointment_routes, slot_routes};
use document_permission_cell::document_permission_routes;
use emergency_cell::emergency_routes;
use review_cell::review_routes;
use shared_utils::state::AppState;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic portal API is running!" }))
        .route("/health", get(health))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/slots", slot_routes(state.clone()))
        .nest("/reviews", review_routes(state.clone()))
        .nest("/document-permissions", document_permission_routes(state.clone()))
        .nest("/emergency", emergency_routes(state))
}
