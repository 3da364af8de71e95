// libs/review-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::state::AppState;

use crate::handlers;

pub fn review_routes(state: Arc<AppState>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::submit_review))
        .route("/eligible", get(handlers::list_reviewable_appointments))
        .route("/mine", get(handlers::list_my_reviews))
        .route("/doctor/{doctor_id}", get(handlers::get_doctor_reviews))
        .route("/appointment/{appointment_id}/can-review", get(handlers::check_can_review))
        .route("/{review_id}", put(handlers::update_review).delete(handlers::delete_review))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
