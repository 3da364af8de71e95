// libs/review-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::Local;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::state::AppState;

use crate::models::{CreateReviewRequest, ReviewError, UpdateReviewRequest};
use crate::services::review::ReviewService;

impl From<ReviewError> for AppError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::ValidationError(msg) => AppError::ValidationError(msg),
            ReviewError::AlreadyReviewed | ReviewError::NotEligible => AppError::Conflict(err.to_string()),
            ReviewError::NotFound => AppError::NotFound(err.to_string()),
            ReviewError::Unauthorized => AppError::Forbidden(err.to_string()),
            ReviewError::Backend(e) => e.into(),
        }
    }
}

/// Appointments the calling patient can still review.
#[axum::debug_handler]
pub async fn list_reviewable_appointments(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Patient)?;
    let patient_id = user.require_profile()?;

    let service = ReviewService::new(&state.backend);
    let appointments = service
        .reviewable_appointments(patient_id, Local::now().naive_local(), auth.token())
        .await?;

    Ok(Json(json!({
        "total": appointments.len(),
        "appointments": appointments,
    })))
}

#[axum::debug_handler]
pub async fn submit_review(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateReviewRequest>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Patient)?;
    let patient_id = user.require_profile()?;

    let _guard = state.in_flight.begin("review", &request.appointment_id)?;

    let service = ReviewService::new(&state.backend);
    let review = service
        .submit_review(patient_id, request, Local::now().naive_local(), auth.token())
        .await?;

    let label = service.eligibility().rating_label(review.rating);
    Ok(Json(json!({
        "success": true,
        "review": review,
        "rating_label": label,
        "message": "Thank you for your feedback"
    })))
}

/// Reviews written by the calling patient, or about the calling doctor.
#[axum::debug_handler]
pub async fn list_my_reviews(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let profile_id = user.require_profile()?;
    let service = ReviewService::new(&state.backend);

    match user.role {
        Role::Patient => {
            let reviews = service.get_patient_reviews(profile_id, auth.token()).await?;
            Ok(Json(json!({
                "total": reviews.len(),
                "reviews": reviews,
            })))
        }
        Role::Doctor => doctor_reviews_body(&service, profile_id, auth.token()).await.map(Json),
        Role::Admin => Err(AppError::Forbidden("Admins have no reviews".to_string())),
    }
}

#[axum::debug_handler]
pub async fn get_doctor_reviews(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = ReviewService::new(&state.backend);
    doctor_reviews_body(&service, &doctor_id, auth.token()).await.map(Json)
}

async fn doctor_reviews_body(
    service: &ReviewService,
    doctor_id: &str,
    auth_token: &str,
) -> Result<Value, AppError> {
    let reviews = service.get_doctor_reviews(doctor_id, auth_token).await?;
    let rating = service.get_doctor_rating(doctor_id, auth_token).await?;
    let mut summary = service.eligibility().summarize(&reviews);

    // the backend aggregate wins when present
    if let Some(rating) = rating {
        summary.average_rating = rating.average_rating.unwrap_or(summary.average_rating);
        summary.total_reviews = rating.total_reviews;
    }

    Ok(json!({
        "doctor_id": doctor_id,
        "summary": summary,
        "reviews": reviews,
    }))
}

#[axum::debug_handler]
pub async fn check_can_review(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let check = ReviewService::new(&state.backend)
        .check_can_review(&appointment_id, auth.token())
        .await?;

    Ok(Json(json!({
        "can_review": check.can_review,
        "has_reviewed": check.has_reviewed,
        "allowed": check.allows_review(),
    })))
}

#[axum::debug_handler]
pub async fn update_review(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(review_id): Path<String>,
    Json(request): Json<UpdateReviewRequest>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Patient)?;
    let patient_id = user.require_profile()?;

    let _guard = state.in_flight.begin("update-review", &review_id)?;

    let review = ReviewService::new(&state.backend)
        .update_review(&review_id, patient_id, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "review": review,
    })))
}

#[axum::debug_handler]
pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(review_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Patient)?;
    let patient_id = user.require_profile()?;

    let _guard = state.in_flight.begin("delete-review", &review_id)?;

    ReviewService::new(&state.backend)
        .delete_review(&review_id, patient_id, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Review deleted"
    })))
}
