// libs/emergency-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::state::AppState;

use crate::models::{
    CompleteEmergencyRequest, CreateEmergencyRequest, EmergencyError, EmergencyTab,
    RejectEmergencyRequest,
};
use crate::services::emergency::EmergencyService;

impl From<EmergencyError> for AppError {
    fn from(err: EmergencyError) -> Self {
        match err {
            EmergencyError::ValidationError(msg) => AppError::ValidationError(msg),
            EmergencyError::NotFound => AppError::NotFound(err.to_string()),
            EmergencyError::InvalidStatusTransition { .. } | EmergencyError::NotCancellable(_) => {
                AppError::Conflict(err.to_string())
            }
            EmergencyError::Unauthorized => AppError::Forbidden(err.to_string()),
            EmergencyError::Backend(e) => e.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EmergencyListQuery {
    pub tab: Option<EmergencyTab>,
}

#[axum::debug_handler]
pub async fn create_emergency_request(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateEmergencyRequest>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Patient)?;
    let patient_id = user.require_profile()?;

    let _guard = state.in_flight.begin("emergency", patient_id)?;

    let created = EmergencyService::new(&state.backend)
        .create_request(patient_id, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "request": created,
        "message": "Emergency request sent"
    })))
}

/// Patients see their own requests, doctors the requests routed to them.
#[axum::debug_handler]
pub async fn list_my_emergency_requests(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<EmergencyListQuery>,
) -> Result<Json<Value>, AppError> {
    let profile_id = user.require_profile()?;
    let service = EmergencyService::new(&state.backend);

    let requests = match user.role {
        Role::Patient => service.get_patient_requests(profile_id, auth.token()).await?,
        Role::Doctor => service.get_doctor_requests(profile_id, auth.token()).await?,
        Role::Admin => {
            return Err(AppError::Forbidden(
                "Emergency requests are listed per patient or doctor".to_string(),
            ))
        }
    };

    let counts = service.triage().count_tabs(&requests);
    let tab = query.tab.unwrap_or_default();
    let requests = service.triage().filter_tab(requests, tab);

    Ok(Json(json!({
        "tab": tab,
        "requests": requests,
        "counts": counts,
    })))
}

#[axum::debug_handler]
pub async fn list_pending_emergencies(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Doctor)?;
    let doctor_id = user.require_profile()?;

    let requests = EmergencyService::new(&state.backend)
        .get_pending_for_doctor(doctor_id, auth.token())
        .await?;

    Ok(Json(json!({
        "total": requests.len(),
        "requests": requests,
    })))
}

#[axum::debug_handler]
pub async fn cancel_emergency_request(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(request_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Patient)?;
    let patient_id = user.require_profile()?;

    let _guard = state.in_flight.begin("cancel-emergency", &request_id)?;

    EmergencyService::new(&state.backend)
        .cancel_request(&request_id, patient_id, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Emergency request cancelled"
    })))
}

#[axum::debug_handler]
pub async fn accept_emergency_request(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(request_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Doctor)?;
    let doctor_id = user.require_profile()?;

    let _guard = state.in_flight.begin("answer-emergency", &request_id)?;

    let accepted = EmergencyService::new(&state.backend)
        .accept_request(&request_id, doctor_id, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "request": accepted,
        "message": "Emergency request accepted"
    })))
}

#[axum::debug_handler]
pub async fn reject_emergency_request(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(request_id): Path<String>,
    body: Option<Json<RejectEmergencyRequest>>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Doctor)?;
    let doctor_id = user.require_profile()?;

    let _guard = state.in_flight.begin("answer-emergency", &request_id)?;
    let rejection = body.map(|Json(rejection)| rejection).unwrap_or_default();

    EmergencyService::new(&state.backend)
        .reject_request(&request_id, doctor_id, rejection, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Emergency request rejected"
    })))
}

#[axum::debug_handler]
pub async fn complete_emergency_request(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(request_id): Path<String>,
    body: Option<Json<CompleteEmergencyRequest>>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Doctor)?;
    let doctor_id = user.require_profile()?;

    let _guard = state.in_flight.begin("complete-emergency", &request_id)?;
    let completion = body.map(|Json(completion)| completion).unwrap_or_default();

    let completed = EmergencyService::new(&state.backend)
        .complete_request(&request_id, doctor_id, completion, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "request": completed,
        "message": "Emergency request completed"
    })))
}
