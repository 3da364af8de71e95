// libs/document-permission-cell/src/handlers.rs
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

use crate::models::{
    CreatePermissionRequest, PermissionDecision, PermissionError, RespondPermissionRequest,
};
use crate::services::grant::GRANT_DURATION_HOURS;
use crate::services::permission::DocumentPermissionService;

impl From<PermissionError> for AppError {
    fn from(err: PermissionError) -> Self {
        match err {
            PermissionError::ValidationError(msg) => AppError::ValidationError(msg),
            PermissionError::NotFound => AppError::NotFound(err.to_string()),
            PermissionError::NotPending(_) | PermissionError::NotRevocable => {
                AppError::Conflict(err.to_string())
            }
            PermissionError::Unauthorized => AppError::Forbidden(err.to_string()),
            PermissionError::Backend(e) => e.into(),
        }
    }
}

#[axum::debug_handler]
pub async fn request_permission(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePermissionRequest>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Doctor)?;
    let doctor_id = user.require_profile()?;

    let _guard = state.in_flight.begin(
        "request-document",
        &format!("{}:{}", request.appointment_id, request.document_id),
    )?;

    let created = DocumentPermissionService::new(&state.backend)
        .request_permission(doctor_id, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "request": created,
        "message": "Access request sent to the patient"
    })))
}

/// The calling patient's requests, bucketed into pending, active and closed.
#[axum::debug_handler]
pub async fn list_my_requests(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Patient)?;
    let patient_id = user.require_profile()?;

    let service = DocumentPermissionService::new(&state.backend);
    let requests = service.get_patient_requests(patient_id, auth.token()).await?;
    let groups = service
        .grants()
        .group_requests(requests, Local::now().naive_local());

    Ok(Json(json!({
        "pending_count": groups.pending.len(),
        "active_count": groups.active.len(),
        "groups": groups,
    })))
}

#[axum::debug_handler]
pub async fn respond_to_request(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(request_id): Path<String>,
    Json(response): Json<RespondPermissionRequest>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Patient)?;
    let patient_id = user.require_profile()?;

    let _guard = state.in_flight.begin("respond-document", &request_id)?;

    let decision = response.response;
    let updated = DocumentPermissionService::new(&state.backend)
        .respond(&request_id, patient_id, response, auth.token())
        .await?;

    let message = match decision {
        PermissionDecision::Approved => {
            format!("Access granted for {} hours", GRANT_DURATION_HOURS)
        }
        PermissionDecision::Rejected => "Access request declined".to_string(),
    };

    Ok(Json(json!({
        "success": true,
        "request": updated,
        "message": message
    })))
}

#[axum::debug_handler]
pub async fn revoke_grant(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(request_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Patient)?;
    let patient_id = user.require_profile()?;

    let _guard = state.in_flight.begin("revoke-document", &request_id)?;

    DocumentPermissionService::new(&state.backend)
        .revoke(&request_id, patient_id, Local::now().naive_local(), auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Access revoked"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment_access(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Doctor)?;
    let doctor_id = user.require_profile()?;

    let access = DocumentPermissionService::new(&state.backend)
        .doctor_access(&appointment_id, doctor_id, Local::now().naive_local(), auth.token())
        .await?;

    Ok(Json(json!({
        "appointment_id": appointment_id,
        "documents": access,
    })))
}

#[axum::debug_handler]
pub async fn check_document_access(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path((document_id, appointment_id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Doctor)?;
    let doctor_id = user.require_profile()?;

    let access = DocumentPermissionService::new(&state.backend)
        .check_access(
            &document_id,
            &appointment_id,
            doctor_id,
            Local::now().naive_local(),
            auth.token(),
        )
        .await?;

    Ok(Json(json!(access)))
}
