// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::{Local, NaiveDate, NaiveDateTime};
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::pagination::{paginate, PageQuery};
use shared_utils::state::AppState;

use crate::models::{
    AppointmentError, AppointmentTab, BookAppointmentRequest, CreateSlotsRequest, DecisionRequest,
    RescheduleAppointmentRequest, SlotConflictQuery,
};
use crate::services::booking::AppointmentBookingService;
use crate::services::slots::SlotService;

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => AppError::NotFound(err.to_string()),
            AppointmentError::Unauthorized => AppError::Forbidden(err.to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::SlotNotAvailable
            | AppointmentError::RescheduleNotAllowed(_)
            | AppointmentError::CancelNotAllowed(_)
            | AppointmentError::InvalidStatusTransition { .. } => AppError::Conflict(err.to_string()),
            AppointmentError::Backend(e) => e.into(),
        }
    }
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Decision bodies are optional; a bare POST carries no notes.
fn decision_notes(body: Option<Json<DecisionRequest>>) -> Option<String> {
    body.map(|Json(request)| request).unwrap_or_default().notes
}

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct AppointmentListQuery {
    pub tab: Option<AppointmentTab>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SlotDateQuery {
    pub date: NaiveDate,
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

/// Caller's appointments split into upcoming/past tabs, decorated with badge
/// and allowed actions.
#[axum::debug_handler]
pub async fn list_my_appointments(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let profile_id = user.require_profile()?;
    let now = local_now();

    let service = AppointmentBookingService::new(&state.backend);
    let appointments = service
        .get_appointments_for(&user, profile_id, auth.token())
        .await?;

    let lifecycle = service.lifecycle();
    let next = lifecycle.next_appointment(&appointments, now).cloned();
    let (upcoming, past) = lifecycle.partition_by_time(appointments, now);
    let (upcoming_count, past_count) = (upcoming.len(), past.len());

    let tab = query.tab.unwrap_or_default();
    let selected = match tab {
        AppointmentTab::Upcoming => upcoming,
        AppointmentTab::Past => past,
    };

    let views = selected
        .into_iter()
        .map(|appointment| lifecycle.describe(appointment, user.role, now))
        .collect();

    let page = paginate(
        views,
        &PageQuery {
            page: query.page,
            per_page: query.per_page,
        },
    );

    Ok(Json(json!({
        "appointments": page.items,
        "pagination": page.pagination,
        "counts": { "upcoming": upcoming_count, "past": past_count },
        "next_appointment": next,
    })))
}

/// Booking requests waiting on the calling doctor.
#[axum::debug_handler]
pub async fn list_pending_requests(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Doctor)?;
    let doctor_id = user.require_profile()?;
    let now = local_now();

    let service = AppointmentBookingService::new(&state.backend);
    let pending = service.get_pending_requests(doctor_id, auth.token()).await?;

    let views: Vec<_> = pending
        .into_iter()
        .map(|appointment| service.lifecycle().describe(appointment, user.role, now))
        .collect();

    Ok(Json(json!({
        "total": views.len(),
        "requests": views,
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state.backend);
    let appointment = service.get_appointment(&appointment_id, auth.token()).await?;
    service.ensure_participant(&appointment, &user)?;

    let view = service.lifecycle().describe(appointment, user.role, local_now());
    Ok(Json(json!(view)))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Patient)?;
    let patient_id = user.require_profile()?;

    let _guard = state
        .in_flight
        .begin("book", &format!("{}:{}", patient_id, request.time_slot_id))?;

    let service = AppointmentBookingService::new(&state.backend);
    let appointment = service
        .book_appointment(patient_id, request, local_now(), auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment requested. The doctor will confirm it shortly."
    })))
}

#[axum::debug_handler]
pub async fn approve_appointment(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    body: Option<Json<DecisionRequest>>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Doctor)?;
    user.require_profile()?;

    // approve and reject share one key so they cannot race each other
    let _guard = state.in_flight.begin("decide", &appointment_id)?;

    let service = AppointmentBookingService::new(&state.backend);
    let appointment = service
        .approve_appointment(&appointment_id, &user, decision_notes(body), auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment approved"
    })))
}

#[axum::debug_handler]
pub async fn reject_appointment(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    body: Option<Json<DecisionRequest>>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Doctor)?;
    user.require_profile()?;

    let _guard = state.in_flight.begin("decide", &appointment_id)?;

    let service = AppointmentBookingService::new(&state.backend);
    let appointment = service
        .reject_appointment(&appointment_id, &user, decision_notes(body), auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment rejected"
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    body: Option<Json<DecisionRequest>>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Doctor)?;
    user.require_profile()?;

    let _guard = state.in_flight.begin("complete", &appointment_id)?;

    let service = AppointmentBookingService::new(&state.backend);
    let appointment = service
        .complete_appointment(&appointment_id, &user, decision_notes(body), auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment marked as completed"
    })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    user.require_profile()?;

    let _guard = state.in_flight.begin("reschedule", &appointment_id)?;

    let service = AppointmentBookingService::new(&state.backend);
    let appointment = service
        .reschedule_appointment(&appointment_id, request, &user, local_now(), auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment rescheduled"
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    user.require_profile()?;

    let _guard = state.in_flight.begin("cancel", &appointment_id)?;

    let service = AppointmentBookingService::new(&state.backend);
    service
        .cancel_appointment(&appointment_id, &user, local_now(), auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment cancelled"
    })))
}

// ==============================================================================
// SLOT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_bookable_slots(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<String>,
    Query(query): Query<SlotDateQuery>,
) -> Result<Json<Value>, AppError> {
    let service = SlotService::new(&state.backend);
    let slots = service
        .get_bookable_slots(&doctor_id, query.date, local_now(), auth.token())
        .await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": query.date,
        "slots": slots,
    })))
}

#[axum::debug_handler]
pub async fn get_my_slots(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Doctor)?;
    let doctor_id = user.require_profile()?;

    let slots = SlotService::new(&state.backend)
        .get_doctor_slots(doctor_id, auth.token())
        .await?;

    Ok(Json(json!({
        "total": slots.len(),
        "slots": slots,
    })))
}

#[axum::debug_handler]
pub async fn generate_slots(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateSlotsRequest>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Doctor)?;
    let doctor_id = user.require_profile()?;

    let _guard = state
        .in_flight
        .begin("generate-slots", &format!("{}:{}", doctor_id, request.date))?;

    let slots = SlotService::new(&state.backend)
        .create_slots(doctor_id, request, local_now(), auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "created": slots.len(),
        "slots": slots,
    })))
}

#[axum::debug_handler]
pub async fn delete_slot(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(slot_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Doctor)?;
    user.require_profile()?;

    let _guard = state.in_flight.begin("delete-slot", &slot_id)?;

    SlotService::new(&state.backend)
        .delete_slot(&slot_id, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Slot deleted"
    })))
}

#[axum::debug_handler]
pub async fn check_slot_conflict(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(query): Json<SlotConflictQuery>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Doctor)?;
    let doctor_id = user.require_profile()?;

    let has_conflict = SlotService::new(&state.backend)
        .check_conflict(doctor_id, query, auth.token())
        .await?;

    Ok(Json(json!({ "has_conflict": has_conflict })))
}
