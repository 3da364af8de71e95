// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use shared_client::BackendError;
use shared_models::wire::{self, time_of_day};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(deserialize_with = "wire::id")]
    pub id: String,
    #[serde(deserialize_with = "wire::id")]
    pub patient_id: String,
    #[serde(deserialize_with = "wire::id")]
    pub doctor_id: String,
    #[serde(default, alias = "slotId", deserialize_with = "wire::optional_id")]
    pub time_slot_id: Option<String>,
    pub date: NaiveDate,
    #[serde(with = "time_of_day")]
    pub time_from: NaiveTime,
    #[serde(with = "time_of_day")]
    pub time_to: NaiveTime,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub doctor_name: String,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub specialization: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "wire::zero_if_null")]
    pub reschedule_count: u32,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

impl Appointment {
    /// Local wall-clock start: `date @ timeFrom`.
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time_from)
    }

    pub fn ends_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time_to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
    /// Any status this gateway does not know about. Never actionable.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "PENDING"),
            AppointmentStatus::Approved => write!(f, "APPROVED"),
            AppointmentStatus::Rejected => write!(f, "REJECTED"),
            AppointmentStatus::Completed => write!(f, "COMPLETED"),
            AppointmentStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTone {
    Secondary,
    Positive,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusBadge {
    pub label: &'static str,
    pub tone: BadgeTone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    #[serde(deserialize_with = "wire::id")]
    pub id: String,
    #[serde(default, deserialize_with = "wire::optional_id")]
    pub doctor_id: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(with = "time_of_day")]
    pub time_from: NaiveTime,
    #[serde(with = "time_of_day")]
    pub time_to: NaiveTime,
    #[serde(default = "default_available", deserialize_with = "wire::true_if_null")]
    pub is_available: bool,
    #[serde(default)]
    pub duration: Option<u32>,
}

fn default_available() -> bool {
    true
}

// ==============================================================================
// DECORATED VIEWS
// ==============================================================================

/// Actions the caller may trigger on an appointment right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AppointmentActions {
    pub reschedule: bool,
    pub cancel: bool,
    pub approve: bool,
    pub reject: bool,
    pub complete: bool,
}

impl AppointmentActions {
    pub fn any(&self) -> bool {
        self.reschedule || self.cancel || self.approve || self.reject || self.complete
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub badge: StatusBadge,
    pub upcoming: bool,
    pub actions: AppointmentActions,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentTab {
    #[default]
    Upcoming,
    Past,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: String,
    pub time_slot_id: String,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_time_slot_id: String,
    pub new_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSlotsRequest {
    pub date: NaiveDate,
    #[serde(with = "time_of_day")]
    pub time_from: NaiveTime,
    #[serde(with = "time_of_day")]
    pub time_to: NaiveTime,
    pub duration: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotConflictQuery {
    pub date: NaiveDate,
    #[serde(with = "time_of_day")]
    pub time_from: NaiveTime,
    #[serde(with = "time_of_day")]
    pub time_to: NaiveTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotConflictResponse {
    pub has_conflict: bool,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Appointment slot not available")]
    SlotNotAvailable,

    #[error("Appointment cannot be rescheduled: {0}")]
    RescheduleNotAllowed(String),

    #[error("Appointment cannot be cancelled: {0}")]
    CancelNotAllowed(String),

    #[error("Appointment cannot move from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Unauthorized access to appointment")]
    Unauthorized,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}
