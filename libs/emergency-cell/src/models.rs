// libs/emergency-cell/src/models.rs
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use shared_client::BackendError;
use shared_models::wire;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmergencyStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for EmergencyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmergencyStatus::Pending => write!(f, "PENDING"),
            EmergencyStatus::Accepted => write!(f, "ACCEPTED"),
            EmergencyStatus::Rejected => write!(f, "REJECTED"),
            EmergencyStatus::Completed => write!(f, "COMPLETED"),
            EmergencyStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Ordered from most to least urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrgencyLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyRequest {
    #[serde(deserialize_with = "wire::id")]
    pub id: String,
    #[serde(deserialize_with = "wire::id")]
    pub patient_id: String,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub patient_phone: Option<String>,
    pub symptoms: String,
    pub urgency_level: UrgencyLevel,
    #[serde(default)]
    pub location: String,
    pub status: EmergencyStatus,
    #[serde(default, deserialize_with = "wire::optional_id")]
    pub accepted_by: Option<String>,
    #[serde(default, deserialize_with = "wire::optional_id")]
    pub doctor_id: Option<String>,
    #[serde(default)]
    pub doctor_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

impl EmergencyRequest {
    /// Whichever doctor the backend recorded as handling the request.
    pub fn handling_doctor(&self) -> Option<&str> {
        self.doctor_id.as_deref().or(self.accepted_by.as_deref())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyTab {
    #[default]
    Active,
    Completed,
    Rejected,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmergencyCounts {
    pub active: usize,
    pub completed: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEmergencyRequest {
    pub symptoms: String,
    pub urgency_level: UrgencyLevel,
    pub location: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RejectEmergencyRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteEmergencyRequest {
    pub notes: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum EmergencyError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Emergency request not found")]
    NotFound,

    #[error("Emergency request cannot move from {from} to {to}")]
    InvalidStatusTransition {
        from: EmergencyStatus,
        to: EmergencyStatus,
    },

    #[error("Only pending emergency requests can be cancelled (status is {0})")]
    NotCancellable(EmergencyStatus),

    #[error("Unauthorized access to emergency request")]
    Unauthorized,

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}
