// libs/document-permission-cell/src/models.rs
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use shared_client::BackendError;
use shared_models::wire;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionStatus {
    Pending,
    Approved,
    Rejected,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionStatus::Pending => write!(f, "PENDING"),
            PermissionStatus::Approved => write!(f, "APPROVED"),
            PermissionStatus::Rejected => write!(f, "REJECTED"),
            PermissionStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// A doctor's request to view one patient document for one appointment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    #[serde(deserialize_with = "wire::id")]
    pub id: String,
    #[serde(deserialize_with = "wire::id")]
    pub appointment_id: String,
    #[serde(deserialize_with = "wire::id")]
    pub doctor_id: String,
    #[serde(default)]
    pub doctor_name: String,
    #[serde(deserialize_with = "wire::id")]
    pub patient_id: String,
    #[serde(deserialize_with = "wire::id")]
    pub document_id: String,
    #[serde(default)]
    pub document_name: String,
    #[serde(default)]
    pub document_type: String,
    #[serde(default)]
    pub request_message: Option<String>,
    pub status: PermissionStatus,
    #[serde(default)]
    pub requested_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub responded_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub expires_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub is_expired: Option<bool>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

impl PermissionRequest {
    pub fn flagged_expired(&self) -> bool {
        self.is_expired.unwrap_or(false)
    }
}

/// What a doctor may see for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAccess {
    #[serde(deserialize_with = "wire::id")]
    pub document_id: String,
    #[serde(default, deserialize_with = "wire::optional_id")]
    pub permission_id: Option<String>,
    #[serde(default, deserialize_with = "wire::false_if_null")]
    pub can_view: bool,
    #[serde(default)]
    pub expires_at: Option<NaiveDateTime>,
    /// Whole minutes.
    #[serde(default)]
    pub time_remaining: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentAccessView {
    #[serde(flatten)]
    pub access: DocumentAccess,
    pub time_remaining_label: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PermissionView {
    #[serde(flatten)]
    pub request: PermissionRequest,
    pub access_valid: bool,
    pub minutes_remaining: Option<i64>,
    pub time_remaining_label: Option<String>,
}

/// Patient inbox buckets.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PermissionGroups {
    pub pending: Vec<PermissionView>,
    pub active: Vec<PermissionView>,
    pub closed: Vec<PermissionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePermissionRequest {
    pub appointment_id: String,
    pub document_id: String,
    pub request_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionDecision {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondPermissionRequest {
    pub response: PermissionDecision,
    pub response_message: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PermissionError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Permission request not found")]
    NotFound,

    #[error("Permission request was already answered ({0})")]
    NotPending(PermissionStatus),

    #[error("Only active grants can be revoked")]
    NotRevocable,

    #[error("Unauthorized access to permission request")]
    Unauthorized,

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}
