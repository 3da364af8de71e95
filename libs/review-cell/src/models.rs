// libs/review-cell/src/models.rs
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use shared_client::BackendError;
use shared_models::wire;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(deserialize_with = "wire::id")]
    pub id: String,
    #[serde(deserialize_with = "wire::id")]
    pub appointment_id: String,
    #[serde(deserialize_with = "wire::id")]
    pub patient_id: String,
    #[serde(deserialize_with = "wire::id")]
    pub doctor_id: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub doctor_name: String,
    #[serde(default)]
    pub doctor_specialization: String,
    #[serde(default)]
    pub appointment_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

/// Server verdict for one appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCheck {
    pub can_review: bool,
    pub has_reviewed: bool,
}

impl ReviewCheck {
    pub fn allows_review(&self) -> bool {
        self.can_review && !self.has_reviewed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorRating {
    #[serde(deserialize_with = "wire::id")]
    pub doctor_id: String,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub total_reviews: u64,
}

/// Aggregates shown on a doctor's review tab.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewSummary {
    pub average_rating: f64,
    pub total_reviews: u64,
    pub positive_share: u32,
    /// Count per star, index 0 is one star.
    pub distribution: [usize; 5],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewRequest {
    pub appointment_id: String,
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateReviewRequest {
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

/// A rating and comment that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidReview {
    pub rating: u8,
    pub comment: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Review already exists for this appointment")]
    AlreadyReviewed,

    #[error("Appointment is not eligible for review")]
    NotEligible,

    #[error("Review not found")]
    NotFound,

    #[error("Unauthorized access to review")]
    Unauthorized,

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}
