// libs/review-cell/src/services/eligibility.rs
use std::fmt::Display;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use appointment_cell::models::{Appointment, AppointmentStatus};

use crate::models::{Review, ReviewCheck, ReviewError, ReviewSummary, ValidReview};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

/// Rating at or above which a review counts as positive.
pub const POSITIVE_RATING: u8 = 4;

#[derive(Debug, Clone, Default)]
pub struct ReviewEligibilityService;

impl ReviewEligibilityService {
    pub fn new() -> Self {
        Self
    }

    /// Completed by the doctor, or approved and already over.
    pub fn is_review_candidate(&self, appointment: &Appointment, now: NaiveDateTime) -> bool {
        match appointment.status {
            AppointmentStatus::Completed => true,
            AppointmentStatus::Approved => appointment.ends_at() < now,
            _ => false,
        }
    }

    pub fn candidates(&self, appointments: Vec<Appointment>, now: NaiveDateTime) -> Vec<Appointment> {
        appointments
            .into_iter()
            .filter(|appointment| self.is_review_candidate(appointment, now))
            .collect()
    }

    /// Keeps candidates the server still accepts a review for. A failed check
    /// drops its candidate without failing the rest.
    pub fn reconcile<E: Display>(
        &self,
        checked: Vec<(Appointment, Result<ReviewCheck, E>)>,
    ) -> Vec<Appointment> {
        checked
            .into_iter()
            .filter_map(|(appointment, check)| match check {
                Ok(check) if check.allows_review() => Some(appointment),
                Ok(check) => {
                    debug!(
                        "Appointment {} not reviewable (can_review={}, has_reviewed={})",
                        appointment.id, check.can_review, check.has_reviewed
                    );
                    None
                }
                Err(e) => {
                    warn!("Review check failed for appointment {}: {}", appointment.id, e);
                    None
                }
            })
            .collect()
    }

    /// Runs before any network call. Blank comments are dropped.
    pub fn validate_submission(
        &self,
        rating: Option<i32>,
        comment: Option<String>,
    ) -> Result<ValidReview, ReviewError> {
        let rating = rating.ok_or_else(|| {
            ReviewError::ValidationError("Please select a rating before submitting".to_string())
        })?;

        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(ReviewError::ValidationError(format!(
                "Rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }

        let comment = comment
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());

        Ok(ValidReview {
            rating: rating as u8,
            comment,
        })
    }

    pub fn rating_label(&self, rating: u8) -> Option<&'static str> {
        match rating {
            1 => Some("Poor"),
            2 => Some("Fair"),
            3 => Some("Good"),
            4 => Some("Very Good"),
            5 => Some("Excellent"),
            _ => None,
        }
    }

    /// Percentage of reviews rated 4 or 5, rounded. Zero when there are none.
    pub fn positive_share(&self, reviews: &[Review]) -> u32 {
        if reviews.is_empty() {
            return 0;
        }

        let positive = reviews
            .iter()
            .filter(|review| review.rating >= POSITIVE_RATING)
            .count();

        ((positive as f64 / reviews.len() as f64) * 100.0).round() as u32
    }

    pub fn rating_distribution(&self, reviews: &[Review]) -> [usize; 5] {
        let mut distribution = [0usize; 5];
        for review in reviews {
            if (1..=5).contains(&review.rating) {
                distribution[(review.rating - 1) as usize] += 1;
            }
        }
        distribution
    }

    pub fn summarize(&self, reviews: &[Review]) -> ReviewSummary {
        let total = reviews.len();
        let average_rating = if total == 0 {
            0.0
        } else {
            let sum: u32 = reviews.iter().map(|review| review.rating as u32).sum();
            ((sum as f64 / total as f64) * 10.0).round() / 10.0
        };

        ReviewSummary {
            average_rating,
            total_reviews: total as u64,
            positive_share: self.positive_share(reviews),
            distribution: self.rating_distribution(reviews),
        }
    }
}
