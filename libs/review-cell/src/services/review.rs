// libs/review-cell/src/services/review.rs
use chrono::NaiveDateTime;
use futures::future::join_all;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};

use appointment_cell::models::{Appointment, AppointmentError};
use appointment_cell::services::booking::AppointmentBookingService;
use shared_client::{BackendClient, BackendError};

use crate::models::{
    CreateReviewRequest, DoctorRating, Review, ReviewCheck, ReviewError, UpdateReviewRequest,
};
use crate::services::eligibility::ReviewEligibilityService;

pub struct ReviewService {
    backend: BackendClient,
    appointments: AppointmentBookingService,
    eligibility: ReviewEligibilityService,
}

impl From<AppointmentError> for ReviewError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => ReviewError::NotEligible,
            AppointmentError::Unauthorized => ReviewError::Unauthorized,
            AppointmentError::Backend(e) => ReviewError::Backend(e),
            other => ReviewError::ValidationError(other.to_string()),
        }
    }
}

fn not_found_as_missing(err: BackendError) -> ReviewError {
    if err.is_not_found() {
        ReviewError::NotFound
    } else {
        ReviewError::Backend(err)
    }
}

impl ReviewService {
    pub fn new(backend: &BackendClient) -> Self {
        Self {
            backend: backend.clone(),
            appointments: AppointmentBookingService::new(backend),
            eligibility: ReviewEligibilityService::new(),
        }
    }

    pub fn eligibility(&self) -> &ReviewEligibilityService {
        &self.eligibility
    }

    pub async fn check_can_review(
        &self,
        appointment_id: &str,
        auth_token: &str,
    ) -> Result<ReviewCheck, BackendError> {
        let path = format!("/reviews/appointment/{}/can-review", urlencoding::encode(appointment_id));
        self.backend
            .request(Method::GET, &path, Some(auth_token), None)
            .await
    }

    /// Past appointments the patient can still review. Checks run
    /// concurrently; a failed check only drops its own appointment.
    pub async fn reviewable_appointments(
        &self,
        patient_id: &str,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, ReviewError> {
        let appointments = self
            .appointments
            .get_patient_appointments(patient_id, auth_token)
            .await?;

        let candidates = self.eligibility.candidates(appointments, now);
        debug!("Checking {} review candidates for patient {}", candidates.len(), patient_id);

        let checks = join_all(
            candidates
                .iter()
                .map(|appointment| self.check_can_review(&appointment.id, auth_token)),
        )
        .await;

        Ok(self
            .eligibility
            .reconcile(candidates.into_iter().zip(checks).collect()))
    }

    pub async fn submit_review(
        &self,
        patient_id: &str,
        request: CreateReviewRequest,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<Review, ReviewError> {
        let valid = self
            .eligibility
            .validate_submission(request.rating, request.comment)?;

        let appointment = self
            .appointments
            .get_appointment(&request.appointment_id, auth_token)
            .await?;

        if appointment.patient_id != patient_id {
            warn!("Patient {} tried to review appointment {}", patient_id, appointment.id);
            return Err(ReviewError::Unauthorized);
        }

        if !self.eligibility.is_review_candidate(&appointment, now) {
            return Err(ReviewError::NotEligible);
        }

        let check = self.check_can_review(&appointment.id, auth_token).await?;
        if check.has_reviewed {
            return Err(ReviewError::AlreadyReviewed);
        }
        if !check.can_review {
            return Err(ReviewError::NotEligible);
        }

        let body = json!({
            "appointmentId": appointment.id,
            "rating": valid.rating,
            "comment": valid.comment,
        });

        let review: Review = self
            .backend
            .request(Method::POST, "/reviews", Some(auth_token), Some(body))
            .await?;

        info!("Review {} submitted for appointment {}", review.id, appointment.id);
        Ok(review)
    }

    pub async fn get_review(&self, review_id: &str, auth_token: &str) -> Result<Review, ReviewError> {
        let path = format!("/reviews/{}", urlencoding::encode(review_id));
        self.backend
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(not_found_as_missing)
    }

    pub async fn get_patient_reviews(
        &self,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Vec<Review>, ReviewError> {
        let path = format!("/reviews/patient/{}", urlencoding::encode(patient_id));
        let reviews: Vec<Review> = self
            .backend
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(reviews)
    }

    pub async fn get_doctor_reviews(
        &self,
        doctor_id: &str,
        auth_token: &str,
    ) -> Result<Vec<Review>, ReviewError> {
        let path = format!("/reviews/doctor/{}", urlencoding::encode(doctor_id));
        let reviews: Vec<Review> = self
            .backend
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(reviews)
    }

    /// `None` when the doctor has no rating yet.
    pub async fn get_doctor_rating(
        &self,
        doctor_id: &str,
        auth_token: &str,
    ) -> Result<Option<DoctorRating>, ReviewError> {
        let path = format!("/reviews/doctor/{}/rating", urlencoding::encode(doctor_id));
        match self
            .backend
            .request::<DoctorRating>(Method::GET, &path, Some(auth_token), None)
            .await
        {
            Ok(rating) => Ok(Some(rating)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn owned_review(
        &self,
        review_id: &str,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Review, ReviewError> {
        let review = self.get_review(review_id, auth_token).await?;
        if review.patient_id != patient_id {
            warn!("Patient {} does not own review {}", patient_id, review_id);
            return Err(ReviewError::Unauthorized);
        }
        Ok(review)
    }

    pub async fn update_review(
        &self,
        review_id: &str,
        patient_id: &str,
        request: UpdateReviewRequest,
        auth_token: &str,
    ) -> Result<Review, ReviewError> {
        let valid = self
            .eligibility
            .validate_submission(request.rating, request.comment)?;

        let review = self.owned_review(review_id, patient_id, auth_token).await?;

        let path = format!("/reviews/{}", urlencoding::encode(&review.id));
        let body = json!({
            "appointmentId": review.appointment_id,
            "rating": valid.rating,
            "comment": valid.comment,
        });

        let updated: Review = self
            .backend
            .request(Method::PUT, &path, Some(auth_token), Some(body))
            .await
            .map_err(not_found_as_missing)?;

        info!("Review {} updated", updated.id);
        Ok(updated)
    }

    pub async fn delete_review(
        &self,
        review_id: &str,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<(), ReviewError> {
        let review = self.owned_review(review_id, patient_id, auth_token).await?;

        let path = format!("/reviews/{}", urlencoding::encode(&review.id));
        self.backend
            .execute(Method::DELETE, &path, Some(auth_token), None)
            .await
            .map_err(not_found_as_missing)?;

        info!("Review {} deleted", review.id);
        Ok(())
    }
}
