// libs/appointment-cell/src/services/slots.rs
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};

use shared_client::BackendClient;

use crate::models::{
    AppointmentError, CreateSlotsRequest, SlotConflictQuery, SlotConflictResponse, TimeSlot,
};
use crate::services::lifecycle::AppointmentLifecycleService;

pub const MIN_SLOT_MINUTES: u32 = 15;
pub const MAX_SLOT_MINUTES: u32 = 120;

pub struct SlotService {
    backend: BackendClient,
    lifecycle: AppointmentLifecycleService,
}

impl SlotService {
    pub fn new(backend: &BackendClient) -> Self {
        Self {
            backend: backend.clone(),
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    /// Slots the backend reports free for a doctor on a date, unfiltered.
    pub async fn get_available_slots(
        &self,
        doctor_id: &str,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<TimeSlot>, AppointmentError> {
        debug!("Fetching available slots for doctor {} on {}", doctor_id, date);

        let path = format!(
            "/slots/available/{}?date={}",
            urlencoding::encode(doctor_id),
            date.format("%Y-%m-%d")
        );

        let slots: Vec<TimeSlot> = self
            .backend
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(slots)
    }

    /// Available slots minus those already started when `date` is today.
    pub async fn get_bookable_slots(
        &self,
        doctor_id: &str,
        date: NaiveDate,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<Vec<TimeSlot>, AppointmentError> {
        let slots = self.get_available_slots(doctor_id, date, auth_token).await?;
        Ok(self.lifecycle.filter_bookable_slots(slots, date, now))
    }

    /// Looks a slot up among the bookable slots for `date`.
    pub async fn find_bookable_slot(
        &self,
        doctor_id: &str,
        slot_id: &str,
        date: NaiveDate,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<TimeSlot, AppointmentError> {
        if date < now.date() {
            return Err(AppointmentError::ValidationError(
                "Cannot book a date in the past".to_string(),
            ));
        }

        self.get_bookable_slots(doctor_id, date, now, auth_token)
            .await?
            .into_iter()
            .find(|slot| slot.id == slot_id && slot.is_available)
            .ok_or_else(|| {
                warn!("Slot {} for doctor {} on {} is not bookable", slot_id, doctor_id, date);
                AppointmentError::SlotNotAvailable
            })
    }

    pub async fn get_doctor_slots(
        &self,
        doctor_id: &str,
        auth_token: &str,
    ) -> Result<Vec<TimeSlot>, AppointmentError> {
        let path = format!("/slots/doctor/{}", urlencoding::encode(doctor_id));
        let slots: Vec<TimeSlot> = self
            .backend
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(slots)
    }

    pub fn validate_slot_request(
        &self,
        request: &CreateSlotsRequest,
        now: NaiveDateTime,
    ) -> Result<(), AppointmentError> {
        if request.time_to <= request.time_from {
            return Err(AppointmentError::ValidationError(
                "End time must be after start time".to_string(),
            ));
        }

        if !(MIN_SLOT_MINUTES..=MAX_SLOT_MINUTES).contains(&request.duration) {
            return Err(AppointmentError::ValidationError(format!(
                "Slot duration must be between {} and {} minutes",
                MIN_SLOT_MINUTES, MAX_SLOT_MINUTES
            )));
        }

        if request.date < now.date() {
            return Err(AppointmentError::ValidationError(
                "Cannot create slots in the past".to_string(),
            ));
        }

        Ok(())
    }

    pub async fn create_slots(
        &self,
        doctor_id: &str,
        request: CreateSlotsRequest,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<Vec<TimeSlot>, AppointmentError> {
        self.validate_slot_request(&request, now)?;

        let body = json!({
            "doctorId": doctor_id,
            "date": request.date.format("%Y-%m-%d").to_string(),
            "timeFrom": request.time_from.format("%H:%M").to_string(),
            "timeTo": request.time_to.format("%H:%M").to_string(),
            "duration": request.duration,
        });

        let slots: Vec<TimeSlot> = self
            .backend
            .request(Method::POST, "/slots/generate", Some(auth_token), Some(body))
            .await?;

        info!("Generated {} slots for doctor {} on {}", slots.len(), doctor_id, request.date);
        Ok(slots)
    }

    pub async fn delete_slot(&self, slot_id: &str, auth_token: &str) -> Result<(), AppointmentError> {
        let path = format!("/slots/{}", urlencoding::encode(slot_id));
        self.backend
            .execute(Method::DELETE, &path, Some(auth_token), None)
            .await?;

        info!("Slot {} deleted", slot_id);
        Ok(())
    }

    pub async fn check_conflict(
        &self,
        doctor_id: &str,
        query: SlotConflictQuery,
        auth_token: &str,
    ) -> Result<bool, AppointmentError> {
        if query.time_to <= query.time_from {
            return Err(AppointmentError::ValidationError(
                "End time must be after start time".to_string(),
            ));
        }

        let body = json!({
            "doctorId": doctor_id,
            "date": query.date.format("%Y-%m-%d").to_string(),
            "timeFrom": query.time_from.format("%H:%M").to_string(),
            "timeTo": query.time_to.format("%H:%M").to_string(),
        });

        let response: SlotConflictResponse = self
            .backend
            .request(Method::POST, "/slots/check-conflict", Some(auth_token), Some(body))
            .await?;

        Ok(response.has_conflict)
    }
}
