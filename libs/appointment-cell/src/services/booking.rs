// libs/appointment-cell/src/services/booking.rs
use chrono::NaiveDateTime;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};

use shared_client::{BackendClient, BackendError};
use shared_models::auth::{Role, User};

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, BookAppointmentRequest,
    RescheduleAppointmentRequest,
};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::slots::SlotService;

/// Appointment reads and writes against the clinic backend. The backend stays
/// the authority; the checks here reject requests it would only bounce later.
pub struct AppointmentBookingService {
    backend: BackendClient,
    lifecycle_service: AppointmentLifecycleService,
    slot_service: SlotService,
}

fn not_found_as_missing(err: BackendError) -> AppointmentError {
    if err.is_not_found() {
        AppointmentError::NotFound
    } else {
        AppointmentError::Backend(err)
    }
}

impl AppointmentBookingService {
    pub fn new(backend: &BackendClient) -> Self {
        Self {
            backend: backend.clone(),
            lifecycle_service: AppointmentLifecycleService::new(),
            slot_service: SlotService::new(backend),
        }
    }

    pub fn lifecycle(&self) -> &AppointmentLifecycleService {
        &self.lifecycle_service
    }

    pub async fn get_appointment(
        &self,
        appointment_id: &str,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment {}", appointment_id);

        let path = format!("/appointments/{}", urlencoding::encode(appointment_id));
        self.backend
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(not_found_as_missing)
    }

    pub async fn get_patient_appointments(
        &self,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!("/appointments/patient/{}", urlencoding::encode(patient_id));
        let appointments: Vec<Appointment> = self
            .backend
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(appointments)
    }

    pub async fn get_doctor_appointments(
        &self,
        doctor_id: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!("/appointments/doctor/{}", urlencoding::encode(doctor_id));
        let appointments: Vec<Appointment> = self
            .backend
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(appointments)
    }

    /// Appointments listed for the caller: a patient sees all of theirs, a
    /// doctor sees the approved schedule.
    pub async fn get_appointments_for(
        &self,
        actor: &User,
        profile_id: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        match actor.role {
            Role::Patient => self.get_patient_appointments(profile_id, auth_token).await,
            Role::Doctor => {
                let appointments = self.get_doctor_appointments(profile_id, auth_token).await?;
                Ok(self.lifecycle_service.doctor_schedule(appointments))
            }
            Role::Admin => Err(AppointmentError::Unauthorized),
        }
    }

    /// Booking requests still waiting on the doctor, soonest first.
    pub async fn get_pending_requests(
        &self,
        doctor_id: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut pending: Vec<Appointment> = self
            .get_doctor_appointments(doctor_id, auth_token)
            .await?
            .into_iter()
            .filter(|appointment| appointment.status == AppointmentStatus::Pending)
            .collect();

        pending.sort_by_key(|appointment| appointment.starts_at());
        Ok(pending)
    }

    pub fn ensure_participant(&self, appointment: &Appointment, actor: &User) -> Result<(), AppointmentError> {
        if actor.is_admin() {
            return Ok(());
        }

        let profile_id = actor.profile_id.as_deref().unwrap_or_default();
        let owns = match actor.role {
            Role::Patient => appointment.patient_id == profile_id,
            Role::Doctor => appointment.doctor_id == profile_id,
            Role::Admin => true,
        };

        if !owns {
            warn!("User {} is not a participant of appointment {}", actor.id, appointment.id);
            return Err(AppointmentError::Unauthorized);
        }

        Ok(())
    }

    pub async fn book_appointment(
        &self,
        patient_id: &str,
        request: BookAppointmentRequest,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Booking slot {} with doctor {} for patient {}", request.time_slot_id, request.doctor_id, patient_id);

        let slot = self
            .slot_service
            .find_bookable_slot(&request.doctor_id, &request.time_slot_id, request.date, now, auth_token)
            .await?;

        let body = json!({
            "patientId": patient_id,
            "doctorId": request.doctor_id,
            "timeSlotId": slot.id,
            "notes": request.notes,
        });

        let appointment: Appointment = self
            .backend
            .request(Method::POST, "/appointments", Some(auth_token), Some(body))
            .await?;

        info!("Appointment {} booked for patient {}", appointment.id, patient_id);
        Ok(appointment)
    }

    async fn update_status(
        &self,
        appointment: &Appointment,
        new_status: AppointmentStatus,
        notes: Option<String>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.lifecycle_service
            .validate_status_transition(appointment.status, new_status)?;

        let path = format!("/appointments/{}/status", urlencoding::encode(&appointment.id));
        let body = json!({
            "status": new_status,
            "notes": notes,
        });

        let updated: Appointment = self
            .backend
            .request(Method::PATCH, &path, Some(auth_token), Some(body))
            .await
            .map_err(not_found_as_missing)?;

        info!("Appointment {} moved from {} to {}", appointment.id, appointment.status, new_status);
        Ok(updated)
    }

    async fn decide(
        &self,
        appointment_id: &str,
        decision: AppointmentStatus,
        actor: &User,
        notes: Option<String>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;
        self.ensure_participant(&appointment, actor)?;

        if !self.lifecycle_service.can_decide(&appointment, actor.role) {
            warn!("Decision {} refused for appointment {} in status {}", decision, appointment.id, appointment.status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: appointment.status,
                to: decision,
            });
        }

        self.update_status(&appointment, decision, notes, auth_token).await
    }

    pub async fn approve_appointment(
        &self,
        appointment_id: &str,
        actor: &User,
        notes: Option<String>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.decide(appointment_id, AppointmentStatus::Approved, actor, notes, auth_token)
            .await
    }

    pub async fn reject_appointment(
        &self,
        appointment_id: &str,
        actor: &User,
        notes: Option<String>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.decide(appointment_id, AppointmentStatus::Rejected, actor, notes, auth_token)
            .await
    }

    pub async fn complete_appointment(
        &self,
        appointment_id: &str,
        actor: &User,
        notes: Option<String>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;
        self.ensure_participant(&appointment, actor)?;

        if !self.lifecycle_service.can_complete(&appointment, actor.role) {
            return Err(AppointmentError::InvalidStatusTransition {
                from: appointment.status,
                to: AppointmentStatus::Completed,
            });
        }

        self.update_status(&appointment, AppointmentStatus::Completed, notes, auth_token)
            .await
    }

    pub async fn reschedule_appointment(
        &self,
        appointment_id: &str,
        request: RescheduleAppointmentRequest,
        actor: &User,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;
        self.ensure_participant(&appointment, actor)?;

        if let Some(reason) = self
            .lifecycle_service
            .reschedule_blocker(&appointment, actor.role, now)
        {
            warn!("Reschedule of appointment {} refused: {}", appointment.id, reason);
            return Err(AppointmentError::RescheduleNotAllowed(reason));
        }

        if appointment.time_slot_id.as_deref() == Some(request.new_time_slot_id.as_str())
            && appointment.date == request.new_date
        {
            return Err(AppointmentError::ValidationError(
                "Choose a different slot".to_string(),
            ));
        }

        let slot = self
            .slot_service
            .find_bookable_slot(
                &appointment.doctor_id,
                &request.new_time_slot_id,
                request.new_date,
                now,
                auth_token,
            )
            .await?;

        let path = format!("/appointments/{}/reschedule", urlencoding::encode(&appointment.id));
        let body = json!({
            "newTimeSlotId": slot.id,
            "newDate": request.new_date.format("%Y-%m-%d").to_string(),
            "newTimeFrom": slot.time_from.format("%H:%M").to_string(),
            "newTimeTo": slot.time_to.format("%H:%M").to_string(),
        });

        let updated: Appointment = self
            .backend
            .request(Method::PATCH, &path, Some(auth_token), Some(body))
            .await
            .map_err(not_found_as_missing)?;

        info!("Appointment {} rescheduled to {} {}", updated.id, updated.date, updated.time_from);
        Ok(updated)
    }

    pub async fn cancel_appointment(
        &self,
        appointment_id: &str,
        actor: &User,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;
        self.ensure_participant(&appointment, actor)?;

        if let Some(reason) = self.lifecycle_service.cancel_blocker(&appointment, actor.role, now) {
            warn!("Cancellation of appointment {} refused: {}", appointment.id, reason);
            return Err(AppointmentError::CancelNotAllowed(reason));
        }

        let path = format!("/appointments/{}", urlencoding::encode(&appointment.id));
        self.backend
            .execute(Method::DELETE, &path, Some(auth_token), None)
            .await
            .map_err(not_found_as_missing)?;

        info!("Appointment {} cancelled by patient {}", appointment.id, appointment.patient_id);
        Ok(())
    }
}
