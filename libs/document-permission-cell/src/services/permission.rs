// libs/document-permission-cell/src/services/permission.rs
use chrono::NaiveDateTime;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};

use appointment_cell::models::{AppointmentError, AppointmentStatus};
use appointment_cell::services::booking::AppointmentBookingService;
use shared_client::BackendClient;

use crate::models::{
    CreatePermissionRequest, DocumentAccess, DocumentAccessView, PermissionError,
    PermissionRequest, RespondPermissionRequest,
};
use crate::services::grant::PermissionGrantService;

impl From<AppointmentError> for PermissionError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => {
                PermissionError::ValidationError("Appointment not found".to_string())
            }
            AppointmentError::Unauthorized => PermissionError::Unauthorized,
            AppointmentError::Backend(e) => PermissionError::Backend(e),
            other => PermissionError::ValidationError(other.to_string()),
        }
    }
}

pub struct DocumentPermissionService {
    backend: BackendClient,
    appointments: AppointmentBookingService,
    grants: PermissionGrantService,
}

impl DocumentPermissionService {
    pub fn new(backend: &BackendClient) -> Self {
        Self {
            backend: backend.clone(),
            appointments: AppointmentBookingService::new(backend),
            grants: PermissionGrantService::new(),
        }
    }

    pub fn grants(&self) -> &PermissionGrantService {
        &self.grants
    }

    /// Checks that `doctor_id` is the doctor on an approved appointment.
    async fn ensure_treating_doctor(
        &self,
        appointment_id: &str,
        doctor_id: &str,
        auth_token: &str,
    ) -> Result<(), PermissionError> {
        let appointment = self.appointments.get_appointment(appointment_id, auth_token).await?;

        if appointment.doctor_id != doctor_id {
            warn!("Doctor {} is not on appointment {}", doctor_id, appointment_id);
            return Err(PermissionError::Unauthorized);
        }

        if !matches!(
            appointment.status,
            AppointmentStatus::Approved | AppointmentStatus::Completed
        ) {
            return Err(PermissionError::ValidationError(format!(
                "Documents can only be requested for approved appointments (status is {})",
                appointment.status
            )));
        }

        Ok(())
    }

    pub async fn request_permission(
        &self,
        doctor_id: &str,
        request: CreatePermissionRequest,
        auth_token: &str,
    ) -> Result<PermissionRequest, PermissionError> {
        self.grants.validate_request(&request)?;
        self.ensure_treating_doctor(&request.appointment_id, doctor_id, auth_token)
            .await?;

        let message = request
            .request_message
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());

        let body = json!({
            "appointmentId": request.appointment_id,
            "documentId": request.document_id,
            "requestMessage": message,
        });

        let created: PermissionRequest = self
            .backend
            .request(Method::POST, "/document-permissions/request", Some(auth_token), Some(body))
            .await?;

        info!("Doctor {} requested document {} ({})", doctor_id, created.document_id, created.id);
        Ok(created)
    }

    pub async fn get_patient_requests(
        &self,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Vec<PermissionRequest>, PermissionError> {
        let path = format!(
            "/document-permissions/patient/{}/requests",
            urlencoding::encode(patient_id)
        );
        let requests: Vec<PermissionRequest> = self
            .backend
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(requests)
    }

    /// The backend has no single-request lookup; the patient's own list also
    /// scopes the lookup to requests they own.
    async fn find_patient_request(
        &self,
        request_id: &str,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<PermissionRequest, PermissionError> {
        debug!("Looking up permission request {} for patient {}", request_id, patient_id);

        self.get_patient_requests(patient_id, auth_token)
            .await?
            .into_iter()
            .find(|request| request.id == request_id)
            .ok_or(PermissionError::NotFound)
    }

    pub async fn respond(
        &self,
        request_id: &str,
        patient_id: &str,
        response: RespondPermissionRequest,
        auth_token: &str,
    ) -> Result<PermissionRequest, PermissionError> {
        let request = self
            .find_patient_request(request_id, patient_id, auth_token)
            .await?;
        self.grants.ensure_respondable(&request)?;

        let path = format!("/document-permissions/{}/respond", urlencoding::encode(&request.id));
        let body = json!({
            "permissionRequestId": request.id,
            "response": response.response,
            "responseMessage": response.response_message,
        });

        let updated: PermissionRequest = self
            .backend
            .request(Method::POST, &path, Some(auth_token), Some(body))
            .await?;

        info!("Permission request {} answered: {}", updated.id, updated.status);
        Ok(updated)
    }

    pub async fn revoke(
        &self,
        request_id: &str,
        patient_id: &str,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<(), PermissionError> {
        let request = self
            .find_patient_request(request_id, patient_id, auth_token)
            .await?;
        self.grants.ensure_revocable(&request, now)?;

        let path = format!("/document-permissions/{}/revoke", urlencoding::encode(&request.id));
        self.backend
            .execute(Method::POST, &path, Some(auth_token), None)
            .await?;

        info!("Permission request {} revoked by patient {}", request.id, patient_id);
        Ok(())
    }

    /// Documents the doctor was granted for an appointment, with fresh expiry.
    pub async fn doctor_access(
        &self,
        appointment_id: &str,
        doctor_id: &str,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<Vec<DocumentAccessView>, PermissionError> {
        self.ensure_treating_doctor(appointment_id, doctor_id, auth_token)
            .await?;

        let path = format!(
            "/document-permissions/doctor/appointment/{}/access",
            urlencoding::encode(appointment_id)
        );
        let access: Vec<DocumentAccess> = self
            .backend
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(access
            .into_iter()
            .map(|entry| self.grants.refresh_access(entry, now))
            .collect())
    }

    pub async fn check_access(
        &self,
        document_id: &str,
        appointment_id: &str,
        doctor_id: &str,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<DocumentAccessView, PermissionError> {
        self.ensure_treating_doctor(appointment_id, doctor_id, auth_token)
            .await?;

        let path = format!(
            "/document-permissions/check-access/{}/{}",
            urlencoding::encode(document_id),
            urlencoding::encode(appointment_id)
        );
        let access: DocumentAccess = self
            .backend
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(self.grants.refresh_access(access, now))
    }
}
