// libs/emergency-cell/src/services/emergency.rs
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};

use shared_client::BackendClient;

use crate::models::{
    CompleteEmergencyRequest, CreateEmergencyRequest, EmergencyError, EmergencyRequest,
    EmergencyStatus, RejectEmergencyRequest,
};
use crate::services::triage::EmergencyTriageService;

pub struct EmergencyService {
    backend: BackendClient,
    triage: EmergencyTriageService,
}

impl EmergencyService {
    pub fn new(backend: &BackendClient) -> Self {
        Self {
            backend: backend.clone(),
            triage: EmergencyTriageService::new(),
        }
    }

    pub fn triage(&self) -> &EmergencyTriageService {
        &self.triage
    }

    pub async fn create_request(
        &self,
        patient_id: &str,
        request: CreateEmergencyRequest,
        auth_token: &str,
    ) -> Result<EmergencyRequest, EmergencyError> {
        self.triage.validate_request(&request)?;

        let body = json!({
            "patientId": patient_id,
            "symptoms": request.symptoms.trim(),
            "urgencyLevel": request.urgency_level,
            "location": request.location.trim(),
            "notes": request.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        });

        let created: EmergencyRequest = self
            .backend
            .request(Method::POST, "/emergency/request", Some(auth_token), Some(body))
            .await?;

        info!(
            "Emergency request {} raised by patient {} ({:?})",
            created.id, patient_id, created.urgency_level
        );
        Ok(created)
    }

    pub async fn get_patient_requests(
        &self,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Vec<EmergencyRequest>, EmergencyError> {
        let path = format!("/emergency/patient/{}", urlencoding::encode(patient_id));
        let requests: Vec<EmergencyRequest> = self
            .backend
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(requests)
    }

    /// Pending requests routed to the doctor, in triage order.
    pub async fn get_pending_for_doctor(
        &self,
        doctor_id: &str,
        auth_token: &str,
    ) -> Result<Vec<EmergencyRequest>, EmergencyError> {
        let path = format!(
            "/emergency/doctor/{}/requests/pending",
            urlencoding::encode(doctor_id)
        );
        let mut requests: Vec<EmergencyRequest> = self
            .backend
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        self.triage.sort_for_triage(&mut requests);
        Ok(requests)
    }

    pub async fn get_doctor_requests(
        &self,
        doctor_id: &str,
        auth_token: &str,
    ) -> Result<Vec<EmergencyRequest>, EmergencyError> {
        let path = format!("/emergency/doctor/{}/requests", urlencoding::encode(doctor_id));
        let requests: Vec<EmergencyRequest> = self
            .backend
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(requests)
    }

    pub async fn cancel_request(
        &self,
        request_id: &str,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<(), EmergencyError> {
        let request = self
            .get_patient_requests(patient_id, auth_token)
            .await?
            .into_iter()
            .find(|request| request.id == request_id)
            .ok_or(EmergencyError::NotFound)?;

        self.triage.ensure_cancellable(&request)?;

        let path = format!("/emergency/request/{}", urlencoding::encode(&request.id));
        self.backend
            .execute(Method::DELETE, &path, Some(auth_token), None)
            .await?;

        info!("Emergency request {} cancelled by patient {}", request.id, patient_id);
        Ok(())
    }

    /// Only requests in the doctor's own pending queue can be answered.
    async fn find_pending(
        &self,
        request_id: &str,
        doctor_id: &str,
        auth_token: &str,
    ) -> Result<EmergencyRequest, EmergencyError> {
        debug!("Looking up pending emergency {} for doctor {}", request_id, doctor_id);

        self.get_pending_for_doctor(doctor_id, auth_token)
            .await?
            .into_iter()
            .find(|request| request.id == request_id)
            .ok_or(EmergencyError::NotFound)
    }

    pub async fn accept_request(
        &self,
        request_id: &str,
        doctor_id: &str,
        auth_token: &str,
    ) -> Result<EmergencyRequest, EmergencyError> {
        let request = self.find_pending(request_id, doctor_id, auth_token).await?;
        self.triage
            .validate_status_transition(request.status, EmergencyStatus::Accepted)?;

        let path = format!(
            "/emergency/doctor/{}/request/{}/accept",
            urlencoding::encode(doctor_id),
            urlencoding::encode(&request.id)
        );
        let accepted: EmergencyRequest = self
            .backend
            .request(Method::PATCH, &path, Some(auth_token), None)
            .await?;

        info!("Emergency request {} accepted by doctor {}", accepted.id, doctor_id);
        Ok(accepted)
    }

    pub async fn reject_request(
        &self,
        request_id: &str,
        doctor_id: &str,
        rejection: RejectEmergencyRequest,
        auth_token: &str,
    ) -> Result<(), EmergencyError> {
        let request = self.find_pending(request_id, doctor_id, auth_token).await?;
        self.triage
            .validate_status_transition(request.status, EmergencyStatus::Rejected)?;

        let path = format!(
            "/emergency/doctor/{}/request/{}/reject",
            urlencoding::encode(doctor_id),
            urlencoding::encode(&request.id)
        );
        self.backend
            .execute(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "reason": rejection.reason })),
            )
            .await?;

        info!("Emergency request {} rejected by doctor {}", request.id, doctor_id);
        Ok(())
    }

    pub async fn complete_request(
        &self,
        request_id: &str,
        doctor_id: &str,
        completion: CompleteEmergencyRequest,
        auth_token: &str,
    ) -> Result<EmergencyRequest, EmergencyError> {
        let request = self
            .get_doctor_requests(doctor_id, auth_token)
            .await?
            .into_iter()
            .find(|request| request.id == request_id)
            .ok_or(EmergencyError::NotFound)?;

        if request.handling_doctor().is_some_and(|handler| handler != doctor_id) {
            warn!("Doctor {} is not handling emergency {}", doctor_id, request.id);
            return Err(EmergencyError::Unauthorized);
        }
        self.triage
            .validate_status_transition(request.status, EmergencyStatus::Completed)?;

        let path = format!("/emergency/request/{}/complete", urlencoding::encode(&request.id));
        let completed: EmergencyRequest = self
            .backend
            .request(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "notes": completion.notes })),
            )
            .await?;

        info!("Emergency request {} completed by doctor {}", completed.id, doctor_id);
        Ok(completed)
    }
}
