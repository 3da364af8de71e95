use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

use crate::state::AppState;

pub struct TestConfig {
    pub jwt_secret: String,
    pub backend_api_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            backend_api_url: "http://localhost:8080/api".to_string(),
        }
    }
}

impl TestConfig {
    /// Points the backend client at a mock server.
    pub fn with_backend(backend_api_url: &str) -> Self {
        Self {
            backend_api_url: backend_api_url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            backend_api_url: self.backend_api_url.clone(),
            backend_api_key: None,
            jwt_secret: self.jwt_secret.clone(),
            bind_address: "127.0.0.1:0".to_string(),
            backend_timeout_secs: 5,
        }
    }

    pub fn to_state(&self) -> Arc<AppState> {
        AppState::new(self.to_app_config())
            .expect("test backend client builds")
            .into_shared()
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
    pub profile_id: Option<String>,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "PATIENT".to_string(),
            profile_id: None,
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
            profile_id: None,
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "DOCTOR")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "PATIENT")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "ADMIN")
    }

    pub fn with_profile(mut self, profile_id: &str) -> Self {
        self.profile_id = Some(profile_id.to_string());
        self
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: self.role.parse().unwrap_or(shared_models::auth::Role::Patient),
            profile_id: self.profile_id.clone(),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "profile_id": user.profile_id,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned backend payloads, shaped like the clinic backend's JSON.
pub struct MockBackendResponses;

impl MockBackendResponses {
    pub fn appointment_response(
        id: &str,
        patient_id: &str,
        doctor_id: &str,
        date: &str,
        time_from: &str,
        time_to: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "patientId": patient_id,
            "doctorId": doctor_id,
            "timeSlotId": "slot-1",
            "date": date,
            "timeFrom": time_from,
            "timeTo": time_to,
            "status": status,
            "doctorName": "Dr. Ada Byrne",
            "patientName": "Sam Kelly",
            "specialization": "Cardiology",
            "rescheduleCount": 0,
            "createdAt": "2025-01-01T09:00:00"
        })
    }

    pub fn slot_response(id: &str, doctor_id: &str, date: &str, time_from: &str, time_to: &str) -> serde_json::Value {
        json!({
            "id": id,
            "doctorId": doctor_id,
            "date": date,
            "timeFrom": time_from,
            "timeTo": time_to,
            "isAvailable": true,
            "duration": 30
        })
    }

    pub fn review_check_response(can_review: bool, has_reviewed: bool) -> serde_json::Value {
        json!({
            "canReview": can_review,
            "hasReviewed": has_reviewed
        })
    }

    pub fn permission_request_response(id: &str, status: &str, expires_at: Option<&str>) -> serde_json::Value {
        json!({
            "id": id,
            "appointmentId": "apt-1",
            "doctorId": "doc-1",
            "doctorName": "Dr. Ada Byrne",
            "patientId": "pat-1",
            "documentId": "doc-file-1",
            "documentName": "blood-panel.pdf",
            "documentType": "LAB_REPORT",
            "requestMessage": "Needed for follow-up",
            "status": status,
            "requestedAt": "2025-01-10T08:00:00",
            "respondedAt": expires_at.map(|_| "2025-01-10T09:00:00"),
            "expiresAt": expires_at,
            "isExpired": false,
            "createdAt": "2025-01-10T08:00:00"
        })
    }

    pub fn emergency_response(id: &str, status: &str, urgency: &str) -> serde_json::Value {
        json!({
            "id": id,
            "patientId": "pat-1",
            "patientName": "Sam Kelly",
            "patientPhone": "+353 1 555 0100",
            "symptoms": "Chest pain",
            "urgencyLevel": urgency,
            "location": "Dublin 8",
            "status": status,
            "createdAt": "2025-01-10T08:00:00",
            "updatedAt": "2025-01-10T08:00:00"
        })
    }

    pub fn error_response(message: &str) -> serde_json::Value {
        json!({
            "message": message
        })
    }
}
