// libs/document-permission-cell/tests/permission_service_test.rs
use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

use document_permission_cell::models::{
    CreatePermissionRequest, PermissionDecision, PermissionError, PermissionStatus,
    RespondPermissionRequest,
};
use document_permission_cell::services::permission::DocumentPermissionService;
use shared_client::BackendClient;
use shared_utils::test_utils::{MockBackendResponses, TestConfig};

const TOKEN: &str = "test-token";

async fn setup() -> (DocumentPermissionService, MockServer) {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_backend(&mock_server.uri()).to_app_config();
    (DocumentPermissionService::new(&BackendClient::new(&config).unwrap()), mock_server)
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 10)
        .unwrap()
        .and_time(NaiveTime::from_hms_opt(10, 0, 0).unwrap())
}

async fn mock_patient_requests(server: &MockServer, requests: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/document-permissions/patient/pat-1/requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(requests))
        .mount(server)
        .await;
}

async fn mock_appointment(server: &MockServer, status: &str) {
    Mock::given(method("GET"))
        .and(path("/appointments/apt-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockBackendResponses::appointment_response("apt-1", "pat-1", "doc-1", "2025-01-10", "09:00", "09:30", status),
        ))
        .mount(server)
        .await;
}

#[tokio::test]
async fn patient_approves_pending_request() {
    let (service, server) = setup().await;
    mock_patient_requests(&server, json!([
        MockBackendResponses::permission_request_response("perm-1", "PENDING", None),
    ]))
    .await;

    Mock::given(method("POST"))
        .and(path("/document-permissions/perm-1/respond"))
        .and(body_partial_json(json!({ "permissionRequestId": "perm-1", "response": "APPROVED" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockBackendResponses::permission_request_response("perm-1", "APPROVED", Some("2025-01-10T22:00:00")),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let updated = service
        .respond(
            "perm-1",
            "pat-1",
            RespondPermissionRequest {
                response: PermissionDecision::Approved,
                response_message: None,
            },
            TOKEN,
        )
        .await
        .unwrap();

    assert_eq!(updated.status, PermissionStatus::Approved);
    assert!(service.grants().is_access_valid(&updated, now()));
}

#[tokio::test]
async fn answered_request_cannot_be_answered_again() {
    let (service, server) = setup().await;
    mock_patient_requests(&server, json!([
        MockBackendResponses::permission_request_response("perm-1", "REJECTED", None),
    ]))
    .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = service
        .respond(
            "perm-1",
            "pat-1",
            RespondPermissionRequest {
                response: PermissionDecision::Approved,
                response_message: None,
            },
            TOKEN,
        )
        .await;

    assert_matches!(result, Err(PermissionError::NotPending(PermissionStatus::Rejected)));
}

#[tokio::test]
async fn unknown_request_is_not_found() {
    let (service, server) = setup().await;
    mock_patient_requests(&server, json!([])).await;

    let result = service.revoke("perm-404", "pat-1", now(), TOKEN).await;
    assert_matches!(result, Err(PermissionError::NotFound));
}

#[tokio::test]
async fn active_grant_is_revoked() {
    let (service, server) = setup().await;
    mock_patient_requests(&server, json!([
        MockBackendResponses::permission_request_response("perm-1", "APPROVED", Some("2025-01-10T20:00:00")),
    ]))
    .await;

    Mock::given(method("POST"))
        .and(path("/document-permissions/perm-1/revoke"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    assert!(service.revoke("perm-1", "pat-1", now(), TOKEN).await.is_ok());
}

#[tokio::test]
async fn doctor_request_requires_own_approved_appointment() {
    let (service, server) = setup().await;
    mock_appointment(&server, "PENDING").await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let request = CreatePermissionRequest {
        appointment_id: "apt-1".to_string(),
        document_id: "doc-file-1".to_string(),
        request_message: None,
    };

    let pending = service.request_permission("doc-1", request.clone(), TOKEN).await;
    assert_matches!(pending, Err(PermissionError::ValidationError(_)));

    let stranger = service.request_permission("doc-2", request, TOKEN).await;
    assert_matches!(stranger, Err(PermissionError::Unauthorized));
}

#[tokio::test]
async fn doctor_request_is_sent() {
    let (service, server) = setup().await;
    mock_appointment(&server, "APPROVED").await;

    Mock::given(method("POST"))
        .and(path("/document-permissions/request"))
        .and(body_partial_json(json!({
            "appointmentId": "apt-1",
            "documentId": "doc-file-1",
            "requestMessage": "Needed for follow-up"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockBackendResponses::permission_request_response("perm-2", "PENDING", None),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let created = service
        .request_permission(
            "doc-1",
            CreatePermissionRequest {
                appointment_id: "apt-1".to_string(),
                document_id: "doc-file-1".to_string(),
                request_message: Some(" Needed for follow-up ".to_string()),
            },
            TOKEN,
        )
        .await
        .unwrap();

    assert_eq!(created.status, PermissionStatus::Pending);
}

#[tokio::test]
async fn doctor_access_recomputes_remaining_time() {
    let (service, server) = setup().await;
    mock_appointment(&server, "APPROVED").await;

    Mock::given(method("GET"))
        .and(path("/document-permissions/doctor/appointment/apt-1/access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "documentId": 40,
                "permissionId": "perm-1",
                "canView": true,
                "expiresAt": "2025-01-10T12:05:00",
                "timeRemaining": 500
            }
        ])))
        .mount(&server)
        .await;

    let access = service.doctor_access("apt-1", "doc-1", now(), TOKEN).await.unwrap();

    assert_eq!(access.len(), 1);
    assert_eq!(access[0].access.document_id, "40");
    assert_eq!(access[0].access.time_remaining, Some(125));
    assert_eq!(access[0].time_remaining_label.as_deref(), Some("2h 5m"));
}

#[tokio::test]
async fn null_can_view_entry_does_not_break_access_list() {
    let (service, server) = setup().await;
    mock_appointment(&server, "APPROVED").await;

    Mock::given(method("GET"))
        .and(path("/document-permissions/doctor/appointment/apt-1/access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "documentId": 40, "canView": null, "expiresAt": null, "timeRemaining": null },
            { "documentId": 41, "permissionId": 7, "canView": true, "expiresAt": "2025-01-10T11:00:00" }
        ])))
        .mount(&server)
        .await;

    let access = service.doctor_access("apt-1", "doc-1", now(), TOKEN).await.unwrap();

    assert_eq!(access.len(), 2);
    assert!(!access[0].access.can_view);
    assert!(access[1].access.can_view);
    assert_eq!(access[1].time_remaining_label.as_deref(), Some("60m"));
}
