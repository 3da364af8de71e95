// libs/emergency-cell/tests/emergency_test.rs
use assert_matches::assert_matches;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

use emergency_cell::emergency_routes;
use emergency_cell::models::{
    CompleteEmergencyRequest, CreateEmergencyRequest, EmergencyError, EmergencyStatus,
    RejectEmergencyRequest, UrgencyLevel,
};
use emergency_cell::services::emergency::EmergencyService;
use shared_client::BackendClient;
use shared_utils::test_utils::{JwtTestUtils, MockBackendResponses, TestConfig, TestUser};

const TOKEN: &str = "test-token";

async fn setup() -> (EmergencyService, MockServer) {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_backend(&mock_server.uri()).to_app_config();
    (EmergencyService::new(&BackendClient::new(&config).unwrap()), mock_server)
}

async fn mock_doctor_pending(server: &MockServer, requests: Value) {
    Mock::given(method("GET"))
        .and(path("/emergency/doctor/doc-1/requests/pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(requests))
        .mount(server)
        .await;
}

#[tokio::test]
async fn patient_raises_request() {
    let (service, server) = setup().await;

    Mock::given(method("POST"))
        .and(path("/emergency/request"))
        .and(body_partial_json(json!({
            "patientId": "pat-1",
            "symptoms": "Chest pain",
            "urgencyLevel": "HIGH",
            "location": "Dublin 8"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockBackendResponses::emergency_response("em-1", "PENDING", "HIGH"),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let created = service
        .create_request(
            "pat-1",
            CreateEmergencyRequest {
                symptoms: " Chest pain ".to_string(),
                urgency_level: UrgencyLevel::High,
                location: "Dublin 8".to_string(),
                notes: Some("  ".to_string()),
            },
            TOKEN,
        )
        .await
        .unwrap();

    assert_eq!(created.status, EmergencyStatus::Pending);
    assert_eq!(created.urgency_level, UrgencyLevel::High);
}

#[tokio::test]
async fn invalid_request_never_reaches_backend() {
    let (service, server) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = service
        .create_request(
            "pat-1",
            CreateEmergencyRequest {
                symptoms: String::new(),
                urgency_level: UrgencyLevel::Low,
                location: "Dublin 8".to_string(),
                notes: None,
            },
            TOKEN,
        )
        .await;

    assert_matches!(result, Err(EmergencyError::ValidationError(_)));
}

#[tokio::test]
async fn pending_queue_is_sorted_by_urgency() {
    let (service, server) = setup().await;
    mock_doctor_pending(&server, json!([
        MockBackendResponses::emergency_response("em-low", "PENDING", "LOW"),
        MockBackendResponses::emergency_response("em-high", "PENDING", "HIGH"),
    ]))
    .await;

    let pending = service.get_pending_for_doctor("doc-1", TOKEN).await.unwrap();
    let ids: Vec<_> = pending.iter().map(|r| r.id.as_str()).collect();

    assert_eq!(ids, vec!["em-high", "em-low"]);
}

#[tokio::test]
async fn doctor_accepts_pending_request() {
    let (service, server) = setup().await;
    mock_doctor_pending(&server, json!([
        MockBackendResponses::emergency_response("em-1", "PENDING", "HIGH"),
    ]))
    .await;

    Mock::given(method("PATCH"))
        .and(path("/emergency/doctor/doc-1/request/em-1/accept"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockBackendResponses::emergency_response("em-1", "ACCEPTED", "HIGH"),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let accepted = service.accept_request("em-1", "doc-1", TOKEN).await.unwrap();
    assert_eq!(accepted.status, EmergencyStatus::Accepted);
}

#[tokio::test]
async fn request_outside_queue_cannot_be_rejected() {
    let (service, server) = setup().await;
    mock_doctor_pending(&server, json!([])).await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = service
        .reject_request(
            "em-9",
            "doc-1",
            RejectEmergencyRequest {
                reason: Some("Outside my area".to_string()),
            },
            TOKEN,
        )
        .await;

    assert_matches!(result, Err(EmergencyError::NotFound));
}

#[tokio::test]
async fn only_accepted_requests_complete() {
    let (service, server) = setup().await;

    let mut accepted = MockBackendResponses::emergency_response("em-1", "ACCEPTED", "HIGH");
    accepted["doctorId"] = json!("doc-1");
    Mock::given(method("GET"))
        .and(path("/emergency/doctor/doc-1/requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            accepted,
            MockBackendResponses::emergency_response("em-2", "PENDING", "LOW"),
        ])))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/emergency/request/em-1/complete"))
        .and(body_partial_json(json!({ "notes": "Stabilised" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockBackendResponses::emergency_response("em-1", "COMPLETED", "HIGH"),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let completed = service
        .complete_request(
            "em-1",
            "doc-1",
            CompleteEmergencyRequest {
                notes: Some("Stabilised".to_string()),
            },
            TOKEN,
        )
        .await
        .unwrap();
    assert_eq!(completed.status, EmergencyStatus::Completed);

    let early = service
        .complete_request("em-2", "doc-1", CompleteEmergencyRequest::default(), TOKEN)
        .await;
    assert_matches!(
        early,
        Err(EmergencyError::InvalidStatusTransition {
            from: EmergencyStatus::Pending,
            to: EmergencyStatus::Completed
        })
    );
}

#[tokio::test]
async fn accepted_request_cannot_be_cancelled_through_router() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_backend(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/emergency/patient/pat-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockBackendResponses::emergency_response("em-1", "ACCEPTED", "HIGH"),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&mock_server)
        .await;

    let patient = TestUser::patient("sam@example.com").with_profile("pat-1");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, Some(1));

    let app = Router::new().nest("/emergency", emergency_routes(config.to_state()));
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/emergency/em-1")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].as_str().unwrap().contains("ACCEPTED"));
}

#[tokio::test]
async fn complete_without_body_is_accepted_through_router() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_backend(&mock_server.uri());

    let mut accepted = MockBackendResponses::emergency_response("em-1", "ACCEPTED", "HIGH");
    accepted["doctorId"] = json!("doc-1");
    Mock::given(method("GET"))
        .and(path("/emergency/doctor/doc-1/requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([accepted])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/emergency/request/em-1/complete"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockBackendResponses::emergency_response("em-1", "COMPLETED", "HIGH"),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let doctor = TestUser::doctor("doc@example.com").with_profile("doc-1");
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, Some(1));

    let app = Router::new().nest("/emergency", emergency_routes(config.to_state()));
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/emergency/em-1/complete")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["request"]["status"], "COMPLETED");
}
