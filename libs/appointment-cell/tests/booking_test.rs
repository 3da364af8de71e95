// libs/appointment-cell/tests/booking_test.rs
use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use appointment_cell::models::{
    AppointmentError, AppointmentStatus, BookAppointmentRequest, RescheduleAppointmentRequest,
};
use appointment_cell::services::booking::AppointmentBookingService;
use shared_client::{BackendClient, BackendError};
use shared_utils::test_utils::{MockBackendResponses, TestConfig, TestUser};

const TOKEN: &str = "test-token";

// ==============================================================================
// TEST FIXTURES AND UTILITIES
// ==============================================================================

struct TestSetup {
    service: AppointmentBookingService,
    mock_server: MockServer,
}

impl TestSetup {
    async fn new() -> Self {
        let mock_server = MockServer::start().await;
        let config = TestConfig::with_backend(&mock_server.uri()).to_app_config();
        let backend = BackendClient::new(&config).unwrap();

        Self {
            service: AppointmentBookingService::new(&backend),
            mock_server,
        }
    }

    async fn mock_appointment(&self, status: &str, date: &str, time_from: &str) {
        Mock::given(method("GET"))
            .and(path("/appointments/101"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                MockBackendResponses::appointment_response(
                    "101", "pat-1", "doc-1", date, time_from, "10:30", status,
                ),
            ))
            .mount(&self.mock_server)
            .await;
    }
}

fn at(day: &str, clock: &str) -> NaiveDateTime {
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .unwrap()
        .and_time(NaiveTime::parse_from_str(clock, "%H:%M").unwrap())
}

fn doctor() -> shared_models::auth::User {
    TestUser::doctor("doc@example.com").with_profile("doc-1").to_user()
}

fn patient() -> shared_models::auth::User {
    TestUser::patient("pat@example.com").with_profile("pat-1").to_user()
}

// ==============================================================================
// APPROVE / REJECT
// ==============================================================================

#[tokio::test]
async fn approve_pending_appointment_patches_status() {
    let setup = TestSetup::new().await;
    setup.mock_appointment("PENDING", "2025-01-10", "10:00").await;

    Mock::given(method("PATCH"))
        .and(path("/appointments/101/status"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(json!({ "status": "APPROVED" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockBackendResponses::appointment_response(
                "101", "pat-1", "doc-1", "2025-01-10", "10:00", "10:30", "APPROVED",
            ),
        ))
        .expect(1)
        .mount(&setup.mock_server)
        .await;

    let updated = setup
        .service
        .approve_appointment("101", &doctor(), None, TOKEN)
        .await
        .unwrap();

    assert_eq!(updated.status, AppointmentStatus::Approved);
}

#[tokio::test]
async fn reject_sends_notes() {
    let setup = TestSetup::new().await;
    setup.mock_appointment("PENDING", "2025-01-10", "10:00").await;

    Mock::given(method("PATCH"))
        .and(path("/appointments/101/status"))
        .and(body_partial_json(json!({ "status": "REJECTED", "notes": "Fully booked" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockBackendResponses::appointment_response(
                "101", "pat-1", "doc-1", "2025-01-10", "10:00", "10:30", "REJECTED",
            ),
        ))
        .expect(1)
        .mount(&setup.mock_server)
        .await;

    let updated = setup
        .service
        .reject_appointment("101", &doctor(), Some("Fully booked".to_string()), TOKEN)
        .await
        .unwrap();

    assert_eq!(updated.status, AppointmentStatus::Rejected);
}

#[tokio::test]
async fn approving_twice_never_reaches_backend() {
    let setup = TestSetup::new().await;
    setup.mock_appointment("APPROVED", "2025-01-10", "10:00").await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&setup.mock_server)
        .await;

    let result = setup.service.approve_appointment("101", &doctor(), None, TOKEN).await;

    assert_matches!(
        result,
        Err(AppointmentError::InvalidStatusTransition {
            from: AppointmentStatus::Approved,
            to: AppointmentStatus::Approved
        })
    );
}

#[tokio::test]
async fn other_doctor_cannot_decide() {
    let setup = TestSetup::new().await;
    setup.mock_appointment("PENDING", "2025-01-10", "10:00").await;

    let stranger = TestUser::doctor("other@example.com").with_profile("doc-9").to_user();
    let result = setup.service.approve_appointment("101", &stranger, None, TOKEN).await;

    assert_matches!(result, Err(AppointmentError::Unauthorized));
}

#[tokio::test]
async fn failed_decision_surfaces_backend_error() {
    let setup = TestSetup::new().await;
    setup.mock_appointment("PENDING", "2025-01-10", "10:00").await;

    Mock::given(method("PATCH"))
        .and(path("/appointments/101/status"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(MockBackendResponses::error_response("boom")),
        )
        .expect(1)
        .mount(&setup.mock_server)
        .await;

    let result = setup.service.approve_appointment("101", &doctor(), None, TOKEN).await;

    assert_matches!(
        result,
        Err(AppointmentError::Backend(BackendError::Status { status: 500, .. }))
    );
}

#[tokio::test]
async fn missing_appointment_is_not_found() {
    let setup = TestSetup::new().await;

    Mock::given(method("GET"))
        .and(path("/appointments/404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&setup.mock_server)
        .await;

    let result = setup.service.get_appointment("404", TOKEN).await;
    assert_matches!(result, Err(AppointmentError::NotFound));
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[tokio::test]
async fn booking_posts_selected_slot() {
    let setup = TestSetup::new().await;

    Mock::given(method("GET"))
        .and(path("/slots/available/doc-1"))
        .and(query_param("date", "2025-01-12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockBackendResponses::slot_response("s-1", "doc-1", "2025-01-12", "09:00", "09:30"),
            MockBackendResponses::slot_response("s-2", "doc-1", "2025-01-12", "09:30", "10:00"),
        ])))
        .mount(&setup.mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/appointments"))
        .and(body_partial_json(json!({
            "patientId": "pat-1",
            "doctorId": "doc-1",
            "timeSlotId": "s-2"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(
            MockBackendResponses::appointment_response(
                "201", "pat-1", "doc-1", "2025-01-12", "09:30", "10:00", "PENDING",
            ),
        ))
        .expect(1)
        .mount(&setup.mock_server)
        .await;

    let request = BookAppointmentRequest {
        doctor_id: "doc-1".to_string(),
        time_slot_id: "s-2".to_string(),
        date: NaiveDate::from_ymd_opt(2025, 1, 12).unwrap(),
        notes: None,
    };

    let appointment = setup
        .service
        .book_appointment("pat-1", request, at("2025-01-10", "12:00"), TOKEN)
        .await
        .unwrap();

    assert_eq!(appointment.id, "201");
    assert_eq!(appointment.status, AppointmentStatus::Pending);
}

#[tokio::test]
async fn booking_a_started_slot_is_refused() {
    let setup = TestSetup::new().await;

    Mock::given(method("GET"))
        .and(path("/slots/available/doc-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockBackendResponses::slot_response("s-1", "doc-1", "2025-01-10", "08:00", "08:30"),
        ])))
        .mount(&setup.mock_server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&setup.mock_server)
        .await;

    let request = BookAppointmentRequest {
        doctor_id: "doc-1".to_string(),
        time_slot_id: "s-1".to_string(),
        date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
        notes: None,
    };

    let result = setup
        .service
        .book_appointment("pat-1", request, at("2025-01-10", "08:15"), TOKEN)
        .await;

    assert_matches!(result, Err(AppointmentError::SlotNotAvailable));
}

#[tokio::test]
async fn booking_in_the_past_fails_before_any_call() {
    let setup = TestSetup::new().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&setup.mock_server)
        .await;

    let request = BookAppointmentRequest {
        doctor_id: "doc-1".to_string(),
        time_slot_id: "s-1".to_string(),
        date: NaiveDate::from_ymd_opt(2025, 1, 9).unwrap(),
        notes: None,
    };

    let result = setup
        .service
        .book_appointment("pat-1", request, at("2025-01-10", "08:15"), TOKEN)
        .await;

    assert_matches!(result, Err(AppointmentError::ValidationError(_)));
}

// ==============================================================================
// RESCHEDULE / CANCEL
// ==============================================================================

#[tokio::test]
async fn reschedule_sends_new_slot_times() {
    let setup = TestSetup::new().await;
    setup.mock_appointment("APPROVED", "2025-01-10", "10:00").await;

    Mock::given(method("GET"))
        .and(path("/slots/available/doc-1"))
        .and(query_param("date", "2025-01-11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockBackendResponses::slot_response("s-7", "doc-1", "2025-01-11", "14:00", "14:30"),
        ])))
        .mount(&setup.mock_server)
        .await;

    let mut rescheduled = MockBackendResponses::appointment_response(
        "101", "pat-1", "doc-1", "2025-01-11", "14:00", "14:30", "APPROVED",
    );
    rescheduled["rescheduleCount"] = json!(1);

    Mock::given(method("PATCH"))
        .and(path("/appointments/101/reschedule"))
        .and(body_partial_json(json!({
            "newTimeSlotId": "s-7",
            "newDate": "2025-01-11",
            "newTimeFrom": "14:00",
            "newTimeTo": "14:30"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(rescheduled))
        .expect(1)
        .mount(&setup.mock_server)
        .await;

    let request = RescheduleAppointmentRequest {
        new_time_slot_id: "s-7".to_string(),
        new_date: NaiveDate::from_ymd_opt(2025, 1, 11).unwrap(),
    };

    let updated = setup
        .service
        .reschedule_appointment("101", request, &patient(), at("2025-01-08", "09:00"), TOKEN)
        .await
        .unwrap();

    assert_eq!(updated.reschedule_count, 1);
}

#[tokio::test]
async fn reschedule_inside_two_hours_is_refused() {
    let setup = TestSetup::new().await;
    setup.mock_appointment("APPROVED", "2025-01-10", "10:00").await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&setup.mock_server)
        .await;

    let request = RescheduleAppointmentRequest {
        new_time_slot_id: "s-7".to_string(),
        new_date: NaiveDate::from_ymd_opt(2025, 1, 11).unwrap(),
    };

    let result = setup
        .service
        .reschedule_appointment("101", request, &patient(), at("2025-01-10", "08:01"), TOKEN)
        .await;

    assert_matches!(result, Err(AppointmentError::RescheduleNotAllowed(_)));
}

#[tokio::test]
async fn cancel_pending_deletes() {
    let setup = TestSetup::new().await;
    setup.mock_appointment("PENDING", "2025-01-10", "10:00").await;

    Mock::given(method("DELETE"))
        .and(path("/appointments/101"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&setup.mock_server)
        .await;

    let result = setup
        .service
        .cancel_appointment("101", &patient(), at("2025-01-09", "10:00"), TOKEN)
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn cancel_approved_is_refused() {
    let setup = TestSetup::new().await;
    setup.mock_appointment("APPROVED", "2025-01-10", "10:00").await;

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&setup.mock_server)
        .await;

    let result = setup
        .service
        .cancel_appointment("101", &patient(), at("2025-01-09", "10:00"), TOKEN)
        .await;

    assert_matches!(result, Err(AppointmentError::CancelNotAllowed(_)));
}

#[tokio::test]
async fn doctor_listing_shows_approved_only() {
    let setup = TestSetup::new().await;

    Mock::given(method("GET"))
        .and(path("/appointments/doctor/doc-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockBackendResponses::appointment_response("1", "pat-1", "doc-1", "2025-01-10", "09:00", "09:30", "PENDING"),
            MockBackendResponses::appointment_response("2", "pat-2", "doc-1", "2025-01-10", "10:00", "10:30", "APPROVED"),
            MockBackendResponses::appointment_response("3", "pat-3", "doc-1", "2025-01-10", "11:00", "11:30", "REJECTED"),
        ])))
        .mount(&setup.mock_server)
        .await;

    let schedule = setup
        .service
        .get_appointments_for(&doctor(), "doc-1", TOKEN)
        .await
        .unwrap();
    assert_eq!(schedule.len(), 1);
    assert_eq!(schedule[0].id, "2");

    let pending = setup.service.get_pending_requests("doc-1", TOKEN).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, "1");
}
