//! End-to-end escalation over a file-backed schedule and a mock call API.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use oncall::{
    CallAttemptController, CallError, CallTransport, ControllerConfig, EscalationError,
    EscalationOutcome, EscalationScheduler, FileScheduleStore, InMemoryCallState, ManualClock,
    QuickCallClient, SchedulerConfig,
};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 18:00 Moscow time.
fn evening() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 15, 0, 0).unwrap()
}

fn file_scheduler(dir: &TempDir) -> Arc<EscalationScheduler> {
    Arc::new(EscalationScheduler::new(
        Arc::new(FileScheduleStore::new(dir.path().join("schedule.json"))),
        Arc::new(InMemoryCallState::new()),
        Arc::new(ManualClock::new(evening())),
        SchedulerConfig::default(),
    ))
}

fn client(server: &MockServer) -> QuickCallClient {
    QuickCallClient::new(&server.uri(), "secret", "client-7", Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_evening_responder_is_selected_from_file_schedule() {
    let dir = TempDir::new().unwrap();
    let scheduler = file_scheduler(&dir);
    scheduler.add_schedule("09:00", "17:00", "+1").await.unwrap();
    scheduler.add_schedule("17:00", "23:00", "+2").await.unwrap();

    assert_eq!(scheduler.resolve_current_responder().await.unwrap(), "+2");

    // A fresh scheduler over the same file sees the same order.
    let reopened = file_scheduler(&dir);
    let numbers: Vec<_> = reopened
        .list_schedule()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.responder)
        .collect();
    assert_eq!(numbers, vec!["+1", "+2"]);
}

#[tokio::test]
async fn test_quick_call_request_contract() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/call/quickcall"))
        .and(header("Accept", "application/json"))
        .and(header("Client", "client-7"))
        .and(header("Authorization", "Bearer secret"))
        .and(body_json(json!({
            "number": "+2",
            "lineNumber": "74950000000",
            "sipId": "51326"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .place_call(&oncall::CallData {
            number: "+2".to_string(),
            line_number: "74950000000".to_string(),
            sip_id: "51326".to_string(),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_non_200_status_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/call/quickcall"))
        .respond_with(ResponseTemplate::new(201).set_body_string("created"))
        .mount(&server)
        .await;

    let err = client(&server)
        .place_call(&oncall::CallData {
            number: "+2".to_string(),
            line_number: "1".to_string(),
            sip_id: "2".to_string(),
        })
        .await
        .unwrap_err();

    match err {
        CallError::Rejected { status, body } => {
            assert_eq!(status, 201);
            assert_eq!(body, "created");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_escalation_rotates_past_unanswered_responder() {
    let dir = TempDir::new().unwrap();
    let scheduler = file_scheduler(&dir);
    scheduler.add_schedule("17:00", "23:00", "+2").await.unwrap();
    scheduler.add_schedule("09:00", "17:00", "+3").await.unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/call/quickcall"))
        .and(body_json(json!({ "number": "+2", "lineNumber": "l", "sipId": "s" })))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/call/quickcall"))
        .and(body_json(json!({ "number": "+3", "lineNumber": "l", "sipId": "s" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let controller = CallAttemptController::new(
        scheduler.clone(),
        Arc::new(client(&server)),
        ControllerConfig {
            line_number: "l".to_string(),
            sip_id: "s".to_string(),
            ..ControllerConfig::default()
        },
    );

    assert_eq!(
        controller.escalate().await.unwrap(),
        EscalationOutcome::Connected {
            number: "+3".to_string(),
            attempts: 4
        }
    );

    // +3 answered, +2 is still in its window, so the next lookup picks +2.
    assert_eq!(scheduler.resolve_current_responder().await.unwrap(), "+2");
}

#[tokio::test]
async fn test_escalation_without_schedule_fails() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    let controller = CallAttemptController::new(
        file_scheduler(&dir),
        Arc::new(client(&server)),
        ControllerConfig::default(),
    );

    assert!(matches!(
        controller.escalate().await,
        Err(EscalationError::NoResponderFound)
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}
