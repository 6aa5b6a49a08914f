//! End-to-end call scenarios against a mock calling server.

use std::time::Duration;

use azure_communication_callingserver::call_connection::{AddParticipantRequest, CreateCallRequest};
use azure_communication_callingserver::events::{parse_events, OperationTracker};
use azure_communication_callingserver::identifier::CommunicationIdentifier;
use azure_communication_callingserver::media::PlayAudioOptions;
use azure_communication_callingserver::{CallingServerClient, OperationTracking};
use azure_communication_core::lro::WaitOptions;
use azure_communication_core::models::OperationStatus;
use azure_communication_core::test_support::setup_mock_client;
use azure_communication_core::{CancellationToken, CommunicationError};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CALLBACK_URI: &str = "https://app.example.com/api/incident/callback";
const AUDIO_FILE_URI: &str = "https://media.example.com/audio/sample-message.wav";

async fn calling_client(server: &MockServer) -> CallingServerClient {
    CallingServerClient::new(setup_mock_client(server).await)
}

fn create_request() -> CreateCallRequest {
    CreateCallRequest::builder()
        .source(CommunicationIdentifier::user("8:acs:source"))
        .target(CommunicationIdentifier::phone_number("+14255550123"))
        .callback_uri(CALLBACK_URI)
        .build()
        .expect("valid request")
}

async fn mount_create_call(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/calling/callConnections"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "abc123"})))
        .mount(server)
        .await;
}

async fn mount_play_audio(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/calling/callConnections/abc123:playAudio"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"operationId": "op1"})))
        .expect(1)
        .mount(server)
        .await;
}

async fn requests_to(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == request_path)
        .count()
}

#[tokio::test]
async fn create_add_remove_hang_up() {
    let server = MockServer::start().await;
    mount_create_call(&server).await;
    Mock::given(method("POST"))
        .and(path("/calling/callConnections/abc123/participants"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"participantId": "p1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/calling/callConnections/abc123/participants:remove"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/calling/callConnections/abc123:hangup"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = calling_client(&server).await;
    let call = client
        .create_call_connection(&create_request())
        .await
        .expect("create call");
    assert_eq!(call.call_connection_id().as_str(), "abc123");

    let participant = CommunicationIdentifier::user("8:acs:p1");
    let added = call
        .add_participant(&AddParticipantRequest::new(participant.clone()))
        .await
        .expect("add participant");
    assert_eq!(added.participant_id, "p1");

    call.remove_participant(&participant)
        .await
        .expect("remove participant");
    call.hang_up().await.expect("hang up");

    let sent_before = server.received_requests().await.unwrap_or_default().len();
    let err = call.get_participants().await.unwrap_err();
    assert!(matches!(
        err,
        CommunicationError::ResourceGone { ref resource_id } if resource_id == "abc123"
    ));
    assert_eq!(
        server.received_requests().await.unwrap_or_default().len(),
        sent_before
    );
}

#[tokio::test]
async fn play_audio_polls_until_succeeded() {
    let server = MockServer::start().await;
    mount_create_call(&server).await;
    mount_play_audio(&server).await;
    Mock::given(method("GET"))
        .and(path("/calling/operations/op1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "active"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/calling/operations/op1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "succeeded"})))
        .mount(&server)
        .await;

    let client = calling_client(&server).await;
    let call = client.create_call_connection(&create_request()).await.unwrap();
    let operation = call
        .play_audio(AUDIO_FILE_URI, &PlayAudioOptions::default())
        .await
        .expect("play audio");
    assert_eq!(operation.status(), OperationStatus::Pending);

    let status = operation
        .wait_until_terminal(
            WaitOptions::default().poll_interval(Duration::from_millis(10)),
            &CancellationToken::new(),
        )
        .await
        .expect("operation should finish");

    assert_eq!(status, OperationStatus::Succeeded);
    assert_eq!(requests_to(&server, "/calling/operations/op1").await, 2);

    // Terminal: polling again makes no request.
    assert_eq!(operation.poll().await.unwrap(), OperationStatus::Succeeded);
    assert_eq!(requests_to(&server, "/calling/operations/op1").await, 2);
}

#[tokio::test]
async fn callback_event_completes_operation_without_polling() {
    let server = MockServer::start().await;
    mount_create_call(&server).await;
    mount_play_audio(&server).await;

    let client = calling_client(&server)
        .await
        .with_operation_tracking(OperationTracking::NotificationsOnly);
    let call = client.create_call_connection(&create_request()).await.unwrap();
    let operation = call
        .play_audio(
            AUDIO_FILE_URI,
            &PlayAudioOptions::default().operation_context("welcome"),
        )
        .await
        .unwrap();

    let tracker = OperationTracker::new();
    tracker.track_with_context(&operation, "welcome");

    let waiter = {
        let operation = operation.clone();
        tokio::spawn(async move {
            operation
                .wait_until_terminal(WaitOptions::default(), &CancellationToken::new())
                .await
        })
    };

    let body = json!([{
        "type": "Microsoft.Communication.PlayAudioResult",
        "data": {
            "operationContext": "welcome",
            "status": "completed",
            "resultDetails": {"code": 200, "subcode": 0, "message": "Action completed successfully"}
        }
    }]);
    for event in parse_events(body.to_string().as_bytes()).unwrap() {
        assert!(tracker.handle(&event).advanced());
    }

    let status = tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("waiter should wake on the notification")
        .expect("task should not panic")
        .expect("operation should finish");
    assert_eq!(status, OperationStatus::Succeeded);
    assert!(tracker.is_empty());
    assert_eq!(requests_to(&server, "/calling/operations/op1").await, 0);
}

#[tokio::test]
async fn reconstructed_connection_behaves_like_created_one() {
    let server = MockServer::start().await;
    mount_create_call(&server).await;
    Mock::given(method("GET"))
        .and(path("/calling/callConnections/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "callConnectionId": "abc123",
            "callConnectionState": "connected",
            "callbackUri": CALLBACK_URI
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = calling_client(&server).await;
    let created = client.create_call_connection(&create_request()).await.unwrap();
    let reconstructed = client.get_call_connection("abc123");

    let from_created = created.get_call().await.unwrap();
    let from_reconstructed = reconstructed.get_call().await.unwrap();

    assert_eq!(from_created, from_reconstructed);
    assert_eq!(created.call_connection_id(), reconstructed.call_connection_id());
}

#[tokio::test]
async fn service_error_is_surfaced_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calling/callConnections/abc123:keepAlive"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": "8522", "message": "Call not found."}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = calling_client(&server).await;
    let call = client.get_call_connection("abc123");

    let err = call.keep_alive().await.unwrap_err();

    match err {
        CommunicationError::Service {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 404);
            assert_eq!(code, "8522");
            assert_eq!(message, "Call not found.");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!call.is_gone());
}
