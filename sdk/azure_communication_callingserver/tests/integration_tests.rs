//! Integration tests for azure_communication_callingserver.
//!
//! These tests require a live Azure Communication Services resource.
//! Run with: `cargo test --features integration-tests`
//!
//! Required environment variables:
//! - `AZURE_COMMUNICATION_CONNECTION_STRING`: `endpoint=...;accesskey=...`
//! - `AZURE_COMMUNICATION_SOURCE_USER`: ACS user id placing the call
//! - `AZURE_COMMUNICATION_TARGET_USER`: ACS user id being called
//! - `AZURE_COMMUNICATION_CALLBACK_URI`: publicly reachable callback URI
//!
//! Optional:
//! - `AZURE_COMMUNICATION_AUDIO_FILE_URI`: audio prompt for the media test

#![cfg(feature = "integration-tests")]

use std::time::Duration;

use azure_communication_callingserver::call_connection::CreateCallRequest;
use azure_communication_callingserver::identifier::CommunicationIdentifier;
use azure_communication_callingserver::locator::CallLocator;
use azure_communication_callingserver::media::PlayAudioOptions;
use azure_communication_callingserver::models::CallMediaType;
use azure_communication_callingserver::recording::StartRecordingRequest;
use azure_communication_callingserver::{CallConnection, CallingServerClient};
use azure_communication_core::lro::WaitOptions;
use azure_communication_core::{CancellationToken, CommunicationError};

fn env(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} not set"))
}

fn get_client() -> CallingServerClient {
    CallingServerClient::from_connection_string(&env("AZURE_COMMUNICATION_CONNECTION_STRING"))
        .expect("Failed to build client")
}

async fn create_call(client: &CallingServerClient) -> CallConnection {
    let request = CreateCallRequest::builder()
        .source(CommunicationIdentifier::user(env("AZURE_COMMUNICATION_SOURCE_USER")))
        .target(CommunicationIdentifier::user(env("AZURE_COMMUNICATION_TARGET_USER")))
        .callback_uri(env("AZURE_COMMUNICATION_CALLBACK_URI"))
        .requested_media_type(CallMediaType::Audio)
        .build()
        .expect("valid request");

    client
        .create_call_connection(&request)
        .await
        .expect("create call connection")
}

#[tokio::test]
async fn test_create_and_hang_up() {
    let client = get_client();
    let call = create_call(&client).await;
    assert!(!call.call_connection_id().as_str().is_empty());

    let properties = call.get_call().await.expect("get call");
    assert_eq!(&properties.call_connection_id, call.call_connection_id());

    call.hang_up().await.expect("hang up");
    let err = call.keep_alive().await.unwrap_err();
    assert!(matches!(err, CommunicationError::ResourceGone { .. }));
}

#[tokio::test]
async fn test_play_audio() {
    let Ok(audio_file_uri) = std::env::var("AZURE_COMMUNICATION_AUDIO_FILE_URI") else {
        eprintln!("AZURE_COMMUNICATION_AUDIO_FILE_URI not set, skipping");
        return;
    };
    let client = get_client();
    let call = create_call(&client).await;

    // Give the callee time to pick up.
    tokio::time::sleep(Duration::from_secs(10)).await;

    let prompt = call
        .play_audio(
            &audio_file_uri,
            &PlayAudioOptions::default().operation_context("integration-test"),
        )
        .await
        .expect("play audio");
    let status = prompt
        .wait_until_terminal(
            WaitOptions::default().max_wait(Duration::from_secs(60)),
            &CancellationToken::new(),
        )
        .await
        .expect("prompt should finish");
    println!("play audio finished: {status}");

    call.hang_up().await.expect("hang up");
}

#[tokio::test]
async fn test_recording_lifecycle() {
    let client = get_client();
    let call = create_call(&client).await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    let properties = call.get_call().await.expect("get call");
    let server_call_id = properties.server_call_id.expect("server call id");

    let request = StartRecordingRequest::builder()
        .call_locator(CallLocator::server_call(server_call_id))
        .recording_state_callback_uri(env("AZURE_COMMUNICATION_CALLBACK_URI"))
        .build()
        .expect("valid request");

    let recording = client.start_recording(&request).await.expect("start recording");
    recording.pause().await.expect("pause recording");
    recording.resume().await.expect("resume recording");
    recording.stop().await.expect("stop recording");
    assert!(recording.operation().is_terminal());

    call.hang_up().await.expect("hang up");
}
