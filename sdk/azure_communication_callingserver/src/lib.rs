//! # Azure Communication Calling Server
//!
//! Server-side call automation client for the Azure Communication Services
//! Rust SDK.
//!
//! This crate places and answers calls, manages participants, plays audio,
//! transfers and records calls. Operations the service completes
//! asynchronously (play audio, transfer, recording) return a
//! [`LongRunningOperation`](azure_communication_core::lro::LongRunningOperation)
//! that can be polled, awaited, or advanced by the callback events the
//! service posts to your application.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use azure_communication_callingserver::call_connection::CreateCallRequest;
//! use azure_communication_callingserver::identifier::CommunicationIdentifier;
//! use azure_communication_callingserver::media::PlayAudioOptions;
//! use azure_communication_callingserver::models::CallMediaType;
//! use azure_communication_callingserver::CallingServerClient;
//! use azure_communication_core::lro::WaitOptions;
//! use azure_communication_core::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = CallingServerClient::from_connection_string(
//!         "endpoint=https://your-resource.communication.azure.com/;accesskey=your-key",
//!     )?;
//!
//!     let request = CreateCallRequest::builder()
//!         .source(CommunicationIdentifier::user("8:acs:source"))
//!         .target(CommunicationIdentifier::phone_number("+14255550123"))
//!         .callback_uri("https://app.example.com/events")
//!         .requested_media_type(CallMediaType::Audio)
//!         .build()?;
//!     let call = client.create_call_connection(&request).await?;
//!
//!     let prompt = call
//!         .play_audio("https://media.example.com/welcome.wav", &PlayAudioOptions::default())
//!         .await?;
//!     let status = prompt
//!         .wait_until_terminal(WaitOptions::default(), &CancellationToken::new())
//!         .await?;
//!     println!("prompt finished: {status}");
//!
//!     call.hang_up().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! - **CallingServerClient**: creates call connections and runs operations on
//!   calls addressed by a [`CallLocator`](locator::CallLocator).
//! - **CallConnection**: a client bound to one call; unusable once the call
//!   is hung up or deleted.
//! - **LongRunningOperation**: the local view of an asynchronous operation.
//! - **OperationTracker**: feeds callback events into the right operation.
//!
//! ## Modules
//!
//! - [`call_connection`] - Create calls and operate on a call connection
//! - [`server_call`] - Join, answer and operate on located calls
//! - [`recording`] - Start, pause, resume, stop and delete recordings
//! - [`media`] - Play-audio and transfer options
//! - [`events`] - Parse callback events and correlate them to operations
//! - [`identifier`] - Participant identifiers
//! - [`locator`] - Call locators
//! - [`models`] - Shared request and response types

pub mod call_connection;
pub mod client;
pub mod events;
pub mod identifier;
pub mod locator;
pub mod media;
pub mod models;
pub mod recording;
pub mod server_call;

mod routes;

pub use call_connection::CallConnection;
pub use client::{CallingServerClient, OperationTracking};
