//! Shared types for the calling server API.
//!
//! This module contains the enums and result types used across call
//! connections, server calls and recordings, plus the small request bodies
//! that only carry a participant.

use azure_communication_core::dispatch::{ensure_not_empty, OperationParameters};
use azure_communication_core::error::CommunicationResult;
use azure_communication_core::models::{OperationId, ResourceId};
use azure_communication_core::wire_enum;
use serde::{Deserialize, Serialize};

use crate::identifier::CommunicationIdentifier;
use crate::locator::CallLocator;

wire_enum! {
    /// Media a call connection subscribes to.
    pub enum CallMediaType {
        Audio => "audio",
        Video => "video",
    }
}

wire_enum! {
    /// Callback events a call connection subscribes to.
    pub enum CallingEventSubscriptionType {
        ParticipantsUpdated => "participantsUpdated",
        ToneReceived => "toneReceived",
    }
}

wire_enum! {
    /// State of a call connection as reported by the service.
    pub enum CallConnectionState {
        Connecting => "connecting",
        Connected => "connected",
        Transferring => "transferring",
        Transferred => "transferred",
        Disconnecting => "disconnecting",
        Disconnected => "disconnected",
    }
}

impl CallConnectionState {
    /// Returns `true` once the call connection can no longer be used.
    pub fn is_ended(&self) -> bool {
        matches!(self, Self::Transferred | Self::Disconnected)
    }
}

/// A participant of a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallParticipant {
    /// Who the participant is.
    pub identifier: CommunicationIdentifier,

    /// Service-assigned participant id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,

    /// Whether the participant is muted.
    #[serde(default)]
    pub is_muted: bool,
}

/// Result of adding a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddParticipantResult {
    pub participant_id: String,
}

/// Body returned when a call connection is created, joined or answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallConnectionCreated {
    #[serde(rename = "id", alias = "callConnectionId")]
    pub call_connection_id: ResourceId,
}

/// Outcome detail attached to asynchronous results and callback events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultDetails {
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub subcode: Option<i32>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ResultDetails {
    /// One-line summary used as the detail of an operation notification.
    pub fn summary(&self) -> String {
        let code = self.code.map(|c| c.to_string()).unwrap_or_default();
        let subcode = self.subcode.map(|c| format!("/{c}")).unwrap_or_default();
        match (&self.message, code.is_empty()) {
            (Some(message), false) => format!("{code}{subcode}: {message}"),
            (Some(message), true) => message.clone(),
            (None, _) => format!("{code}{subcode}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Participant-only request bodies
// ---------------------------------------------------------------------------

/// Body of operations that act on one participant of a call connection.
#[derive(Debug, Serialize)]
pub(crate) struct ParticipantBody<'a> {
    pub identifier: &'a CommunicationIdentifier,
}

impl OperationParameters for ParticipantBody<'_> {
    fn validate(&self) -> CommunicationResult<()> {
        self.identifier.validate("participant")
    }
}

/// Body of operations that act on one participant of a located call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LocatedParticipantBody<'a> {
    pub call_locator: &'a CallLocator,
    pub identifier: &'a CommunicationIdentifier,
}

impl OperationParameters for LocatedParticipantBody<'_> {
    fn validate(&self) -> CommunicationResult<()> {
        self.call_locator.validate()?;
        self.identifier.validate("participant")
    }
}

/// Body of operations that only address a located call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LocatorBody<'a> {
    pub call_locator: &'a CallLocator,
}

impl OperationParameters for LocatorBody<'_> {
    fn validate(&self) -> CommunicationResult<()> {
        self.call_locator.validate()
    }
}

/// Body of operations that cancel a media operation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CancelMediaOperationBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_locator: Option<&'a CallLocator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<&'a CommunicationIdentifier>,
    pub media_operation_id: &'a OperationId,
}

impl OperationParameters for CancelMediaOperationBody<'_> {
    fn validate(&self) -> CommunicationResult<()> {
        if let Some(locator) = self.call_locator {
            locator.validate()?;
        }
        if let Some(identifier) = self.identifier {
            identifier.validate("participant")?;
        }
        ensure_not_empty("media_operation_id", self.media_operation_id.as_str())
    }
}

/// Validate an optional callback URI.
pub(crate) fn validate_callback_uri(field: &str, uri: Option<&str>) -> CommunicationResult<()> {
    match uri {
        Some(uri) => validate_uri(field, uri),
        None => Ok(()),
    }
}

/// Validate that `uri` is an absolute http(s) URL.
pub(crate) fn validate_uri(field: &str, uri: &str) -> CommunicationResult<()> {
    ensure_not_empty(field, uri)?;
    match url::Url::parse(uri) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(azure_communication_core::CommunicationError::validation(
            format!("{field} must be an absolute http(s) URL"),
        )),
    }
}
