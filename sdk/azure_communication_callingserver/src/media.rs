//! Media and transfer options shared by call connections and server calls.
//!
//! Playing audio and transferring a call are asynchronous on the service
//! side: the request returns `202 Accepted` with an operation id, and the
//! caller gets a [`LongRunningOperation`](azure_communication_core::lro::LongRunningOperation)
//! to follow it.

use azure_communication_core::dispatch::{ensure_not_empty, OperationParameters};
use azure_communication_core::error::{CommunicationError, CommunicationResult};
use azure_communication_core::models::ResourceId;
use serde::{Deserialize, Serialize};

use crate::identifier::CommunicationIdentifier;
use crate::locator::CallLocator;
use crate::models::{validate_callback_uri, validate_uri};

/// Operation kind of pollers returned by `play_audio`.
pub const PLAY_AUDIO_KIND: &str = "play_audio";

/// Operation kind of pollers returned by `play_audio_to_participant`.
pub const PLAY_AUDIO_TO_PARTICIPANT_KIND: &str = "play_audio_to_participant";

/// Operation kind of pollers returned by the transfer operations.
pub const TRANSFER_KIND: &str = "transfer";

// ---------------------------------------------------------------------------
// Play audio
// ---------------------------------------------------------------------------

/// Options for playing an audio prompt.
///
/// ```rust
/// use azure_communication_callingserver::media::PlayAudioOptions;
///
/// let options = PlayAudioOptions::default()
///     .loop_audio(true)
///     .operation_context("greeting");
/// assert!(options.loop_audio);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayAudioOptions {
    /// Repeat the prompt until cancelled.
    #[serde(rename = "loop")]
    pub loop_audio: bool,
    /// Cache key of the audio file on the service side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_file_id: Option<String>,
    /// Where the completion event is delivered, overriding the call's callback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_uri: Option<String>,
    /// Opaque value echoed back in the completion event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_context: Option<String>,
}

impl PlayAudioOptions {
    pub fn loop_audio(mut self, loop_audio: bool) -> Self {
        self.loop_audio = loop_audio;
        self
    }

    pub fn audio_file_id(mut self, audio_file_id: impl Into<String>) -> Self {
        self.audio_file_id = Some(audio_file_id.into());
        self
    }

    pub fn callback_uri(mut self, callback_uri: impl Into<String>) -> Self {
        self.callback_uri = Some(callback_uri.into());
        self
    }

    pub fn operation_context(mut self, operation_context: impl Into<String>) -> Self {
        self.operation_context = Some(operation_context.into());
        self
    }
}

/// Body of every play-audio variant.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlayAudioBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_locator: Option<&'a CallLocator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<&'a CommunicationIdentifier>,
    pub audio_file_uri: &'a str,
    #[serde(rename = "loop")]
    pub loop_audio: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_file_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_uri: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_context: Option<&'a str>,
}

impl<'a> PlayAudioBody<'a> {
    pub fn new(audio_file_uri: &'a str, options: &'a PlayAudioOptions) -> Self {
        Self {
            call_locator: None,
            identifier: None,
            audio_file_uri,
            loop_audio: options.loop_audio,
            audio_file_id: options.audio_file_id.as_deref(),
            callback_uri: options.callback_uri.as_deref(),
            operation_context: options.operation_context.as_deref(),
        }
    }

    pub fn located(mut self, call_locator: &'a CallLocator) -> Self {
        self.call_locator = Some(call_locator);
        self
    }

    pub fn for_participant(mut self, identifier: &'a CommunicationIdentifier) -> Self {
        self.identifier = Some(identifier);
        self
    }
}

impl OperationParameters for PlayAudioBody<'_> {
    fn validate(&self) -> CommunicationResult<()> {
        if let Some(locator) = self.call_locator {
            locator.validate()?;
        }
        if let Some(identifier) = self.identifier {
            identifier.validate("participant")?;
        }
        validate_uri("audio_file_uri", self.audio_file_uri)?;
        if let Some(id) = self.audio_file_id {
            ensure_not_empty("audio_file_id", id)?;
        }
        validate_callback_uri("callback_uri", self.callback_uri)
    }
}

// ---------------------------------------------------------------------------
// Transfer
// ---------------------------------------------------------------------------

/// Options for transferring a call connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransferOptions {
    /// Phone number shown to a PSTN target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_caller_id: Option<CommunicationIdentifier>,
    /// Information passed to the target as user-to-user data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_to_user_information: Option<String>,
    /// Opaque value echoed back in the transfer result event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_context: Option<String>,
    /// Where the transfer result event is delivered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_uri: Option<String>,
}

impl TransferOptions {
    pub fn alternate_caller_id(mut self, phone_number: CommunicationIdentifier) -> Self {
        self.alternate_caller_id = Some(phone_number);
        self
    }

    pub fn user_to_user_information(mut self, information: impl Into<String>) -> Self {
        self.user_to_user_information = Some(information.into());
        self
    }

    pub fn operation_context(mut self, operation_context: impl Into<String>) -> Self {
        self.operation_context = Some(operation_context.into());
        self
    }

    pub fn callback_uri(mut self, callback_uri: impl Into<String>) -> Self {
        self.callback_uri = Some(callback_uri.into());
        self
    }
}

/// Body of the transfer operation. Exactly one target is set.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransferBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_participant: Option<&'a CommunicationIdentifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_call_connection_id: Option<&'a ResourceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_caller_id: Option<&'a CommunicationIdentifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_to_user_information: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_context: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_uri: Option<&'a str>,
}

impl<'a> TransferBody<'a> {
    fn with_options(options: &'a TransferOptions) -> Self {
        Self {
            target_participant: None,
            target_call_connection_id: None,
            alternate_caller_id: options.alternate_caller_id.as_ref(),
            user_to_user_information: options.user_to_user_information.as_deref(),
            operation_context: options.operation_context.as_deref(),
            callback_uri: options.callback_uri.as_deref(),
        }
    }

    pub fn to_participant(target: &'a CommunicationIdentifier, options: &'a TransferOptions) -> Self {
        Self {
            target_participant: Some(target),
            ..Self::with_options(options)
        }
    }

    pub fn to_call(target: &'a ResourceId, options: &'a TransferOptions) -> Self {
        Self {
            target_call_connection_id: Some(target),
            ..Self::with_options(options)
        }
    }
}

impl OperationParameters for TransferBody<'_> {
    fn validate(&self) -> CommunicationResult<()> {
        match (self.target_participant, self.target_call_connection_id) {
            (Some(participant), None) => participant.validate("target_participant")?,
            (None, Some(call)) => ensure_not_empty("target_call_connection_id", call.as_str())?,
            _ => {
                return Err(CommunicationError::validation(
                    "exactly one of target_participant or target_call_connection_id must be set",
                ))
            }
        }
        if let Some(caller) = self.alternate_caller_id {
            caller.validate_phone_number("alternate_caller_id")?;
        }
        validate_callback_uri("callback_uri", self.callback_uri)
    }
}
