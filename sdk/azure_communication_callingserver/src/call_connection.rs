//! Call connections.
//!
//! A [`CallConnection`] is bound to one active call. Every operation is
//! scoped to the call connection id it was created with, so callers never
//! pass the id again.
//!
//! Hanging up or deleting the call ends the connection: once either
//! succeeds, every later operation on the same instance fails with
//! [`CommunicationError::ResourceGone`] without sending a request.
//!
//! ## Example
//!
//! ```rust,no_run
//! use azure_communication_callingserver::call_connection::{AddParticipantRequest, CreateCallRequest};
//! use azure_communication_callingserver::identifier::CommunicationIdentifier;
//! use azure_communication_callingserver::models::CallMediaType;
//! use azure_communication_callingserver::CallingServerClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = CallingServerClient::from_connection_string(
//!     "endpoint=https://your-resource.communication.azure.com/;accesskey=your-key",
//! )?;
//!
//! let request = CreateCallRequest::builder()
//!     .source(CommunicationIdentifier::user("8:acs:source"))
//!     .target(CommunicationIdentifier::phone_number("+14255550123"))
//!     .callback_uri("https://app.example.com/events")
//!     .requested_media_type(CallMediaType::Audio)
//!     .build()?;
//!
//! let call = client.create_call_connection(&request).await?;
//! let added = call
//!     .add_participant(&AddParticipantRequest::new(CommunicationIdentifier::user("8:acs:p1")))
//!     .await?;
//! println!("added {}", added.participant_id);
//!
//! call.hang_up().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use azure_communication_core::dispatch::{OperationDispatcher, OperationParameters, Route};
use azure_communication_core::error::{CommunicationError, CommunicationResult};
use azure_communication_core::lro::LongRunningOperation;
use azure_communication_core::models::{AcceptedOperation, OperationId, ResourceId};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::client::CallingServerClient;
use crate::identifier::CommunicationIdentifier;
use crate::media::{
    PlayAudioBody, PlayAudioOptions, TransferBody, TransferOptions, PLAY_AUDIO_KIND,
    PLAY_AUDIO_TO_PARTICIPANT_KIND, TRANSFER_KIND,
};
use crate::models::{
    validate_callback_uri, validate_uri, AddParticipantResult, CallConnectionState,
    CallMediaType, CallParticipant, CallingEventSubscriptionType, CancelMediaOperationBody,
    ParticipantBody,
};
use crate::routes;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// A request to create an outbound call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCallRequest {
    pub(crate) source: CommunicationIdentifier,
    pub(crate) targets: Vec<CommunicationIdentifier>,
    pub(crate) callback_uri: String,
    #[serde(default)]
    pub(crate) requested_media_types: Vec<CallMediaType>,
    #[serde(default)]
    pub(crate) requested_call_events: Vec<CallingEventSubscriptionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) alternate_caller_id: Option<CommunicationIdentifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) subject: Option<String>,
}

impl CreateCallRequest {
    /// Create a new builder.
    pub fn builder() -> CreateCallRequestBuilder {
        CreateCallRequestBuilder::default()
    }

    /// The caller.
    pub fn source(&self) -> &CommunicationIdentifier {
        &self.source
    }

    /// The callees.
    pub fn targets(&self) -> &[CommunicationIdentifier] {
        &self.targets
    }

    /// Where call events are delivered.
    pub fn callback_uri(&self) -> &str {
        &self.callback_uri
    }
}

impl OperationParameters for CreateCallRequest {
    fn validate(&self) -> CommunicationResult<()> {
        self.source.validate("source")?;
        if self.targets.is_empty() {
            return Err(CommunicationError::validation(
                "targets must contain at least one participant",
            ));
        }
        for target in &self.targets {
            target.validate("targets")?;
        }
        validate_uri("callback_uri", &self.callback_uri)?;
        if let Some(caller) = &self.alternate_caller_id {
            caller.validate_phone_number("alternate_caller_id")?;
        }
        Ok(())
    }
}

/// Builder for [`CreateCallRequest`].
#[derive(Debug, Clone, Default)]
pub struct CreateCallRequestBuilder {
    source: Option<CommunicationIdentifier>,
    targets: Vec<CommunicationIdentifier>,
    callback_uri: Option<String>,
    requested_media_types: Vec<CallMediaType>,
    requested_call_events: Vec<CallingEventSubscriptionType>,
    alternate_caller_id: Option<CommunicationIdentifier>,
    subject: Option<String>,
}

impl CreateCallRequestBuilder {
    /// Set the caller. **Required.**
    pub fn source(mut self, source: CommunicationIdentifier) -> Self {
        self.source = Some(source);
        self
    }

    /// Add a callee. At least one is required.
    pub fn target(mut self, target: CommunicationIdentifier) -> Self {
        self.targets.push(target);
        self
    }

    /// Replace the callees.
    pub fn targets(mut self, targets: Vec<CommunicationIdentifier>) -> Self {
        self.targets = targets;
        self
    }

    /// Set the URI call events are delivered to. **Required.**
    pub fn callback_uri(mut self, callback_uri: impl Into<String>) -> Self {
        self.callback_uri = Some(callback_uri.into());
        self
    }

    pub fn requested_media_type(mut self, media_type: CallMediaType) -> Self {
        self.requested_media_types.push(media_type);
        self
    }

    pub fn requested_call_event(mut self, event: CallingEventSubscriptionType) -> Self {
        self.requested_call_events.push(event);
        self
    }

    /// Set the phone number shown to PSTN callees.
    pub fn alternate_caller_id(mut self, phone_number: CommunicationIdentifier) -> Self {
        self.alternate_caller_id = Some(phone_number);
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Build the request.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the source or callback URI is missing,
    /// no target was added, or a field is malformed.
    pub fn build(self) -> CommunicationResult<CreateCallRequest> {
        let source = self
            .source
            .ok_or_else(|| CommunicationError::validation("source is required"))?;
        let callback_uri = self
            .callback_uri
            .ok_or_else(|| CommunicationError::validation("callback_uri is required"))?;

        let request = CreateCallRequest {
            source,
            targets: self.targets,
            callback_uri,
            requested_media_types: self.requested_media_types,
            requested_call_events: self.requested_call_events,
            alternate_caller_id: self.alternate_caller_id,
            subject: self.subject,
        };
        request.validate()?;
        Ok(request)
    }
}

/// A request to add a participant to a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddParticipantRequest {
    pub participant: CommunicationIdentifier,
    /// Phone number shown to a PSTN participant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_caller_id: Option<CommunicationIdentifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_uri: Option<String>,
}

impl AddParticipantRequest {
    pub fn new(participant: CommunicationIdentifier) -> Self {
        Self {
            participant,
            alternate_caller_id: None,
            operation_context: None,
            callback_uri: None,
        }
    }

    pub fn alternate_caller_id(mut self, phone_number: CommunicationIdentifier) -> Self {
        self.alternate_caller_id = Some(phone_number);
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

impl OperationParameters for AddParticipantRequest {
    fn validate(&self) -> CommunicationResult<()> {
        self.participant.validate("participant")?;
        if let Some(caller) = &self.alternate_caller_id {
            caller.validate_phone_number("alternate_caller_id")?;
        }
        validate_callback_uri("callback_uri", self.callback_uri.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Properties of a call connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallConnectionProperties {
    #[serde(alias = "id")]
    pub call_connection_id: ResourceId,
    pub call_connection_state: CallConnectionState,
    #[serde(default)]
    pub source: Option<CommunicationIdentifier>,
    #[serde(default)]
    pub alternate_caller_id: Option<CommunicationIdentifier>,
    #[serde(default)]
    pub targets: Vec<CommunicationIdentifier>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub callback_uri: Option<String>,
    #[serde(default)]
    pub requested_media_types: Vec<CallMediaType>,
    #[serde(default)]
    pub requested_call_events: Vec<CallingEventSubscriptionType>,
    #[serde(default)]
    pub server_call_id: Option<String>,
}

// ---------------------------------------------------------------------------
// CallConnection
// ---------------------------------------------------------------------------

/// Client bound to one call connection.
///
/// Obtained from [`CallingServerClient::create_call_connection`],
/// [`CallingServerClient::get_call_connection`],
/// [`CallingServerClient::join_call`] or
/// [`CallingServerClient::answer_call`]; all of them behave the same.
///
/// Not `Clone`: the "call has ended" flag belongs to this instance. Build a
/// second handle with [`CallingServerClient::get_call_connection`] if needed.
#[derive(Debug)]
pub struct CallConnection {
    id: ResourceId,
    client: CallingServerClient,
    gone: AtomicBool,
}

impl CallConnection {
    pub(crate) fn new(id: ResourceId, client: CallingServerClient) -> Self {
        Self {
            id,
            client,
            gone: AtomicBool::new(false),
        }
    }

    /// The call connection id.
    pub fn call_connection_id(&self) -> &ResourceId {
        &self.id
    }

    /// Returns `true` once `hang_up` or `delete_call` succeeded.
    pub fn is_gone(&self) -> bool {
        self.gone.load(Ordering::Acquire)
    }

    fn dispatcher(&self) -> &OperationDispatcher {
        &self.client.call_connections
    }

    fn ensure_live(&self) -> CommunicationResult<()> {
        if self.is_gone() {
            tracing::debug!(call_connection_id = %self.id, "call connection already ended");
            return Err(CommunicationError::resource_gone(self.id.as_str()));
        }
        Ok(())
    }

    async fn call<P: OperationParameters>(
        &self,
        route: &Route,
        params: &P,
    ) -> CommunicationResult<()> {
        self.ensure_live()?;
        let _: IgnoredAny = self.dispatcher().call(route, Some(&self.id), params).await?;
        Ok(())
    }

    async fn invoke(&self, route: &Route) -> CommunicationResult<()> {
        self.ensure_live()?;
        let _: IgnoredAny = self.dispatcher().invoke(route, Some(&self.id)).await?;
        Ok(())
    }

    async fn terminate(&self, route: &Route) -> CommunicationResult<()> {
        self.invoke(route).await?;
        self.gone.store(true, Ordering::Release);
        tracing::debug!(call_connection_id = %self.id, "call connection ended");
        Ok(())
    }

    async fn start_operation<P: OperationParameters>(
        &self,
        route: &Route,
        params: &P,
        kind: &'static str,
    ) -> CommunicationResult<LongRunningOperation> {
        self.ensure_live()?;
        let accepted: AcceptedOperation =
            self.dispatcher().call(route, Some(&self.id), params).await?;
        Ok(self.client.track_accepted(self.id.clone(), accepted, kind))
    }

    /// Get the current properties of the call.
    #[tracing::instrument(
        name = "communication::call_connection::get_call",
        skip(self),
        fields(call_connection_id = %self.id)
    )]
    pub async fn get_call(&self) -> CommunicationResult<CallConnectionProperties> {
        tracing::debug!("getting call");
        self.ensure_live()?;
        self.dispatcher()
            .invoke(&routes::GET_CALL, Some(&self.id))
            .await
    }

    /// Keep the call alive.
    #[tracing::instrument(
        name = "communication::call_connection::keep_alive",
        skip(self),
        fields(call_connection_id = %self.id)
    )]
    pub async fn keep_alive(&self) -> CommunicationResult<()> {
        tracing::debug!("sending keep-alive");
        self.invoke(&routes::KEEP_ALIVE).await
    }

    /// Hang up the call for this connection.
    ///
    /// On success the connection is ended; later operations fail with
    /// [`CommunicationError::ResourceGone`].
    #[tracing::instrument(
        name = "communication::call_connection::hang_up",
        skip(self),
        fields(call_connection_id = %self.id)
    )]
    pub async fn hang_up(&self) -> CommunicationResult<()> {
        tracing::debug!("hanging up");
        self.terminate(&routes::HANG_UP).await
    }

    /// End the call for every participant.
    ///
    /// On success the connection is ended; later operations fail with
    /// [`CommunicationError::ResourceGone`].
    #[tracing::instrument(
        name = "communication::call_connection::delete_call",
        skip(self),
        fields(call_connection_id = %self.id)
    )]
    pub async fn delete_call(&self) -> CommunicationResult<()> {
        tracing::debug!("deleting call");
        self.terminate(&routes::DELETE_CALL).await
    }

    // -----------------------------------------------------------------------
    // Participants
    // -----------------------------------------------------------------------

    /// Add a participant to the call.
    #[tracing::instrument(
        name = "communication::call_connection::add_participant",
        skip(self, request),
        fields(call_connection_id = %self.id)
    )]
    pub async fn add_participant(
        &self,
        request: &AddParticipantRequest,
    ) -> CommunicationResult<AddParticipantResult> {
        tracing::debug!("adding participant");
        self.ensure_live()?;
        let result: AddParticipantResult = self
            .dispatcher()
            .call(&routes::ADD_PARTICIPANT, Some(&self.id), request)
            .await?;
        tracing::debug!(participant_id = %result.participant_id, "participant added");
        Ok(result)
    }

    /// Remove a participant from the call.
    #[tracing::instrument(
        name = "communication::call_connection::remove_participant",
        skip(self, participant),
        fields(call_connection_id = %self.id)
    )]
    pub async fn remove_participant(
        &self,
        participant: &CommunicationIdentifier,
    ) -> CommunicationResult<()> {
        tracing::debug!("removing participant");
        self.call(
            &routes::REMOVE_PARTICIPANT,
            &ParticipantBody {
                identifier: participant,
            },
        )
        .await
    }

    /// List the participants of the call.
    #[tracing::instrument(
        name = "communication::call_connection::get_participants",
        skip(self),
        fields(call_connection_id = %self.id)
    )]
    pub async fn get_participants(&self) -> CommunicationResult<Vec<CallParticipant>> {
        tracing::debug!("listing participants");
        self.ensure_live()?;
        self.dispatcher()
            .invoke(&routes::GET_PARTICIPANTS, Some(&self.id))
            .await
    }

    /// Get one participant of the call.
    #[tracing::instrument(
        name = "communication::call_connection::get_participant",
        skip(self, participant),
        fields(call_connection_id = %self.id)
    )]
    pub async fn get_participant(
        &self,
        participant: &CommunicationIdentifier,
    ) -> CommunicationResult<CallParticipant> {
        tracing::debug!("getting participant");
        self.ensure_live()?;
        self.dispatcher()
            .call(
                &routes::GET_PARTICIPANT,
                Some(&self.id),
                &ParticipantBody {
                    identifier: participant,
                },
            )
            .await
    }

    /// Mute a participant.
    #[tracing::instrument(
        name = "communication::call_connection::mute_participant",
        skip(self, participant),
        fields(call_connection_id = %self.id)
    )]
    pub async fn mute_participant(
        &self,
        participant: &CommunicationIdentifier,
    ) -> CommunicationResult<()> {
        tracing::debug!("muting participant");
        self.call(
            &routes::MUTE_PARTICIPANT,
            &ParticipantBody {
                identifier: participant,
            },
        )
        .await
    }

    /// Unmute a participant.
    #[tracing::instrument(
        name = "communication::call_connection::unmute_participant",
        skip(self, participant),
        fields(call_connection_id = %self.id)
    )]
    pub async fn unmute_participant(
        &self,
        participant: &CommunicationIdentifier,
    ) -> CommunicationResult<()> {
        tracing::debug!("unmuting participant");
        self.call(
            &routes::UNMUTE_PARTICIPANT,
            &ParticipantBody {
                identifier: participant,
            },
        )
        .await
    }

    /// Put a participant's meeting audio on hold.
    #[tracing::instrument(
        name = "communication::call_connection::hold_participant_meeting_audio",
        skip(self, participant),
        fields(call_connection_id = %self.id)
    )]
    pub async fn hold_participant_meeting_audio(
        &self,
        participant: &CommunicationIdentifier,
    ) -> CommunicationResult<()> {
        tracing::debug!("holding participant meeting audio");
        self.call(
            &routes::HOLD_PARTICIPANT_MEETING_AUDIO,
            &ParticipantBody {
                identifier: participant,
            },
        )
        .await
    }

    /// Resume a participant's meeting audio.
    #[tracing::instrument(
        name = "communication::call_connection::resume_participant_meeting_audio",
        skip(self, participant),
        fields(call_connection_id = %self.id)
    )]
    pub async fn resume_participant_meeting_audio(
        &self,
        participant: &CommunicationIdentifier,
    ) -> CommunicationResult<()> {
        tracing::debug!("resuming participant meeting audio");
        self.call(
            &routes::RESUME_PARTICIPANT_MEETING_AUDIO,
            &ParticipantBody {
                identifier: participant,
            },
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Media
    // -----------------------------------------------------------------------

    /// Play an audio file to everyone in the call.
    ///
    /// Returns a poller for the media operation.
    #[tracing::instrument(
        name = "communication::call_connection::play_audio",
        skip(self, options),
        fields(call_connection_id = %self.id)
    )]
    pub async fn play_audio(
        &self,
        audio_file_uri: &str,
        options: &PlayAudioOptions,
    ) -> CommunicationResult<LongRunningOperation> {
        tracing::debug!("playing audio");
        self.start_operation(
            &routes::PLAY_AUDIO,
            &PlayAudioBody::new(audio_file_uri, options),
            PLAY_AUDIO_KIND,
        )
        .await
    }

    /// Play an audio file to one participant.
    #[tracing::instrument(
        name = "communication::call_connection::play_audio_to_participant",
        skip(self, participant, options),
        fields(call_connection_id = %self.id)
    )]
    pub async fn play_audio_to_participant(
        &self,
        participant: &CommunicationIdentifier,
        audio_file_uri: &str,
        options: &PlayAudioOptions,
    ) -> CommunicationResult<LongRunningOperation> {
        tracing::debug!("playing audio to participant");
        self.start_operation(
            &routes::PLAY_AUDIO_TO_PARTICIPANT,
            &PlayAudioBody::new(audio_file_uri, options).for_participant(participant),
            PLAY_AUDIO_TO_PARTICIPANT_KIND,
        )
        .await
    }

    /// Cancel every media operation running in the call.
    #[tracing::instrument(
        name = "communication::call_connection::cancel_all_media_operations",
        skip(self),
        fields(call_connection_id = %self.id)
    )]
    pub async fn cancel_all_media_operations(&self) -> CommunicationResult<()> {
        tracing::debug!("cancelling all media operations");
        self.invoke(&routes::CANCEL_ALL_MEDIA_OPERATIONS).await
    }

    /// Cancel one media operation targeting a participant.
    #[tracing::instrument(
        name = "communication::call_connection::cancel_participant_media_operation",
        skip(self, participant),
        fields(call_connection_id = %self.id, %media_operation_id)
    )]
    pub async fn cancel_participant_media_operation(
        &self,
        participant: &CommunicationIdentifier,
        media_operation_id: &OperationId,
    ) -> CommunicationResult<()> {
        tracing::debug!("cancelling participant media operation");
        self.call(
            &routes::CANCEL_PARTICIPANT_MEDIA_OPERATION,
            &CancelMediaOperationBody {
                call_locator: None,
                identifier: Some(participant),
                media_operation_id,
            },
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Transfer
    // -----------------------------------------------------------------------

    /// Transfer the call to a participant.
    ///
    /// The connection stays usable until the service reports the call as
    /// transferred; follow the returned poller for the outcome.
    #[tracing::instrument(
        name = "communication::call_connection::transfer_to_participant",
        skip(self, target, options),
        fields(call_connection_id = %self.id)
    )]
    pub async fn transfer_to_participant(
        &self,
        target: &CommunicationIdentifier,
        options: &TransferOptions,
    ) -> CommunicationResult<LongRunningOperation> {
        tracing::debug!("transferring call to participant");
        self.start_operation(
            &routes::TRANSFER,
            &TransferBody::to_participant(target, options),
            TRANSFER_KIND,
        )
        .await
    }

    /// Transfer the call into another call connection.
    #[tracing::instrument(
        name = "communication::call_connection::transfer_to_call",
        skip(self, options),
        fields(call_connection_id = %self.id, target_call_connection_id = %target)
    )]
    pub async fn transfer_to_call(
        &self,
        target: &ResourceId,
        options: &TransferOptions,
    ) -> CommunicationResult<LongRunningOperation> {
        tracing::debug!("transferring call to call");
        self.start_operation(
            &routes::TRANSFER,
            &TransferBody::to_call(target, options),
            TRANSFER_KIND,
        )
        .await
    }
}
