//! Call recording.
//!
//! Recordings are started on a located call and then addressed by the
//! recording id the service returns. [`CallingServerClient::start_recording`]
//! wraps that id in a [`RecordingOperation`], which tracks the recording's
//! lifecycle: it is `Active` once the service reports the recording and
//! `Succeeded` once it has been stopped, either through
//! [`RecordingOperation::stop`] or, when stopped elsewhere, on the next poll.
//!
//! ## Example
//!
//! ```rust,no_run
//! use azure_communication_callingserver::locator::CallLocator;
//! use azure_communication_callingserver::recording::{RecordingContentType, StartRecordingRequest};
//! use azure_communication_callingserver::CallingServerClient;
//!
//! # async fn example(client: CallingServerClient) -> Result<(), Box<dyn std::error::Error>> {
//! let request = StartRecordingRequest::builder()
//!     .call_locator(CallLocator::server_call("aHR0cHM6Ly9..."))
//!     .recording_state_callback_uri("https://app.example.com/recording-events")
//!     .content_type(RecordingContentType::Audio)
//!     .build()?;
//!
//! let recording = client.start_recording(&request).await?;
//! recording.pause().await?;
//! recording.resume().await?;
//! recording.stop().await?;
//! # Ok(())
//! # }
//! ```

use azure_communication_core::dispatch::{OperationDispatcher, OperationParameters};
use azure_communication_core::error::{CommunicationError, CommunicationResult};
use azure_communication_core::lro::{LongRunningOperation, StatusOrigin, StatusSource};
use azure_communication_core::models::{OperationStatus, ResourceId};
use azure_communication_core::wire_enum;
use reqwest::Method;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::client::CallingServerClient;
use crate::locator::CallLocator;
use crate::models::validate_uri;
use crate::routes;

/// Operation kind of recording pollers.
pub const RECORDING_KIND: &str = "recording";

wire_enum! {
    /// Whether a recording is capturing.
    pub enum RecordingState {
        Active => "active",
        Inactive => "inactive",
    }
}

wire_enum! {
    /// What a recording captures.
    pub enum RecordingContentType {
        AudioVideo => "audioVideo",
        Audio => "audio",
    }
}

wire_enum! {
    /// Whether participants are mixed into one channel.
    pub enum RecordingChannelType {
        Mixed => "mixed",
        Unmixed => "unmixed",
    }
}

wire_enum! {
    /// File format of a recording.
    pub enum RecordingFormatType {
        Wav => "wav",
        Mp3 => "mp3",
        Mp4 => "mp4",
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// A request to start recording a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRecordingRequest {
    call_locator: CallLocator,
    recording_state_callback_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    recording_content_type: Option<RecordingContentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recording_channel_type: Option<RecordingChannelType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recording_format_type: Option<RecordingFormatType>,
}

impl StartRecordingRequest {
    /// Create a new builder.
    pub fn builder() -> StartRecordingRequestBuilder {
        StartRecordingRequestBuilder::default()
    }

    /// The call being recorded.
    pub fn call_locator(&self) -> &CallLocator {
        &self.call_locator
    }
}

impl OperationParameters for StartRecordingRequest {
    fn validate(&self) -> CommunicationResult<()> {
        self.call_locator.validate()?;
        validate_uri(
            "recording_state_callback_uri",
            &self.recording_state_callback_uri,
        )
    }
}

/// Builder for [`StartRecordingRequest`].
#[derive(Debug, Clone, Default)]
pub struct StartRecordingRequestBuilder {
    call_locator: Option<CallLocator>,
    recording_state_callback_uri: Option<String>,
    content_type: Option<RecordingContentType>,
    channel_type: Option<RecordingChannelType>,
    format_type: Option<RecordingFormatType>,
}

impl StartRecordingRequestBuilder {
    /// Set the call to record. **Required.**
    pub fn call_locator(mut self, call_locator: CallLocator) -> Self {
        self.call_locator = Some(call_locator);
        self
    }

    /// Set where recording state events are delivered. **Required.**
    pub fn recording_state_callback_uri(mut self, uri: impl Into<String>) -> Self {
        self.recording_state_callback_uri = Some(uri.into());
        self
    }

    pub fn content_type(mut self, content_type: RecordingContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn channel_type(mut self, channel_type: RecordingChannelType) -> Self {
        self.channel_type = Some(channel_type);
        self
    }

    pub fn format_type(mut self, format_type: RecordingFormatType) -> Self {
        self.format_type = Some(format_type);
        self
    }

    /// Build the request.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the locator or callback URI is missing
    /// or malformed.
    pub fn build(self) -> CommunicationResult<StartRecordingRequest> {
        let call_locator = self
            .call_locator
            .ok_or_else(|| CommunicationError::validation("call_locator is required"))?;
        let recording_state_callback_uri = self.recording_state_callback_uri.ok_or_else(|| {
            CommunicationError::validation("recording_state_callback_uri is required")
        })?;

        let request = StartRecordingRequest {
            call_locator,
            recording_state_callback_uri,
            recording_content_type: self.content_type,
            recording_channel_type: self.channel_type,
            recording_format_type: self.format_type,
        };
        request.validate()?;
        Ok(request)
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Body returned when a recording starts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRecordingResult {
    pub recording_id: ResourceId,
}

/// Properties of a recording.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingProperties {
    pub recording_state: RecordingState,
}

// ---------------------------------------------------------------------------
// Recording poller
// ---------------------------------------------------------------------------

/// Polls the recording properties route.
///
/// Both `active` and `inactive` (paused) mean the recording is running. The
/// service forgets a recording once it is stopped, so a 404 means `Succeeded`.
#[derive(Debug, Clone)]
struct RecordingStateSource {
    dispatcher: OperationDispatcher,
    recording_id: ResourceId,
}

#[async_trait::async_trait]
impl StatusSource for RecordingStateSource {
    async fn fetch(&self) -> CommunicationResult<Option<OperationStatus>> {
        let fetched = self
            .dispatcher
            .invoke::<RecordingProperties>(
                &routes::GET_RECORDING_PROPERTIES,
                Some(&self.recording_id),
            )
            .await;
        match fetched {
            Ok(properties) => Ok(Some(recording_status(&properties.recording_state))),
            Err(err) if err.status() == Some(404) => {
                tracing::debug!(recording_id = %self.recording_id, "recording no longer exists");
                Ok(Some(OperationStatus::Succeeded))
            }
            Err(err) => Err(err),
        }
    }
}

/// Operation status of a recording in `state`.
pub(crate) fn recording_status(state: &RecordingState) -> OperationStatus {
    match state {
        RecordingState::Active | RecordingState::Inactive => OperationStatus::Active,
        RecordingState::Unrecognized(raw) => OperationStatus::Unrecognized(raw.clone()),
    }
}

/// A started recording.
///
/// Cheap to clone; clones share the same tracked status.
#[derive(Debug, Clone)]
pub struct RecordingOperation {
    recording_id: ResourceId,
    operation: LongRunningOperation,
    client: CallingServerClient,
}

impl RecordingOperation {
    /// The recording id.
    pub fn recording_id(&self) -> &ResourceId {
        &self.recording_id
    }

    /// The lifecycle tracker of the recording.
    ///
    /// Its operation id is the recording id, so recording state events can
    /// be correlated to it.
    pub fn operation(&self) -> &LongRunningOperation {
        &self.operation
    }

    /// Fetch the recording properties.
    pub async fn properties(&self) -> CommunicationResult<RecordingProperties> {
        self.client.get_recording_properties(&self.recording_id).await
    }

    /// Pause the recording.
    pub async fn pause(&self) -> CommunicationResult<()> {
        self.client.pause_recording(&self.recording_id).await
    }

    /// Resume a paused recording.
    pub async fn resume(&self) -> CommunicationResult<()> {
        self.client.resume_recording(&self.recording_id).await
    }

    /// Stop the recording and mark the operation `Succeeded`.
    pub async fn stop(&self) -> CommunicationResult<()> {
        self.client.stop_recording(&self.recording_id).await?;
        self.operation
            .observe(OperationStatus::Succeeded, StatusOrigin::Response);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

impl CallingServerClient {
    /// Start recording a call.
    #[tracing::instrument(
        name = "communication::recording::start_recording",
        skip(self, request),
        fields(call_locator = request.call_locator.id())
    )]
    pub async fn start_recording(
        &self,
        request: &StartRecordingRequest,
    ) -> CommunicationResult<RecordingOperation> {
        tracing::debug!("starting recording");
        let started: StartRecordingResult = self
            .recordings
            .call(&routes::START_RECORDING, None, request)
            .await?;
        tracing::debug!(recording_id = %started.recording_id, "recording started");

        let recording_id = started.recording_id;
        let source = RecordingStateSource {
            dispatcher: self.recordings.clone(),
            recording_id: recording_id.clone(),
        };
        let operation = LongRunningOperation::new(
            request.call_locator.resource_id(),
            recording_id.as_str(),
            RECORDING_KIND,
            OperationStatus::Pending,
            source,
        );

        Ok(RecordingOperation {
            recording_id,
            operation,
            client: self.clone(),
        })
    }

    /// Get the properties of a recording.
    #[tracing::instrument(
        name = "communication::recording::get_recording_properties",
        skip(self),
        fields(%recording_id)
    )]
    pub async fn get_recording_properties(
        &self,
        recording_id: &ResourceId,
    ) -> CommunicationResult<RecordingProperties> {
        tracing::debug!("getting recording properties");
        self.recordings
            .invoke(&routes::GET_RECORDING_PROPERTIES, Some(recording_id))
            .await
    }

    /// Pause a recording.
    #[tracing::instrument(
        name = "communication::recording::pause_recording",
        skip(self),
        fields(%recording_id)
    )]
    pub async fn pause_recording(&self, recording_id: &ResourceId) -> CommunicationResult<()> {
        tracing::debug!("pausing recording");
        let _: IgnoredAny = self
            .recordings
            .invoke(&routes::PAUSE_RECORDING, Some(recording_id))
            .await?;
        Ok(())
    }

    /// Resume a paused recording.
    #[tracing::instrument(
        name = "communication::recording::resume_recording",
        skip(self),
        fields(%recording_id)
    )]
    pub async fn resume_recording(&self, recording_id: &ResourceId) -> CommunicationResult<()> {
        tracing::debug!("resuming recording");
        let _: IgnoredAny = self
            .recordings
            .invoke(&routes::RESUME_RECORDING, Some(recording_id))
            .await?;
        Ok(())
    }

    /// Stop a recording.
    #[tracing::instrument(
        name = "communication::recording::stop_recording",
        skip(self),
        fields(%recording_id)
    )]
    pub async fn stop_recording(&self, recording_id: &ResourceId) -> CommunicationResult<()> {
        tracing::debug!("stopping recording");
        let _: IgnoredAny = self
            .recordings
            .invoke(&routes::STOP_RECORDING, Some(recording_id))
            .await?;
        Ok(())
    }

    /// Delete a recorded file.
    ///
    /// `delete_url` is the absolute URL from the recording file status
    /// event. Returns the status code of the service response.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a relative or non-http(s) URL, or the
    /// service error for a non-2xx response.
    #[tracing::instrument(name = "communication::recording::delete_recording", skip(self))]
    pub async fn delete_recording(&self, delete_url: &str) -> CommunicationResult<u16> {
        tracing::debug!("deleting recording");
        validate_uri("delete_url", delete_url)?;
        let url = url::Url::parse(delete_url).map_err(|e| {
            CommunicationError::invalid_endpoint_with_source("invalid delete_url", e)
        })?;

        let response = self
            .communication_client()
            .execute(Method::DELETE, url, None)
            .await?;
        tracing::debug!(status = response.status, "recording deleted");
        Ok(response.status)
    }
}
