//! Callback events.
//!
//! The service reports call state changes and the outcome of asynchronous
//! operations by posting events to the callback URI. [`parse_events`] turns a
//! posted body into [`CallingServerEvent`]s, and [`OperationTracker`] feeds
//! the operation results into the pollers they belong to.
//!
//! ```rust
//! use azure_communication_callingserver::events::{parse_events, CallingServerEvent};
//!
//! let body = br#"[{
//!     "type": "Microsoft.Communication.CallConnectionStateChanged",
//!     "data": {"callConnectionId": "abc123", "callConnectionState": "connected"}
//! }]"#;
//!
//! let events = parse_events(body).unwrap();
//! assert!(matches!(events[0], CallingServerEvent::CallConnectionStateChanged(_)));
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use azure_communication_core::dispatch::decode;
use azure_communication_core::error::{CommunicationError, CommunicationResult};
use azure_communication_core::lro::{LongRunningOperation, Observation, OperationNotification};
use azure_communication_core::models::{OperationId, OperationStatus, ResourceId};
use azure_communication_core::wire_enum;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::models::{CallConnectionState, CallParticipant, ResultDetails};
use crate::recording::{recording_status, RecordingState};

const EVENT_PREFIX: &str = "Microsoft.Communication.";

/// How long [`OperationTracker`] keeps an operation after it finishes.
pub const DEFAULT_FINISHED_RETENTION: Duration = Duration::from_secs(60);

wire_enum! {
    /// A DTMF tone.
    pub enum ToneValue {
        Tone0 => "tone0",
        Tone1 => "tone1",
        Tone2 => "tone2",
        Tone3 => "tone3",
        Tone4 => "tone4",
        Tone5 => "tone5",
        Tone6 => "tone6",
        Tone7 => "tone7",
        Tone8 => "tone8",
        Tone9 => "tone9",
        Star => "toneStar",
        Pound => "tonePound",
        A => "toneA",
        B => "toneB",
        C => "toneC",
        D => "toneD",
        Flash => "flash",
    }
}

// ---------------------------------------------------------------------------
// Event payloads
// ---------------------------------------------------------------------------

/// A call connection changed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallConnectionStateChangedEvent {
    pub call_connection_id: ResourceId,
    pub call_connection_state: CallConnectionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_call_id: Option<String>,
}

/// Progress or outcome of an asynchronous operation.
///
/// Shared by the add-participant, play-audio and transfer result events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResultEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<OperationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_context: Option<String>,
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_details: Option<ResultDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_connection_id: Option<ResourceId>,
}

/// The participant list of a call changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantsUpdatedEvent {
    pub call_connection_id: ResourceId,
    #[serde(default)]
    pub participants: Vec<CallParticipant>,
}

/// A recording started, paused or resumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecordingStateChangedEvent {
    pub recording_id: ResourceId,
    pub state: RecordingState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_call_id: Option<String>,
}

/// A tone pressed by a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToneInfo {
    pub sequence_id: i32,
    pub tone: ToneValue,
}

/// A participant pressed a tone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToneReceivedEvent {
    pub tone_info: ToneInfo,
    pub call_connection_id: ResourceId,
}

/// A callback event.
#[derive(Debug, Clone, PartialEq)]
pub enum CallingServerEvent {
    CallConnectionStateChanged(CallConnectionStateChangedEvent),
    AddParticipantResult(OperationResultEvent),
    PlayAudioResult(OperationResultEvent),
    CallTransferResult(OperationResultEvent),
    ParticipantsUpdated(ParticipantsUpdatedEvent),
    CallRecordingStateChanged(CallRecordingStateChangedEvent),
    ToneReceived(ToneReceivedEvent),
    /// An event type this SDK version does not know.
    Unknown {
        event_type: String,
        data: serde_json::Value,
    },
}

impl CallingServerEvent {
    /// Parse one event from its type name and data payload.
    ///
    /// The `Microsoft.Communication.` prefix is optional.
    pub fn from_parts(event_type: &str, data: serde_json::Value) -> CommunicationResult<Self> {
        fn payload<T: DeserializeOwned>(data: serde_json::Value) -> CommunicationResult<T> {
            serde_json::from_value(data).map_err(CommunicationError::deserialization)
        }

        let name = event_type.strip_prefix(EVENT_PREFIX).unwrap_or(event_type);
        Ok(match name {
            "CallConnectionStateChanged" => Self::CallConnectionStateChanged(payload(data)?),
            "AddParticipantResult" => Self::AddParticipantResult(payload(data)?),
            "PlayAudioResult" => Self::PlayAudioResult(payload(data)?),
            "CallTransferResult" => Self::CallTransferResult(payload(data)?),
            "ParticipantsUpdated" => Self::ParticipantsUpdated(payload(data)?),
            "CallRecordingStateChanged" => Self::CallRecordingStateChanged(payload(data)?),
            "ToneReceived" => Self::ToneReceived(payload(data)?),
            _ => Self::Unknown {
                event_type: event_type.to_string(),
                data,
            },
        })
    }

    /// The full event type name.
    pub fn event_type(&self) -> String {
        let name = match self {
            Self::CallConnectionStateChanged(_) => "CallConnectionStateChanged",
            Self::AddParticipantResult(_) => "AddParticipantResult",
            Self::PlayAudioResult(_) => "PlayAudioResult",
            Self::CallTransferResult(_) => "CallTransferResult",
            Self::ParticipantsUpdated(_) => "ParticipantsUpdated",
            Self::CallRecordingStateChanged(_) => "CallRecordingStateChanged",
            Self::ToneReceived(_) => "ToneReceived",
            Self::Unknown { event_type, .. } => return event_type.clone(),
        };
        format!("{EVENT_PREFIX}{name}")
    }

    /// The operation result carried by the event, if any.
    pub fn operation_result(&self) -> Option<&OperationResultEvent> {
        match self {
            Self::AddParticipantResult(result)
            | Self::PlayAudioResult(result)
            | Self::CallTransferResult(result) => Some(result),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type", alias = "eventType")]
    event_type: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Parse a callback request body.
///
/// Accepts an array of events or a single event object. Each event carries
/// its type in `type` (or `eventType`) and its payload in `data`.
///
/// # Errors
///
/// Returns [`CommunicationError::Deserialization`] if the body is not an
/// event or a known event type has a malformed payload.
pub fn parse_events(body: &[u8]) -> CommunicationResult<Vec<CallingServerEvent>> {
    let value: serde_json::Value = decode(body)?;
    let envelopes: Vec<Envelope> = match value {
        serde_json::Value::Array(_) => {
            serde_json::from_value(value).map_err(CommunicationError::deserialization)?
        }
        other => vec![serde_json::from_value(other).map_err(CommunicationError::deserialization)?],
    };

    envelopes
        .into_iter()
        .map(|envelope| CallingServerEvent::from_parts(&envelope.event_type, envelope.data))
        .collect()
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Tracked {
    operations: HashMap<OperationId, LongRunningOperation>,
    contexts: HashMap<String, OperationId>,
    finished: HashMap<OperationId, Instant>,
}

impl Tracked {
    fn remove(&mut self, operation_id: &OperationId) -> Option<LongRunningOperation> {
        self.contexts.retain(|_, id| id != operation_id);
        self.finished.remove(operation_id);
        self.operations.remove(operation_id)
    }

    /// Stamp newly finished operations and drop those past `retention`.
    fn sweep(&mut self, retention: Duration) {
        let now = Instant::now();
        for (id, operation) in &self.operations {
            if operation.is_terminal() {
                self.finished.entry(id.clone()).or_insert(now);
            }
        }
        let expired: Vec<OperationId> = self
            .finished
            .iter()
            .filter(|(_, finished_at)| now.duration_since(**finished_at) >= retention)
            .map(|(id, _)| id.clone())
            .collect();
        for id in expired {
            tracing::trace!(operation_id = %id, "evicting finished operation");
            self.remove(&id);
        }
    }
}

/// Routes callback events to the pollers they belong to.
///
/// Operation result events are matched by `operationId`, or by
/// `operationContext` for operations registered with
/// [`track_with_context`](Self::track_with_context). Recording state events
/// are matched by recording id.
///
/// An operation that reaches a terminal status stays correlatable for
/// [`DEFAULT_FINISHED_RETENTION`] (see
/// [`with_finished_retention`](Self::with_finished_retention)), so a late
/// event contradicting its outcome is still matched and reported as
/// [`Observation::Conflict`].
#[derive(Debug)]
pub struct OperationTracker {
    tracked: Mutex<Tracked>,
    retention: Duration,
}

impl Default for OperationTracker {
    fn default() -> Self {
        Self {
            tracked: Mutex::default(),
            retention: DEFAULT_FINISHED_RETENTION,
        }
    }
}

impl OperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how long finished operations stay correlatable.
    pub fn with_finished_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    fn tracked(&self) -> MutexGuard<'_, Tracked> {
        let mut tracked = self.tracked.lock().unwrap_or_else(PoisonError::into_inner);
        tracked.sweep(self.retention);
        tracked
    }

    /// Track an operation by its operation id.
    pub fn track(&self, operation: &LongRunningOperation) {
        self.tracked()
            .operations
            .insert(operation.operation_id().clone(), operation.clone());
    }

    /// Track an operation by id and by the operation context sent with it.
    pub fn track_with_context(&self, operation: &LongRunningOperation, context: impl Into<String>) {
        let mut tracked = self.tracked();
        tracked
            .contexts
            .insert(context.into(), operation.operation_id().clone());
        tracked
            .operations
            .insert(operation.operation_id().clone(), operation.clone());
    }

    /// Stop tracking an operation.
    pub fn untrack(&self, operation_id: &OperationId) -> Option<LongRunningOperation> {
        self.tracked().remove(operation_id)
    }

    /// Number of tracked operations that have not finished.
    pub fn len(&self) -> usize {
        let tracked = self.tracked();
        tracked.operations.len() - tracked.finished.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn find(&self, operation_id: Option<&OperationId>, context: Option<&str>) -> Option<LongRunningOperation> {
        let tracked = self.tracked();
        operation_id
            .and_then(|id| tracked.operations.get(id))
            .or_else(|| {
                context
                    .and_then(|ctx| tracked.contexts.get(ctx))
                    .and_then(|id| tracked.operations.get(id))
            })
            .cloned()
    }

    /// Feed an event to the operation it belongs to.
    ///
    /// Returns [`Observation::Uncorrelated`] for events that carry no
    /// operation status or match no tracked operation.
    pub fn handle(&self, event: &CallingServerEvent) -> Observation {
        let (operation, status, detail) = match event {
            CallingServerEvent::CallRecordingStateChanged(recording) => {
                let id = OperationId::new(recording.recording_id.as_str());
                (
                    self.find(Some(&id), None),
                    recording_status(&recording.state),
                    None,
                )
            }
            other => match other.operation_result() {
                Some(result) => (
                    self.find(
                        result.operation_id.as_ref(),
                        result.operation_context.as_deref(),
                    ),
                    result.status.clone(),
                    result.result_details.as_ref().map(ResultDetails::summary),
                ),
                None => return Observation::Uncorrelated,
            },
        };

        let Some(operation) = operation else {
            tracing::debug!(event_type = %event.event_type(), "event matches no tracked operation");
            return Observation::Uncorrelated;
        };

        let mut notification = OperationNotification::new(operation.operation_id().clone(), status);
        if let Some(detail) = detail {
            notification = notification.with_detail(detail);
        }
        let observation = operation.apply_notification(&notification);
        if let Observation::Conflict { kept, rejected } = &observation {
            tracing::warn!(
                event_type = %event.event_type(),
                operation_id = %operation.operation_id(),
                %kept,
                %rejected,
                "event contradicts finished operation"
            );
        }

        if operation.is_terminal() {
            self.tracked()
                .finished
                .entry(operation.operation_id().clone())
                .or_insert_with(Instant::now);
        }
        observation
    }
}
