//! Route table of the calling server REST API.
//!
//! Templates are relative to the resource endpoint. `{id}` is the call
//! connection id, recording id or operation id depending on the group.

use azure_communication_core::dispatch::Route;
use reqwest::Method;

/// Resource group names, used as dispatcher labels.
pub(crate) mod group {
    pub const CALL_CONNECTIONS: &str = "call_connections";
    pub const SERVER_CALLS: &str = "server_calls";
    pub const RECORDINGS: &str = "recordings";
    pub const OPERATIONS: &str = "operations";
}

// ---------------------------------------------------------------------------
// Call connections
// ---------------------------------------------------------------------------

pub(crate) const CREATE_CALL: Route =
    Route::new("create_call", Method::POST, "calling/callConnections");
pub(crate) const GET_CALL: Route =
    Route::new("get_call", Method::GET, "calling/callConnections/{id}");
pub(crate) const DELETE_CALL: Route =
    Route::new("delete_call", Method::DELETE, "calling/callConnections/{id}");
pub(crate) const HANG_UP: Route =
    Route::new("hang_up", Method::POST, "calling/callConnections/{id}:hangup");
pub(crate) const KEEP_ALIVE: Route =
    Route::new("keep_alive", Method::POST, "calling/callConnections/{id}:keepAlive");
pub(crate) const TRANSFER: Route =
    Route::new("transfer", Method::POST, "calling/callConnections/{id}:transfer");
pub(crate) const PLAY_AUDIO: Route =
    Route::new("play_audio", Method::POST, "calling/callConnections/{id}:playAudio");
pub(crate) const CANCEL_ALL_MEDIA_OPERATIONS: Route = Route::new(
    "cancel_all_media_operations",
    Method::POST,
    "calling/callConnections/{id}:cancelAllMediaOperations",
);
pub(crate) const ADD_PARTICIPANT: Route = Route::new(
    "add_participant",
    Method::POST,
    "calling/callConnections/{id}/participants",
);
pub(crate) const GET_PARTICIPANTS: Route = Route::new(
    "get_participants",
    Method::GET,
    "calling/callConnections/{id}/participants",
);
pub(crate) const GET_PARTICIPANT: Route = Route::new(
    "get_participant",
    Method::POST,
    "calling/callConnections/{id}/participants:get",
);
pub(crate) const REMOVE_PARTICIPANT: Route = Route::new(
    "remove_participant",
    Method::POST,
    "calling/callConnections/{id}/participants:remove",
);
pub(crate) const MUTE_PARTICIPANT: Route = Route::new(
    "mute_participant",
    Method::POST,
    "calling/callConnections/{id}/participants:mute",
);
pub(crate) const UNMUTE_PARTICIPANT: Route = Route::new(
    "unmute_participant",
    Method::POST,
    "calling/callConnections/{id}/participants:unmute",
);
pub(crate) const HOLD_PARTICIPANT_MEETING_AUDIO: Route = Route::new(
    "hold_participant_meeting_audio",
    Method::POST,
    "calling/callConnections/{id}/participants:holdMeetingAudio",
);
pub(crate) const RESUME_PARTICIPANT_MEETING_AUDIO: Route = Route::new(
    "resume_participant_meeting_audio",
    Method::POST,
    "calling/callConnections/{id}/participants:resumeMeetingAudio",
);
pub(crate) const PLAY_AUDIO_TO_PARTICIPANT: Route = Route::new(
    "play_audio_to_participant",
    Method::POST,
    "calling/callConnections/{id}/participants:playAudio",
);
pub(crate) const CANCEL_PARTICIPANT_MEDIA_OPERATION: Route = Route::new(
    "cancel_participant_media_operation",
    Method::POST,
    "calling/callConnections/{id}/participants:cancelMediaOperation",
);

// ---------------------------------------------------------------------------
// Server calls (addressed by a call locator in the body)
// ---------------------------------------------------------------------------

pub(crate) const JOIN_CALL: Route =
    Route::new("join_call", Method::POST, "calling/serverCalls:join");
pub(crate) const ANSWER_CALL: Route =
    Route::new("answer_call", Method::POST, "calling/serverCalls:answer");
pub(crate) const SERVER_ADD_PARTICIPANT: Route = Route::new(
    "add_participant",
    Method::POST,
    "calling/serverCalls:addParticipant",
);
pub(crate) const SERVER_REMOVE_PARTICIPANT: Route = Route::new(
    "remove_participant",
    Method::POST,
    "calling/serverCalls:removeParticipant",
);
pub(crate) const SERVER_GET_PARTICIPANTS: Route = Route::new(
    "get_participants",
    Method::POST,
    "calling/serverCalls:getParticipants",
);
pub(crate) const SERVER_GET_PARTICIPANT: Route = Route::new(
    "get_participant",
    Method::POST,
    "calling/serverCalls:getParticipant",
);
pub(crate) const SERVER_PLAY_AUDIO: Route =
    Route::new("play_audio", Method::POST, "calling/serverCalls:playAudio");
pub(crate) const SERVER_PLAY_AUDIO_TO_PARTICIPANT: Route = Route::new(
    "play_audio_to_participant",
    Method::POST,
    "calling/serverCalls:playAudioToParticipant",
);
pub(crate) const SERVER_CANCEL_MEDIA_OPERATION: Route = Route::new(
    "cancel_media_operation",
    Method::POST,
    "calling/serverCalls:cancelMediaOperation",
);
pub(crate) const SERVER_CANCEL_PARTICIPANT_MEDIA_OPERATION: Route = Route::new(
    "cancel_participant_media_operation",
    Method::POST,
    "calling/serverCalls:cancelParticipantMediaOperation",
);
pub(crate) const SERVER_HOLD_PARTICIPANT_MEETING_AUDIO: Route = Route::new(
    "hold_participant_meeting_audio",
    Method::POST,
    "calling/serverCalls:holdMeetingAudio",
);
pub(crate) const SERVER_RESUME_PARTICIPANT_MEETING_AUDIO: Route = Route::new(
    "resume_participant_meeting_audio",
    Method::POST,
    "calling/serverCalls:resumeMeetingAudio",
);

// ---------------------------------------------------------------------------
// Recordings
// ---------------------------------------------------------------------------

pub(crate) const START_RECORDING: Route =
    Route::new("start_recording", Method::POST, "calling/recordings");
pub(crate) const GET_RECORDING_PROPERTIES: Route = Route::new(
    "get_recording_properties",
    Method::GET,
    "calling/recordings/{id}",
);
pub(crate) const PAUSE_RECORDING: Route =
    Route::new("pause_recording", Method::POST, "calling/recordings/{id}:pause");
pub(crate) const RESUME_RECORDING: Route =
    Route::new("resume_recording", Method::POST, "calling/recordings/{id}:resume");
pub(crate) const STOP_RECORDING: Route =
    Route::new("stop_recording", Method::POST, "calling/recordings/{id}:stop");

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

pub(crate) const GET_OPERATION_STATUS: Route = Route::new(
    "get_operation_status",
    Method::GET,
    "calling/operations/{id}",
);
