//! Server-call operations.
//!
//! These operations address a call by [`CallLocator`] instead of a call
//! connection, so they work on calls this application did not create. They
//! live on [`CallingServerClient`].

use azure_communication_core::dispatch::{ensure_not_empty, OperationParameters, Route};
use azure_communication_core::error::CommunicationResult;
use azure_communication_core::lro::LongRunningOperation;
use azure_communication_core::models::{AcceptedOperation, OperationId};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::call_connection::{AddParticipantRequest, CallConnection};
use crate::client::CallingServerClient;
use crate::identifier::CommunicationIdentifier;
use crate::locator::CallLocator;
use crate::media::{PlayAudioBody, PlayAudioOptions, PLAY_AUDIO_KIND, PLAY_AUDIO_TO_PARTICIPANT_KIND};
use crate::models::{
    validate_callback_uri, validate_uri, AddParticipantResult, CallConnectionCreated,
    CallMediaType, CallParticipant, CallingEventSubscriptionType, CancelMediaOperationBody,
    LocatedParticipantBody, LocatorBody,
};
use crate::routes;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Options for joining an existing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinCallOptions {
    pub callback_uri: String,
    #[serde(default)]
    pub requested_media_types: Vec<CallMediaType>,
    #[serde(default)]
    pub requested_call_events: Vec<CallingEventSubscriptionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl JoinCallOptions {
    /// Join with events delivered to `callback_uri`.
    pub fn new(callback_uri: impl Into<String>) -> Self {
        Self {
            callback_uri: callback_uri.into(),
            requested_media_types: Vec::new(),
            requested_call_events: Vec::new(),
            subject: None,
        }
    }

    pub fn requested_media_type(mut self, media_type: CallMediaType) -> Self {
        self.requested_media_types.push(media_type);
        self
    }

    pub fn requested_call_event(mut self, event: CallingEventSubscriptionType) -> Self {
        self.requested_call_events.push(event);
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

/// Options for answering an incoming call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnswerCallOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_uri: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub requested_media_types: Vec<CallMediaType>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub requested_call_events: Vec<CallingEventSubscriptionType>,
}

impl AnswerCallOptions {
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
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JoinCallBody<'a> {
    call_locator: &'a CallLocator,
    source: &'a CommunicationIdentifier,
    #[serde(flatten)]
    options: &'a JoinCallOptions,
}

impl OperationParameters for JoinCallBody<'_> {
    fn validate(&self) -> CommunicationResult<()> {
        self.call_locator.validate()?;
        self.source.validate("source")?;
        validate_uri("callback_uri", &self.options.callback_uri)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnswerCallBody<'a> {
    incoming_call_context: &'a str,
    #[serde(flatten)]
    options: &'a AnswerCallOptions,
}

impl OperationParameters for AnswerCallBody<'_> {
    fn validate(&self) -> CommunicationResult<()> {
        ensure_not_empty("incoming_call_context", self.incoming_call_context)?;
        validate_callback_uri("callback_uri", self.options.callback_uri.as_deref())
    }
}

/// A call-connection request re-addressed to a located call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Located<'a, P> {
    call_locator: &'a CallLocator,
    #[serde(flatten)]
    params: &'a P,
}

impl<P: OperationParameters> OperationParameters for Located<'_, P> {
    fn validate(&self) -> CommunicationResult<()> {
        self.call_locator.validate()?;
        self.params.validate()
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

impl CallingServerClient {
    async fn server_call<P, R>(&self, route: &Route, params: &P) -> CommunicationResult<R>
    where
        P: OperationParameters,
        R: serde::de::DeserializeOwned,
    {
        self.server_calls.call(route, None, params).await
    }

    async fn start_server_operation<P: OperationParameters>(
        &self,
        call_locator: &CallLocator,
        route: &Route,
        params: &P,
        kind: &'static str,
    ) -> CommunicationResult<LongRunningOperation> {
        let accepted: AcceptedOperation = self.server_call(route, params).await?;
        Ok(self.track_accepted(call_locator.resource_id(), accepted, kind))
    }

    /// Join an existing call and return a connection bound to it.
    #[tracing::instrument(
        name = "communication::server_call::join_call",
        skip(self, call_locator, source, options),
        fields(call_locator = call_locator.id())
    )]
    pub async fn join_call(
        &self,
        call_locator: &CallLocator,
        source: &CommunicationIdentifier,
        options: &JoinCallOptions,
    ) -> CommunicationResult<CallConnection> {
        tracing::debug!("joining call");
        let joined: CallConnectionCreated = self
            .server_call(
                &routes::JOIN_CALL,
                &JoinCallBody {
                    call_locator,
                    source,
                    options,
                },
            )
            .await?;
        tracing::debug!(call_connection_id = %joined.call_connection_id, "call joined");
        Ok(self.get_call_connection(joined.call_connection_id))
    }

    /// Answer an incoming call and return a connection bound to it.
    ///
    /// `incoming_call_context` comes from the incoming-call event.
    #[tracing::instrument(
        name = "communication::server_call::answer_call",
        skip(self, incoming_call_context, options)
    )]
    pub async fn answer_call(
        &self,
        incoming_call_context: &str,
        options: &AnswerCallOptions,
    ) -> CommunicationResult<CallConnection> {
        tracing::debug!("answering call");
        let answered: CallConnectionCreated = self
            .server_call(
                &routes::ANSWER_CALL,
                &AnswerCallBody {
                    incoming_call_context,
                    options,
                },
            )
            .await?;
        tracing::debug!(call_connection_id = %answered.call_connection_id, "call answered");
        Ok(self.get_call_connection(answered.call_connection_id))
    }

    /// Add a participant to a located call.
    #[tracing::instrument(
        name = "communication::server_call::add_participant",
        skip(self, call_locator, request),
        fields(call_locator = call_locator.id())
    )]
    pub async fn add_participant(
        &self,
        call_locator: &CallLocator,
        request: &AddParticipantRequest,
    ) -> CommunicationResult<AddParticipantResult> {
        tracing::debug!("adding participant");
        self.server_call(
            &routes::SERVER_ADD_PARTICIPANT,
            &Located {
                call_locator,
                params: request,
            },
        )
        .await
    }

    /// Remove a participant from a located call.
    #[tracing::instrument(
        name = "communication::server_call::remove_participant",
        skip(self, call_locator, participant),
        fields(call_locator = call_locator.id())
    )]
    pub async fn remove_participant(
        &self,
        call_locator: &CallLocator,
        participant: &CommunicationIdentifier,
    ) -> CommunicationResult<()> {
        tracing::debug!("removing participant");
        let _: IgnoredAny = self
            .server_call(
                &routes::SERVER_REMOVE_PARTICIPANT,
                &LocatedParticipantBody {
                    call_locator,
                    identifier: participant,
                },
            )
            .await?;
        Ok(())
    }

    /// List the participants of a located call.
    #[tracing::instrument(
        name = "communication::server_call::get_participants",
        skip(self, call_locator),
        fields(call_locator = call_locator.id())
    )]
    pub async fn get_participants(
        &self,
        call_locator: &CallLocator,
    ) -> CommunicationResult<Vec<CallParticipant>> {
        tracing::debug!("listing participants");
        self.server_call(&routes::SERVER_GET_PARTICIPANTS, &LocatorBody { call_locator })
            .await
    }

    /// Get one participant of a located call.
    #[tracing::instrument(
        name = "communication::server_call::get_participant",
        skip(self, call_locator, participant),
        fields(call_locator = call_locator.id())
    )]
    pub async fn get_participant(
        &self,
        call_locator: &CallLocator,
        participant: &CommunicationIdentifier,
    ) -> CommunicationResult<CallParticipant> {
        tracing::debug!("getting participant");
        self.server_call(
            &routes::SERVER_GET_PARTICIPANT,
            &LocatedParticipantBody {
                call_locator,
                identifier: participant,
            },
        )
        .await
    }

    /// Play an audio file to everyone in a located call.
    ///
    /// The returned poller is keyed by the locator id.
    #[tracing::instrument(
        name = "communication::server_call::play_audio",
        skip(self, call_locator, options),
        fields(call_locator = call_locator.id())
    )]
    pub async fn play_audio(
        &self,
        call_locator: &CallLocator,
        audio_file_uri: &str,
        options: &PlayAudioOptions,
    ) -> CommunicationResult<LongRunningOperation> {
        tracing::debug!("playing audio");
        self.start_server_operation(
            call_locator,
            &routes::SERVER_PLAY_AUDIO,
            &PlayAudioBody::new(audio_file_uri, options).located(call_locator),
            PLAY_AUDIO_KIND,
        )
        .await
    }

    /// Play an audio file to one participant of a located call.
    #[tracing::instrument(
        name = "communication::server_call::play_audio_to_participant",
        skip(self, call_locator, participant, options),
        fields(call_locator = call_locator.id())
    )]
    pub async fn play_audio_to_participant(
        &self,
        call_locator: &CallLocator,
        participant: &CommunicationIdentifier,
        audio_file_uri: &str,
        options: &PlayAudioOptions,
    ) -> CommunicationResult<LongRunningOperation> {
        tracing::debug!("playing audio to participant");
        self.start_server_operation(
            call_locator,
            &routes::SERVER_PLAY_AUDIO_TO_PARTICIPANT,
            &PlayAudioBody::new(audio_file_uri, options)
                .located(call_locator)
                .for_participant(participant),
            PLAY_AUDIO_TO_PARTICIPANT_KIND,
        )
        .await
    }

    /// Cancel a media operation in a located call.
    #[tracing::instrument(
        name = "communication::server_call::cancel_media_operation",
        skip(self, call_locator),
        fields(call_locator = call_locator.id(), %media_operation_id)
    )]
    pub async fn cancel_media_operation(
        &self,
        call_locator: &CallLocator,
        media_operation_id: &OperationId,
    ) -> CommunicationResult<()> {
        tracing::debug!("cancelling media operation");
        let _: IgnoredAny = self
            .server_call(
                &routes::SERVER_CANCEL_MEDIA_OPERATION,
                &CancelMediaOperationBody {
                    call_locator: Some(call_locator),
                    identifier: None,
                    media_operation_id,
                },
            )
            .await?;
        Ok(())
    }

    /// Cancel a media operation targeting one participant of a located call.
    #[tracing::instrument(
        name = "communication::server_call::cancel_participant_media_operation",
        skip(self, call_locator, participant),
        fields(call_locator = call_locator.id(), %media_operation_id)
    )]
    pub async fn cancel_participant_media_operation(
        &self,
        call_locator: &CallLocator,
        participant: &CommunicationIdentifier,
        media_operation_id: &OperationId,
    ) -> CommunicationResult<()> {
        tracing::debug!("cancelling participant media operation");
        let _: IgnoredAny = self
            .server_call(
                &routes::SERVER_CANCEL_PARTICIPANT_MEDIA_OPERATION,
                &CancelMediaOperationBody {
                    call_locator: Some(call_locator),
                    identifier: Some(participant),
                    media_operation_id,
                },
            )
            .await?;
        Ok(())
    }

    /// Put a participant's meeting audio on hold in a located call.
    #[tracing::instrument(
        name = "communication::server_call::hold_participant_meeting_audio",
        skip(self, call_locator, participant),
        fields(call_locator = call_locator.id())
    )]
    pub async fn hold_participant_meeting_audio(
        &self,
        call_locator: &CallLocator,
        participant: &CommunicationIdentifier,
    ) -> CommunicationResult<()> {
        tracing::debug!("holding participant meeting audio");
        let _: IgnoredAny = self
            .server_call(
                &routes::SERVER_HOLD_PARTICIPANT_MEETING_AUDIO,
                &LocatedParticipantBody {
                    call_locator,
                    identifier: participant,
                },
            )
            .await?;
        Ok(())
    }

    /// Resume a participant's meeting audio in a located call.
    #[tracing::instrument(
        name = "communication::server_call::resume_participant_meeting_audio",
        skip(self, call_locator, participant),
        fields(call_locator = call_locator.id())
    )]
    pub async fn resume_participant_meeting_audio(
        &self,
        call_locator: &CallLocator,
        participant: &CommunicationIdentifier,
    ) -> CommunicationResult<()> {
        tracing::debug!("resuming participant meeting audio");
        let _: IgnoredAny = self
            .server_call(
                &routes::SERVER_RESUME_PARTICIPANT_MEETING_AUDIO,
                &LocatedParticipantBody {
                    call_locator,
                    identifier: participant,
                },
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{scripted_calling_client, setup_mock_client, TEST_CALLBACK_URI};
    use azure_communication_core::models::OperationStatus;
    use azure_communication_core::test_support::ScriptedTransport;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn group_call() -> CallLocator {
        CallLocator::group_call("3f1c5b2a-0000-4000-8000-000000000001")
    }

    fn sent_body(transport: &ScriptedTransport, index: usize) -> serde_json::Value {
        let request = &transport.requests()[index];
        serde_json::from_slice(request.body.as_deref().unwrap_or(b"null".as_slice())).unwrap()
    }

    #[test]
    fn join_call_options_round_trip() {
        let options = JoinCallOptions::new(TEST_CALLBACK_URI)
            .requested_media_type(CallMediaType::Audio)
            .requested_call_event(CallingEventSubscriptionType::ParticipantsUpdated)
            .subject("standup");

        let wire = serde_json::to_value(&options).unwrap();
        let parsed: JoinCallOptions = serde_json::from_value(wire).unwrap();
        assert_eq!(parsed, options);
    }

    #[test]
    fn answer_call_options_round_trip() {
        for options in [
            AnswerCallOptions::default(),
            AnswerCallOptions::default()
                .callback_uri(TEST_CALLBACK_URI)
                .requested_media_type(CallMediaType::Video)
                .requested_call_event(CallingEventSubscriptionType::ToneReceived),
        ] {
            let wire = serde_json::to_value(&options).unwrap();
            let parsed: AnswerCallOptions = serde_json::from_value(wire).unwrap();
            assert_eq!(parsed, options);
        }
    }

    #[tokio::test]
    async fn join_call_returns_bound_connection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calling/serverCalls:join"))
            .and(body_partial_json(json!({
                "callLocator": {"kind": "groupCallLocator", "groupCallId": "3f1c5b2a-0000-4000-8000-000000000001"},
                "source": {"rawId": "8:acs:bot"},
                "callbackUri": TEST_CALLBACK_URI,
                "requestedMediaTypes": ["audio"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"callConnectionId": "joined-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let connection = client
            .join_call(
                &group_call(),
                &CommunicationIdentifier::user("8:acs:bot"),
                &JoinCallOptions::new(TEST_CALLBACK_URI).requested_media_type(CallMediaType::Audio),
            )
            .await
            .unwrap();

        assert_eq!(connection.call_connection_id().as_str(), "joined-1");
    }

    #[tokio::test]
    async fn join_call_rejects_relative_callback() {
        let transport = Arc::new(ScriptedTransport::new());
        let client = scripted_calling_client(transport.clone());

        let err = client
            .join_call(
                &group_call(),
                &CommunicationIdentifier::user("8:acs:bot"),
                &JoinCallOptions::new("/events"),
            )
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn answer_call_sends_context() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(200, json!({"callConnectionId": "answered-1"}));
        let client = scripted_calling_client(transport.clone());

        let connection = client
            .answer_call(
                "incoming-context",
                &AnswerCallOptions::default().callback_uri(TEST_CALLBACK_URI),
            )
            .await
            .unwrap();

        assert_eq!(connection.call_connection_id().as_str(), "answered-1");
        assert_eq!(transport.requests()[0].url.path(), "/calling/serverCalls:answer");
        assert_eq!(
            sent_body(&transport, 0),
            json!({"incomingCallContext": "incoming-context", "callbackUri": TEST_CALLBACK_URI})
        );
    }

    #[tokio::test]
    async fn answer_call_requires_context() {
        let transport = Arc::new(ScriptedTransport::new());
        let client = scripted_calling_client(transport.clone());

        let err = client
            .answer_call(" ", &AnswerCallOptions::default())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("incoming_call_context"));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn add_participant_flattens_request() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(202, json!({"participantId": "p9"}));
        let client = scripted_calling_client(transport.clone());

        let result = client
            .add_participant(
                &CallLocator::server_call("srv1"),
                &AddParticipantRequest::new(CommunicationIdentifier::phone_number("+14255550123"))
                    .alternate_caller_id(CommunicationIdentifier::phone_number("+14255550100")),
            )
            .await
            .unwrap();

        assert_eq!(result.participant_id, "p9");
        let body = sent_body(&transport, 0);
        assert_eq!(body["callLocator"]["serverCallId"], "srv1");
        assert_eq!(body["participant"]["phoneNumber"]["value"], "+14255550123");
        assert_eq!(body["alternateCallerId"]["rawId"], "4:+14255550100");
    }

    #[tokio::test]
    async fn participant_operations_use_server_call_routes() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .respond_empty(200)
            .respond_empty(200)
            .respond_empty(200)
            .respond(200, json!([]))
            .respond(
                200,
                json!({"identifier": {"rawId": "8:acs:p1", "communicationUser": {"id": "8:acs:p1"}}}),
            );
        let client = scripted_calling_client(transport.clone());
        let locator = group_call();
        let participant = CommunicationIdentifier::user("8:acs:p1");

        client.remove_participant(&locator, &participant).await.unwrap();
        client
            .hold_participant_meeting_audio(&locator, &participant)
            .await
            .unwrap();
        client
            .resume_participant_meeting_audio(&locator, &participant)
            .await
            .unwrap();
        assert!(client.get_participants(&locator).await.unwrap().is_empty());
        let fetched = client.get_participant(&locator, &participant).await.unwrap();

        assert_eq!(fetched.identifier, participant);
        let paths: Vec<String> = transport
            .requests()
            .iter()
            .map(|r| r.url.path().to_string())
            .collect();
        assert_eq!(
            paths,
            [
                "/calling/serverCalls:removeParticipant",
                "/calling/serverCalls:holdMeetingAudio",
                "/calling/serverCalls:resumeMeetingAudio",
                "/calling/serverCalls:getParticipants",
                "/calling/serverCalls:getParticipant",
            ]
        );
        assert_eq!(
            sent_body(&transport, 3),
            json!({"callLocator": {"kind": "groupCallLocator", "groupCallId": "3f1c5b2a-0000-4000-8000-000000000001"}})
        );
    }

    #[tokio::test]
    async fn play_audio_poller_is_keyed_by_locator() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(202, json!({"operationId": "op7", "status": "running"}));
        let client = scripted_calling_client(transport.clone());

        let operation = client
            .play_audio(
                &CallLocator::server_call("srv1"),
                "https://media.example.com/hold.wav",
                &PlayAudioOptions::default().audio_file_id("hold-music"),
            )
            .await
            .unwrap();

        assert_eq!(operation.resource_id().as_str(), "srv1");
        assert_eq!(operation.status(), OperationStatus::Active);
        let body = sent_body(&transport, 0);
        assert_eq!(body["callLocator"]["kind"], "serverCallLocator");
        assert_eq!(body["audioFileId"], "hold-music");
    }

    #[tokio::test]
    async fn play_audio_to_participant_on_located_call() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(202, json!({"operationId": "op8"}));
        let client = scripted_calling_client(transport.clone());

        let operation = client
            .play_audio_to_participant(
                &group_call(),
                &CommunicationIdentifier::user("8:acs:p1"),
                "https://media.example.com/hold.wav",
                &PlayAudioOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(operation.kind(), PLAY_AUDIO_TO_PARTICIPANT_KIND);
        assert_eq!(
            transport.requests()[0].url.path(),
            "/calling/serverCalls:playAudioToParticipant"
        );
    }

    #[tokio::test]
    async fn cancel_media_operations() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond_empty(200).respond_empty(200);
        let client = scripted_calling_client(transport.clone());
        let locator = group_call();
        let operation_id = OperationId::new("op7");

        client
            .cancel_media_operation(&locator, &operation_id)
            .await
            .unwrap();
        client
            .cancel_participant_media_operation(
                &locator,
                &CommunicationIdentifier::user("8:acs:p1"),
                &operation_id,
            )
            .await
            .unwrap();

        let first = sent_body(&transport, 0);
        assert_eq!(first["mediaOperationId"], "op7");
        assert!(first.get("identifier").is_none());
        let second = sent_body(&transport, 1);
        assert_eq!(second["identifier"]["rawId"], "8:acs:p1");
        assert_eq!(
            transport.requests()[1].url.path(),
            "/calling/serverCalls:cancelParticipantMediaOperation"
        );
    }

    #[tokio::test]
    async fn empty_locator_is_never_sent() {
        let transport = Arc::new(ScriptedTransport::new());
        let client = scripted_calling_client(transport.clone());

        let err = client
            .get_participants(&CallLocator::server_call(""))
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert_eq!(transport.request_count(), 0);
    }
}
