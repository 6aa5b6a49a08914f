//! The top-level calling server client.

use azure_communication_core::client::CommunicationClient;
use azure_communication_core::dispatch::OperationDispatcher;
use azure_communication_core::error::CommunicationResult;
use azure_communication_core::lro::{LongRunningOperation, NotificationOnly, RouteStatusSource};
use azure_communication_core::models::{
    AcceptedOperation, OperationId, OperationStatus, ResourceId,
};

use crate::call_connection::{CallConnection, CreateCallRequest};
use crate::models::CallConnectionCreated;
use crate::routes::{self, group};

/// How pollers returned by media and transfer operations learn about progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OperationTracking {
    /// Poll the operation status route; notifications are applied as well.
    #[default]
    Poll,
    /// Never poll; only callback notifications advance the operation.
    NotificationsOnly,
}

/// Entry point to the calling server API.
///
/// Creates [`CallConnection`]s and runs the operations that address a call
/// by [`CallLocator`](crate::locator::CallLocator) or recording id.
///
/// Cheap to clone; clones share the same client pipeline.
///
/// ```rust,no_run
/// use azure_communication_callingserver::CallingServerClient;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = CallingServerClient::from_connection_string(
///     "endpoint=https://your-resource.communication.azure.com/;accesskey=your-key",
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CallingServerClient {
    client: CommunicationClient,
    pub(crate) call_connections: OperationDispatcher,
    pub(crate) server_calls: OperationDispatcher,
    pub(crate) recordings: OperationDispatcher,
    operations: OperationDispatcher,
    tracking: OperationTracking,
}

impl CallingServerClient {
    /// Wrap a configured [`CommunicationClient`].
    pub fn new(client: CommunicationClient) -> Self {
        Self {
            call_connections: OperationDispatcher::new(client.clone(), group::CALL_CONNECTIONS),
            server_calls: OperationDispatcher::new(client.clone(), group::SERVER_CALLS),
            recordings: OperationDispatcher::new(client.clone(), group::RECORDINGS),
            operations: OperationDispatcher::new(client.clone(), group::OPERATIONS),
            client,
            tracking: OperationTracking::default(),
        }
    }

    /// Build a client from `endpoint=...;accesskey=...`.
    pub fn from_connection_string(connection_string: &str) -> CommunicationResult<Self> {
        CommunicationClient::from_connection_string(connection_string).map(Self::new)
    }

    /// Choose how pollers returned by this client track progress.
    pub fn with_operation_tracking(mut self, tracking: OperationTracking) -> Self {
        self.tracking = tracking;
        self
    }

    /// The underlying client pipeline.
    pub fn communication_client(&self) -> &CommunicationClient {
        &self.client
    }

    /// The tracking mode of pollers returned by this client.
    pub fn operation_tracking(&self) -> OperationTracking {
        self.tracking
    }

    /// Create an outbound call and return a connection bound to it.
    ///
    /// # Errors
    ///
    /// Returns a validation error for invalid parameters, or the service
    /// error if the call could not be created.
    #[tracing::instrument(
        name = "communication::calling_server::create_call_connection",
        skip(self, request),
        fields(targets = request.targets.len())
    )]
    pub async fn create_call_connection(
        &self,
        request: &CreateCallRequest,
    ) -> CommunicationResult<CallConnection> {
        tracing::debug!("creating call connection");

        let created: CallConnectionCreated = self
            .call_connections
            .call(&routes::CREATE_CALL, None, request)
            .await?;

        tracing::debug!(call_connection_id = %created.call_connection_id, "call connection created");
        Ok(self.get_call_connection(created.call_connection_id))
    }

    /// Bind a connection to an existing call connection id.
    ///
    /// No request is made; the result behaves exactly like the connection
    /// returned by [`create_call_connection`](Self::create_call_connection).
    pub fn get_call_connection(&self, call_connection_id: impl Into<ResourceId>) -> CallConnection {
        CallConnection::new(call_connection_id.into(), self.clone())
    }

    /// Start tracking an operation the service accepted.
    ///
    /// Depending on [`OperationTracking`], the poller queries the operation
    /// status route or waits for notifications only.
    pub fn track_operation(
        &self,
        resource_id: impl Into<ResourceId>,
        operation_id: impl Into<OperationId>,
        kind: &'static str,
        initial: OperationStatus,
    ) -> LongRunningOperation {
        let operation_id = operation_id.into();
        match self.tracking {
            OperationTracking::Poll => {
                let source = RouteStatusSource::new(
                    self.operations.clone(),
                    routes::GET_OPERATION_STATUS,
                    operation_id.as_str(),
                );
                LongRunningOperation::new(resource_id, operation_id, kind, initial, source)
            }
            OperationTracking::NotificationsOnly => {
                LongRunningOperation::new(resource_id, operation_id, kind, initial, NotificationOnly)
            }
        }
    }

    /// Start tracking the operation described by an accepted response.
    pub(crate) fn track_accepted(
        &self,
        resource_id: impl Into<ResourceId>,
        accepted: AcceptedOperation,
        kind: &'static str,
    ) -> LongRunningOperation {
        tracing::debug!(operation_id = %accepted.operation_id, kind, "operation accepted");
        self.track_operation(
            resource_id,
            accepted.operation_id,
            kind,
            accepted.status.unwrap_or(OperationStatus::Pending),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::CommunicationIdentifier;
    use crate::models::CallMediaType;
    use crate::test_utils::{setup_mock_client, TEST_CALLBACK_URI};
    use azure_communication_core::test_support::{scripted_client, ScriptedTransport};
    use azure_communication_core::CommunicationError;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_request() -> CreateCallRequest {
        CreateCallRequest::builder()
            .source(CommunicationIdentifier::user("8:acs:source"))
            .target(CommunicationIdentifier::user("8:acs:target"))
            .callback_uri(TEST_CALLBACK_URI)
            .requested_media_type(CallMediaType::Audio)
            .build()
            .expect("valid request")
    }

    #[tokio::test]
    async fn create_call_connection_binds_returned_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calling/callConnections"))
            .and(body_partial_json(json!({
                "callbackUri": TEST_CALLBACK_URI,
                "requestedMediaTypes": ["audio"],
                "targets": [{"rawId": "8:acs:target", "communicationUser": {"id": "8:acs:target"}}]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "abc123"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let connection = client
            .create_call_connection(&create_request())
            .await
            .expect("should create");

        assert_eq!(connection.call_connection_id().as_str(), "abc123");
    }

    #[tokio::test]
    async fn create_call_connection_surfaces_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calling/callConnections"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": "InvalidTarget", "message": "target is not reachable"}
            })))
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let err = client
            .create_call_connection(&create_request())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CommunicationError::Service { status: 400, ref code, .. } if code == "InvalidTarget"
        ));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn create_call_connection_emits_span() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calling/callConnections"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "abc123"})))
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        client.create_call_connection(&create_request()).await.unwrap();

        assert!(logs_contain("communication::calling_server::create_call_connection"));
        assert!(logs_contain("call connection created"));
    }

    #[test]
    fn get_call_connection_makes_no_request() {
        let transport = Arc::new(ScriptedTransport::new());
        let client = CallingServerClient::new(scripted_client(transport.clone()));

        let connection = client.get_call_connection("abc123");

        assert_eq!(connection.call_connection_id().as_str(), "abc123");
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn track_operation_polls_operation_route() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(200, json!({"status": "running"}));
        let client = CallingServerClient::new(scripted_client(transport.clone()));

        let operation =
            client.track_operation("abc123", "op1", "play_audio", OperationStatus::Pending);
        assert_eq!(operation.poll().await.unwrap(), OperationStatus::Active);
        assert_eq!(transport.requests()[0].url.path(), "/calling/operations/op1");
    }

    #[tokio::test]
    async fn notification_only_tracking_never_polls() {
        let transport = Arc::new(ScriptedTransport::new());
        let client = CallingServerClient::new(scripted_client(transport.clone()))
            .with_operation_tracking(OperationTracking::NotificationsOnly);

        let operation =
            client.track_operation("abc123", "op1", "play_audio", OperationStatus::Pending);
        assert_eq!(operation.poll().await.unwrap(), OperationStatus::Pending);
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn from_connection_string() {
        let client = CallingServerClient::from_connection_string(
            "endpoint=https://test.communication.azure.com/;accesskey=1234",
        )
        .expect("should build");
        assert_eq!(
            client.communication_client().endpoint().as_str(),
            "https://test.communication.azure.com/"
        );
        assert_eq!(client.operation_tracking(), OperationTracking::Poll);
    }
}
