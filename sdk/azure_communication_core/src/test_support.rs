//! Helpers for testing code built on this crate.
//!
//! Enabled for this crate's own tests and, for sibling crates, through the
//! `test-support` feature.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use reqwest::header::HeaderMap;
use wiremock::MockServer;

use crate::auth::CommunicationCredential;
use crate::client::CommunicationClient;
use crate::error::{CommunicationError, CommunicationResult};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, RetryPolicy};

/// Test access key (not a real key).
pub const TEST_API_KEY: &str = "test-key";

/// Endpoint used by clients built on a [`ScriptedTransport`].
pub const TEST_ENDPOINT: &str = "https://test.communication.azure.com";

/// Create a test client connected to a mock server.
///
/// Retries are disabled so error-path tests see exactly one request.
pub async fn setup_mock_client(server: &MockServer) -> CommunicationClient {
    CommunicationClient::builder()
        .endpoint(server.uri())
        .credential(CommunicationCredential::api_key(TEST_API_KEY))
        .retry_policy(RetryPolicy::none())
        .build()
        .unwrap_or_else(|e| panic!("should build client: {e}"))
}

/// Create a test client that sends through `transport`.
pub fn scripted_client(transport: Arc<ScriptedTransport>) -> CommunicationClient {
    CommunicationClient::builder()
        .endpoint(TEST_ENDPOINT)
        .credential(CommunicationCredential::api_key(TEST_API_KEY))
        .transport(transport)
        .build()
        .unwrap_or_else(|e| panic!("should build client: {e}"))
}

/// Transport that answers from a queue of canned responses and records
/// every request it receives.
///
/// Does no I/O, so it works under `tokio::time::pause`.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with a JSON body.
    pub fn respond(&self, status: u16, body: serde_json::Value) -> &Self {
        self.push(status, Bytes::from(body.to_string()))
    }

    /// Queue a response with an empty body.
    pub fn respond_empty(&self, status: u16) -> &Self {
        self.push(status, Bytes::new())
    }

    fn push(&self, status: u16, body: Bytes) -> &Self {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(HttpResponse {
                status,
                headers: HeaderMap::new(),
                body,
            });
        self
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of queued responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait::async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> CommunicationResult<HttpResponse> {
        let path = request.url.path().to_string();
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| {
                CommunicationError::transport(format!("no scripted response left for {path}"))
            })
    }
}
