//! HTTP transport abstraction.
//!
//! The dispatcher knows how to build and interpret requests but never talks
//! to the network itself; it hands an [`HttpRequest`] to an [`HttpTransport`]
//! and gets an [`HttpResponse`] back. Timeouts and retries of transient
//! failures belong to the transport. [`ReqwestTransport`] is the default
//! implementation.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Method;
use url::Url;

use crate::error::CommunicationResult;

/// Default connection timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default read/response timeout (60 seconds).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound on the delay before any retry.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// A fully built HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Create a request without headers or body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// A received HTTP response with its body fully read.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    /// Returns `true` for 2xx status codes.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the value of a header as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Sends requests over the network.
///
/// Implementations must return `Ok` for every response that was received,
/// whatever its status code; `Err` is reserved for failures where no
/// response exists (connection refused, timeout, TLS failure).
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync + std::fmt::Debug {
    /// Send a request and wait for the complete response.
    async fn send(&self, request: HttpRequest) -> CommunicationResult<HttpResponse>;
}

/// Determines if an HTTP status code represents a retriable error.
///
/// Retriable errors are transient server-side issues that may succeed on retry:
/// - 429 Too Many Requests (rate limiting)
/// - 500 Internal Server Error
/// - 502 Bad Gateway
/// - 503 Service Unavailable
/// - 504 Gateway Timeout
#[inline]
pub fn is_retriable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Configuration for automatic retry behavior on transient errors.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (not counting the initial request).
    pub max_retries: u32,
    /// Initial backoff duration before the first retry.
    /// Subsequent retries use exponential backoff (2^attempt * initial_backoff).
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// A policy that sends every request exactly once.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
        }
    }

    /// Backoff before retry number `attempt` (0-based), with ±25% jitter,
    /// capped at [`MAX_BACKOFF`].
    fn backoff(&self, attempt: u32) -> Duration {
        let base_backoff = 2_u32
            .checked_pow(attempt)
            .and_then(|factor| self.initial_backoff.checked_mul(factor))
            .map_or(MAX_BACKOFF, |backoff| backoff.min(MAX_BACKOFF));
        let jitter = 0.75 + fastrand::f64() * 0.5; // 0.75 to 1.25
        base_backoff.mul_f64(jitter).min(MAX_BACKOFF)
    }
}

/// [`HttpTransport`] backed by `reqwest`, retrying transient failures.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    retry_policy: RetryPolicy,
}

impl ReqwestTransport {
    /// Build a transport with the given timeouts.
    pub fn new(
        connect_timeout: Duration,
        read_timeout: Duration,
        retry_policy: RetryPolicy,
    ) -> CommunicationResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .build()?;
        Ok(Self { http, retry_policy })
    }

    /// Wrap an existing `reqwest` client.
    pub fn with_client(http: reqwest::Client, retry_policy: RetryPolicy) -> Self {
        Self { http, retry_policy }
    }

    /// Get the retry policy configuration.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    async fn send_once(&self, request: &HttpRequest) -> CommunicationResult<HttpResponse> {
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> CommunicationResult<HttpResponse> {
        let mut attempt = 0;
        loop {
            let response = self.send_once(&request).await?;

            // Success, non-retriable error, or last attempt - hand it back
            if response.is_success()
                || !is_retriable_status(response.status)
                || attempt >= self.retry_policy.max_retries
            {
                return Ok(response);
            }

            let backoff = self.retry_policy.backoff(attempt);
            tracing::debug!(
                status = response.status,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                "retriable status, backing off"
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }
}
