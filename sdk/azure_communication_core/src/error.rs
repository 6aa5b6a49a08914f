use std::time::Duration;

use thiserror::Error;

/// Boxed error produced by an [`HttpTransport`](crate::transport::HttpTransport).
pub type BoxedTransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur when interacting with an Azure Communication Services API.
#[derive(Error, Debug)]
pub enum CommunicationError {
    /// Operation parameters were missing or malformed. Nothing was sent.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The service answered with a non-success status code.
    #[error("Service error ({status}, {code}): {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    /// A response body did not match the expected shape.
    #[error("Deserialization error{}: {}", field_suffix(.field), .message)]
    Deserialization {
        field: Option<String>,
        message: String,
    },

    /// The resource was invalidated by a terminal operation.
    #[error("Resource is gone: {resource_id}")]
    ResourceGone { resource_id: String },

    /// A blocking wait exceeded its maximum duration.
    #[error("Operation timed out after {waited:?}")]
    Timeout { waited: Duration },

    /// A blocking wait was cancelled by the caller.
    #[error("Wait cancelled")]
    Cancelled,

    /// The transport failed before a response was received.
    #[error("Transport error: {0}")]
    Transport(#[source] BoxedTransportError),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The request payload could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The endpoint URL is invalid.
    #[error("Invalid endpoint URL: {message}")]
    InvalidEndpoint {
        message: String,
        #[source]
        source: Option<url::ParseError>,
    },

    /// A required configuration value is missing.
    #[error("Missing configuration: {0}")]
    MissingConfig(String),
}

impl CommunicationError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a service error from a status code alone.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Service {
            status,
            code: "unknown".into(),
            message: message.into(),
        }
    }

    /// Create a service error with an error code taken from the response body.
    pub fn service(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create an invalid endpoint error that keeps the URL parse error.
    pub fn invalid_endpoint_with_source(msg: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidEndpoint {
            message: msg.into(),
            source: Some(source),
        }
    }

    /// Create an invalid endpoint error.
    pub fn invalid_endpoint(msg: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            message: msg.into(),
            source: None,
        }
    }

    /// Wrap an arbitrary transport failure.
    pub fn transport(err: impl Into<BoxedTransportError>) -> Self {
        Self::Transport(err.into())
    }

    /// Create an error for an operation attempted on an invalidated resource.
    pub fn resource_gone(resource_id: impl Into<String>) -> Self {
        Self::ResourceGone {
            resource_id: resource_id.into(),
        }
    }

    /// Convert a response decoding failure, extracting the offending field name.
    ///
    /// serde_json reports a missing required field as ``missing field `name` ``.
    pub fn deserialization(err: serde_json::Error) -> Self {
        let message = err.to_string();
        let field = message
            .strip_prefix("missing field `")
            .and_then(|rest| rest.split('`').next())
            .map(str::to_string);
        Self::Deserialization { field, message }
    }

    /// Returns the HTTP status code for [`Service`](Self::Service) errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` for errors a caller can fix by changing the input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

fn field_suffix(field: &Option<String>) -> String {
    field
        .as_deref()
        .map(|f| format!(" at field `{f}`"))
        .unwrap_or_default()
}

impl From<reqwest::Error> for CommunicationError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}

/// Result type alias for Azure Communication Services operations.
pub type CommunicationResult<T> = std::result::Result<T, CommunicationError>;
