#![doc = include_str!("../README.md")]

pub mod auth;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod lro;
pub mod models;
pub mod transport;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::{CommunicationError, CommunicationResult};

// Re-exported so callers of `wait_until_terminal` need not depend on tokio-util.
pub use tokio_util::sync::CancellationToken;
