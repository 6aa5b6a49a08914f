//! Shared model types for Azure Communication Services clients.
//!
//! This module holds the identifier newtypes, the [`wire_enum!`](crate::wire_enum)
//! macro used for forward-compatible string enums, and the lifecycle status of
//! long-running operations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declare a string enum that tolerates values added by the service later.
///
/// Each variant maps to one canonical wire string (used when serializing) and
/// any number of aliases accepted when deserializing. Unknown strings
/// deserialize into `Unrecognized(String)` and serialize back unchanged.
///
/// ```rust
/// azure_communication_core::wire_enum! {
///     /// The media of a call.
///     pub enum Media {
///         /// Audio only.
///         Audio => "audio",
///         /// Audio and video.
///         Video => "video" | "audioVideo",
///     }
/// }
///
/// let media: Media = serde_json::from_str("\"audioVideo\"").unwrap();
/// assert_eq!(media, Media::Video);
///
/// let future: Media = serde_json::from_str("\"hologram\"").unwrap();
/// assert_eq!(future, Media::Unrecognized("hologram".into()));
/// assert_eq!(serde_json::to_string(&future).unwrap(), "\"hologram\"");
/// ```
#[macro_export]
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $wire:literal $(| $alias:literal)*
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
            /// A value not known to this version of the SDK.
            Unrecognized(String),
        }

        impl $name {
            /// Returns the wire representation of this value.
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $wire,)+
                    Self::Unrecognized(raw) => raw.as_str(),
                }
            }

            /// Returns `true` if the value was not recognised by this SDK version.
            pub fn is_unrecognized(&self) -> bool {
                matches!(self, Self::Unrecognized(_))
            }
        }

        impl ::std::convert::From<&str> for $name {
            fn from(raw: &str) -> Self {
                match raw {
                    $($wire $(| $alias)* => Self::$variant,)+
                    other => Self::Unrecognized(other.to_string()),
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> ::std::result::Result<Self, D::Error> {
                let raw = <::std::borrow::Cow<'de, str> as ::serde::Deserialize>::deserialize(deserializer)?;
                Ok(Self::from(raw.as_ref()))
            }
        }
    };
}

/// Opaque identifier of a remote resource (a call connection, a recording, ...).
///
/// Issued by the service and never modified by the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Wrap an identifier issued by the service.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Server-assigned identifier of an asynchronous operation.
///
/// Doubles as the correlation identifier carried by callback notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    /// Wrap an operation identifier issued by the service.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OperationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for OperationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

wire_enum! {
    /// Lifecycle status of a long-running operation.
    ///
    /// The service is not consistent about spelling across operation kinds, so
    /// the common synonyms are accepted on the wire.
    pub enum OperationStatus {
        /// Accepted by the service, not started yet.
        Pending => "pending" | "notStarted" | "accepted",
        /// Running.
        Active => "active" | "running" | "inProgress",
        /// Completed successfully.
        Succeeded => "succeeded" | "completed",
        /// Completed with a failure.
        Failed => "failed",
        /// Cancelled before completion.
        Canceled => "canceled" | "cancelled",
    }
}

impl OperationStatus {
    /// Returns `true` if no further transition can happen from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    /// Position in the forward-only lifecycle, `None` for unrecognized values.
    pub(crate) fn rank(&self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Active => Some(1),
            Self::Succeeded | Self::Failed | Self::Canceled => Some(2),
            Self::Unrecognized(_) => None,
        }
    }
}

/// Body of a status-retrieval endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatusBody {
    /// Current status reported by the service.
    pub status: OperationStatus,
}

/// Body returned when the service accepts an asynchronous operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedOperation {
    /// Identifier of the accepted operation.
    pub operation_id: OperationId,

    /// Initial status, when the service reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OperationStatus>,
}
