//! Call locators.

use azure_communication_core::dispatch::ensure_not_empty;
use azure_communication_core::error::CommunicationResult;
use azure_communication_core::models::ResourceId;
use serde::{Deserialize, Serialize};

/// Addresses an existing call without a call connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum CallLocator {
    /// A group call, addressed by the group id chosen by its creator.
    #[serde(rename = "groupCallLocator", rename_all = "camelCase")]
    GroupCall { group_call_id: String },

    /// A call addressed by its server call id.
    #[serde(rename = "serverCallLocator", rename_all = "camelCase")]
    ServerCall { server_call_id: String },
}

impl CallLocator {
    pub fn group_call(group_call_id: impl Into<String>) -> Self {
        Self::GroupCall {
            group_call_id: group_call_id.into(),
        }
    }

    pub fn server_call(server_call_id: impl Into<String>) -> Self {
        Self::ServerCall {
            server_call_id: server_call_id.into(),
        }
    }

    /// The group or server call id.
    pub fn id(&self) -> &str {
        match self {
            Self::GroupCall { group_call_id } => group_call_id,
            Self::ServerCall { server_call_id } => server_call_id,
        }
    }

    /// The locator id as a resource id, for operation tracking.
    pub fn resource_id(&self) -> ResourceId {
        ResourceId::new(self.id())
    }

    pub(crate) fn validate(&self) -> CommunicationResult<()> {
        ensure_not_empty("call_locator", self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn group_call_wire_shape() {
        let locator = CallLocator::group_call("3f1c5b2a-0000-4000-8000-000000000001");
        assert_eq!(
            serde_json::to_value(&locator).unwrap(),
            json!({"kind": "groupCallLocator", "groupCallId": "3f1c5b2a-0000-4000-8000-000000000001"})
        );
    }

    #[test]
    fn server_call_parses() {
        let locator: CallLocator =
            serde_json::from_value(json!({"kind": "serverCallLocator", "serverCallId": "aHR0cHM6"}))
                .unwrap();
        assert_eq!(locator, CallLocator::server_call("aHR0cHM6"));
        assert_eq!(locator.id(), "aHR0cHM6");
    }

    #[test]
    fn empty_locator_is_invalid() {
        assert!(CallLocator::group_call("").validate().unwrap_err().is_validation());
    }
}
