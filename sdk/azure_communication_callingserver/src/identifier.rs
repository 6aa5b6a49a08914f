//! Communication identifiers.
//!
//! A participant in a call is one of a small set of identity kinds. On the
//! wire each kind is a sub-object of [`CommunicationIdentifierModel`]
//! alongside a `rawId`; in Rust it is the closed enum
//! [`CommunicationIdentifier`].

use azure_communication_core::dispatch::ensure_not_empty;
use azure_communication_core::error::{CommunicationError, CommunicationResult};
use azure_communication_core::wire_enum;
use serde::{Deserialize, Serialize};

wire_enum! {
    /// The cloud a Microsoft Teams user belongs to.
    pub enum CommunicationCloudEnvironment {
        Public => "public",
        Dod => "dod",
        Gcch => "gcch",
    }
}

/// Identity of a call participant.
///
/// Serializes through [`CommunicationIdentifierModel`]. A wire payload with
/// no recognised sub-object parses as [`Unknown`](Self::Unknown) carrying
/// the raw id, and is rejected if that raw id is missing or empty.
///
/// `raw_id` holds only a raw id that differs from the one derived from the
/// other fields, so a value survives a serialize/deserialize round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    try_from = "CommunicationIdentifierModel",
    into = "CommunicationIdentifierModel"
)]
pub enum CommunicationIdentifier {
    /// An Azure Communication Services user.
    CommunicationUser { id: String },

    /// A phone number in E.164 format.
    PhoneNumber {
        value: String,
        raw_id: Option<String>,
    },

    /// A Microsoft Teams user.
    MicrosoftTeamsUser {
        user_id: String,
        is_anonymous: bool,
        cloud: CommunicationCloudEnvironment,
        raw_id: Option<String>,
    },

    /// An identifier of a kind this SDK version does not know.
    Unknown { id: String },
}

impl CommunicationIdentifier {
    /// An Azure Communication Services user.
    pub fn user(id: impl Into<String>) -> Self {
        Self::CommunicationUser { id: id.into() }
    }

    /// A phone number, e.g. `+14255550123`.
    pub fn phone_number(value: impl Into<String>) -> Self {
        Self::PhoneNumber {
            value: value.into(),
            raw_id: None,
        }
    }

    /// A Microsoft Teams user in the public cloud.
    pub fn teams_user(user_id: impl Into<String>) -> Self {
        Self::MicrosoftTeamsUser {
            user_id: user_id.into(),
            is_anonymous: false,
            cloud: CommunicationCloudEnvironment::Public,
            raw_id: None,
        }
    }

    /// The raw id, as the service would report it.
    pub fn raw_id(&self) -> String {
        match self {
            Self::PhoneNumber {
                raw_id: Some(raw_id),
                ..
            }
            | Self::MicrosoftTeamsUser {
                raw_id: Some(raw_id),
                ..
            } => raw_id.clone(),
            _ => self.derived_raw_id(),
        }
    }

    fn derived_raw_id(&self) -> String {
        match self {
            Self::CommunicationUser { id } | Self::Unknown { id } => id.clone(),
            Self::PhoneNumber { value, .. } => format!("4:{value}"),
            Self::MicrosoftTeamsUser {
                user_id,
                is_anonymous,
                cloud,
                ..
            } => {
                let prefix = match (is_anonymous, cloud) {
                    (true, _) => "8:teamsvisitor:",
                    (false, CommunicationCloudEnvironment::Dod) => "8:dod:",
                    (false, CommunicationCloudEnvironment::Gcch) => "8:gcch:",
                    (false, _) => "8:orgid:",
                };
                format!("{prefix}{user_id}")
            }
        }
    }

    /// Keep `raw_id` only where it differs from the derived one.
    fn with_raw_id(mut self, wire_raw_id: Option<String>) -> Self {
        let derived = self.derived_raw_id();
        if let Self::PhoneNumber { raw_id, .. } | Self::MicrosoftTeamsUser { raw_id, .. } =
            &mut self
        {
            *raw_id = wire_raw_id.filter(|id| *id != derived);
        }
        self
    }

    /// Returns `true` for [`PhoneNumber`](Self::PhoneNumber).
    pub fn is_phone_number(&self) -> bool {
        matches!(self, Self::PhoneNumber { .. })
    }

    /// Check that the identifier carries a non-empty id.
    pub fn validate(&self, field: &str) -> CommunicationResult<()> {
        let value = match self {
            Self::CommunicationUser { id } | Self::Unknown { id } => id,
            Self::PhoneNumber { value, .. } => value,
            Self::MicrosoftTeamsUser { user_id, .. } => user_id,
        };
        ensure_not_empty(field, value)
    }

    /// Check that the identifier is a valid phone number.
    pub(crate) fn validate_phone_number(&self, field: &str) -> CommunicationResult<()> {
        if !self.is_phone_number() {
            return Err(CommunicationError::validation(format!(
                "{field} must be a phone number"
            )));
        }
        self.validate(field)
    }
}

// ---------------------------------------------------------------------------
// Wire model
// ---------------------------------------------------------------------------

/// Wire form of an ACS user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunicationUserIdentifierModel {
    pub id: String,
}

/// Wire form of a phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumberIdentifierModel {
    pub value: String,
}

/// Wire form of a Teams user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicrosoftTeamsUserIdentifierModel {
    pub user_id: String,
    #[serde(default)]
    pub is_anonymous: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud: Option<CommunicationCloudEnvironment>,
}

/// Wire form of any identifier: a raw id plus at most one typed sub-object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationIdentifierModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communication_user: Option<CommunicationUserIdentifierModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<PhoneNumberIdentifierModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub microsoft_teams_user: Option<MicrosoftTeamsUserIdentifierModel>,
}

impl TryFrom<CommunicationIdentifierModel> for CommunicationIdentifier {
    type Error = CommunicationError;

    fn try_from(model: CommunicationIdentifierModel) -> CommunicationResult<Self> {
        let CommunicationIdentifierModel {
            raw_id,
            communication_user,
            phone_number,
            microsoft_teams_user,
        } = model;

        if let Some(user) = communication_user {
            return Ok(Self::CommunicationUser { id: user.id });
        }
        if let Some(phone) = phone_number {
            return Ok(Self::phone_number(phone.value).with_raw_id(raw_id));
        }
        if let Some(teams) = microsoft_teams_user {
            let identifier = Self::MicrosoftTeamsUser {
                user_id: teams.user_id,
                is_anonymous: teams.is_anonymous,
                cloud: teams
                    .cloud
                    .unwrap_or(CommunicationCloudEnvironment::Public),
                raw_id: None,
            };
            return Ok(identifier.with_raw_id(raw_id));
        }
        match raw_id {
            Some(id) if !id.trim().is_empty() => Ok(Self::Unknown { id }),
            _ => Err(CommunicationError::Deserialization {
                field: Some("rawId".into()),
                message: "identifier has no known kind and no raw id".into(),
            }),
        }
    }
}

impl From<CommunicationIdentifier> for CommunicationIdentifierModel {
    fn from(identifier: CommunicationIdentifier) -> Self {
        let raw_id = Some(identifier.raw_id());
        match identifier {
            CommunicationIdentifier::CommunicationUser { id } => Self {
                raw_id,
                communication_user: Some(CommunicationUserIdentifierModel { id }),
                ..Default::default()
            },
            CommunicationIdentifier::PhoneNumber { value, .. } => Self {
                raw_id,
                phone_number: Some(PhoneNumberIdentifierModel { value }),
                ..Default::default()
            },
            CommunicationIdentifier::MicrosoftTeamsUser {
                user_id,
                is_anonymous,
                cloud,
                ..
            } => Self {
                raw_id,
                microsoft_teams_user: Some(MicrosoftTeamsUserIdentifierModel {
                    user_id,
                    is_anonymous,
                    cloud: Some(cloud),
                }),
                ..Default::default()
            },
            CommunicationIdentifier::Unknown { .. } => Self {
                raw_id,
                ..Default::default()
            },
        }
    }
}
