use std::sync::Arc;

use crate::error::{CommunicationError, CommunicationResult};
use secrecy::{ExposeSecret, SecretString};

/// Environment variable holding an access key.
pub const API_KEY_ENV: &str = "AZURE_COMMUNICATION_API_KEY";

/// Environment variable holding a pre-acquired bearer token.
pub const TOKEN_ENV: &str = "AZURE_COMMUNICATION_TOKEN";

/// Supplies bearer tokens on demand.
///
/// Implement this to plug in any token acquisition mechanism (managed
/// identity, a CLI login, a test double). The SDK calls it once per request
/// and treats the returned token as opaque.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return a bearer token valid for the next request.
    async fn token(&self) -> CommunicationResult<SecretString>;
}

/// Credential types supported by the Azure Communication Services SDK.
#[derive(Clone)]
pub enum CommunicationCredential {
    /// Access key taken from the resource's connection string.
    ApiKey(SecretString),

    /// A fixed bearer token.
    Token(SecretString),

    /// Tokens fetched from a caller-supplied provider.
    Provider(Arc<dyn TokenProvider>),
}

impl CommunicationCredential {
    /// Create a credential from the environment.
    ///
    /// Checks `AZURE_COMMUNICATION_API_KEY` first, then
    /// `AZURE_COMMUNICATION_TOKEN`.
    pub fn from_env() -> CommunicationResult<Self> {
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.is_empty() => Ok(Self::ApiKey(SecretString::from(key))),
            _ => match std::env::var(TOKEN_ENV) {
                Ok(token) if !token.is_empty() => Ok(Self::Token(SecretString::from(token))),
                _ => Err(CommunicationError::Auth(format!(
                    "no credential configured. Set {API_KEY_ENV} or {TOKEN_ENV}."
                ))),
            },
        }
    }

    /// Create an access key credential.
    pub fn api_key(key: impl Into<String>) -> Self {
        Self::ApiKey(SecretString::from(key.into()))
    }

    /// Create a fixed bearer token credential.
    pub fn token(token: impl Into<String>) -> Self {
        Self::Token(SecretString::from(token.into()))
    }

    /// Create a credential backed by a [`TokenProvider`].
    pub fn provider(provider: impl TokenProvider + 'static) -> Self {
        Self::Provider(Arc::new(provider))
    }

    /// Resolve the credential to an authorization header value.
    pub async fn resolve(&self) -> CommunicationResult<String> {
        match self {
            Self::ApiKey(key) => Ok(format!("Bearer {}", key.expose_secret())),
            Self::Token(token) => Ok(format!("Bearer {}", token.expose_secret())),
            Self::Provider(provider) => {
                let token = provider.token().await?;
                if token.expose_secret().is_empty() {
                    return Err(CommunicationError::Auth(
                        "token provider returned an empty token".into(),
                    ));
                }
                Ok(format!("Bearer {}", token.expose_secret()))
            }
        }
    }
}

impl std::fmt::Debug for CommunicationCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => write!(f, "CommunicationCredential::ApiKey(****)"),
            Self::Token(_) => write!(f, "CommunicationCredential::Token(****)"),
            Self::Provider(_) => write!(f, "CommunicationCredential::Provider"),
        }
    }
}

/// Endpoint and access key parsed from a resource connection string.
#[derive(Debug, Clone)]
pub struct ConnectionString {
    /// The resource endpoint, e.g. `https://my-acs.communication.azure.com/`.
    pub endpoint: String,
    /// Credential built from the `accesskey` component.
    pub credential: CommunicationCredential,
}

impl ConnectionString {
    /// Parse `endpoint=<url>;accesskey=<key>`.
    ///
    /// Keys are matched case-insensitively and may appear in any order.
    pub fn parse(connection_string: &str) -> CommunicationResult<Self> {
        let mut endpoint = None;
        let mut access_key = None;

        for part in connection_string.split(';').filter(|p| !p.trim().is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                CommunicationError::MissingConfig(
                    "connection string components must be key=value pairs".into(),
                )
            })?;
            match key.trim().to_ascii_lowercase().as_str() {
                "endpoint" => endpoint = Some(value.trim().to_string()),
                "accesskey" => access_key = Some(value.trim().to_string()),
                _ => {}
            }
        }

        let endpoint = endpoint
            .filter(|e| !e.is_empty())
            .ok_or_else(|| CommunicationError::MissingConfig("connection string has no endpoint".into()))?;
        let access_key = access_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| CommunicationError::MissingConfig("connection string has no accesskey".into()))?;

        Ok(Self {
            endpoint,
            credential: CommunicationCredential::api_key(access_key),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticProvider(&'static str);

    #[async_trait::async_trait]
    impl TokenProvider for StaticProvider {
        async fn token(&self) -> CommunicationResult<SecretString> {
            Ok(SecretString::from(self.0.to_string()))
        }
    }

    #[tokio::test]
    async fn api_key_resolves_to_bearer() {
        let credential = CommunicationCredential::api_key("secret-key");
        assert_eq!(credential.resolve().await.unwrap(), "Bearer secret-key");
    }

    #[tokio::test]
    async fn provider_is_called_per_resolve() {
        let credential = CommunicationCredential::provider(StaticProvider("from-provider"));
        assert_eq!(credential.resolve().await.unwrap(), "Bearer from-provider");
    }

    #[tokio::test]
    async fn empty_provider_token_is_rejected() {
        let credential = CommunicationCredential::provider(StaticProvider(""));
        let err = credential.resolve().await.unwrap_err();
        assert!(matches!(err, CommunicationError::Auth(_)));
    }

    #[test]
    fn debug_redacts_secrets() {
        let credential = CommunicationCredential::api_key("super-secret");
        let debug = format!("{credential:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("****"));
    }

    #[test]
    fn parses_connection_string() {
        let parsed =
            ConnectionString::parse("endpoint=https://test.communication.azure.com/;accesskey=1234")
                .expect("should parse");
        assert_eq!(parsed.endpoint, "https://test.communication.azure.com/");
        assert!(matches!(parsed.credential, CommunicationCredential::ApiKey(_)));
    }

    #[test]
    fn connection_string_keys_are_case_insensitive() {
        let parsed =
            ConnectionString::parse("AccessKey=abc;Endpoint=https://x.communication.azure.com/;")
                .expect("should parse");
        assert_eq!(parsed.endpoint, "https://x.communication.azure.com/");
    }

    #[test]
    fn connection_string_requires_access_key() {
        let err = ConnectionString::parse("endpoint=https://x.communication.azure.com/")
            .unwrap_err();
        assert!(matches!(err, CommunicationError::MissingConfig(_)));
    }

    #[test]
    fn connection_string_rejects_garbage() {
        let err = ConnectionString::parse("not a connection string").unwrap_err();
        assert!(matches!(err, CommunicationError::MissingConfig(_)));
    }
}
