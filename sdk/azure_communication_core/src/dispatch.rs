//! Route-table-driven operation dispatch.
//!
//! A resource group (call connections, server calls, recordings) is a set of
//! [`Route`]s. [`OperationDispatcher`] turns a route, an optional
//! [`ResourceId`] and typed parameters into a request, sends it through the
//! client's transport and decodes the answer.
//!
//! Every invocation follows the same steps:
//!
//! 1. validate the parameters ([`OperationParameters::validate`]);
//! 2. substitute the percent-encoded resource id into the route template;
//! 3. serialize the body, send once, and map non-2xx to
//!    [`CommunicationError::Service`];
//! 4. decode the body into the result type (`()` for empty bodies).

use bytes::Bytes;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::CommunicationClient;
use crate::error::{CommunicationError, CommunicationResult};
use crate::models::ResourceId;
use crate::transport::HttpResponse;

const ID_PLACEHOLDER: &str = "{id}";

/// A single REST operation in a route table.
#[derive(Debug, Clone)]
pub struct Route {
    /// Operation name, used in logs and errors.
    pub name: &'static str,
    /// HTTP method.
    pub method: Method,
    /// Path relative to the endpoint, with at most one `{id}` placeholder.
    pub template: &'static str,
}

impl Route {
    /// Declare a route.
    pub const fn new(name: &'static str, method: Method, template: &'static str) -> Self {
        Self {
            name,
            method,
            template,
        }
    }

    /// Returns `true` if the template needs a resource id.
    pub fn needs_id(&self) -> bool {
        self.template.contains(ID_PLACEHOLDER)
    }

    /// Resolve the template into a path.
    ///
    /// # Errors
    ///
    /// Returns [`CommunicationError::Validation`] if the template has an
    /// `{id}` placeholder and `id` is missing or empty.
    pub fn resolve(&self, id: Option<&ResourceId>) -> CommunicationResult<String> {
        if !self.needs_id() {
            return Ok(self.template.to_string());
        }

        let id = id.ok_or_else(|| {
            CommunicationError::validation(format!("`{}` requires a resource id", self.name))
        })?;
        if id.as_str().trim().is_empty() {
            return Err(CommunicationError::validation(format!(
                "`{}`: resource id must not be empty",
                self.name
            )));
        }

        Ok(self
            .template
            .replacen(ID_PLACEHOLDER, &urlencoding::encode(id.as_str()), 1))
    }
}

/// Typed parameters of one operation.
///
/// Implementors are plain request structs; `validate` checks what the type
/// system cannot (non-empty strings, mutually exclusive fields).
pub trait OperationParameters: Serialize + Send + Sync {
    /// Check the parameters before anything is sent.
    fn validate(&self) -> CommunicationResult<()> {
        Ok(())
    }
}

/// Fail with a validation error naming `field` if `value` is blank.
pub fn ensure_not_empty(field: &str, value: &str) -> CommunicationResult<()> {
    if value.trim().is_empty() {
        return Err(CommunicationError::validation(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}

/// Decode a response body, treating an empty body as JSON `null`.
///
/// This lets `()` and `Option<T>` results accept `204 No Content` while
/// struct results still report a missing body as a deserialization error.
pub fn decode<R: DeserializeOwned>(body: &[u8]) -> CommunicationResult<R> {
    let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        body
    };
    serde_json::from_slice(body).map_err(CommunicationError::deserialization)
}

/// Sends the operations of one resource group.
///
/// Cheap to clone; clones share the underlying client pipeline.
#[derive(Debug, Clone)]
pub struct OperationDispatcher {
    client: CommunicationClient,
    group: &'static str,
}

impl OperationDispatcher {
    /// Bind a dispatcher to a resource group.
    pub fn new(client: CommunicationClient, group: &'static str) -> Self {
        Self { client, group }
    }

    /// The resource group name.
    pub fn group(&self) -> &'static str {
        self.group
    }

    /// The underlying client.
    pub fn client(&self) -> &CommunicationClient {
        &self.client
    }

    /// Invoke a route with a JSON body and decode the response.
    pub async fn call<P, R>(
        &self,
        route: &Route,
        id: Option<&ResourceId>,
        params: &P,
    ) -> CommunicationResult<R>
    where
        P: OperationParameters,
        R: DeserializeOwned,
    {
        params.validate()?;
        let body = Bytes::from(serde_json::to_vec(params)?);
        let response = self.send(route, id, Some(body)).await?;
        decode(&response.body)
    }

    /// Invoke a route without a body and decode the response.
    pub async fn invoke<R>(&self, route: &Route, id: Option<&ResourceId>) -> CommunicationResult<R>
    where
        R: DeserializeOwned,
    {
        let response = self.send(route, id, None).await?;
        decode(&response.body)
    }

    /// Invoke a route and return the raw successful response.
    #[tracing::instrument(
        name = "communication::dispatch",
        skip(self, route, id, body),
        fields(
            group = self.group,
            route = route.name,
            resource_id = id.map(ResourceId::as_str),
        )
    )]
    pub async fn send(
        &self,
        route: &Route,
        id: Option<&ResourceId>,
        body: Option<Bytes>,
    ) -> CommunicationResult<HttpResponse> {
        let path = route.resolve(id)?;
        let url = self.client.url(&path)?;
        tracing::debug!(method = %route.method, %url, "sending request");

        let response = self
            .client
            .execute(route.method.clone(), url, body)
            .await
            .inspect_err(|e| tracing::debug!(error = %e, "request failed"))?;

        tracing::debug!(status = response.status, "request succeeded");
        Ok(response)
    }
}
