//! Control plane and invocation API traits
//!
//! These are the collaborator contracts the engine consumes. A concrete
//! implementation wraps a cloud SDK client; tests use in-memory fakes.

use crate::error::Result;
use crate::state::{
    Endpoint, EndpointRevision, Page, RemoteRuntime, RuntimeRevision, RuntimeSummary,
    VersionSummary,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

/// Resource control API for a single kind of managed runtime
///
/// Implementations map "resource does not exist" to `CloudError::NotFound`
/// and permission failures to `CloudError::AccessDenied`; everything else is
/// `CloudError::Remote`. No implementation retries.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// One page of the runtime listing
    async fn list_runtimes(&self, next_token: Option<String>) -> Result<Page<RuntimeSummary>>;

    /// Full state of a runtime at a literal version
    async fn get_runtime(&self, id: &str, version: &str) -> Result<RemoteRuntime>;

    async fn create_runtime(&self, request: &CreateRuntimeRequest) -> Result<RuntimeRevision>;

    async fn update_runtime(&self, request: &UpdateRuntimeRequest) -> Result<RuntimeRevision>;

    async fn delete_runtime(&self, id: &str) -> Result<()>;

    /// One page of the version listing of a runtime
    async fn list_runtime_versions(
        &self,
        id: &str,
        next_token: Option<String>,
    ) -> Result<Page<VersionSummary>>;

    /// One page of the endpoint listing of a runtime
    async fn list_endpoints(&self, id: &str, next_token: Option<String>)
    -> Result<Page<Endpoint>>;

    async fn get_endpoint(&self, id: &str, name: &str) -> Result<Endpoint>;

    async fn create_endpoint(&self, request: &EndpointRequest) -> Result<EndpointRevision>;

    async fn update_endpoint(&self, request: &EndpointRequest) -> Result<EndpointRevision>;

    async fn delete_endpoint(&self, id: &str, name: &str) -> Result<()>;
}

/// Create call payload: the full definition in wire format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRuntimeRequest {
    pub document: serde_json::Value,
}

/// Update call payload: target identifier plus the full definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRuntimeRequest {
    pub runtime_id: String,
    pub document: serde_json::Value,
}

/// Endpoint create/update payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRequest {
    pub runtime_id: String,
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Session and distributed-tracing headers carried by an invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationHeaders {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_protocol_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baggage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_state: Option<String>,
}

impl InvocationHeaders {
    /// Present headers as `(name, value)` pairs, in a stable order
    pub fn present(&self) -> Vec<(&'static str, &str)> {
        [
            ("mcp_protocol_version", &self.mcp_protocol_version),
            ("mcp_session_id", &self.mcp_session_id),
            ("runtime_session_id", &self.runtime_session_id),
            ("runtime_user_id", &self.runtime_user_id),
            ("baggage", &self.baggage),
            ("trace_id", &self.trace_id),
            ("trace_parent", &self.trace_parent),
            ("trace_state", &self.trace_state),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
    }
}

/// A single invocation of a deployed runtime
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeRequest {
    pub runtime_arn: String,
    pub qualifier: String,
    pub payload: Vec<u8>,
    pub content_type: String,
    pub accept: String,
    pub headers: InvocationHeaders,
}

/// Invocation response with a streamed body
pub struct InvokeResponse {
    pub status_code: i32,
    pub content_type: Option<String>,
    /// Tracing and session headers echoed back by the runtime
    pub headers: InvocationHeaders,
    pub body: Box<dyn AsyncRead + Send + Unpin>,
}

impl std::fmt::Debug for InvokeResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvokeResponse")
            .field("status_code", &self.status_code)
            .field("content_type", &self.content_type)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Data plane API used to invoke a deployed runtime
#[async_trait]
pub trait InvokeApi: Send + Sync {
    async fn invoke(&self, request: InvokeRequest) -> Result<InvokeResponse>;
}
