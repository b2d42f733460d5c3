//! Point-in-time views of remote entities
//!
//! Everything here is a read result. Nothing is cached across calls except the
//! name directory kept by the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Endpoint name owned by the control plane itself; never created, updated or
/// deleted by a workflow.
pub const DEFAULT_ENDPOINT_NAME: &str = "DEFAULT";

/// Endpoint used when the caller does not name one
pub const CURRENT_ENDPOINT_NAME: &str = "current";

pub fn is_reserved_endpoint(name: &str) -> bool {
    name == DEFAULT_ENDPOINT_NAME
}

/// Lifecycle status shared by runtimes, versions and endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuntimeStatus {
    Creating,
    CreateFailed,
    Updating,
    UpdateFailed,
    Ready,
    Deleting,
    #[serde(other)]
    Unknown,
}

impl RuntimeStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, RuntimeStatus::Ready)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RuntimeStatus::CreateFailed | RuntimeStatus::UpdateFailed)
    }
}

impl std::fmt::Display for RuntimeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeStatus::Creating => write!(f, "CREATING"),
            RuntimeStatus::CreateFailed => write!(f, "CREATE_FAILED"),
            RuntimeStatus::Updating => write!(f, "UPDATING"),
            RuntimeStatus::UpdateFailed => write!(f, "UPDATE_FAILED"),
            RuntimeStatus::Ready => write!(f, "READY"),
            RuntimeStatus::Deleting => write!(f, "DELETING"),
            RuntimeStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// One entry of the runtime listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSummary {
    pub id: String,
    pub arn: String,
    pub name: String,
    pub version: String,
    pub status: RuntimeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<DateTime<Utc>>,
}

/// Full server-observed state of one runtime version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRuntime {
    pub id: String,
    pub arn: String,
    pub name: String,
    pub version: String,
    pub status: RuntimeStatus,

    /// The response body in wire format (lowerCamel keys, one-of unions
    /// encoded as `{ member: payload }`), decoded by the codec.
    pub document: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<DateTime<Utc>>,
}

/// Result of a create or update call: every such call issues a new version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeRevision {
    pub id: String,
    pub arn: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload_identity_arn: Option<String>,
}

/// Named mutable pointer to a runtime version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub id: String,
    pub name: String,
    pub arn: String,
    pub status: RuntimeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Endpoint {
    /// The version this endpoint resolves to: target if set, else live
    pub fn current_version(&self) -> Option<&str> {
        self.target_version
            .as_deref()
            .or(self.live_version.as_deref())
    }
}

/// Result of an endpoint create or update call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRevision {
    pub arn: String,
    pub status: RuntimeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_version: Option<String>,
}

/// One entry of the version listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSummary {
    pub version: String,
    pub status: RuntimeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl VersionSummary {
    /// Numeric ordering key; labels that are not base-10 integers sort as 0
    pub fn ordinal(&self) -> u64 {
        self.version.parse().unwrap_or(0)
    }
}

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }
}
