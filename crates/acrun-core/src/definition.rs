//! Declared agent runtime definition
//!
//! Field names follow the typed (PascalCase) convention; the codec flips them
//! to and from the lowerCamel wire form. Union fields are not serialized here,
//! the codec moves them in and out through the union registry.

use crate::union::{Artifact, Authorizer, RequestHeaders};
use acrun_cloud::{CloudError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RuntimeDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_runtime_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,

    #[serde(skip)]
    pub agent_runtime_artifact: Option<Artifact>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_configuration: Option<NetworkConfiguration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_configuration: Option<ProtocolConfiguration>,

    #[serde(skip)]
    pub authorizer_configuration: Option<Authorizer>,

    #[serde(skip)]
    pub request_header_configuration: Option<RequestHeaders>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_configuration: Option<LifecycleConfiguration>,

    /// User-defined keys, never case-rewritten
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment_variables: BTreeMap<String, String>,

    /// User-defined keys, never case-rewritten
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkConfiguration {
    /// `PUBLIC` or `VPC`
    pub network_mode: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_mode_config: Option<VpcConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcConfig {
    #[serde(default)]
    pub security_groups: Vec<String>,
    #[serde(default)]
    pub subnets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProtocolConfiguration {
    /// `MCP`, `HTTP` or `A2A`
    pub server_protocol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleConfiguration {
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_runtime_session_timeout: Option<u32>,
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lifetime: Option<u32>,
}

impl RuntimeDefinition {
    /// Declared name; empty when unset
    pub fn name(&self) -> &str {
        self.agent_runtime_name.as_deref().unwrap_or_default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.name().is_empty() {
            return Err(CloudError::Validation(
                "agent runtime name is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Container image the runtime is built from, if it uses one
    pub fn container_uri(&self) -> Option<&str> {
        match &self.agent_runtime_artifact {
            Some(Artifact::Container(config)) => Some(&config.container_uri),
            None => None,
        }
    }
}
