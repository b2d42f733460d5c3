//! Definition codec
//!
//! Decoding runs in two phases. A case walk capitalizes every key except those
//! of the free-form maps, while a hook pulls the union fields out of the tree.
//! The remaining tree is read by serde, then each captured union fragment is
//! decoded through its registry. Encoding is the mirror image.

use crate::definition::RuntimeDefinition;
use crate::path::Path;
use crate::union::{self, Strictness, unknown_field};
use crate::walker::{CaseWalker, KeyCase, first_unknown_key};
use acrun_cloud::{CloudError, RemoteRuntime, Result};
use serde_json::Value;

/// Maps whose keys are user data and keep their case
pub const FREE_FORM_MAPS: [&str; 2] = ["$.environmentVariables.*", "$.tags.*"];

/// A union-typed top-level field and its codec pair
struct UnionSlot {
    key: &'static str,
    decode: fn(&mut RuntimeDefinition, Value, Strictness, &Path) -> Result<()>,
    encode: fn(&RuntimeDefinition) -> Result<Option<Value>>,
}

impl UnionSlot {
    fn pattern(&self) -> String {
        format!("$.{}", self.key)
    }
}

static UNION_SLOTS: [UnionSlot; 3] = [
    UnionSlot {
        key: "agentRuntimeArtifact",
        decode: |definition, fragment, mode, path| {
            definition.agent_runtime_artifact = union::decode(fragment, mode, path)?;
            Ok(())
        },
        encode: |definition| definition.agent_runtime_artifact.as_ref().map(union::encode).transpose(),
    },
    UnionSlot {
        key: "authorizerConfiguration",
        decode: |definition, fragment, mode, path| {
            definition.authorizer_configuration = union::decode(fragment, mode, path)?;
            Ok(())
        },
        encode: |definition| definition.authorizer_configuration.as_ref().map(union::encode).transpose(),
    },
    UnionSlot {
        key: "requestHeaderConfiguration",
        decode: |definition, fragment, mode, path| {
            definition.request_header_configuration = union::decode(fragment, mode, path)?;
            Ok(())
        },
        encode: |definition| {
            definition
                .request_header_configuration
                .as_ref()
                .map(union::encode)
                .transpose()
        },
    },
];

/// Decode a definition document
pub fn decode(bytes: &[u8], mode: Strictness) -> Result<RuntimeDefinition> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| CloudError::Decode {
        path: Path::root().to_string(),
        message: e.to_string(),
    })?;
    decode_value(value, mode)
}

pub fn decode_value(value: Value, mode: Strictness) -> Result<RuntimeDefinition> {
    if !value.is_object() {
        return Err(CloudError::Decode {
            path: Path::root().to_string(),
            message: "definition must be a JSON object".to_string(),
        });
    }

    let mut captured: Vec<(&'static UnionSlot, Path, Value)> = Vec::new();
    let walked = CaseWalker::new(KeyCase::Upper)
        .ignore(FREE_FORM_MAPS)
        .hook(|path, key, value| {
            if path.segments().len() == 1 {
                if let Some(slot) = UNION_SLOTS.iter().find(|slot| path.matches(&slot.pattern())) {
                    captured.push((slot, path.clone(), value));
                    return Ok(None);
                }
            }
            Ok(Some((key, value)))
        })
        .walk(value)?;

    let mut definition: RuntimeDefinition =
        serde_json::from_value(walked.clone()).map_err(|e| CloudError::Decode {
            path: Path::root().to_string(),
            message: e.to_string(),
        })?;

    if mode.is_strict() {
        let known = serde_json::to_value(&definition)?;
        if let Some(unknown) = first_unknown_key(&walked, &known) {
            let wire = unknown.map_keys(|key| KeyCase::Lower.apply(key));
            return Err(unknown_field(&Path::root(), &wire));
        }
    }

    for (slot, path, fragment) in captured {
        (slot.decode)(&mut definition, fragment, mode, &path)?;
    }
    Ok(definition)
}

/// Decode the document of a remote read
///
/// Server responses carry identity and status fields the definition does not
/// model, so they are always read leniently.
pub fn decode_remote(remote: &RemoteRuntime) -> Result<RuntimeDefinition> {
    decode_value(remote.document.clone(), Strictness::Lenient)
}

/// Encode a definition as a pretty-printed wire document
pub fn encode(definition: &RuntimeDefinition) -> Result<Vec<u8>> {
    let value = encode_value(definition)?;
    Ok(serde_json::to_vec_pretty(&value)?)
}

pub fn encode_value(definition: &RuntimeDefinition) -> Result<Value> {
    let typed = serde_json::to_value(definition)?;
    let mut wire = CaseWalker::new(KeyCase::Lower)
        .ignore(FREE_FORM_MAPS)
        .walk(typed)?;

    if let Value::Object(fields) = &mut wire {
        for slot in &UNION_SLOTS {
            if let Some(fragment) = (slot.encode)(definition)? {
                fields.insert(slot.key.to_string(), fragment);
            }
        }
    }
    Ok(wire)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{NetworkConfiguration, ProtocolConfiguration};
    use crate::union::{
        Artifact, Authorizer, ContainerConfiguration, CustomJwtAuthorizer, RequestHeaders,
    };
    use serde_json::json;

    fn document() -> Value {
        json!({
            "agentRuntimeName": "hosted_agent_dummy",
            "roleArn": "arn:aws:iam::123456789012:role/service-role/DummyServiceRole",
            "agentRuntimeArtifact": {
                "containerConfiguration": {
                    "containerUri": "123456789012.dkr.ecr.us-west-2.amazonaws.com/acrun/sample-mcp:dev"
                }
            },
            "networkConfiguration": {"networkMode": "PUBLIC"},
            "protocolConfiguration": {"serverProtocol": "MCP"},
            "environmentVariables": {"env": "dev", "LOG_LEVEL": "debug"},
            "authorizerConfiguration": {
                "customJWTAuthorizer": {
                    "discoveryUrl": "https://example.com/.well-known/openid-configuration",
                    "allowedAudience": ["example_audience"],
                    "allowedClients": ["example_client"]
                }
            },
            "requestHeaderConfiguration": {
                "allowList": ["X-Custom-Header", "Authorization"]
            }
        })
    }

    #[test]
    fn test_decode_document() {
        let definition = decode_value(document(), Strictness::Strict).unwrap();

        assert_eq!(definition.name(), "hosted_agent_dummy");
        assert_eq!(
            definition.agent_runtime_artifact,
            Some(Artifact::Container(ContainerConfiguration {
                container_uri: "123456789012.dkr.ecr.us-west-2.amazonaws.com/acrun/sample-mcp:dev"
                    .to_string()
            }))
        );
        assert_eq!(
            definition.network_configuration,
            Some(NetworkConfiguration {
                network_mode: "PUBLIC".to_string(),
                network_mode_config: None,
            })
        );
        assert_eq!(
            definition.protocol_configuration,
            Some(ProtocolConfiguration {
                server_protocol: "MCP".to_string()
            })
        );
        assert_eq!(definition.environment_variables["env"], "dev");
        assert_eq!(definition.environment_variables["LOG_LEVEL"], "debug");
        assert_eq!(
            definition.authorizer_configuration,
            Some(Authorizer::CustomJwt(CustomJwtAuthorizer {
                discovery_url: "https://example.com/.well-known/openid-configuration".to_string(),
                allowed_audience: Some(vec!["example_audience".to_string()]),
                allowed_clients: Some(vec!["example_client".to_string()]),
            }))
        );
        assert_eq!(
            definition.request_header_configuration,
            Some(RequestHeaders::AllowList(vec![
                "X-Custom-Header".to_string(),
                "Authorization".to_string()
            ]))
        );
    }

    #[test]
    fn test_encode_reproduces_document() {
        let definition = decode_value(document(), Strictness::Strict).unwrap();
        assert_eq!(encode_value(&definition).unwrap(), document());
    }

    #[test]
    fn test_round_trip() {
        let definition = RuntimeDefinition {
            agent_runtime_name: Some("test_runtime".to_string()),
            role_arn: Some("arn:aws:iam::123456789012:role/TestRole".to_string()),
            agent_runtime_artifact: Some(Artifact::Container(ContainerConfiguration {
                container_uri: "123456789012.dkr.ecr.us-west-2.amazonaws.com/test:latest"
                    .to_string(),
            })),
            request_header_configuration: Some(RequestHeaders::AllowList(vec![
                "X-Custom-Header".to_string(),
                "Authorization".to_string(),
            ])),
            tags: [("Team".to_string(), "platform".to_string())].into(),
            ..Default::default()
        };

        let bytes = encode(&definition).unwrap();
        let decoded = decode(&bytes, Strictness::Strict).unwrap();
        assert_eq!(decoded, definition);
    }

    #[test]
    fn test_free_form_keys_keep_case() {
        let definition = decode_value(
            json!({"agentRuntimeName": "a", "tags": {"owner": "x", "CostCenter": "y"}}),
            Strictness::Strict,
        )
        .unwrap();
        assert!(definition.tags.contains_key("owner"));
        assert!(definition.tags.contains_key("CostCenter"));

        let wire = encode_value(&definition).unwrap();
        assert_eq!(wire["tags"], json!({"owner": "x", "CostCenter": "y"}));
    }

    #[test]
    fn test_strict_unknown_field() {
        let mut doc = document();
        doc["roleArnn"] = json!("typo");

        let err = decode_value(doc.clone(), Strictness::Strict).unwrap_err();
        assert_eq!(err.unknown_field(), Some("roleArnn"));

        let lenient = decode_value(doc, Strictness::Lenient).unwrap();
        assert_eq!(lenient.name(), "hosted_agent_dummy");
    }

    #[test]
    fn test_strict_accepts_empty_maps() {
        for field in ["tags", "environmentVariables"] {
            let definition = decode_value(
                json!({"agentRuntimeName": "a", field: {}}),
                Strictness::Strict,
            )
            .unwrap();
            assert_eq!(definition.name(), "a");
        }

        let mut doc = document();
        doc["tags"] = json!({});
        doc["agentRuntimeArtifact"] = json!({
            "containerConfiguration": {"containerUri": "repo/image:tag", "containerUrl": "x"}
        });
        let err = decode_value(doc, Strictness::Strict).unwrap_err();
        assert_eq!(err.unknown_field(), Some("containerUrl"));
    }

    #[test]
    fn test_strict_unknown_nested_field() {
        let mut doc = document();
        doc["networkConfiguration"]["networkMod"] = json!("VPC");

        match decode_value(doc, Strictness::Strict).unwrap_err() {
            CloudError::UnknownField { path, field } => {
                assert_eq!(field, "networkMod");
                assert_eq!(path, "$.networkConfiguration.networkMod");
            }
            other => panic!("Expected UnknownField, got {:?}", other),
        }
    }

    #[test]
    fn test_union_error_names_field() {
        let mut doc = document();
        doc["agentRuntimeArtifact"] = json!({"unknownMember": {}});

        let err = decode_value(doc, Strictness::Lenient).unwrap_err();
        assert!(matches!(err, CloudError::UnknownVariant { ref union, .. } if union == "agentRuntimeArtifact"));
    }

    #[test]
    fn test_remote_extra_fields_are_dropped() {
        let mut doc = document();
        doc["agentRuntimeId"] = json!("rt-123");
        doc["status"] = json!("READY");
        doc["agentRuntimeVersion"] = json!("3");

        let remote = RemoteRuntime {
            id: "rt-123".to_string(),
            arn: "arn:aws:bedrock-agentcore:us-west-2:123456789012:runtime/rt-123".to_string(),
            name: "hosted_agent_dummy".to_string(),
            version: "3".to_string(),
            status: acrun_cloud::RuntimeStatus::Ready,
            document: doc,
            created_at: None,
            last_updated_at: None,
        };
        let definition = decode_remote(&remote).unwrap();
        assert_eq!(encode_value(&definition).unwrap(), document());
    }

    #[test]
    fn test_not_an_object() {
        let err = decode(b"[1, 2]", Strictness::Lenient).unwrap_err();
        assert!(matches!(err, CloudError::Decode { .. }));

        let err = decode(b"{", Strictness::Lenient).unwrap_err();
        assert!(matches!(err, CloudError::Decode { .. }));
    }
}
