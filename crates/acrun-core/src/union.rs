//! One-of fields
//!
//! On the wire a union field is a mapping with exactly one member, whose key
//! names the variant: `{"containerConfiguration": {"containerUri": "..."}}`.
//! Each union type carries a closed registry of variants, each a key plus a
//! decode/encode pair. Adding a variant means adding an enum arm and a registry
//! entry; call sites go through [`decode`] and [`encode`] only.

use crate::path::{Path, Segment};
use crate::walker::first_unknown_key;
use acrun_cloud::{CloudError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How tolerant a decode is of keys the model does not know
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// User-authored input: unknown keys are an error
    Strict,
    /// Server responses: unknown keys are dropped
    Lenient,
}

impl Strictness {
    pub fn is_strict(&self) -> bool {
        matches!(self, Strictness::Strict)
    }
}

/// Registry entry for one variant of a union
pub struct Variant<U> {
    pub key: &'static str,
    pub decode: fn(Value, Strictness, &Path) -> Result<U>,
    /// `None` when the value is a different variant
    pub encode: fn(&U) -> Option<Result<Value>>,
}

pub trait UnionField: Sized + 'static {
    /// Wire name of the field, used in error messages
    const NAME: &'static str;

    fn variants() -> &'static [Variant<Self>];

    /// Registry key of the populated variant
    fn key(&self) -> &'static str;
}

/// Decode a union fragment
///
/// `null` and `{}` decode as absent. Anything other than a single-member
/// mapping, or a member key missing from the registry, is an error.
pub fn decode<U: UnionField>(fragment: Value, mode: Strictness, path: &Path) -> Result<Option<U>> {
    let members = match fragment {
        Value::Null => return Ok(None),
        Value::Object(members) => members,
        other => {
            return Err(CloudError::Decode {
                path: path.to_string(),
                message: format!("{} must be an object, got {}", U::NAME, kind(&other)),
            });
        }
    };

    let mut members = members.into_iter();
    let (key, payload) = match (members.next(), members.next()) {
        (None, _) => return Ok(None),
        (Some(member), None) => member,
        (Some((first, _)), Some((second, _))) => {
            return Err(CloudError::Decode {
                path: path.to_string(),
                message: format!(
                    "{} must have exactly one member, found {:?} and {:?}",
                    U::NAME,
                    first,
                    second
                ),
            });
        }
    };

    let variant = U::variants()
        .iter()
        .find(|variant| variant.key == key)
        .ok_or_else(|| CloudError::UnknownVariant {
            union: U::NAME.to_string(),
            key: key.clone(),
        })?;

    (variant.decode)(payload, mode, &path.key(&key)).map(Some)
}

/// Encode a union value as `{ key: payload }`
pub fn encode<U: UnionField>(value: &U) -> Result<Value> {
    let key = value.key();
    let unregistered = || CloudError::UnknownVariant {
        union: U::NAME.to_string(),
        key: key.to_string(),
    };

    let variant = U::variants()
        .iter()
        .find(|variant| variant.key == key)
        .ok_or_else(unregistered)?;
    let payload = (variant.encode)(value).ok_or_else(unregistered)??;

    let mut member = Map::new();
    member.insert(key.to_string(), payload);
    Ok(Value::Object(member))
}

/// Decode a variant payload, rejecting unknown keys in strict mode
pub fn decode_payload<T>(payload: Value, mode: Strictness, path: &Path) -> Result<T>
where
    T: DeserializeOwned + Serialize,
{
    let decoded: T = serde_json::from_value(payload.clone()).map_err(|e| CloudError::Decode {
        path: path.to_string(),
        message: e.to_string(),
    })?;

    if mode.is_strict() {
        let known = serde_json::to_value(&decoded)?;
        if let Some(unknown) = first_unknown_key(&payload, &known) {
            return Err(unknown_field(path, &unknown));
        }
    }
    Ok(decoded)
}

/// Build an `UnknownField` error for a path relative to `base`
pub(crate) fn unknown_field(base: &Path, relative: &Path) -> CloudError {
    let field = match relative.segments().last() {
        Some(Segment::Key(key)) => key.clone(),
        Some(Segment::Index(index)) => index.to_string(),
        None => String::new(),
    };
    CloudError::UnknownField {
        path: base.join(relative).to_string(),
        field,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// Artifact

pub const CONTAINER_CONFIGURATION: &str = "containerConfiguration";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerConfiguration {
    pub container_uri: String,
}

/// Where the runtime's code comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    Container(ContainerConfiguration),
}

static ARTIFACT_VARIANTS: [Variant<Artifact>; 1] = [Variant {
    key: CONTAINER_CONFIGURATION,
    decode: |payload, mode, path| decode_payload(payload, mode, path).map(Artifact::Container),
    encode: |value| match value {
        Artifact::Container(config) => Some(serde_json::to_value(config).map_err(Into::into)),
    },
}];

impl UnionField for Artifact {
    const NAME: &'static str = "agentRuntimeArtifact";

    fn variants() -> &'static [Variant<Self>] {
        &ARTIFACT_VARIANTS
    }

    fn key(&self) -> &'static str {
        match self {
            Artifact::Container(_) => CONTAINER_CONFIGURATION,
        }
    }
}

// Authorizer

pub const CUSTOM_JWT_AUTHORIZER: &str = "customJWTAuthorizer";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomJwtAuthorizer {
    pub discovery_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_audience: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_clients: Option<Vec<String>>,
}

/// Inbound request authorization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorizer {
    CustomJwt(CustomJwtAuthorizer),
}

static AUTHORIZER_VARIANTS: [Variant<Authorizer>; 1] = [Variant {
    key: CUSTOM_JWT_AUTHORIZER,
    decode: |payload, mode, path| decode_payload(payload, mode, path).map(Authorizer::CustomJwt),
    encode: |value| match value {
        Authorizer::CustomJwt(config) => Some(serde_json::to_value(config).map_err(Into::into)),
    },
}];

impl UnionField for Authorizer {
    const NAME: &'static str = "authorizerConfiguration";

    fn variants() -> &'static [Variant<Self>] {
        &AUTHORIZER_VARIANTS
    }

    fn key(&self) -> &'static str {
        match self {
            Authorizer::CustomJwt(_) => CUSTOM_JWT_AUTHORIZER,
        }
    }
}

// Request headers

pub const ALLOW_LIST: &str = "allowList";

/// Request headers forwarded to the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestHeaders {
    AllowList(Vec<String>),
}

static REQUEST_HEADER_VARIANTS: [Variant<RequestHeaders>; 1] = [Variant {
    key: ALLOW_LIST,
    decode: |payload, mode, path| decode_payload(payload, mode, path).map(RequestHeaders::AllowList),
    encode: |value| match value {
        RequestHeaders::AllowList(headers) => Some(serde_json::to_value(headers).map_err(Into::into)),
    },
}];

impl UnionField for RequestHeaders {
    const NAME: &'static str = "requestHeaderConfiguration";

    fn variants() -> &'static [Variant<Self>] {
        &REQUEST_HEADER_VARIANTS
    }

    fn key(&self) -> &'static str {
        match self {
            RequestHeaders::AllowList(_) => ALLOW_LIST,
        }
    }
}
