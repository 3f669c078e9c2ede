use std::fmt;

use serde_json::Value;

use crate::{JsonMap, Result, SimplismartError};

/// API credential: bearer token plus optional tenant routing id.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    authorization: String,
    tenant_id: Option<String>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("authorization", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

impl Credential {
    /// Creates a credential from a bearer token.
    ///
    /// If the token is missing the `Bearer ` prefix, it is added automatically.
    pub fn bearer(token: impl AsRef<str>) -> Self {
        Self {
            authorization: normalize_bearer_authorization(token.as_ref()),
            tenant_id: None,
        }
    }

    /// Sets the tenant/routing id sent as the `id` header.
    ///
    /// Blank values are ignored.
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        let tenant_id = tenant_id.into();
        self.tenant_id = (!tenant_id.trim().is_empty()).then_some(tenant_id);
        self
    }

    /// Full `Authorization` header value.
    pub fn authorization(&self) -> &str {
        &self.authorization
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }
}

/// One outbound call: endpoint, credential and JSON object payload.
///
/// Built per call and never mutated after construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    endpoint: String,
    credential: Credential,
    payload: JsonMap,
}

impl Request {
    pub fn new(endpoint: impl Into<String>, credential: Credential, payload: JsonMap) -> Self {
        Self {
            endpoint: endpoint.into(),
            credential,
            payload,
        }
    }

    /// Builds a request from any JSON value; it must be an object.
    pub fn from_json(
        endpoint: impl Into<String>,
        credential: Credential,
        payload: Value,
    ) -> Result<Self> {
        match payload {
            Value::Object(map) => Ok(Self::new(endpoint, credential, map)),
            other => Err(SimplismartError::InvalidRequest(format!(
                "payload must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn payload(&self) -> &JsonMap {
        &self.payload
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}
