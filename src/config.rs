use std::fmt;

use crate::{Credential, Result, SimplismartError};

pub const BASE_URL_VAR: &str = "SIMPLISMART_BASE_URL";
pub const API_KEY_VAR: &str = "SIMPLISMART_API_KEY";
pub const TENANT_ID_VAR: &str = "DEFAULT_HEADERS_ID";

/// Where and how to reach the inference service.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// For OCR: the OpenAI-compatible API root (`/chat/completions` is
    /// appended). For image editing: the generation endpoint itself.
    pub base_url: String,
    pub api_key: String,
    /// Optional routing id, sent as the `id` header.
    pub tenant_id: Option<String>,
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

impl ServiceConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            tenant_id: None,
        }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Reads the configuration from environment variables.
    ///
    /// Reads:
    /// - `SIMPLISMART_BASE_URL` — API root or generation endpoint
    /// - `SIMPLISMART_API_KEY` — access token (Bearer prefix optional)
    /// - `DEFAULT_HEADERS_ID` — optional tenant id
    ///
    /// Returns an error if a required variable is missing or empty.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads a `.env` file from the current directory (if present), then
    /// behaves like [`ServiceConfig::from_env`].
    pub fn from_dotenv() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(err) if err.not_found() => {}
            Err(err) => {
                return Err(SimplismartError::Config(format!(
                    "could not load .env file: {err}"
                )))
            }
        }
        Self::from_env()
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| -> Result<String> {
            let value = lookup(name).ok_or_else(|| {
                SimplismartError::Config(format!("missing {name} environment variable"))
            })?;
            if value.trim().is_empty() {
                return Err(SimplismartError::Config(format!(
                    "{name} is set but empty"
                )));
            }
            Ok(value)
        };

        let base_url = required(BASE_URL_VAR)?;
        let api_key = required(API_KEY_VAR)?;
        let tenant_id = lookup(TENANT_ID_VAR).filter(|value| !value.trim().is_empty());

        Ok(Self {
            base_url,
            api_key,
            tenant_id,
        })
    }

    pub fn credential(&self) -> Credential {
        let credential = Credential::bearer(&self.api_key);
        match &self.tenant_id {
            Some(tenant_id) => credential.with_tenant(tenant_id.clone()),
            None => credential,
        }
    }

    /// `{base_url}/chat/completions`, tolerating a trailing slash.
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
