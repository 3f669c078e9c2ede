use std::time::Duration;

use reqwest::header;

use crate::{ClientOptions, Request, Result, SimplismartError};

/// Status and raw body of a completed HTTP exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking HTTP capability the retry client is built on.
///
/// `send` performs exactly one transmission. It returns `Ok` whenever the
/// endpoint answered, whatever the status; errors are reserved for
/// exchanges that did not complete and must be
/// [`SimplismartError::Transport`].
pub trait Transport: Send + Sync {
    fn send(&self, request: &Request) -> Result<RawResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &Request) -> Result<RawResponse> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn send(&self, request: &Request) -> Result<RawResponse> {
        (**self).send(request)
    }
}

/// [`Transport`] backed by `reqwest::blocking`.
///
/// Must not be created or used from inside an async runtime.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    http: reqwest::blocking::Client,
    options: ClientOptions,
}

impl ReqwestTransport {
    pub fn new(options: ClientOptions) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(options.timeout_ms))
            .build()
            .map_err(|err| SimplismartError::Config(format!("cannot build HTTP client: {err}")))?;
        Ok(Self { http, options })
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &Request) -> Result<RawResponse> {
        let credential = request.credential();
        let mut builder = self
            .http
            .post(request.endpoint())
            .header(header::AUTHORIZATION, credential.authorization())
            .header(header::CONTENT_TYPE, "application/json")
            .json(request.payload());
        if let Some(tenant_id) = credential.tenant_id() {
            builder = builder.header("id", tenant_id);
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(RawResponse { status, body })
    }
}
