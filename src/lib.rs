//! `simplismart-http` is a blocking HTTP client for Simplismart hosted
//! inference.
//!
//! Every call goes through one retry loop with bounded exponential backoff:
//! - [`SimplismartClient::submit`] for raw JSON requests
//! - [`SimplismartClient::ocr`] and [`SimplismartClient::ocr_pages`] for OCR
//! - [`SimplismartClient::edit_image`] for FLUX Kontext image editing
//!
//! Transport and sleeping are traits ([`Transport`], [`Sleeper`]) so the
//! retry behavior can be driven without a network or a real clock.

mod client;
mod config;
mod decode;
mod error;
mod kontext;
mod ocr;
mod options;
mod pages;
mod request;
mod sleep;
mod transport;
mod types;
mod wire;

pub use client::{submit, SimplismartClient};
pub use config::{ServiceConfig, API_KEY_VAR, BASE_URL_VAR, TENANT_ID_VAR};
pub use error::SimplismartError;
pub use kontext::{Acceleration, KontextParams};
pub use ocr::{ImageSource, OcrRequest, DEFAULT_OCR_MODEL};
pub use options::{ClientOptions, RetryOn, RetryPolicy};
pub use pages::{combine_pages, write_outputs, PageBatch, PAGE_SEPARATOR};
pub use request::{Credential, Request};
pub use sleep::{Sleeper, ThreadSleeper};
pub use transport::{RawResponse, ReqwestTransport, Transport};
pub use types::{Attempt, AttemptOutcome, GeneratedImage, GeneratedImages, Submission};

/// JSON object carried in requests and returned by successful calls.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

pub type Result<T> = std::result::Result<T, SimplismartError>;
