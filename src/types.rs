use std::time::SystemTime;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::{JsonMap, Result};

/// How a single transmission ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    /// Failed, and the failure was eligible for another attempt.
    TransientFailure(String),
    /// Failed in a way retrying cannot fix.
    FatalFailure(String),
}

/// Record of one transmission of a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attempt {
    /// 0-based ordinal of the attempt.
    pub index: usize,
    pub started_at: SystemTime,
    pub outcome: AttemptOutcome,
}

/// Result of a submission together with every attempt it took.
#[derive(Debug)]
pub struct Submission {
    pub result: Result<JsonMap>,
    pub attempts: Vec<Attempt>,
}

impl Submission {
    /// Number of transport calls that were made.
    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }
}

/// Output image reference returned by the Kontext endpoint.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct GeneratedImage {
    pub url: String,
}

/// Decoded Kontext generation response.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct GeneratedImages {
    pub images: Vec<GeneratedImage>,
    /// Service-assigned id; numeric ids are kept as their decimal text.
    #[serde(default, deserialize_with = "lenient_id")]
    pub request_id: Option<String>,
    /// Seconds spent on the whole request, as reported by the service.
    #[serde(default)]
    pub total_request_time: Option<f64>,
    /// Seconds spent in model inference.
    #[serde(default)]
    pub model_inference_time: Option<f64>,
}

impl GeneratedImages {
    pub fn first_url(&self) -> Option<&str> {
        self.images.first().map(|image| image.url.as_str())
    }
}

fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) => Some(id),
        Some(other) => Some(other.to_string()),
    })
}
