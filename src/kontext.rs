//! FLUX.1 Kontext image editing: reference image plus prompt.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::{
    decode::{decode_generated_images, to_payload},
    sleep::Sleeper,
    transport::Transport,
    wire::KontextPayload,
    GeneratedImages, Request, Result, RetryPolicy, ServiceConfig, SimplismartClient,
    SimplismartError,
};

pub const GUIDANCE_SCALE_RANGE: (f64, f64) = (1.0, 10.0);
pub const INFERENCE_STEPS_RANGE: (u32, u32) = (10, 50);
pub const SUPPORTED_SIZES: [u32; 3] = [512, 768, 1024];

/// Speed/quality trade-off exposed by the service as `threshold`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Acceleration {
    #[default]
    Low,
    High,
}

impl Acceleration {
    pub fn threshold(self) -> f64 {
        match self {
            Self::Low => 0.9,
            Self::High => 1.0,
        }
    }
}

/// Parameters of one image-editing call.
#[derive(Clone, Debug, PartialEq)]
pub struct KontextParams {
    pub prompt: String,
    /// Reference image, base64 without a `data:` prefix.
    pub image_base64: String,
    pub guidance_scale: f64,
    pub num_inference_steps: u32,
    pub num_images_per_prompt: u32,
    pub width: u32,
    pub height: u32,
    pub acceleration: Acceleration,
}

impl KontextParams {
    pub fn new(prompt: impl Into<String>, image_base64: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image_base64: image_base64.into(),
            guidance_scale: 2.5,
            num_inference_steps: 28,
            num_images_per_prompt: 1,
            width: 1024,
            height: 1024,
            acceleration: Acceleration::Low,
        }
    }

    /// Same as [`KontextParams::new`] but encodes raw image bytes.
    pub fn from_image_bytes(prompt: impl Into<String>, image: &[u8]) -> Self {
        Self::new(prompt, STANDARD.encode(image))
    }

    pub fn with_guidance_scale(mut self, guidance_scale: f64) -> Self {
        self.guidance_scale = guidance_scale;
        self
    }

    pub fn with_inference_steps(mut self, steps: u32) -> Self {
        self.num_inference_steps = steps;
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_acceleration(mut self, acceleration: Acceleration) -> Self {
        self.acceleration = acceleration;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.image_base64.trim().is_empty() {
            return invalid("a reference image is required".to_owned());
        }
        if self.prompt.trim().is_empty() {
            return invalid("prompt cannot be empty".to_owned());
        }
        let (min, max) = GUIDANCE_SCALE_RANGE;
        if !(min..=max).contains(&self.guidance_scale) {
            return invalid(format!(
                "guidance_scale {} outside {min}..={max}",
                self.guidance_scale
            ));
        }
        let (min, max) = INFERENCE_STEPS_RANGE;
        if !(min..=max).contains(&self.num_inference_steps) {
            return invalid(format!(
                "num_inference_steps {} outside {min}..={max}",
                self.num_inference_steps
            ));
        }
        if self.num_images_per_prompt == 0 {
            return invalid("num_images_per_prompt must be at least 1".to_owned());
        }
        for (name, value) in [("width", self.width), ("height", self.height)] {
            if !SUPPORTED_SIZES.contains(&value) {
                return invalid(format!(
                    "{name} {value} is not one of {SUPPORTED_SIZES:?}"
                ));
            }
        }
        Ok(())
    }

    /// Validates and builds the request for the generation endpoint.
    pub fn to_request(&self, config: &ServiceConfig) -> Result<Request> {
        self.validate()?;
        let payload = to_payload(&KontextPayload {
            image: &self.image_base64,
            prompt: &self.prompt,
            guidance_scale: self.guidance_scale,
            num_inference_steps: self.num_inference_steps,
            num_images_per_prompt: self.num_images_per_prompt,
            height: self.height,
            width: self.width,
            threshold: self.acceleration.threshold(),
        })?;
        Ok(Request::new(
            config.base_url.clone(),
            config.credential(),
            payload,
        ))
    }
}

fn invalid(message: String) -> Result<()> {
    Err(SimplismartError::InvalidRequest(message))
}

impl<T: Transport, S: Sleeper> SimplismartClient<T, S> {
    /// Generates edited image(s) from a reference image and a prompt.
    pub fn edit_image(
        &self,
        config: &ServiceConfig,
        params: &KontextParams,
        policy: &RetryPolicy,
    ) -> Result<GeneratedImages> {
        let body = self.submit(&params.to_request(config)?, policy)?;
        decode_generated_images(body)
    }
}
