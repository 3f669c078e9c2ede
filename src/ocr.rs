//! OCR through the OpenAI-compatible chat-completions endpoint.

use std::{fs, path::Path};

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::{
    decode::{decode_chat_content, to_payload},
    sleep::Sleeper,
    transport::Transport,
    wire::{ChatCompletionRequest, ChatMessage, ContentPart, ImageUrl, MessageContent},
    Request, Result, RetryPolicy, ServiceConfig, SimplismartClient, SimplismartError,
};

pub const DEFAULT_OCR_MODEL: &str = "deepseek-ocr";
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Image handed to the model, either by reference or inline.
#[derive(Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Publicly reachable URL.
    Url(String),
    /// Encoded image bytes, sent as a base64 `data:` URL.
    Inline { mime: String, bytes: Vec<u8> },
}

impl std::fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(url) => f.debug_tuple("Url").field(url).finish(),
            Self::Inline { mime, bytes } => f
                .debug_struct("Inline")
                .field("mime", mime)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

impl ImageSource {
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }

    pub fn png(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Inline {
            mime: "image/png".to_owned(),
            bytes: bytes.into(),
        }
    }

    /// Reads an image file; the MIME type is guessed from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        Ok(Self::Inline {
            mime: mime_for_path(path).to_owned(),
            bytes,
        })
    }

    /// Value for the `image_url.url` field.
    pub fn to_url(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Inline { mime, bytes } => {
                format!("data:{mime};base64,{}", STANDARD.encode(bytes))
            }
        }
    }
}

fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

/// One OCR call: prompts, image and sampling settings.
#[derive(Clone, Debug, PartialEq)]
pub struct OcrRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub instruction: String,
    pub image: ImageSource,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl OcrRequest {
    pub fn new(instruction: impl Into<String>, image: ImageSource) -> Self {
        Self {
            model: DEFAULT_OCR_MODEL.to_owned(),
            system_prompt: None,
            instruction: instruction.into(),
            image,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.0,
        }
    }

    /// Plain text extraction from a public image URL.
    pub fn for_url(url: impl Into<String>) -> Self {
        Self::new("Extract all text from this image.", ImageSource::url(url)).with_system_prompt(
            "You are an expert OCR assistant. Extract all text from images accurately.",
        )
    }

    /// Layout-preserving extraction from a local image file.
    pub fn for_local_image(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(
            "Please extract all text from this image, preserving the layout and structure.",
            ImageSource::from_path(path)?,
        )
        .with_system_prompt(
            "You are an expert OCR assistant. Extract all text from images accurately, \
             maintaining the original structure and formatting.",
        ))
    }

    /// A rendered document page (PNG) with a free-form instruction.
    pub fn for_page(instruction: impl Into<String>, png: impl Into<Vec<u8>>) -> Self {
        Self::new(instruction, ImageSource::png(png))
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn to_wire(&self) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: MessageContent::Text(system.clone()),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: MessageContent::Parts(vec![
                ContentPart::Text {
                    text: self.instruction.clone(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: self.image.to_url(),
                    },
                },
            ]),
        });

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    /// Builds the chat-completions [`Request`] for `config`.
    pub fn to_request(&self, config: &ServiceConfig) -> Result<Request> {
        if self.instruction.trim().is_empty() {
            return Err(SimplismartError::InvalidRequest(
                "OCR instruction cannot be empty".to_owned(),
            ));
        }
        let payload = to_payload(&self.to_wire())?;
        Ok(Request::new(
            config.chat_completions_url(),
            config.credential(),
            payload,
        ))
    }
}

impl<T: Transport, S: Sleeper> SimplismartClient<T, S> {
    /// Runs one OCR request and returns the recognized text.
    pub fn ocr(
        &self,
        config: &ServiceConfig,
        request: &OcrRequest,
        policy: &RetryPolicy,
    ) -> Result<String> {
        let body = self.submit(&request.to_request(config)?, policy)?;
        decode_chat_content(body)
    }
}
