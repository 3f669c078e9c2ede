use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    request::json_kind,
    wire::ChatCompletionResponse,
    GeneratedImages, JsonMap, SimplismartError,
};

/// Serializes a wire struct into the JSON object a [`crate::Request`] carries.
pub(crate) fn to_payload<T: Serialize>(value: &T) -> Result<JsonMap, SimplismartError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(SimplismartError::InvalidRequest(format!(
            "payload serialized to {} instead of an object",
            json_kind(&other)
        ))),
        Err(err) => Err(SimplismartError::InvalidRequest(format!(
            "payload could not be serialized: {err}"
        ))),
    }
}

fn from_body<T: DeserializeOwned>(body: JsonMap, what: &str) -> Result<T, SimplismartError> {
    serde_json::from_value(Value::Object(body))
        .map_err(|err| SimplismartError::Decode(format!("unexpected {what} shape: {err}")))
}

/// Extracts `choices[0].message.content`; a null content is empty text.
pub(crate) fn decode_chat_content(body: JsonMap) -> Result<String, SimplismartError> {
    let response: ChatCompletionResponse = from_body(body, "chat completion")?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| SimplismartError::NoOutput("chat completion has no choices".to_owned()))?;
    Ok(choice.message.content.unwrap_or_default())
}

pub(crate) fn decode_generated_images(body: JsonMap) -> Result<GeneratedImages, SimplismartError> {
    let images: GeneratedImages = from_body(body, "image generation")?;
    if images.images.is_empty() {
        return Err(SimplismartError::NoOutput(
            "image generation returned no images".to_owned(),
        ));
    }
    Ok(images)
}
