//! Answer extraction from chat-completion responses.

use crate::error::{VisionError, VisionResult};
use serde_json::Value;

/// Returns the text at `choices[0].message.content`.
///
/// # Errors
///
/// Returns [`VisionError::MalformedResponse`] naming the first missing
/// element when the body does not have that shape.
pub fn extract_content(body: &Value) -> VisionResult<String> {
    let choices = body
        .get("choices")
        .and_then(Value::as_array)
        .ok_or_else(|| VisionError::malformed_response("missing `choices` array"))?;

    let first = choices
        .first()
        .ok_or_else(|| VisionError::malformed_response("`choices` is empty"))?;

    let message = first
        .get("message")
        .ok_or_else(|| VisionError::malformed_response("`choices[0]` has no `message`"))?;

    message
        .get("content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            VisionError::malformed_response("`choices[0].message` has no text `content`")
        })
}
