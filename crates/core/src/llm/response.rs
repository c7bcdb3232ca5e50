//! Chat-endpoint response schema.

use serde::Deserialize;

/// The model response did not match the expected schema.
///
/// Carries the full raw response text for diagnostics.
#[derive(Debug, thiserror::Error)]
#[error("could not parse model response: {reason}")]
pub struct ResponseParseError {
    pub reason: String,
    pub raw: String,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// The subset of an Ollama-style chat response the pipeline needs;
/// everything else in the payload is ignored.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

/// Extracts the model's textual answer from a raw chat response.
pub fn extract_answer(raw: &str) -> Result<String, ResponseParseError> {
    let response: ChatResponse =
        serde_json::from_str(raw).map_err(|error| ResponseParseError {
            reason: error.to_string(),
            raw: raw.to_string(),
        })?;
    Ok(response.message.content)
}
