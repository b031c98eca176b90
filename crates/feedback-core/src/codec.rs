//! Wire format of the handoff file.
//!
//! The surface and the service are always deployed together, so the
//! document carries no version field: it is a JSON object with exactly one
//! key, `interactive_feedback`, holding a string.

use std::fs;
use std::io;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

use crate::types::FeedbackResult;

/// Key holding the merged feedback string.
pub const RESULT_KEY: &str = "interactive_feedback";

/// Errors from encoding, decoding or moving handoff documents.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Malformed result: {0}")]
    Malformed(String),

    #[error("Handoff I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Encode a result as UTF-8 JSON.
pub fn encode(result: &FeedbackResult) -> Vec<u8> {
    let mut document = serde_json::Map::with_capacity(1);
    document.insert(
        RESULT_KEY.to_string(),
        Value::String(result.interactive_feedback.clone()),
    );
    Value::Object(document).to_string().into_bytes()
}

/// Decode a handoff document.
///
/// Fails with [`CodecError::Malformed`] when the bytes are not JSON, not an
/// object, lack the result key, or the key does not hold a string. Other
/// keys are ignored.
pub fn decode(bytes: &[u8]) -> Result<FeedbackResult, CodecError> {
    let document: Value = serde_json::from_slice(bytes)
        .map_err(|e| CodecError::Malformed(format!("invalid JSON: {}", e)))?;

    let object = document
        .as_object()
        .ok_or_else(|| CodecError::Malformed("document is not a JSON object".to_string()))?;

    match object.get(RESULT_KEY) {
        Some(Value::String(feedback)) => Ok(FeedbackResult::new(feedback.clone())),
        Some(other) => Err(CodecError::Malformed(format!(
            "'{}' must be a string, found {}",
            RESULT_KEY,
            json_type_name(other)
        ))),
        None => Err(CodecError::Malformed(format!("missing key '{}'", RESULT_KEY))),
    }
}

/// Write an encoded result to a handoff path, creating parent directories.
///
/// Used by presentation surfaces.
pub fn write_handoff(path: impl AsRef<Path>, result: &FeedbackResult) -> Result<(), CodecError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, encode(result))?;
    Ok(())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
