//! JSON-RPC 2.0 message shapes used by the tool server.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use feedback_core::{codec, FeedbackResult};

/// JSON-RPC version string.
pub const JSONRPC_VERSION: &str = "2.0";

/// Protocol version answered when the client does not ask for one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-06-18";

/// Name of the single tool this server exposes.
pub const TOOL_NAME: &str = "interactive_feedback";

/// Standard JSON-RPC error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
}

/// An incoming request or notification.
///
/// Notifications carry no `id` and are never answered.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    /// Must be "2.0"
    #[serde(default)]
    pub jsonrpc: Option<String>,

    /// Request id; absent for notifications. A present `null` id is still
    /// a request and is kept as `Some(Value::Null)`.
    #[serde(default, deserialize_with = "present_value")]
    pub id: Option<Value>,

    /// Method name
    pub method: String,

    /// Method parameters
    #[serde(default)]
    pub params: Option<Value>,
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl IncomingMessage {
    /// Whether this message expects no response.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Error object of a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// An outgoing response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl OutgoingResponse {
    /// A successful response.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// A failed response.
    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Parameters of a `tools/call` request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Descriptor returned by `tools/list`.
pub fn tool_descriptor() -> Value {
    json!({
        "name": TOOL_NAME,
        "description": "Request interactive feedback from the user. Blocks until the user answers.",
        "inputSchema": {
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The specific question for the user"
                },
                "predefined_options": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Predefined options for the user to choose from (optional)"
                }
            },
            "required": ["message"]
        }
    })
}

/// Tool result carrying the human's answer.
pub fn tool_success(result: &FeedbackResult) -> Value {
    let text = String::from_utf8_lossy(&codec::encode(result)).into_owned();
    json!({
        "content": [{ "type": "text", "text": text }],
        "structuredContent": { "interactive_feedback": result.interactive_feedback },
        "isError": false
    })
}

/// Tool result reporting a failed interaction.
pub fn tool_failure(message: impl Into<String>) -> Value {
    json!({
        "content": [{ "type": "text", "text": message.into() }],
        "isError": true
    })
}
