//! Request and result values exchanged with the presentation surface.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::launch::OPTION_DELIMITER;
use crate::service::FeedbackError;

/// A request for human feedback.
///
/// Immutable once built. The order of `predefined_options` is preserved
/// end-to-end because it maps to checkbox identity on the surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    /// Text shown verbatim to the human (may be empty or multi-line)
    pub prompt: String,

    /// Selectable labels, in caller order
    #[serde(default)]
    pub predefined_options: Vec<String>,
}

impl FeedbackRequest {
    /// Create a request with no predefined options.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            predefined_options: Vec::new(),
        }
    }

    /// Create a request with an optional list of predefined options.
    ///
    /// Empty labels are dropped; `None` means no options.
    pub fn with_options(prompt: impl Into<String>, options: Option<Vec<String>>) -> Self {
        Self {
            prompt: prompt.into(),
            predefined_options: options
                .unwrap_or_default()
                .into_iter()
                .filter(|option| !option.is_empty())
                .collect(),
        }
    }

    /// Build a request from tool-call arguments.
    ///
    /// Expects `{"message": string, "predefined_options": [..]}`. The options
    /// key also accepts `predefinedOptions`. A non-array options value is
    /// treated as absent rather than rejected.
    pub fn from_arguments(arguments: &Value) -> Result<Self, FeedbackError> {
        let prompt = match arguments.get("message") {
            Some(Value::String(message)) => message.clone(),
            Some(_) => {
                return Err(FeedbackError::InvalidRequest(
                    "'message' must be a string".to_string(),
                ))
            }
            None => {
                return Err(FeedbackError::InvalidRequest(
                    "missing required argument 'message'".to_string(),
                ))
            }
        };

        let options = arguments
            .get("predefined_options")
            .or_else(|| arguments.get("predefinedOptions"))
            .and_then(coerce_options);

        Ok(Self::with_options(prompt, options))
    }

    /// Check that every option survives the delimiter-joined launch encoding.
    pub fn validate(&self) -> Result<(), FeedbackError> {
        if let Some(option) = self
            .predefined_options
            .iter()
            .find(|option| option.contains(OPTION_DELIMITER))
        {
            return Err(FeedbackError::InvalidRequest(format!(
                "predefined option {:?} contains the reserved delimiter {:?}",
                option, OPTION_DELIMITER
            )));
        }
        Ok(())
    }
}

/// Coerce a JSON value into an option list, or `None` if it is not list-shaped.
fn coerce_options(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| match item {
                Value::Null => None,
                Value::String(text) => Some(text.clone()),
                other => Some(other.to_string()),
            })
            .collect(),
    )
}

/// The human's answer, as written by the presentation surface.
///
/// `interactive_feedback` is never absent: a human who answers with nothing
/// yields the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedbackResult {
    /// Merged selections and free text
    pub interactive_feedback: String,
}

impl FeedbackResult {
    /// Create a result from already-merged feedback text.
    pub fn new(interactive_feedback: impl Into<String>) -> Self {
        Self {
            interactive_feedback: interactive_feedback.into(),
        }
    }

    /// Whether the human answered with nothing.
    pub fn is_empty(&self) -> bool {
        self.interactive_feedback.is_empty()
    }
}
