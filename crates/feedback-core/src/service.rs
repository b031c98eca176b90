//! Caller-facing entry point.

use serde_json::Value;
use thiserror::Error;

use crate::config::SurfaceConfig;
use crate::session::{PresentationSession, SessionError};
use crate::types::{FeedbackRequest, FeedbackResult};

/// Errors returned to callers of [`FeedbackService`].
///
/// A failed interaction is always an error, never an empty result, so a
/// caller can tell "the human answered with nothing" from "the interaction
/// failed".
#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Requests feedback from a human through the configured surface.
///
/// Each call allocates its own handoff file and child process, so separate
/// calls share no mutable state.
#[derive(Debug, Clone)]
pub struct FeedbackService {
    config: SurfaceConfig,
}

impl FeedbackService {
    /// Create a service using the given surface configuration.
    pub fn new(config: SurfaceConfig) -> Self {
        Self { config }
    }

    /// The surface configuration in use.
    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    /// Ask the human and block until they answer or the surface fails.
    pub fn request_feedback(
        &self,
        prompt: impl Into<String>,
        predefined_options: Option<Vec<String>>,
    ) -> Result<FeedbackResult, FeedbackError> {
        self.handle(FeedbackRequest::with_options(prompt, predefined_options))
    }

    /// Handle a request built from tool-call arguments.
    pub fn request_from_arguments(&self, arguments: &Value) -> Result<FeedbackResult, FeedbackError> {
        self.handle(FeedbackRequest::from_arguments(arguments)?)
    }

    /// Validate and run one request.
    pub fn handle(&self, request: FeedbackRequest) -> Result<FeedbackResult, FeedbackError> {
        request.validate()?;

        tracing::info!(
            prompt_len = request.prompt.len(),
            options = request.predefined_options.len(),
            "Requesting human feedback"
        );

        let result = PresentationSession::new(&self.config, &request)?.run()?;

        tracing::info!(
            feedback_len = result.interactive_feedback.len(),
            "Received human feedback"
        );
        Ok(result)
    }
}
