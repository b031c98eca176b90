//! The seam between the tool server and whatever actually asks the human.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use feedback_core::{FeedbackError, FeedbackRequest, FeedbackResult, FeedbackService};

/// Errors from a feedback handler.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error(transparent)]
    Feedback(#[from] FeedbackError),

    #[error("Feedback task failed: {0}")]
    Task(String),
}

/// Answers feedback requests on behalf of the tool server.
///
/// Implementations may block for as long as the human takes.
#[async_trait]
pub trait FeedbackHandler: Send + Sync {
    /// Ask the human and return their answer.
    async fn request_feedback(&self, request: FeedbackRequest)
        -> Result<FeedbackResult, HandlerError>;
}

/// Runs the blocking [`FeedbackService`] on tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct BlockingFeedbackHandler {
    service: Arc<FeedbackService>,
}

impl BlockingFeedbackHandler {
    /// Wrap a feedback service.
    pub fn new(service: FeedbackService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

#[async_trait]
impl FeedbackHandler for BlockingFeedbackHandler {
    async fn request_feedback(
        &self,
        request: FeedbackRequest,
    ) -> Result<FeedbackResult, HandlerError> {
        let service = Arc::clone(&self.service);
        tokio::task::spawn_blocking(move || service.handle(request))
            .await
            .map_err(|e| HandlerError::Task(e.to_string()))?
            .map_err(HandlerError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedback_core::{SessionError, SurfaceConfig};

    #[tokio::test]
    async fn test_blocking_handler_surfaces_errors() {
        let handler = BlockingFeedbackHandler::new(FeedbackService::new(SurfaceConfig::new(
            "/nonexistent/interactive-feedback-surface",
        )));

        let result = handler.request_feedback(FeedbackRequest::new("hi")).await;

        assert!(matches!(
            result,
            Err(HandlerError::Feedback(FeedbackError::Session(
                SessionError::Launch { .. }
            )))
        ));
    }
}
