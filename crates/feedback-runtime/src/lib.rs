//! # feedback-runtime
//!
//! Stdio tool server for interactive feedback.
//!
//! Agents speak line-delimited JSON-RPC 2.0 on stdin/stdout and call the
//! single `interactive_feedback` tool. Each call is answered by a
//! [`FeedbackHandler`], normally a [`BlockingFeedbackHandler`] that runs
//! the synchronous `feedback-core` exchange on tokio's blocking pool.
//!
//! ## Example
//!
//! ```rust,ignore
//! use feedback_core::{FeedbackService, SurfaceConfig};
//! use feedback_runtime::{BlockingFeedbackHandler, ToolServer};
//!
//! let service = FeedbackService::new(SurfaceConfig::new("/usr/local/bin/feedback-surface"));
//! ToolServer::new(BlockingFeedbackHandler::new(service))
//!     .serve_stdio()
//!     .await?;
//! ```

use thiserror::Error;

pub mod handler;
pub mod protocol;
pub mod server;

pub use handler::{BlockingFeedbackHandler, FeedbackHandler, HandlerError};
pub use protocol::{IncomingMessage, OutgoingResponse, RpcError, TOOL_NAME};
pub use server::{ServerInfo, ToolServer};

/// Errors that stop the tool server.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Transport I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server task failed: {0}")]
    Task(String),
}
