//! # feedback-core
//!
//! Pause an automated agent, ask a human, resume with the answer.
//!
//! The human is reached through a *presentation surface*: a separate
//! process that renders the prompt and options and writes the answer into a
//! handoff file. This crate owns everything on the caller's side of that
//! boundary.
//!
//! ## Key Guarantees
//!
//! 1. **One exchange per call**: synchronous, blocking, no retries
//! 2. **Always cleaned up**: the handoff file is deleted on every path
//! 3. **Failures are errors**: an empty answer only comes from a human
//! 4. **Isolated sessions**: unique handoff per call, no shared state
//!
//! ## Example
//!
//! ```rust,ignore
//! use feedback_core::{FeedbackService, SurfaceConfig};
//!
//! let service = FeedbackService::new(SurfaceConfig::new("/usr/local/bin/feedback-surface"));
//! let result = service.request_feedback("Ship it?", Some(vec!["Yes".into(), "No".into()]))?;
//! println!("{}", result.interactive_feedback);
//! ```

pub mod codec;
pub mod config;
pub mod launch;
pub mod merge;
pub mod service;
pub mod session;
pub mod types;

// Re-export main types at crate root
pub use codec::{decode, encode, write_handoff, CodecError};
pub use config::{ConfigError, SurfaceConfig};
pub use launch::{join_options, split_options, LaunchSpec, OPTION_DELIMITER};
pub use merge::{merge, selected_options};
pub use service::{FeedbackError, FeedbackService};
pub use session::{HandoffFile, PresentationSession, SessionError, SessionState};
pub use types::{FeedbackRequest, FeedbackResult};
