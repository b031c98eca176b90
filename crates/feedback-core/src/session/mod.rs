//! One request/response exchange with the presentation surface.
//!
//! A session moves through `Created -> Launched -> Completed | Failed ->
//! Finalized`. Finalization always runs: the handoff file is deleted on
//! every path, including launch failures and timeouts.
//!
//! Nothing here is retried. A human prompt is not idempotent, so failures
//! go back to the caller to decide whether to ask again.

mod handoff;

pub use handoff::{HandoffFile, HANDOFF_FILE_NAME};

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::codec::{self, CodecError};
use crate::config::SurfaceConfig;
use crate::launch::LaunchSpec;
use crate::types::{FeedbackRequest, FeedbackResult};

/// Poll interval while waiting on a surface with a deadline.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Errors from a presentation session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No presentation surface executable configured")]
    NotConfigured,

    #[error("Failed to launch presentation surface {executable:?}: {source}")]
    Launch {
        executable: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Presentation surface exited with {}", describe_exit(.code))]
    SurfaceExit { code: Option<i32> },

    #[error("Presentation surface exited successfully but wrote no result to {path:?}")]
    MissingHandoff { path: PathBuf },

    #[error(transparent)]
    MalformedResult(#[from] CodecError),

    #[error("Handoff file error: {0}")]
    Handoff(#[source] io::Error),

    #[error("Failed waiting for presentation surface: {0}")]
    Wait(#[source] io::Error),

    #[error("No answer within {}", describe_timeout(.after))]
    TimedOut { after: Duration },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

fn describe_timeout(after: &Duration) -> String {
    humantime::format_duration(*after).to_string()
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Handoff path allocated, surface not started
    Created,

    /// Surface process running
    Launched,

    /// Surface exited successfully and its result decoded
    Completed,

    /// Launch, exit status, handoff or decoding failed
    Failed,

    /// Handoff deleted; terminal
    Finalized,
}

/// Drives exactly one exchange with the presentation surface.
pub struct PresentationSession {
    launch: LaunchSpec,
    handoff: HandoffFile,
    timeout: Option<Duration>,
    inherit_stderr: bool,
    state: SessionState,
}

impl PresentationSession {
    /// Allocate a handoff location and prepare the launch.
    pub fn new(config: &SurfaceConfig, request: &FeedbackRequest) -> Result<Self, SessionError> {
        let handoff = HandoffFile::allocate().map_err(SessionError::Handoff)?;
        Self::with_handoff(config, request, handoff)
    }

    /// Prepare a launch around an already-allocated handoff location.
    pub fn with_handoff(
        config: &SurfaceConfig,
        request: &FeedbackRequest,
        handoff: HandoffFile,
    ) -> Result<Self, SessionError> {
        let executable = config
            .executable
            .clone()
            .ok_or(SessionError::NotConfigured)?;

        let launch = LaunchSpec::new(
            executable,
            config.args.clone(),
            request.prompt.clone(),
            &request.predefined_options,
            handoff.path(),
        );

        tracing::debug!(
            handoff = %handoff.path().display(),
            options = request.predefined_options.len(),
            "Presentation session created"
        );

        Ok(Self {
            launch,
            handoff,
            timeout: config.timeout,
            inherit_stderr: config.inherit_stderr,
            state: SessionState::Created,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Where the surface will write its result.
    pub fn handoff_path(&self) -> &Path {
        self.handoff.path()
    }

    /// The launch this session will perform.
    pub fn launch_spec(&self) -> &LaunchSpec {
        &self.launch
    }

    /// Run the exchange, blocking until the surface exits.
    ///
    /// The handoff is finalized before this returns, whatever the outcome.
    pub fn run(mut self) -> Result<FeedbackResult, SessionError> {
        let outcome = self.exchange();

        self.state = match &outcome {
            Ok(_) => SessionState::Completed,
            Err(e) => {
                tracing::warn!(error = %e, "Presentation session failed");
                SessionState::Failed
            }
        };
        tracing::debug!(state = ?self.state, "Presentation session finished");

        self.finalize();
        outcome
    }

    fn exchange(&mut self) -> Result<FeedbackResult, SessionError> {
        let mut child = self
            .launch
            .command(self.inherit_stderr)
            .spawn()
            .map_err(|source| SessionError::Launch {
                executable: self.launch.executable.clone(),
                source,
            })?;
        self.state = SessionState::Launched;

        tracing::info!(
            executable = %self.launch.executable.display(),
            pid = child.id(),
            "Presentation surface launched"
        );

        let status = self.wait(&mut child)?;
        if !status.success() {
            return Err(SessionError::SurfaceExit {
                code: status.code(),
            });
        }

        let bytes = self
            .handoff
            .read()
            .map_err(SessionError::Handoff)?
            .ok_or_else(|| SessionError::MissingHandoff {
                path: self.handoff.path().to_path_buf(),
            })?;

        Ok(codec::decode(&bytes)?)
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus, SessionError> {
        match self.timeout {
            None => child.wait().map_err(SessionError::Wait),
            Some(timeout) => wait_with_deadline(child, timeout),
        }
    }

    fn finalize(self) {
        let Self { handoff, .. } = self;
        let path = handoff.path().to_path_buf();
        if let Err(e) = handoff.finalize() {
            tracing::warn!(handoff = %path.display(), error = %e, "Failed to delete handoff");
        }
        tracing::debug!(state = ?SessionState::Finalized, handoff = %path.display(), "Handoff finalized");
    }
}

/// Wait for the child, killing it once `timeout` has passed.
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Result<ExitStatus, SessionError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().map_err(SessionError::Wait)? {
            return Ok(status);
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::warn!(timeout = ?timeout, pid = child.id(), "Presentation surface timed out, killing");
            let _ = child.kill();
            let _ = child.wait();
            return Err(SessionError::TimedOut { after: timeout });
        }

        thread::sleep(WAIT_POLL_INTERVAL.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_configured() {
        let result = PresentationSession::new(&SurfaceConfig::default(), &FeedbackRequest::new("hi"));
        assert!(matches!(result, Err(SessionError::NotConfigured)));
    }

    #[test]
    fn test_created_state_and_launch_spec() {
        let config = SurfaceConfig::new("/opt/surface").with_args(["surface"]);
        let request =
            FeedbackRequest::with_options("Pick", Some(vec!["A".to_string(), "B".to_string()]));

        let session = PresentationSession::new(&config, &request).unwrap();

        assert_eq!(session.state(), SessionState::Created);
        assert!(!session.handoff_path().exists());
        assert_eq!(session.launch_spec().predefined_options, "A|||B");
        assert_eq!(session.launch_spec().handoff_path(), session.handoff_path());
    }

    #[test]
    fn test_launch_error_cleans_up() {
        let config = SurfaceConfig::new("/nonexistent/interactive-feedback-surface");
        let session = PresentationSession::new(&config, &FeedbackRequest::new("hi")).unwrap();
        let dir = session.handoff_path().parent().unwrap().to_path_buf();

        let result = session.run();

        assert!(matches!(result, Err(SessionError::Launch { .. })));
        assert!(!dir.exists());
    }

    #[test]
    fn test_exit_messages() {
        let err = SessionError::SurfaceExit { code: Some(1) };
        assert_eq!(err.to_string(), "Presentation surface exited with code 1");

        let err = SessionError::SurfaceExit { code: None };
        assert!(err.to_string().contains("signal"));

        let err = SessionError::TimedOut {
            after: Duration::from_secs(90),
        };
        assert_eq!(err.to_string(), "No answer within 1m 30s");
    }
}
