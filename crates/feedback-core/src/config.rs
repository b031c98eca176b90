//! Presentation surface configuration.
//!
//! Loaded from YAML, then overridden from the environment:
//!
//! ```yaml
//! executable: /usr/local/bin/my-feedback-surface
//! args: []
//! timeout: 10m
//! inherit_stderr: false
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding the surface executable.
pub const SURFACE_ENV: &str = "INTERACTIVE_FEEDBACK_SURFACE";

/// Environment variable overriding the wait timeout (humantime, e.g. `5m`).
pub const TIMEOUT_ENV: &str = "INTERACTIVE_FEEDBACK_TIMEOUT";

/// Errors from loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid duration {value:?}: {reason}")]
    InvalidDuration { value: String, reason: String },
}

/// How to start and supervise the presentation surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Surface executable; `None` until the caller picks a default
    pub executable: Option<PathBuf>,

    /// Arguments placed before the launch contract flags
    pub args: Vec<String>,

    /// Give up waiting for the human after this long (absent waits forever)
    #[serde(with = "duration_humantime")]
    pub timeout: Option<Duration>,

    /// Let the surface's stderr through instead of discarding it
    pub inherit_stderr: bool,
}

mod duration_humantime {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_str(&humantime::format_duration(*d).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = Option::<String>::deserialize(deserializer)?;
        text.map(|t| humantime::parse_duration(&t).map_err(serde::de::Error::custom))
            .transpose()
    }
}

impl SurfaceConfig {
    /// Create a config for a specific surface executable.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: Some(executable.into()),
            ..Default::default()
        }
    }

    /// Set arguments placed before the launch contract flags.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the wait timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Parse a config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse a config from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Apply `INTERACTIVE_FEEDBACK_*` environment overrides.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_overrides(
            std::env::var_os(SURFACE_ENV).map(PathBuf::from),
            std::env::var(TIMEOUT_ENV).ok(),
        )
    }

    /// Apply explicit overrides; `None` leaves a field untouched.
    ///
    /// Setting the executable clears `args`, since they belonged to the
    /// previous executable.
    pub fn apply_overrides(
        mut self,
        executable: Option<PathBuf>,
        timeout: Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(executable) = executable.filter(|p| !p.as_os_str().is_empty()) {
            self.executable = Some(executable);
            self.args.clear();
        }
        if let Some(timeout) = timeout {
            self.timeout = Some(parse_duration(&timeout)?);
        }
        Ok(self)
    }

    /// Fill in the surface executable if none is configured.
    pub fn or_default_surface<I, S>(mut self, executable: PathBuf, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.executable.is_none() {
            self.executable = Some(executable);
            self.args = args.into_iter().map(Into::into).collect();
        }
        self
    }
}

/// Parse a humantime duration such as `90s` or `5m`.
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|e| ConfigError::InvalidDuration {
        value: value.to_string(),
        reason: e.to_string(),
    })
}
