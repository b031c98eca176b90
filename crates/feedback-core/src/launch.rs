//! How the presentation surface is started.
//!
//! The surface receives three values on its command line: the prompt, the
//! predefined options joined with [`OPTION_DELIMITER`], and the handoff path.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Delimiter joining predefined options into one argument.
pub const OPTION_DELIMITER: &str = "|||";

/// Flag carrying the prompt text.
pub const PROMPT_FLAG: &str = "--prompt";

/// Flag carrying the joined predefined options.
pub const OPTIONS_FLAG: &str = "--predefined-options";

/// Flag carrying the handoff file path.
pub const OUTPUT_FLAG: &str = "--output-file";

/// Join options for the launch command line.
pub fn join_options(options: &[String]) -> String {
    options.join(OPTION_DELIMITER)
}

/// Split a joined options argument, discarding empty segments.
pub fn split_options(joined: &str) -> Vec<String> {
    joined
        .split(OPTION_DELIMITER)
        .filter(|option| !option.is_empty())
        .map(str::to_string)
        .collect()
}

/// Everything needed to start one presentation surface process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Surface executable
    pub executable: PathBuf,

    /// Arguments placed before the contract flags (e.g. a subcommand)
    pub args: Vec<String>,

    /// Prompt text, verbatim
    pub prompt: String,

    /// Options joined with [`OPTION_DELIMITER`]
    pub predefined_options: String,

    /// Where the surface must write its result
    pub handoff_path: PathBuf,
}

impl LaunchSpec {
    /// Build a launch spec.
    pub fn new(
        executable: impl Into<PathBuf>,
        args: Vec<String>,
        prompt: impl Into<String>,
        options: &[String],
        handoff_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            executable: executable.into(),
            args,
            prompt: prompt.into(),
            predefined_options: join_options(options),
            handoff_path: handoff_path.into(),
        }
    }

    /// The full argument vector after the executable.
    pub fn arguments(&self) -> Vec<OsString> {
        let mut argv: Vec<OsString> = self.args.iter().map(OsString::from).collect();
        argv.push(PROMPT_FLAG.into());
        argv.push(self.prompt.clone().into());
        argv.push(OPTIONS_FLAG.into());
        argv.push(self.predefined_options.clone().into());
        argv.push(OUTPUT_FLAG.into());
        argv.push(self.handoff_path.clone().into_os_string());
        argv
    }

    /// Build the process command.
    ///
    /// Stdin and stdout are always null: the caller's stdout may be a
    /// protocol stream. Stderr is discarded unless `inherit_stderr` is set.
    pub fn command(&self, inherit_stderr: bool) -> Command {
        let mut command = Command::new(&self.executable);
        command
            .args(self.arguments())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(if inherit_stderr {
                Stdio::inherit()
            } else {
                Stdio::null()
            });
        command
    }

    /// The handoff path passed to the surface.
    pub fn handoff_path(&self) -> &Path {
        &self.handoff_path
    }
}
