//! Subprocess execution for extraction backends.
//!
//! Backends such as `yt-dlp` and `streamlink` are driven as external
//! commands. Every run is bounded by a timeout and the child is killed when
//! the timeout fires.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::error::ProcessError;

// ============================================================================
// Process Output
// ============================================================================

/// Output from a process execution.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Standard output content.
    pub stdout: String,
    /// Standard error content.
    pub stderr: String,
    /// Exit code (0 = success).
    pub exit_code: i32,
    /// How long the command took to execute.
    pub duration: Duration,
}

impl ProcessOutput {
    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the stdout if successful, otherwise an error.
    pub fn stdout_if_success(&self) -> Result<&str, ProcessError> {
        if self.success() {
            Ok(&self.stdout)
        } else {
            Err(ProcessError::NonZeroExit {
                code: self.exit_code,
                stderr: last_line(&self.stderr),
            })
        }
    }
}

/// Backends print progress noise before the real error; keep the tail.
fn last_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or_default()
        .trim()
        .to_string()
}

// ============================================================================
// Process Runner
// ============================================================================

/// Runs backend commands.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Creates a new process runner.
    pub fn new() -> Self {
        Self
    }

    /// Run a command with a timeout.
    #[instrument(skip(self, args), fields(cmd = %cmd, timeout = ?timeout))]
    pub async fn run_with_timeout(
        &self,
        cmd: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError> {
        debug!(args = args.len(), "Running command");

        let cmd_path = self.which(cmd).ok_or_else(|| {
            warn!(cmd = %cmd, "Command not found");
            ProcessError::NotFound(cmd.to_string())
        })?;

        let start = Instant::now();

        let mut command = Command::new(&cmd_path);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, command.output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(cmd = %cmd, timeout = ?timeout, "Command timed out");
                return Err(ProcessError::Timeout(timeout));
            }
        };

        let duration = start.elapsed();
        let exit_code = output.status.code().unwrap_or(-1);

        let result = ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code,
            duration,
        };

        debug!(
            exit_code = exit_code,
            duration = ?duration,
            stdout_len = result.stdout.len(),
            stderr_len = result.stderr.len(),
            "Command completed"
        );

        Ok(result)
    }

    /// Check if a command exists on PATH.
    pub fn command_exists(&self, cmd: &str) -> bool {
        self.which(cmd).is_some()
    }

    /// Find the path to a command.
    pub fn which(&self, cmd: &str) -> Option<PathBuf> {
        which::which(cmd).ok()
    }
}

// ============================================================================
// Backend Commands
// ============================================================================

/// Extraction backend command names.
pub mod commands {
    /// `yt-dlp`.
    pub const YT_DLP: &str = "yt-dlp";
    /// `streamlink`.
    pub const STREAMLINK: &str = "streamlink";
}

// ============================================================================
// Tests
// ============================================================================
