//! Command-line extraction provider.
//!
//! Dispatches each strategy to the backend named in its client profile,
//! runs the backend through the shared [`ProcessRunner`] and parses its JSON
//! output. Backend failures become [`ExtractionOutcome::Failed`] with the
//! backend's own error line as the reason.

use async_trait::async_trait;
use relink_core::{CredentialBundle, SourceRef};
use relink_fetch::host::process::commands;
use relink_fetch::{
    Backend, ExtractionOutcome, ExtractionProvider, FetchContext, ProcessRunner, RawExtraction,
    StrategyDescriptor,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::ProviderError;
use crate::{streamlink, ytdlp};

// ============================================================================
// Backend Command
// ============================================================================

/// How a backend is invoked: a program plus arguments placed before the
/// per-attempt ones (e.g. `python3 -m yt_dlp`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCommand {
    /// Program name or path.
    pub program: String,
    /// Arguments inserted before the generated ones.
    pub leading_args: Vec<String>,
}

impl BackendCommand {
    /// Creates a command for the given program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Adds leading arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Default command for a backend.
    pub fn default_for(backend: Backend) -> Self {
        match backend {
            Backend::YtDlp => Self::new(commands::YT_DLP),
            Backend::Streamlink => Self::new(commands::STREAMLINK),
        }
    }

    fn args_with(&self, generated: Vec<String>) -> Vec<String> {
        let mut args = self.leading_args.clone();
        args.extend(generated);
        args
    }
}

// ============================================================================
// Command Extractor
// ============================================================================

/// Extraction provider backed by the `yt-dlp` and `streamlink` commands.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    process: Arc<ProcessRunner>,
    timeout: Duration,
    ytdlp: BackendCommand,
    streamlink: BackendCommand,
}

impl CommandExtractor {
    /// Creates an extractor using the context's process runner and extraction timeout.
    pub fn new(ctx: &FetchContext) -> Self {
        Self {
            process: Arc::clone(&ctx.process),
            timeout: ctx.settings.extraction_timeout,
            ytdlp: BackendCommand::default_for(Backend::YtDlp),
            streamlink: BackendCommand::default_for(Backend::Streamlink),
        }
    }

    /// Overrides how a backend is invoked.
    pub fn with_command(mut self, backend: Backend, command: BackendCommand) -> Self {
        match backend {
            Backend::YtDlp => self.ytdlp = command,
            Backend::Streamlink => self.streamlink = command,
        }
        self
    }

    /// Overrides the per-command timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Command used for a backend.
    pub fn command(&self, backend: Backend) -> &BackendCommand {
        match backend {
            Backend::YtDlp => &self.ytdlp,
            Backend::Streamlink => &self.streamlink,
        }
    }

    /// Returns true if the backend's program can be found.
    pub fn is_available(&self, backend: Backend) -> bool {
        self.process.command_exists(&self.command(backend).program)
    }

    /// Runs one strategy and parses the backend output.
    pub async fn extract(
        &self,
        strategy: &StrategyDescriptor,
        source: &SourceRef,
        bundle: &CredentialBundle,
    ) -> Result<RawExtraction, ProviderError> {
        let profile = &strategy.profile;
        match profile.backend {
            Backend::YtDlp => {
                let args = ytdlp::build_args(profile, source, bundle);
                let output = self.run(Backend::YtDlp, args).await?;
                let stdout = output
                    .stdout_if_success()
                    .map_err(|e| ProviderError::from_process(commands::YT_DLP, e))?;
                ytdlp::parse_info(stdout)
            }
            Backend::Streamlink => {
                let args = streamlink::build_args(profile, source, bundle);
                let output = self.run(Backend::Streamlink, args).await?;
                // streamlink reports failures as a JSON document on stdout.
                if !output.success() {
                    if let Some(message) = streamlink::parse_error(&output.stdout) {
                        return Err(ProviderError::BackendFailed {
                            backend: commands::STREAMLINK.to_string(),
                            code: output.exit_code,
                            message,
                        });
                    }
                }
                let stdout = output
                    .stdout_if_success()
                    .map_err(|e| ProviderError::from_process(commands::STREAMLINK, e))?;
                streamlink::parse_output(stdout, streamlink::preferred_quality(profile))
            }
        }
    }

    async fn run(
        &self,
        backend: Backend,
        generated: Vec<String>,
    ) -> Result<relink_fetch::ProcessOutput, ProviderError> {
        let command = self.command(backend);
        let args = command.args_with(generated);
        debug!(backend = %backend, program = %command.program, "Running backend");
        self.process
            .run_with_timeout(&command.program, &args, self.timeout)
            .await
            .map_err(|e| ProviderError::from_process(backend.display_name(), e))
    }
}

#[async_trait]
impl ExtractionProvider for CommandExtractor {
    #[instrument(skip_all, fields(strategy = %strategy.name, source = %source.key()))]
    async fn attempt(
        &self,
        strategy: &StrategyDescriptor,
        source: &SourceRef,
        bundle: &CredentialBundle,
    ) -> ExtractionOutcome {
        match self.extract(strategy, source, bundle).await {
            Ok(raw) => ExtractionOutcome::Resolved(raw),
            Err(e) => {
                warn!(error = %e, "Backend extraction failed");
                ExtractionOutcome::failed(e.to_string())
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
