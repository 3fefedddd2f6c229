// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! relink CLI - resolve playable stream URLs from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Resolve one source
//! relink resolve https://www.youtube.com/watch?v=XXXX
//!
//! # Several sources, JSON output
//! relink --format json --pretty resolve URL1 URL2 URL3
//!
//! # Ignore the cached stream
//! relink resolve --force URL
//!
//! # Cache and credential status
//! relink status
//!
//! # Strategy order for the current credentials
//! relink plan
//!
//! # Drop one cached stream, or everything
//! relink clear URL
//! relink clear
//! ```

mod app;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{clear, plan, purge, resolve, status};

// ============================================================================
// CLI Definition
// ============================================================================

/// relink CLI - signed media URL resolution.
#[derive(Parser)]
#[command(name = "relink")]
#[command(about = "Resolve playable, validated stream URLs")]
#[command(long_about = r#"
relink turns a page URL into a stream URL a player can open, together with
the headers the player must send.

Strategies are tried in an order chosen from the available credentials.
When every strategy fails, credentials are refreshed once and the
strategies are tried again.

Credentials are read from the credential file (see `relink status`) and
can be overridden with RELINK_USER_AGENT, RELINK_COOKIES,
RELINK_VISITOR_DATA and RELINK_PROOF_TOKEN.

Examples:
  relink resolve URL              # Resolve one source
  relink resolve --force URL      # Bypass the stream cache
  relink --format json resolve A B
  relink status                   # Cache and credential status
  relink plan                     # Strategy order
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Settings file (defaults to the platform config directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Credential file override.
    #[arg(long, global = true)]
    pub credentials: Option<PathBuf>,

    /// Cache directory override.
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Keep caches in memory only.
    #[arg(long, global = true)]
    pub no_persist: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Resolve one or more sources to playable streams.
    #[command(visible_alias = "r")]
    Resolve(resolve::ResolveArgs),

    /// Show cache and credential status.
    #[command(visible_alias = "s")]
    Status,

    /// Show the strategy order for the current credentials.
    #[command(visible_alias = "p")]
    Plan,

    /// Drop one cached stream, or every cache.
    Clear(clear::ClearArgs),

    /// Remove expired cache entries.
    Purge,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// At least one source could not be resolved.
    Unresolved = 2,
    /// Resolution hit its deadline.
    Timeout = 4,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("relink=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("relink=warn"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Resolve(args) => resolve::run(args, &cli).await,
        Commands::Status => status::run(&cli).await,
        Commands::Plan => plan::run(&cli).await,
        Commands::Clear(args) => clear::run(args, &cli).await,
        Commands::Purge => purge::run(&cli).await,
    };

    match result {
        Ok(ExitCode::Success) => Ok(()),
        Ok(code) => std::process::exit(code as i32),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            std::process::exit(ExitCode::Error as i32);
        }
    }
}
