//! Clear command - drop cached streams and credentials.

use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::app::App;
use crate::output::JsonFormatter;
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the clear command.
#[derive(Args)]
pub struct ClearArgs {
    /// Source whose cached stream is dropped. Without it every cache is cleared.
    pub url: Option<String>,
}

/// Runs the clear command.
pub async fn run(args: &ClearArgs, cli: &Cli) -> Result<ExitCode> {
    let app = App::load(cli).await?;

    let (message, removed) = match &args.url {
        Some(url) => {
            let removed = app.resolver.invalidate(url).await;
            let message = if removed {
                format!("Dropped cached stream for {}", url.trim())
            } else {
                format!("No cached stream for {}", url.trim())
            };
            (message, removed)
        }
        None => {
            app.resolver.invalidate_all().await;
            ("Cleared stream and credential caches".to_string(), true)
        }
    };

    match cli.format {
        OutputFormat::Json => {
            let output = json!({ "source": args.url, "removed": removed });
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{message}");
            }
        }
    }

    Ok(ExitCode::Success)
}
