//! Purge command - remove expired cache entries.

use anyhow::Result;
use serde_json::json;

use crate::app::App;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Runs the purge command.
pub async fn run(cli: &Cli) -> Result<ExitCode> {
    let app = App::load(cli).await?;
    let report = app.resolver.purge_expired().await;

    match cli.format {
        OutputFormat::Json => {
            let output = json!({ "streams": report.streams, "tokens": report.tokens });
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", TextFormatter::new(!cli.no_color).format_purge(report));
            }
        }
    }

    Ok(ExitCode::Success)
}
