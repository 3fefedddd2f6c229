//! Status command - cache and credential diagnostics.

use anyhow::Result;

use crate::app::App;
use crate::output::{JsonFormatter, StatusOutput, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Runs the status command.
pub async fn run(cli: &Cli) -> Result<ExitCode> {
    let app = App::load(cli).await?;
    let status = app.resolver.report_status().await;
    let cache_dir = app.settings.cache_dir().display().to_string();
    let credentials = app.settings.credentials_file().display().to_string();

    match cli.format {
        OutputFormat::Json => {
            let output = StatusOutput {
                status: &status,
                cache_dir,
                credentials_file: credentials,
                persist_cache: app.settings.persist_cache,
            };
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_status(&status, &cache_dir, &credentials));
            if !app.settings.persist_cache {
                println!("Persistence:  disabled");
            }
            println!("Settings:     {}", app.settings_path.display());
        }
    }

    Ok(ExitCode::Success)
}
