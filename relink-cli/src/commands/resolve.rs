//! Resolve command - turn sources into playable streams.

use anyhow::Result;
use clap::Args;
use relink_core::SourceRef;
use relink_resolver::ResolveError;
use tracing::info;

use crate::app::App;
use crate::output::{JsonFormatter, ResolveOutput, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the resolve command.
#[derive(Args)]
pub struct ResolveArgs {
    /// Source URLs to resolve.
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Ignore cached streams (credentials stay cached).
    #[arg(long)]
    pub force: bool,

    /// Sources resolved at once (defaults to the configured concurrency).
    #[arg(long, short = 'j')]
    pub concurrency: Option<usize>,

    /// Print only the player URL (`url|Header=value&...`) per line.
    #[arg(long)]
    pub player: bool,
}

/// Runs the resolve command.
pub async fn run(args: &ResolveArgs, cli: &Cli) -> Result<ExitCode> {
    let app = App::load(cli).await?;
    let sources: Vec<SourceRef> = args.urls.iter().map(SourceRef::from_url).collect();
    let concurrency = args.concurrency.unwrap_or(app.settings.concurrency);

    info!(sources = sources.len(), force = args.force, concurrency, "Resolving");

    let results = app
        .resolver
        .resolve_many(&sources, args.force, concurrency)
        .await;

    if args.player {
        for result in &results {
            match result {
                Ok(stream) => println!("{}", stream.player_url()),
                Err(_) => println!(),
            }
        }
    } else {
        match cli.format {
            OutputFormat::Json => {
                let outputs: Vec<ResolveOutput> = sources
                    .iter()
                    .zip(&results)
                    .map(|(source, result)| ResolveOutput::new(source, result))
                    .collect();
                println!("{}", JsonFormatter::new(cli.pretty).format_results(&outputs)?);
            }
            OutputFormat::Text => {
                let formatter = TextFormatter::new(!cli.no_color);
                let blocks: Vec<String> = sources
                    .iter()
                    .zip(&results)
                    .map(|(source, result)| match result {
                        Ok(stream) => formatter.format_stream(source.key(), stream),
                        Err(e) => formatter.format_failure(source.key(), e),
                    })
                    .collect();
                println!("{}", blocks.join("\n\n"));
            }
        }
    }

    Ok(exit_code(&results))
}

/// Success only if every source resolved; all-timeout runs report a timeout.
fn exit_code<T>(results: &[Result<T, ResolveError>]) -> ExitCode {
    let failures: Vec<&ResolveError> = results.iter().filter_map(|r| r.as_ref().err()).collect();
    if failures.is_empty() {
        ExitCode::Success
    } else if failures.iter().all(|e| matches!(e, ResolveError::Timeout { .. })) {
        ExitCode::Timeout
    } else {
        ExitCode::Unresolved
    }
}
