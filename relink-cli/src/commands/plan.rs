//! Plan command - show the strategy order.

use anyhow::Result;

use crate::app::App;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Runs the plan command.
///
/// Uses the cached credential bundle, or the anonymous one when none is
/// cached. The token provider is never called.
pub async fn run(cli: &Cli) -> Result<ExitCode> {
    let app = App::load(cli).await?;
    let plan = app.resolver.plan_preview().await;

    match cli.format {
        OutputFormat::Json => println!("{}", JsonFormatter::new(cli.pretty).format_plan(&plan)?),
        OutputFormat::Text => println!("{}", TextFormatter::new(!cli.no_color).format_plan(&plan)),
    }

    Ok(ExitCode::Success)
}
