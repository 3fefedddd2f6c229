//! Wires settings, providers and the resolver for one CLI invocation.

use anyhow::{Context, Result};
use relink_fetch::FetchContext;
use relink_providers::{CommandExtractor, FileTokenProvider};
use relink_resolver::Resolver;
use relink_store::{Settings, default_settings_path};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::Cli;

/// Everything a command needs.
pub struct App {
    pub settings: Settings,
    pub settings_path: PathBuf,
    pub resolver: Resolver,
}

impl App {
    /// Loads settings, applies command-line overrides and builds the resolver.
    pub async fn load(cli: &Cli) -> Result<Self> {
        let settings_path = cli.config.clone().unwrap_or_else(default_settings_path);
        let mut settings = Settings::load(&settings_path)
            .await
            .with_context(|| format!("loading {}", settings_path.display()))?;
        apply_overrides(&mut settings, cli);
        settings.validate().context("invalid settings")?;

        let ctx = FetchContext::with_settings(settings.fetch_settings())
            .context("building HTTP client")?;
        let extractor = CommandExtractor::new(&ctx);
        let tokens = FileTokenProvider::from_env(settings.credentials_file());
        let validator = ctx.validator(settings.validation_policy());

        debug!(
            settings = %settings_path.display(),
            cache_dir = %settings.cache_dir().display(),
            credentials = %settings.credentials_file().display(),
            "Building resolver"
        );

        let resolver = Resolver::from_settings(
            &settings,
            Arc::new(extractor),
            Arc::new(tokens),
            Arc::new(validator),
        )
        .await;

        Ok(Self {
            settings,
            settings_path,
            resolver,
        })
    }
}

fn apply_overrides(settings: &mut Settings, cli: &Cli) {
    if let Some(path) = &cli.credentials {
        settings.credentials_file = Some(path.clone());
    }
    if let Some(dir) = &cli.cache_dir {
        settings.cache_dir = Some(dir.clone());
    }
    if cli.no_persist {
        settings.persist_cache = false;
    }
}
