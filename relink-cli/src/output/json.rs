//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use relink_core::{ResolvedStream, ResolverStatus, SourceRef};
use relink_fetch::StrategyDescriptor;
use relink_resolver::{AttemptRecord, ResolveError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for one source.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveOutput {
    pub source: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<StreamOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<AttemptOutput>,
}

/// A resolved stream.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamOutput {
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub strategy: String,
    pub url_kind: String,
    pub player_url: String,
    pub resolved_at: DateTime<Utc>,
}

/// One strategy attempt.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptOutput {
    pub strategy: String,
    pub pass: String,
    pub duration_ms: u64,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// One planned strategy.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanEntryOutput {
    pub name: String,
    pub backend: String,
    pub client: String,
    pub requires: Vec<String>,
}

/// Status report with the paths in use.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOutput<'a> {
    #[serde(flatten)]
    pub status: &'a ResolverStatus,
    pub cache_dir: String,
    pub credentials_file: String,
    pub persist_cache: bool,
}

// ============================================================================
// Conversions
// ============================================================================

impl From<&ResolvedStream> for StreamOutput {
    fn from(stream: &ResolvedStream) -> Self {
        Self {
            url: stream.url.clone(),
            headers: stream
                .headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            strategy: stream.strategy_used.clone(),
            url_kind: stream.url_kind.display_name().to_string(),
            player_url: stream.player_url(),
            resolved_at: stream.resolved_at,
        }
    }
}

impl From<&AttemptRecord> for AttemptOutput {
    fn from(record: &AttemptRecord) -> Self {
        Self {
            strategy: record.strategy.clone(),
            pass: record.pass.display_name().to_string(),
            duration_ms: u64::try_from(record.duration.as_millis()).unwrap_or(u64::MAX),
            outcome: record.outcome.to_string(),
            status: record.status(),
        }
    }
}

impl From<&StrategyDescriptor> for PlanEntryOutput {
    fn from(strategy: &StrategyDescriptor) -> Self {
        Self {
            name: strategy.name.clone(),
            backend: strategy.profile.backend.display_name().to_string(),
            client: strategy.profile.client.clone(),
            requires: strategy
                .required_fields
                .iter()
                .map(|f| f.display_name().to_string())
                .collect(),
        }
    }
}

impl ResolveOutput {
    /// Builds the output for one resolution result.
    pub fn new(source: &SourceRef, result: &Result<Arc<ResolvedStream>, ResolveError>) -> Self {
        match result {
            Ok(stream) => Self {
                source: source.key().to_string(),
                ok: true,
                stream: Some(StreamOutput::from(stream.as_ref())),
                error: None,
                attempts: Vec::new(),
            },
            Err(e) => Self {
                source: source.key().to_string(),
                ok: false,
                stream: None,
                error: Some(e.to_string()),
                attempts: e.attempts().iter().map(AttemptOutput::from).collect(),
            },
        }
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats resolution results. A single result is printed as an object.
    pub fn format_results(&self, outputs: &[ResolveOutput]) -> Result<String> {
        if let [single] = outputs {
            self.format(single)
        } else {
            self.format(&outputs)
        }
    }

    /// Formats a strategy plan.
    pub fn format_plan(&self, plan: &[StrategyDescriptor]) -> Result<String> {
        let entries: Vec<PlanEntryOutput> = plan.iter().map(PlanEntryOutput::from).collect();
        self.format(&entries)
    }
}
