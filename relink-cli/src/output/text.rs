//! Text output formatting with colors.

use relink_core::{CacheStats, ResolvedStream, ResolverStatus};
use relink_fetch::StrategyDescriptor;
use relink_resolver::{PurgeReport, ResolveError};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Formats a resolved stream.
    pub fn format_stream(&self, source: &str, stream: &ResolvedStream) -> String {
        let mut lines = vec![
            format!("{} {}", self.green("✓"), self.bold(source)),
            format!("  url:      {}", stream.url),
            format!(
                "  strategy: {} {}",
                stream.strategy_used,
                self.dim(&format!("({})", stream.url_kind))
            ),
        ];
        for (name, value) in stream.headers.iter() {
            lines.push(format!("  {}", self.dim(&format!("{name}: {}", redact(name, value)))));
        }
        lines.push(format!("  player:   {}", stream.player_url()));
        lines.join("\n")
    }

    /// Formats a failed resolution with its attempts.
    pub fn format_failure(&self, source: &str, error: &ResolveError) -> String {
        let mut lines = vec![format!("{} {}", self.red("✗"), self.bold(source))];
        lines.push(format!("  {error}"));
        for attempt in error.attempts() {
            lines.push(format!("  {}", self.dim(&attempt.to_string())));
        }
        lines.join("\n")
    }

    /// Formats the status report.
    pub fn format_status(&self, status: &ResolverStatus, cache_dir: &str, credentials: &str) -> String {
        let mut lines = vec![
            self.bold("relink status"),
            "─".repeat(40),
            format!("Streams:      {}", format_stats(status.streams)),
            format!("Credentials:  {}", format_stats(status.tokens)),
        ];

        let freshness = match (status.credentials_fresh, status.credential_age_secs) {
            (true, Some(age)) => self.green(&format!("fresh ({})", format_age(age))),
            (false, Some(age)) => self.yellow(&format!("expired ({})", format_age(age))),
            _ => self.dim("none cached"),
        };
        lines.push(format!("  bundle:     {freshness}"));
        lines.push(format!(
            "  proof token: {}",
            if status.has_proof_token { "yes" } else { "no" }
        ));
        if let Some(warning) = &status.credential_warning {
            lines.push(format!("  {}", self.yellow(&format!("warning: {warning}"))));
        }

        lines.push(String::new());
        lines.push(format!("Cache dir:    {cache_dir}"));
        lines.push(format!("Credentials:  {credentials}"));
        lines.join("\n")
    }

    /// Formats a strategy plan.
    pub fn format_plan(&self, plan: &[StrategyDescriptor]) -> String {
        plan.iter()
            .enumerate()
            .map(|(i, s)| {
                let requires: Vec<&str> = s.required_fields.iter().map(|f| f.display_name()).collect();
                let requires = if requires.is_empty() {
                    self.dim("no credentials")
                } else {
                    self.dim(&format!("needs {}", requires.join(", ")))
                };
                format!("{}. {:<20} {:<11} {}", i + 1, s.name, s.profile.backend.display_name(), requires)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Formats a purge report.
    pub fn format_purge(&self, report: PurgeReport) -> String {
        format!(
            "Purged {} expired stream(s) and {} expired credential bundle(s)",
            report.streams, report.tokens
        )
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Cookies are shortened in text output; JSON output carries them in full.
pub(crate) fn redact(name: &str, value: &str) -> String {
    const KEEP: usize = 12;
    if name.eq_ignore_ascii_case("cookie") && value.chars().count() > KEEP {
        let head: String = value.chars().take(KEEP).collect();
        format!("{head}…")
    } else {
        value.to_string()
    }
}

pub(crate) fn format_stats(stats: CacheStats) -> String {
    if stats.expired() == 0 {
        format!("{} live", stats.live)
    } else {
        format!("{} live, {} expired", stats.live, stats.expired())
    }
}

pub(crate) fn format_age(secs: u64) -> String {
    match secs {
        s if s < 60 => format!("{s}s old"),
        s if s < 3600 => format!("{}m old", s / 60),
        s => format!("{}h {}m old", s / 3600, (s % 3600) / 60),
    }
}
