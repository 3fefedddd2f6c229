//! One pass over an ordered strategy list.
//!
//! Strategies run sequentially: each attempt hits the same upstream, and
//! running them in parallel invites rate limiting. The pass stops at the
//! first candidate that validates.

use relink_core::{CredentialBundle, ResolvedStream, SourceRef};
use relink_fetch::{
    ExtractionOutcome, ExtractionProvider, FetchSettings, StrategyDescriptor, StreamValidator,
    build_headers, select_candidate,
};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::error::{AttemptOutcome, AttemptRecord, Pass};

/// Runs strategies against one source until one validates.
pub struct StrategyPass<'a> {
    extractor: &'a dyn ExtractionProvider,
    validator: &'a dyn StreamValidator,
    settings: &'a FetchSettings,
}

impl<'a> StrategyPass<'a> {
    /// Creates a pass over the given provider and validator.
    pub fn new(
        extractor: &'a dyn ExtractionProvider,
        validator: &'a dyn StreamValidator,
        settings: &'a FetchSettings,
    ) -> Self {
        Self {
            extractor,
            validator,
            settings,
        }
    }

    /// Tries `strategies` in order, appending one record per attempt.
    ///
    /// Records are pushed as each attempt finishes, so a caller that drops
    /// this future on a deadline still sees every completed attempt.
    #[instrument(skip_all, fields(source = %source.key(), pass = %pass))]
    pub async fn run(
        &self,
        pass: Pass,
        strategies: &[StrategyDescriptor],
        source: &SourceRef,
        bundle: &CredentialBundle,
        attempts: &mut Vec<AttemptRecord>,
    ) -> Option<ResolvedStream> {
        for strategy in strategies {
            let started = Instant::now();
            let (outcome, stream) = self.attempt(strategy, source, bundle).await;
            let duration = started.elapsed();

            match &outcome {
                AttemptOutcome::Validated { method } => {
                    info!(strategy = %strategy.name, %method, ?duration, "Strategy validated");
                }
                AttemptOutcome::StrategyFailed { cause } => {
                    warn!(strategy = %strategy.name, cause = %cause, ?duration, "Strategy failed");
                }
                AttemptOutcome::ValidationFailed { status } => {
                    warn!(strategy = %strategy.name, ?status, ?duration, "Candidate rejected");
                }
            }

            attempts.push(AttemptRecord {
                strategy: strategy.name.clone(),
                pass,
                duration,
                outcome,
            });
            if stream.is_some() {
                return stream;
            }
        }
        debug!(tried = strategies.len(), "Pass exhausted");
        None
    }

    async fn attempt(
        &self,
        strategy: &StrategyDescriptor,
        source: &SourceRef,
        bundle: &CredentialBundle,
    ) -> (AttemptOutcome, Option<ResolvedStream>) {
        let timeout = self.settings.extraction_timeout;
        let raw = match tokio::time::timeout(timeout, self.extractor.attempt(strategy, source, bundle))
            .await
        {
            Ok(ExtractionOutcome::Resolved(raw)) => raw,
            Ok(ExtractionOutcome::Failed { reason }) => return failed(reason),
            Err(_) => return failed(format!("extraction timed out after {timeout:?}")),
        };

        let Some(candidate) = select_candidate(&raw) else {
            return failed("no usable URL in extraction result");
        };
        let headers = build_headers(&raw, bundle, &self.settings.header_defaults());
        debug!(strategy = %strategy.name, kind = %candidate.kind, "Validating candidate");

        let validation = self
            .validator
            .validate(&candidate.url, &headers, self.settings.probe_timeout)
            .await;
        if !validation.ok {
            return (
                AttemptOutcome::ValidationFailed {
                    status: validation.status,
                },
                None,
            );
        }

        match ResolvedStream::new(
            source.key(),
            candidate.url,
            headers,
            strategy.name.clone(),
            candidate.kind,
        ) {
            Ok(stream) => (
                AttemptOutcome::Validated {
                    method: validation.method,
                },
                Some(stream),
            ),
            Err(e) => failed(e.to_string()),
        }
    }
}

fn failed(cause: impl Into<String>) -> (AttemptOutcome, Option<ResolvedStream>) {
    (
        AttemptOutcome::StrategyFailed {
            cause: cause.into(),
        },
        None,
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockExtractor, MockValidator, manifest};
    use relink_core::UrlKind;
    use relink_fetch::{StrategyPlanner, Validation};
    use std::time::Duration;

    fn plan() -> Vec<StrategyDescriptor> {
        StrategyPlanner::default().plan(&CredentialBundle::new("UA"))
    }

    #[tokio::test]
    async fn test_first_validating_strategy_wins() {
        let extractor = MockExtractor::new()
            .with("tv_embedded", ExtractionOutcome::failed("HTTP 429"))
            .with("ios", manifest("https://cdn.example/ios.m3u8"))
            .with("web.pot.noauth", manifest("https://cdn.example/web.m3u8"));
        let validator = MockValidator::accepting();
        let settings = FetchSettings::default();
        let mut attempts = Vec::new();

        let stream = StrategyPass::new(&extractor, &validator, &settings)
            .run(
                Pass::First,
                &plan(),
                &SourceRef::from_url("https://yt/live"),
                &CredentialBundle::new("UA").with_cookies("SID=1"),
                &mut attempts,
            )
            .await
            .unwrap();

        assert_eq!(stream.strategy_used, "ios");
        assert_eq!(stream.url_kind, UrlKind::Manifest);
        assert_eq!(stream.headers.get("Cookie"), Some("SID=1"));
        assert_eq!(attempts.len(), 2);
        assert!(!attempts[0].is_success());
        assert!(attempts[1].is_success());
        assert_eq!(extractor.calls(), vec!["tv_embedded", "ios"]);
    }

    #[tokio::test]
    async fn test_rejected_candidate_recorded_with_status() {
        let extractor = MockExtractor::new().with_default(manifest("https://cdn.example/x.m3u8"));
        let validator = MockValidator::rejecting(403);
        let settings = FetchSettings::default();
        let mut attempts = Vec::new();

        let stream = StrategyPass::new(&extractor, &validator, &settings)
            .run(
                Pass::Refresh,
                &plan(),
                &SourceRef::from_url("https://yt/live"),
                &CredentialBundle::new("UA"),
                &mut attempts,
            )
            .await;

        assert!(stream.is_none());
        assert_eq!(attempts.len(), 4);
        assert!(attempts.iter().all(|a| a.status() == Some(403) && a.pass == Pass::Refresh));
    }

    #[tokio::test]
    async fn test_empty_extraction_is_a_strategy_failure() {
        let extractor = MockExtractor::new()
            .with_default(ExtractionOutcome::Resolved(relink_fetch::RawExtraction::default()));
        let validator = MockValidator::accepting();
        let settings = FetchSettings::default();
        let mut attempts = Vec::new();

        StrategyPass::new(&extractor, &validator, &settings)
            .run(
                Pass::First,
                &plan()[..1],
                &SourceRef::from_url("https://yt/live"),
                &CredentialBundle::new("UA"),
                &mut attempts,
            )
            .await;

        assert!(matches!(attempts[0].outcome, AttemptOutcome::StrategyFailed { .. }));
        assert_eq!(validator.calls().len(), 0);
    }

    #[tokio::test]
    async fn test_extraction_timeout_is_bounded() {
        let extractor = MockExtractor::new()
            .with_default(manifest("https://cdn.example/x.m3u8"))
            .with_delay(Duration::from_secs(5));
        let validator = MockValidator::accepting();
        let settings =
            FetchSettings::default().with_extraction_timeout(Duration::from_millis(50));
        let mut attempts = Vec::new();

        let started = Instant::now();
        StrategyPass::new(&extractor, &validator, &settings)
            .run(
                Pass::First,
                &plan()[..1],
                &SourceRef::from_url("https://yt/live"),
                &CredentialBundle::new("UA"),
                &mut attempts,
            )
            .await;

        assert!(started.elapsed() < Duration::from_secs(2));
        match &attempts[0].outcome {
            AttemptOutcome::StrategyFailed { cause } => assert!(cause.contains("timed out")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_validator_sees_player_headers() {
        let extractor = MockExtractor::new().with_default(manifest("https://cdn.example/x.m3u8"));
        let validator = MockValidator::scripted(vec![Validation::probed(200)]);
        let settings = FetchSettings::default();
        let mut attempts = Vec::new();

        StrategyPass::new(&extractor, &validator, &settings)
            .run(
                Pass::First,
                &plan(),
                &SourceRef::from_url("https://yt/live"),
                &CredentialBundle::new("Bundle-UA").with_locale("pt-BR"),
                &mut attempts,
            )
            .await
            .unwrap();

        let (url, headers) = validator.calls().remove(0);
        assert_eq!(url, "https://cdn.example/x.m3u8");
        assert_eq!(headers.get("User-Agent"), Some("Bundle-UA"));
        assert_eq!(headers.get("Accept-Language"), Some("pt-BR"));
    }
}
