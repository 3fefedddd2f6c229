//! The resolution orchestrator.
//!
//! ```text
//! CacheHit ─────────────────────────────────────────────────────► Done
//! CacheMiss → AcquireCredentials → TryStrategies ─┬─ validated ──► CacheWrite → Done
//!                                                 └─ all failed ─► ForceRefresh
//! ForceRefresh → TryStrategies ─┬─ validated ──► CacheWrite → Done
//!                               └─ all failed ─► Exhausted
//! ```
//!
//! The refresh branch runs at most once per resolution.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use relink_core::{CredentialBundle, ResolvedStream, ResolverStatus, SourceRef};
use relink_fetch::{
    ExtractionProvider, FetchSettings, StrategyDescriptor, StrategyPlanner, StreamValidator,
    TokenProvider,
};
use relink_store::{
    DEFAULT_STREAM_TTL, DEFAULT_TOKEN_TTL, Settings, StreamCache, TokenCache, streams_path,
    tokens_path,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::error::{AttemptRecord, Pass, ResolveError};
use crate::pipeline::StrategyPass;

/// Default overall deadline for one resolution.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(90);

/// Entries removed by a purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// Expired streams removed.
    pub streams: usize,
    /// Expired credential bundles removed.
    pub tokens: usize,
}

// ============================================================================
// Resolver
// ============================================================================

/// Resolves sources to validated streams.
///
/// Cheap to share behind an `Arc`; distinct sources may resolve concurrently.
pub struct Resolver {
    planner: StrategyPlanner,
    extractor: Arc<dyn ExtractionProvider>,
    tokens: Arc<dyn TokenProvider>,
    validator: Arc<dyn StreamValidator>,
    streams: StreamCache,
    token_cache: TokenCache,
    fetch: FetchSettings,
    deadline: Duration,
    credential_warning: RwLock<Option<String>>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("planner", &self.planner)
            .field("fetch", &self.fetch)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Creates a builder over the three external capabilities.
    pub fn builder(
        extractor: Arc<dyn ExtractionProvider>,
        tokens: Arc<dyn TokenProvider>,
        validator: Arc<dyn StreamValidator>,
    ) -> ResolverBuilder {
        ResolverBuilder::new(extractor, tokens, validator)
    }

    /// Creates a resolver configured by `settings`, loading persisted caches
    /// when persistence is enabled.
    pub async fn from_settings(
        settings: &Settings,
        extractor: Arc<dyn ExtractionProvider>,
        tokens: Arc<dyn TokenProvider>,
        validator: Arc<dyn StreamValidator>,
    ) -> Self {
        let (streams, token_cache) = if settings.persist_cache {
            let dir = settings.cache_dir();
            (
                StreamCache::load(settings.stream_ttl(), streams_path(&dir)).await,
                TokenCache::load(settings.token_ttl(), tokens_path(&dir)).await,
            )
        } else {
            (
                StreamCache::new(settings.stream_ttl()),
                TokenCache::new(settings.token_ttl()),
            )
        };

        Self::builder(extractor, tokens, validator)
            .planner(StrategyPlanner::new(settings.strategies.clone()))
            .fetch_settings(settings.fetch_settings())
            .deadline(settings.deadline())
            .stream_cache(streams)
            .token_cache(token_cache)
            .build()
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Resolves `source` to a validated stream.
    ///
    /// A live cached stream is returned without any provider or validator
    /// call. `force_refresh` evicts that entry first; it does not touch the
    /// credential cache.
    ///
    /// # Errors
    ///
    /// [`ResolveError::Exhausted`] when both passes fail and
    /// [`ResolveError::Timeout`] when the deadline elapses. Both carry the
    /// attempts made.
    #[instrument(skip(self, source), fields(source = %source.key()))]
    pub async fn resolve(
        &self,
        source: &SourceRef,
        force_refresh: bool,
    ) -> Result<Arc<ResolvedStream>, ResolveError> {
        let key = source.key();
        if key.is_empty() {
            return Err(ResolveError::InvalidSource("empty source URL".to_string()));
        }

        if force_refresh {
            if self.streams.invalidate(key).await {
                debug!("Evicted cached stream");
            }
        } else if let Some(stream) = self.streams.get(key).await {
            debug!(strategy = %stream.strategy_used, "Stream cache hit");
            return Ok(stream);
        }

        let started = Instant::now();
        let mut attempts = Vec::new();
        let outcome = tokio::time::timeout(self.deadline, self.resolve_fresh(source, &mut attempts))
            .await;

        match outcome {
            Ok(Ok(stream)) => {
                info!(
                    strategy = %stream.strategy_used,
                    attempts = attempts.len(),
                    duration = ?started.elapsed(),
                    "Resolved"
                );
                Ok(self.streams.put(stream).await)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Resolution failed");
                Err(e)
            }
            Err(_) => {
                let elapsed = started.elapsed();
                warn!(?elapsed, attempts = attempts.len(), "Resolution deadline elapsed");
                Err(ResolveError::Timeout { elapsed, attempts })
            }
        }
    }

    async fn resolve_fresh(
        &self,
        source: &SourceRef,
        attempts: &mut Vec<AttemptRecord>,
    ) -> Result<ResolvedStream, ResolveError> {
        let pass = StrategyPass::new(self.extractor.as_ref(), self.validator.as_ref(), &self.fetch);

        let bundle = self.credentials(false).await;
        let plan = self.planner.plan(&bundle);
        if let Some(stream) = pass.run(Pass::First, &plan, source, &bundle, attempts).await {
            return Ok(stream);
        }

        info!(attempts = attempts.len(), "No strategy validated, refreshing credentials");
        self.token_cache.invalidate().await;
        self.tokens.invalidate().await;

        let bundle = self.credentials(true).await;
        let plan = self.planner.plan(&bundle);
        if let Some(stream) = pass.run(Pass::Refresh, &plan, source, &bundle, attempts).await {
            return Ok(stream);
        }

        Err(ResolveError::Exhausted {
            attempts: std::mem::take(attempts),
        })
    }

    /// Cached bundle, else a fetched one. Never fails: without usable
    /// credentials, the anonymous bundle lets credential-free strategies run.
    async fn credentials(&self, force_refresh: bool) -> Arc<CredentialBundle> {
        if !force_refresh {
            if let Some(bundle) = self.token_cache.get().await {
                debug!("Credential cache hit");
                return bundle;
            }
        }

        let problem = match self.tokens.fetch(force_refresh).await {
            Ok(bundle) if bundle.is_usable() => {
                debug!(fields = ?bundle.present_fields(), force_refresh, "Credentials fetched");
                *self.credential_warning.write().await = None;
                return self.token_cache.put(bundle).await;
            }
            Ok(_) => ResolveError::NoCredentials("bundle has no user agent".to_string()),
            Err(e) => ResolveError::NoCredentials(e.to_string()),
        };

        warn!(error = %problem, "Continuing with anonymous credentials");
        *self.credential_warning.write().await = Some(problem.to_string());
        Arc::new(CredentialBundle::anonymous())
    }

    /// Resolves many sources, at most `concurrency` at a time.
    ///
    /// Results are returned in input order.
    pub async fn resolve_many(
        &self,
        sources: &[SourceRef],
        force_refresh: bool,
        concurrency: usize,
    ) -> Vec<Result<Arc<ResolvedStream>, ResolveError>> {
        stream::iter(sources)
            .map(|source| self.resolve(source, force_refresh))
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Drops the cached stream for one source, e.g. after playback failed.
    pub async fn invalidate(&self, source_key: &str) -> bool {
        self.streams.invalidate(source_key.trim()).await
    }

    /// Clears both caches and the provider's memo.
    pub async fn invalidate_all(&self) {
        self.streams.clear().await;
        self.token_cache.invalidate().await;
        self.tokens.invalidate().await;
        *self.credential_warning.write().await = None;
        info!("All caches cleared");
    }

    /// Removes expired entries from both caches.
    pub async fn purge_expired(&self) -> PurgeReport {
        let report = PurgeReport {
            streams: self.streams.purge_expired().await,
            tokens: self.token_cache.purge_expired().await,
        };
        debug!(streams = report.streams, tokens = report.tokens, "Purged expired entries");
        report
    }

    /// Purges expired entries every `every` until the resolver is dropped.
    ///
    /// The task holds only a weak reference, so it never keeps the resolver
    /// alive.
    pub fn spawn_purge_task(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let resolver = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(resolver) = resolver.upgrade() else {
                    debug!("Resolver dropped, stopping purge task");
                    break;
                };
                let report = resolver.purge_expired().await;
                if report.streams + report.tokens > 0 {
                    info!(streams = report.streams, tokens = report.tokens, "Background purge");
                }
            }
        })
    }

    /// Diagnostic summary of both caches and the credentials.
    pub async fn report_status(&self) -> ResolverStatus {
        let now = Utc::now();
        let tokens = self.token_cache.stats().await;
        let stored = self.token_cache.peek().await;

        ResolverStatus {
            streams: self.streams.stats().await,
            tokens,
            credential_age_secs: stored.as_ref().map(|e| e.age_at(now).as_secs()),
            credentials_fresh: tokens.live > 0,
            has_proof_token: stored.is_some_and(|e| e.value.has_proof_token()),
            credential_warning: self.credential_warning.read().await.clone(),
        }
    }

    /// The strategy order the next resolution would start with.
    ///
    /// Uses the cached bundle, or the anonymous one; never calls the provider.
    pub async fn plan_preview(&self) -> Vec<StrategyDescriptor> {
        let bundle = self
            .token_cache
            .get()
            .await
            .unwrap_or_else(|| Arc::new(CredentialBundle::anonymous()));
        self.planner.plan(&bundle)
    }

    /// Returns the overall deadline.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}

// ============================================================================
// Resolver Builder
// ============================================================================

/// Builder for constructing a [`Resolver`].
pub struct ResolverBuilder {
    extractor: Arc<dyn ExtractionProvider>,
    tokens: Arc<dyn TokenProvider>,
    validator: Arc<dyn StreamValidator>,
    planner: StrategyPlanner,
    streams: Option<StreamCache>,
    token_cache: Option<TokenCache>,
    fetch: FetchSettings,
    deadline: Duration,
}

impl ResolverBuilder {
    /// Creates a builder with in-memory caches and default timeouts.
    pub fn new(
        extractor: Arc<dyn ExtractionProvider>,
        tokens: Arc<dyn TokenProvider>,
        validator: Arc<dyn StreamValidator>,
    ) -> Self {
        Self {
            extractor,
            tokens,
            validator,
            planner: StrategyPlanner::default(),
            streams: None,
            token_cache: None,
            fetch: FetchSettings::default(),
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Sets the planner.
    pub fn planner(mut self, planner: StrategyPlanner) -> Self {
        self.planner = planner;
        self
    }

    /// Sets the stream cache.
    pub fn stream_cache(mut self, cache: StreamCache) -> Self {
        self.streams = Some(cache);
        self
    }

    /// Sets the credential cache.
    pub fn token_cache(mut self, cache: TokenCache) -> Self {
        self.token_cache = Some(cache);
        self
    }

    /// Sets call timeouts and header defaults.
    pub fn fetch_settings(mut self, fetch: FetchSettings) -> Self {
        self.fetch = fetch;
        self
    }

    /// Sets the overall deadline.
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Builds the resolver.
    pub fn build(self) -> Resolver {
        Resolver {
            planner: self.planner,
            extractor: self.extractor,
            tokens: self.tokens,
            validator: self.validator,
            streams: self
                .streams
                .unwrap_or_else(|| StreamCache::new(DEFAULT_STREAM_TTL)),
            token_cache: self
                .token_cache
                .unwrap_or_else(|| TokenCache::new(DEFAULT_TOKEN_TTL)),
            fetch: self.fetch,
            deadline: self.deadline,
            credential_warning: RwLock::new(None),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AttemptOutcome;
    use crate::testing::{MockExtractor, MockTokens, MockValidator, manifest};
    use relink_fetch::{ExtractionOutcome, Validation};

    struct Harness {
        extractor: Arc<MockExtractor>,
        tokens: Arc<MockTokens>,
        validator: Arc<MockValidator>,
        resolver: Resolver,
    }

    fn harness(extractor: MockExtractor, tokens: MockTokens, validator: MockValidator) -> Harness {
        harness_with(extractor, tokens, validator, DEFAULT_DEADLINE)
    }

    fn harness_with(
        extractor: MockExtractor,
        tokens: MockTokens,
        validator: MockValidator,
        deadline: Duration,
    ) -> Harness {
        let extractor = Arc::new(extractor);
        let tokens = Arc::new(tokens);
        let validator = Arc::new(validator);
        let resolver = Resolver::builder(extractor.clone(), tokens.clone(), validator.clone())
            .deadline(deadline)
            .build();
        Harness {
            extractor,
            tokens,
            validator,
            resolver,
        }
    }

    fn source() -> SourceRef {
        SourceRef::new("https://www.youtube.com/watch?v=live1", "Live 1")
    }

    fn bundle() -> CredentialBundle {
        CredentialBundle::new("Mozilla/5.0 Test").with_cookies("SID=1")
    }

    #[tokio::test]
    async fn test_scenario_a_first_strategy_validates() {
        let h = harness(
            MockExtractor::new().with_default(manifest("https://cdn.example/1.m3u8")),
            MockTokens::returning(bundle()),
            MockValidator::accepting(),
        );

        let stream = h.resolver.resolve(&source(), false).await.unwrap();

        assert_eq!(stream.strategy_used, "tv_embedded");
        assert_eq!(stream.headers.get("User-Agent"), Some("Mozilla/5.0 Test"));
        assert_eq!(stream.headers.get("Cookie"), Some("SID=1"));
        assert_eq!(h.tokens.fetches(), vec![false]);
        assert_eq!(h.extractor.calls().len(), 1);
        assert_eq!(h.validator.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_scenario_b_third_strategy_succeeds() {
        let h = harness(
            MockExtractor::new()
                .with("tv_embedded", ExtractionOutcome::failed("HTTP 403"))
                .with("ios", ExtractionOutcome::failed("Sign in to confirm"))
                .with_default(manifest("https://cdn.example/3.m3u8")),
            MockTokens::returning(bundle()),
            MockValidator::accepting(),
        );

        let stream = h.resolver.resolve(&source(), false).await.unwrap();

        assert_eq!(stream.strategy_used, "web.pot.noauth");
        assert_eq!(h.extractor.calls(), vec!["tv_embedded", "ios", "web.pot.noauth"]);
        assert_eq!(h.validator.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_scenario_c_refresh_then_first_strategy_validates() {
        let fresh = bundle().with_proof_token("pot").with_visitor_data("vd");
        let h = harness(
            MockExtractor::new().with_default(manifest("https://cdn.example/x.m3u8")),
            MockTokens::returning(fresh).then(Ok(bundle())),
            MockValidator::scripted(vec![Validation::probed(403); 4]).then_accepting(),
        );

        let stream = h.resolver.resolve(&source(), false).await.unwrap();

        assert_eq!(stream.strategy_used, "web.pot");
        assert_eq!(h.tokens.fetches(), vec![false, true]);
        assert_eq!(h.tokens.invalidations(), 1);
        assert_eq!(
            h.extractor.calls(),
            vec!["tv_embedded", "ios", "web.pot.noauth", "streamlink", "web.pot"]
        );
    }

    #[tokio::test]
    async fn test_scenario_d_all_fail_on_both_passes() {
        let h = harness(
            MockExtractor::new().with_default(ExtractionOutcome::failed("unavailable")),
            MockTokens::returning(bundle()),
            MockValidator::accepting(),
        );

        let err = h.resolver.resolve(&source(), false).await.unwrap_err();

        let ResolveError::Exhausted { attempts } = err else {
            panic!("expected Exhausted, got {err:?}");
        };
        assert_eq!(attempts.len(), 8);
        assert_eq!(attempts.iter().filter(|a| a.pass == Pass::First).count(), 4);
        assert_eq!(attempts.iter().filter(|a| a.pass == Pass::Refresh).count(), 4);
        assert_eq!(h.tokens.fetches(), vec![false, true]);
        assert_eq!(h.resolver.report_status().await.streams.total, 0);
    }

    #[tokio::test]
    async fn test_refresh_retry_happens_exactly_once() {
        let h = harness(
            MockExtractor::new().with_default(manifest("https://cdn.example/x.m3u8")),
            MockTokens::returning(bundle()),
            MockValidator::rejecting(403),
        );

        let err = h.resolver.resolve(&source(), false).await.unwrap_err();

        assert_eq!(err.attempts().len(), 8);
        assert!(err.attempts().iter().all(|a| a.status() == Some(403)));
        assert_eq!(h.tokens.fetches().iter().filter(|f| **f).count(), 1);
        assert_eq!(h.tokens.invalidations(), 1);
    }

    #[tokio::test]
    async fn test_scenario_e_skipped_validation_counts_as_success() {
        let h = harness(
            MockExtractor::new().with_default(manifest("https://rr1---sn-a.googlevideo.com/x")),
            MockTokens::returning(bundle()),
            MockValidator::scripted(vec![Validation::skipped()]),
        );

        let stream = h.resolver.resolve(&source(), false).await.unwrap();

        assert_eq!(stream.strategy_used, "tv_embedded");
        assert_eq!(h.validator.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_makes_zero_calls_and_is_idempotent() {
        let h = harness(
            MockExtractor::new().with_default(manifest("https://cdn.example/1.m3u8")),
            MockTokens::returning(bundle()),
            MockValidator::accepting(),
        );

        let first = h.resolver.resolve(&source(), false).await.unwrap();
        let second = h.resolver.resolve(&source(), false).await.unwrap();
        let padded = SourceRef::from_url("  https://www.youtube.com/watch?v=live1 ");
        let third = h.resolver.resolve(&padded, false).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(h.extractor.calls().len(), 1);
        assert_eq!(h.validator.calls().len(), 1);
        assert_eq!(h.tokens.fetches().len(), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_stream_cache_only() {
        let h = harness(
            MockExtractor::new().with_default(manifest("https://cdn.example/1.m3u8")),
            MockTokens::returning(bundle()),
            MockValidator::accepting(),
        );

        h.resolver.resolve(&source(), false).await.unwrap();
        h.resolver.resolve(&source(), true).await.unwrap();

        assert_eq!(h.extractor.calls().len(), 2);
        assert_eq!(h.tokens.fetches(), vec![false]);
    }

    #[tokio::test]
    async fn test_no_credentials_falls_back_to_anonymous() {
        let h = harness(
            MockExtractor::new().with_default(manifest("https://cdn.example/1.m3u8")),
            MockTokens::returning(bundle()).then(Err("browser closed".to_string())),
            MockValidator::accepting(),
        );

        let stream = h.resolver.resolve(&source(), false).await.unwrap();

        assert_eq!(
            stream.user_agent(),
            Some(CredentialBundle::anonymous().user_agent.as_str())
        );
        assert!(!stream.has_cookie());
        let status = h.resolver.report_status().await;
        assert!(!status.credentials_fresh);
        assert!(status.credential_warning.unwrap().contains("browser closed"));
    }

    #[tokio::test]
    async fn test_unusable_bundle_is_not_cached() {
        let h = harness(
            MockExtractor::new().with_default(manifest("https://cdn.example/1.m3u8")),
            MockTokens::returning(CredentialBundle::new("  ")),
            MockValidator::accepting(),
        );

        h.resolver.resolve(&source(), false).await.unwrap();

        assert_eq!(h.resolver.report_status().await.tokens.total, 0);
    }

    #[tokio::test]
    async fn test_deadline_reports_partial_attempts() {
        let h = harness_with(
            MockExtractor::new()
                .with_default(manifest("https://cdn.example/1.m3u8"))
                .with_delay(Duration::from_millis(200)),
            MockTokens::returning(bundle()),
            MockValidator::rejecting(404),
            Duration::from_millis(500),
        );

        let err = h.resolver.resolve(&source(), false).await.unwrap_err();

        let ResolveError::Timeout { elapsed, attempts } = err else {
            panic!("expected Timeout, got {err:?}");
        };
        assert!(elapsed >= Duration::from_millis(500));
        assert_eq!(attempts.len(), 2);
        assert!(attempts.iter().all(|a| a.outcome == AttemptOutcome::ValidationFailed {
            status: Some(404)
        }));
    }

    #[tokio::test]
    async fn test_invalidate_forces_new_resolution() {
        let h = harness(
            MockExtractor::new().with_default(manifest("https://cdn.example/1.m3u8")),
            MockTokens::returning(bundle()),
            MockValidator::accepting(),
        );

        h.resolver.resolve(&source(), false).await.unwrap();
        assert!(h.resolver.invalidate(source().key()).await);
        h.resolver.resolve(&source(), false).await.unwrap();

        assert_eq!(h.extractor.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_all_and_status() {
        let h = harness(
            MockExtractor::new().with_default(manifest("https://cdn.example/1.m3u8")),
            MockTokens::returning(bundle().with_proof_token("pot")),
            MockValidator::accepting(),
        );

        h.resolver.resolve(&source(), false).await.unwrap();
        let status = h.resolver.report_status().await;
        assert_eq!(status.streams.live, 1);
        assert!(status.credentials_fresh);
        assert!(status.has_proof_token);
        assert!(status.credential_age_secs.is_some());

        h.resolver.invalidate_all().await;
        let status = h.resolver.report_status().await;
        assert_eq!(status.streams.total, 0);
        assert_eq!(status.tokens.total, 0);
        assert_eq!(h.tokens.invalidations(), 1);
    }

    #[tokio::test]
    async fn test_resolve_many_keeps_order() {
        let h = harness(
            MockExtractor::new().with_default(manifest("https://cdn.example/1.m3u8")),
            MockTokens::returning(bundle()),
            MockValidator::accepting(),
        );
        let sources = vec![
            SourceRef::from_url("https://yt/a"),
            SourceRef::from_url(" "),
            SourceRef::from_url("https://yt/c"),
        ];

        let results = h.resolver.resolve_many(&sources, false, 2).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().source_key, "https://yt/a");
        assert!(matches!(results[1], Err(ResolveError::InvalidSource(_))));
        assert_eq!(results[2].as_ref().unwrap().source_key, "https://yt/c");
    }

    #[tokio::test]
    async fn test_background_purge_removes_expired_streams() {
        let extractor = Arc::new(MockExtractor::new().with_default(manifest("https://cdn/a.m3u8")));
        let resolver = Arc::new(
            Resolver::builder(
                extractor,
                Arc::new(MockTokens::returning(bundle())),
                Arc::new(MockValidator::accepting()),
            )
            .stream_cache(StreamCache::new(Duration::from_millis(50)))
            .build(),
        );
        resolver.resolve(&source(), false).await.unwrap();
        assert_eq!(resolver.report_status().await.streams.total, 1);

        let task = resolver.spawn_purge_task(Duration::from_millis(30));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(resolver.report_status().await.streams.total, 0);

        drop(resolver);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("purge task should stop once the resolver is dropped")
            .unwrap();
    }

    #[tokio::test]
    async fn test_plan_preview_never_fetches() {
        let h = harness(
            MockExtractor::new(),
            MockTokens::returning(bundle().with_proof_token("pot")),
            MockValidator::accepting(),
        );

        let plan = h.resolver.plan_preview().await;

        assert_eq!(plan[0].name, "tv_embedded");
        assert!(h.tokens.fetches().is_empty());
    }

    #[tokio::test]
    async fn test_from_settings_persists_streams() {
        let dir = tempfile::TempDir::new().unwrap();
        let settings = Settings {
            cache_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let resolver = Resolver::from_settings(
            &settings,
            Arc::new(MockExtractor::new().with_default(manifest("https://cdn.example/1.m3u8"))),
            Arc::new(MockTokens::returning(bundle())),
            Arc::new(MockValidator::accepting()),
        )
        .await;
        resolver.resolve(&source(), false).await.unwrap();

        let extractor = Arc::new(MockExtractor::new());
        let restored = Resolver::from_settings(
            &settings,
            extractor.clone(),
            Arc::new(MockTokens::returning(bundle())),
            Arc::new(MockValidator::accepting()),
        )
        .await;
        let stream = restored.resolve(&source(), false).await.unwrap();

        assert_eq!(stream.url, "https://cdn.example/1.m3u8");
        assert!(extractor.calls().is_empty());
        assert!(dir.path().join("tokens.json").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_resolve_many_persists_every_stream() {
        let dir = tempfile::TempDir::new().unwrap();
        let settings = Settings {
            cache_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let sources: Vec<SourceRef> = (0..50)
            .map(|i| SourceRef::from_url(format!("https://www.youtube.com/watch?v=live{i}")))
            .collect();

        let resolver = Resolver::from_settings(
            &settings,
            Arc::new(
                MockExtractor::new()
                    .with_default(manifest("https://cdn.example/1.m3u8"))
                    .with_delay(Duration::from_millis(5)),
            ),
            Arc::new(MockTokens::returning(bundle())),
            Arc::new(MockValidator::accepting()),
        )
        .await;
        let results = resolver.resolve_many(&sources, false, 8).await;
        assert!(results.iter().all(Result::is_ok));
        drop(resolver);

        let extractor = Arc::new(MockExtractor::new());
        let validator = Arc::new(MockValidator::accepting());
        let restored = Resolver::from_settings(
            &settings,
            extractor.clone(),
            Arc::new(MockTokens::returning(bundle())),
            validator.clone(),
        )
        .await;
        assert_eq!(restored.report_status().await.streams.live, 50);

        let results = restored.resolve_many(&sources, false, 8).await;
        for (source, result) in sources.iter().zip(&results) {
            assert_eq!(result.as_ref().unwrap().source_key, source.key());
        }
        assert!(extractor.calls().is_empty());
        assert!(validator.calls().is_empty());
    }
}
