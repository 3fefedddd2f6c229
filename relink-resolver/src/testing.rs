//! Hand-written provider and validator doubles for resolver tests.

use async_trait::async_trait;
use relink_core::{CredentialBundle, SourceRef, StreamHeaders};
use relink_fetch::{
    ExtractionOutcome, ExtractionProvider, FetchError, RawExtraction, StrategyDescriptor,
    StreamValidator, TokenProvider, Validation,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A resolved extraction carrying only a master manifest.
pub fn manifest(url: &str) -> ExtractionOutcome {
    ExtractionOutcome::Resolved(RawExtraction {
        manifest_url: Some(url.to_string()),
        ..Default::default()
    })
}

// ============================================================================
// Extraction
// ============================================================================

/// Scripted extractor. Per-strategy queues first, then the default outcome.
pub struct MockExtractor {
    scripted: Mutex<HashMap<String, VecDeque<ExtractionOutcome>>>,
    default: ExtractionOutcome,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self {
            scripted: Mutex::default(),
            default: ExtractionOutcome::failed("not scripted"),
            delay: None,
            calls: Mutex::default(),
        }
    }

    /// Queues an outcome for one strategy.
    pub fn with(self, strategy: &str, outcome: ExtractionOutcome) -> Self {
        self.scripted
            .lock()
            .unwrap()
            .entry(strategy.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    pub fn with_default(mut self, outcome: ExtractionOutcome) -> Self {
        self.default = outcome;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Strategy names in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExtractionProvider for MockExtractor {
    async fn attempt(
        &self,
        strategy: &StrategyDescriptor,
        _source: &SourceRef,
        _bundle: &CredentialBundle,
    ) -> ExtractionOutcome {
        self.calls.lock().unwrap().push(strategy.name.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self
            .scripted
            .lock()
            .unwrap()
            .get_mut(&strategy.name)
            .and_then(VecDeque::pop_front);
        next.unwrap_or_else(|| self.default.clone())
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Scripted validator. Queued verdicts first, then the fallback verdict.
pub struct MockValidator {
    script: Mutex<VecDeque<Validation>>,
    fallback: Validation,
    calls: Mutex<Vec<(String, StreamHeaders)>>,
}

impl MockValidator {
    pub fn scripted(script: Vec<Validation>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Validation::probed(403),
            calls: Mutex::default(),
        }
    }

    pub fn accepting() -> Self {
        Self {
            fallback: Validation::probed(200),
            ..Self::scripted(Vec::new())
        }
    }

    pub fn rejecting(status: u16) -> Self {
        Self {
            fallback: Validation::probed(status),
            ..Self::scripted(Vec::new())
        }
    }

    /// Accepts once the script runs out.
    pub fn then_accepting(mut self) -> Self {
        self.fallback = Validation::probed(200);
        self
    }

    /// URL and headers of every call, in order.
    pub fn calls(&self) -> Vec<(String, StreamHeaders)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StreamValidator for MockValidator {
    async fn validate(&self, url: &str, headers: &StreamHeaders, _timeout: Duration) -> Validation {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), headers.clone()));
        self.script.lock().unwrap().pop_front().unwrap_or(self.fallback)
    }
}

// ============================================================================
// Tokens
// ============================================================================

/// Token provider returning queued bundles, then the fallback bundle.
pub struct MockTokens {
    script: Mutex<VecDeque<Result<CredentialBundle, String>>>,
    fallback: CredentialBundle,
    fetches: Mutex<Vec<bool>>,
    invalidations: AtomicUsize,
}

impl MockTokens {
    pub fn returning(bundle: CredentialBundle) -> Self {
        Self {
            script: Mutex::default(),
            fallback: bundle,
            fetches: Mutex::default(),
            invalidations: AtomicUsize::new(0),
        }
    }

    /// Queues a result for the next fetch.
    pub fn then(self, result: Result<CredentialBundle, String>) -> Self {
        self.script.lock().unwrap().push_back(result);
        self
    }

    /// `force_refresh` flag of every fetch, in order.
    pub fn fetches(&self) -> Vec<bool> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenProvider for MockTokens {
    async fn fetch(&self, force_refresh: bool) -> Result<CredentialBundle, FetchError> {
        self.fetches.lock().unwrap().push(force_refresh);
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(bundle)) => Ok(bundle),
            Some(Err(reason)) => Err(FetchError::CredentialsUnavailable(reason)),
            None => Ok(self.fallback.clone()),
        }
    }

    async fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}
