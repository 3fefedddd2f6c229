//! Cache and credential diagnostics.

use serde::{Deserialize, Serialize};

/// Entry counts for one cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Entries that are still within their TTL.
    pub live: usize,
    /// All stored entries, expired ones included.
    pub total: usize,
}

impl CacheStats {
    /// Number of expired entries awaiting removal.
    pub fn expired(&self) -> usize {
        self.total.saturating_sub(self.live)
    }
}

/// Diagnostic summary returned by the resolver's status report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverStatus {
    /// Resolved-stream cache counts.
    pub streams: CacheStats,
    /// Credential cache counts.
    pub tokens: CacheStats,
    /// Age of the cached credential bundle in seconds, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_age_secs: Option<u64>,
    /// True if a cached bundle exists and is within its TTL.
    pub credentials_fresh: bool,
    /// True if the cached bundle carries a proof token.
    pub has_proof_token: bool,
    /// Last credential problem seen, if the provider returned nothing usable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_warning: Option<String>,
}
