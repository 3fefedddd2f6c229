//! Strategy descriptors and the credential-driven planner.
//!
//! A strategy is one way of asking an extraction backend for a stream: a
//! client profile plus the credential fields it wants. Strategies are pure
//! configuration. The [`StrategyPlanner`] orders a [`StrategyCatalog`] for a
//! given [`CredentialBundle`].

use relink_core::{CredentialBundle, CredentialField};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use tracing::debug;

/// Suffix appended to the strongest strategy's name for its weak-auth variant.
pub const WEAK_AUTH_SUFFIX: &str = ".noauth";

// ============================================================================
// Backend
// ============================================================================

/// Which extraction backend a strategy targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// `yt-dlp` with a player client profile.
    #[default]
    YtDlp,
    /// `streamlink` plugin resolution.
    Streamlink,
}

impl Backend {
    /// Returns the display name for this backend.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::YtDlp => "yt-dlp",
            Self::Streamlink => "streamlink",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Client Profile
// ============================================================================

/// Provider-specific configuration carried by a strategy.
///
/// The orchestrator never interprets this; only extraction providers do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientProfile {
    /// Backend that executes the strategy.
    pub backend: Backend,
    /// Player client name understood by the backend (e.g. `tv_embedded`).
    pub client: String,
    /// Whether the proof token should be sent when present.
    pub send_proof_token: bool,
    /// Free-form backend options.
    pub options: BTreeMap<String, String>,
}

impl ClientProfile {
    /// Creates a profile for the given backend and client.
    pub fn new(backend: Backend, client: impl Into<String>) -> Self {
        Self {
            backend,
            client: client.into(),
            send_proof_token: false,
            options: BTreeMap::new(),
        }
    }

    /// Marks the profile as sending the proof token.
    pub fn with_proof_token(mut self) -> Self {
        self.send_proof_token = true;
        self
    }

    /// Adds a backend option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Strategy Descriptor
// ============================================================================

/// A named extraction strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyDescriptor {
    /// Unique, stable name used in logs and cache records.
    pub name: String,
    /// Credential fields this strategy wants.
    #[serde(default)]
    pub required_fields: BTreeSet<CredentialField>,
    /// Backend configuration.
    #[serde(default)]
    pub profile: ClientProfile,
}

impl StrategyDescriptor {
    /// Creates a descriptor with no credential requirements.
    pub fn new(name: impl Into<String>, profile: ClientProfile) -> Self {
        Self {
            name: name.into(),
            required_fields: BTreeSet::new(),
            profile,
        }
    }

    /// Adds a required credential field.
    pub fn requires(mut self, field: CredentialField) -> Self {
        self.required_fields.insert(field);
        self
    }

    /// Returns true if the bundle carries every required field.
    pub fn is_satisfied_by(&self, bundle: &CredentialBundle) -> bool {
        self.required_fields.iter().all(|f| bundle.has(*f))
    }

    /// Returns true if this strategy needs the proof token.
    pub fn requires_proof_token(&self) -> bool {
        self.required_fields.contains(&CredentialField::ProofToken)
    }

    /// Returns true if this strategy needs no credential beyond a user agent.
    pub fn is_credential_free(&self) -> bool {
        self.required_fields
            .iter()
            .all(|f| *f == CredentialField::UserAgent)
    }

    /// The same strategy attempted without the proof token.
    #[must_use]
    pub fn weak_auth_variant(&self) -> Self {
        let mut variant = self.clone();
        variant.name = format!("{}{}", self.name, WEAK_AUTH_SUFFIX);
        variant.required_fields.remove(&CredentialField::ProofToken);
        variant.profile.send_proof_token = false;
        variant
    }
}

impl fmt::Display for StrategyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.profile.backend)
    }
}

// ============================================================================
// Strategy Catalog
// ============================================================================

/// The configurable set of strategies the planner orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyCatalog {
    /// Strongest strategy; wants the proof token.
    pub strongest: StrategyDescriptor,
    /// Robust for live content without elevated credentials.
    pub live_robust: StrategyDescriptor,
    /// Needs no credentials; widely compatible, less reliable.
    pub credential_free: StrategyDescriptor,
    /// Always attempted last.
    pub last_resort: StrategyDescriptor,
}

impl Default for StrategyCatalog {
    fn default() -> Self {
        Self {
            strongest: StrategyDescriptor::new(
                "web.pot",
                ClientProfile::new(Backend::YtDlp, "web").with_proof_token(),
            )
            .requires(CredentialField::ProofToken)
            .requires(CredentialField::VisitorData),
            live_robust: StrategyDescriptor::new(
                "tv_embedded",
                ClientProfile::new(Backend::YtDlp, "tv_embedded"),
            ),
            credential_free: StrategyDescriptor::new(
                "ios",
                ClientProfile::new(Backend::YtDlp, "ios"),
            ),
            last_resort: StrategyDescriptor::new(
                "streamlink",
                ClientProfile::new(Backend::Streamlink, "best"),
            ),
        }
    }
}

// ============================================================================
// Strategy Planner
// ============================================================================

/// Orders the catalog for a credential bundle.
#[derive(Debug, Clone, Default)]
pub struct StrategyPlanner {
    catalog: StrategyCatalog,
}

impl StrategyPlanner {
    /// Creates a planner over the given catalog.
    pub fn new(catalog: StrategyCatalog) -> Self {
        Self { catalog }
    }

    /// Returns the catalog.
    pub fn catalog(&self) -> &StrategyCatalog {
        &self.catalog
    }

    /// Produces the ordered strategy list for `bundle`.
    ///
    /// 1. strongest, if a proof token is present
    /// 2. live-robust
    /// 3. credential-free
    /// 4. strongest without its token, if no proof token is present
    /// 5. last resort
    ///
    /// A name that already appeared is skipped.
    pub fn plan(&self, bundle: &CredentialBundle) -> Vec<StrategyDescriptor> {
        let has_token = bundle.has_proof_token();
        let c = &self.catalog;

        let mut ordered = Vec::with_capacity(5);
        if has_token {
            ordered.push(c.strongest.clone());
        }
        ordered.push(c.live_robust.clone());
        ordered.push(c.credential_free.clone());
        if !has_token {
            ordered.push(c.strongest.weak_auth_variant());
        }
        ordered.push(c.last_resort.clone());

        let mut seen = HashSet::new();
        ordered.retain(|s| seen.insert(s.name.clone()));

        debug!(
            proof_token = has_token,
            strategies = ?ordered.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            "Planned strategies"
        );
        ordered
    }
}

// ============================================================================
// Tests
// ============================================================================
