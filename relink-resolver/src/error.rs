//! Resolution errors and per-attempt records.

use relink_fetch::ValidationMethod;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Attempt Records
// ============================================================================

/// Which pass an attempt belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    /// With the cached or freshly fetched bundle.
    First,
    /// After the forced credential refresh.
    Refresh,
}

impl Pass {
    /// Returns the display name for this pass.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Refresh => "refresh",
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// How one strategy attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The candidate validated; this attempt produced the result.
    Validated {
        /// How validation passed.
        method: ValidationMethod,
    },
    /// The backend failed or returned nothing usable.
    StrategyFailed {
        /// Why.
        cause: String,
    },
    /// The candidate was rejected by the validator.
    ValidationFailed {
        /// HTTP status, if a probe answered.
        status: Option<u16>,
    },
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validated { method } => write!(f, "validated ({method})"),
            Self::StrategyFailed { cause } => write!(f, "failed: {cause}"),
            Self::ValidationFailed { status: Some(s) } => write!(f, "rejected (HTTP {s})"),
            Self::ValidationFailed { status: None } => write!(f, "rejected"),
        }
    }
}

/// Record of a single strategy attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// Strategy name.
    pub strategy: String,
    /// Pass the attempt ran in.
    pub pass: Pass,
    /// How long extraction plus validation took.
    pub duration: Duration,
    /// How it ended.
    pub outcome: AttemptOutcome,
}

impl AttemptRecord {
    /// Returns true if this attempt produced the result.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Validated { .. })
    }

    /// HTTP status of a rejected candidate.
    pub fn status(&self) -> Option<u16> {
        match self.outcome {
            AttemptOutcome::ValidationFailed { status } => status,
            _ => None,
        }
    }

    /// The attempt's failure as an error, if it failed.
    pub fn error(&self) -> Option<ResolveError> {
        match &self.outcome {
            AttemptOutcome::Validated { .. } => None,
            AttemptOutcome::StrategyFailed { cause } => Some(ResolveError::StrategyFailed {
                strategy: self.strategy.clone(),
                cause: cause.clone(),
            }),
            AttemptOutcome::ValidationFailed { status } => Some(ResolveError::ValidationFailed {
                strategy: self.strategy.clone(),
                status: *status,
            }),
        }
    }
}

impl fmt::Display for AttemptRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} in {}ms",
            self.pass,
            self.strategy,
            self.outcome,
            self.duration.as_millis()
        )
    }
}

// ============================================================================
// Resolve Error
// ============================================================================

/// Error type for resolution.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The token provider produced nothing usable. Non-fatal.
    #[error("No usable credentials: {0}")]
    NoCredentials(String),

    /// A strategy's backend failed.
    #[error("Strategy {strategy} failed: {cause}")]
    StrategyFailed {
        /// Strategy name.
        strategy: String,
        /// Why.
        cause: String,
    },

    /// A strategy's candidate URL was rejected.
    #[error("Strategy {strategy} produced an unplayable URL (status {status:?})")]
    ValidationFailed {
        /// Strategy name.
        strategy: String,
        /// HTTP status, if a probe answered.
        status: Option<u16>,
    },

    /// Every strategy failed on both passes.
    #[error("All strategies exhausted after {} attempts", .attempts.len())]
    Exhausted {
        /// Every attempt, in order.
        attempts: Vec<AttemptRecord>,
    },

    /// The overall deadline elapsed.
    #[error("Resolution timed out after {elapsed:?} ({} attempts completed)", .attempts.len())]
    Timeout {
        /// Time spent before giving up.
        elapsed: Duration,
        /// Attempts completed before the deadline.
        attempts: Vec<AttemptRecord>,
    },

    /// The source has no usable key.
    #[error("Invalid source: {0}")]
    InvalidSource(String),
}

impl ResolveError {
    /// Attempts recorded before the failure.
    pub fn attempts(&self) -> &[AttemptRecord] {
        match self {
            Self::Exhausted { attempts } | Self::Timeout { attempts, .. } => attempts,
            _ => &[],
        }
    }

    /// Returns true if the caller may retry later with a chance of success.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Exhausted { .. })
    }
}
