#![warn(missing_debug_implementations)]
#![deny(unused_must_use, rust_2018_idioms, unreachable_pub)]

//! Primitive types shared by every crate in the automation core, plus the
//! error taxonomy described in the design's error-handling section.
//!
//! Nothing in this crate talks to the network or a database; it exists so
//! that `bank-client`, `local-store`, `rule-model` and friends can agree on
//! what a user, account, pot, rule id and money amount *are* without any of
//! them depending on each other.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod ids;
pub use ids::{AccountId, PotId, RuleId, UserId};

/// A moment in time, always UTC. All timestamps that cross the bank-client
/// response parser boundary are coerced into this type exactly once; nothing
/// downstream ever has to guess whether a timestamp is naive or aware.
pub type Timestamp = DateTime<Utc>;

/// An amount of money in minor currency units (e.g. pence, cents). Never a
/// floating point number anywhere in the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(pub i64);

impl Amount {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// Constructs an amount from a minor-unit integer.
    #[must_use]
    pub const fn minor_units(value: i64) -> Self {
        Self(value)
    }

    /// Returns the underlying minor-unit integer.
    #[must_use]
    pub const fn as_minor_units(self) -> i64 {
        self.0
    }

    /// Returns `true` if this amount is strictly positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Saturating subtraction, never going below zero.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        Self((self.0 - other.0).max(0))
    }

    /// Saturating addition.
    #[must_use]
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// The smaller of two amounts.
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }

    /// The larger of two amounts.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self(self.0.max(other.0))
    }

    /// Clamps this amount to the inclusive range `[Amount::ZERO, upper]`.
    #[must_use]
    pub fn clamp_non_negative(self, upper: Self) -> Self {
        Self(self.0.clamp(0, upper.0.max(0)))
    }

    /// Multiplies this amount by a fraction in `[0.0, 1.0]`, flooring the
    /// result. Non-finite fractions (the autosorter's NaN guard) are treated
    /// as zero rather than propagating a `NaN` amount.
    #[must_use]
    pub fn floor_mul_fraction(self, fraction: f64) -> Self {
        if !fraction.is_finite() || fraction <= 0.0 {
            return Self::ZERO;
        }
        Self(((self.0 as f64) * fraction).floor() as i64)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0.div_euclid(100), self.0.rem_euclid(100))
    }
}

impl std::ops::Add for Amount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Amount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.map(|a| a.0).sum())
    }
}

/// The error taxonomy from the design's error-handling section. These are
/// kinds, not a single opaque "something went wrong" error: callers branch on
/// variant to decide whether to retry, alert, or record a benign outcome.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The refresh token is expired or the bank rejected it with
    /// `invalid_grant`. The affected user needs to go through the OAuth
    /// dance again; their accounts are skipped on future sync ticks.
    #[error("reauthentication required: {0}")]
    ReauthRequired(String),

    /// A 401 or token-like error that a single refresh+retry should clear.
    /// This variant should never escape the bank client on a successful
    /// retry; it exists so the client can report the retry failed.
    #[error("transient authentication failure: {0}")]
    AuthTransient(String),

    /// 5xx, network error, or timeout talking to the bank API. Executors
    /// abort the current rule and let the next scheduler tick retry.
    #[error("transient bank API failure: {0}")]
    BankTransient(String),

    /// A money-movement precondition failed (source balance too low). This
    /// is a normal, expected outcome, not a system alert.
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// A rule's `config` blob failed validation. The rule is skipped, not
    /// disabled, and an alert is emitted.
    #[error("invalid rule configuration: {0}")]
    ConfigInvalid(String),

    /// A cooldown tripped; this is an informational non-error outcome.
    #[error("duplicate execution suppressed: {0}")]
    DuplicateSuppressed(String),

    /// A queued item's dependencies were not all complete; causes a
    /// re-enqueue rather than a failure.
    #[error("unmet dependency: {0}")]
    DependencyUnmet(String),

    /// Database corruption or a programming bug. Propagates to the
    /// scheduler, is logged with full context, and aborts the current tick
    /// only — the next tick still runs.
    #[error("fatal error: {0}")]
    Fatal(String),
}

impl CoreError {
    /// Whether this error represents a normal, non-alertable outcome (as
    /// opposed to something that should page someone).
    #[must_use]
    pub const fn is_benign_outcome(&self) -> bool {
        matches!(
            self,
            Self::InsufficientFunds(_) | Self::DuplicateSuppressed(_) | Self::DependencyUnmet(_)
        )
    }
}

/// Convenience alias used throughout the core.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_display_renders_minor_units_as_decimal() {
        assert_eq!(Amount::minor_units(450_00).to_string(), "450.00");
        assert_eq!(Amount::minor_units(99).to_string(), "0.99");
    }

    #[test]
    fn floor_mul_fraction_guards_non_finite_input() {
        assert_eq!(Amount::minor_units(1000).floor_mul_fraction(f64::NAN), Amount::ZERO);
        assert_eq!(Amount::minor_units(1000).floor_mul_fraction(0.5), Amount::minor_units(500));
    }

    #[test]
    fn saturating_sub_never_goes_negative() {
        assert_eq!(
            Amount::minor_units(100).saturating_sub(Amount::minor_units(500)),
            Amount::ZERO
        );
    }

    #[test]
    fn benign_outcome_classification_matches_taxonomy() {
        assert!(CoreError::InsufficientFunds("x".into()).is_benign_outcome());
        assert!(!CoreError::Fatal("x".into()).is_benign_outcome());
        assert!(!CoreError::ConfigInvalid("x".into()).is_benign_outcome());
    }
}
