//! Dedupe-id construction helpers (§4.1, §6 "Dedupe-id scheme").
//!
//! The bank client never invents a dedupe id — it only accepts one from the
//! caller and forwards it unchanged on retry. These helpers exist so that
//! every executor builds ids the same deterministic way: per logical intent
//! (same rule, same cycle), not per call attempt, so a crash-and-retry of the
//! same logical transfer is suppressed by the bank rather than double-moving
//! money.

use chrono::SecondsFormat;
use core_types::{RuleId, Timestamp};

/// Builds the recommended autosorter/sweep dedupe id shape:
/// `<module>_<timestampISO>_<source>_<target>`.
#[must_use]
pub fn module_transfer_id(module: &str, now: Timestamp, source: &str, target: &str) -> String {
    format!("{module}_{}_{source}_{target}", now.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Builds the recommended auto-topup dedupe id shape: `topup_<timestampISO>`.
#[must_use]
pub fn topup_id(now: Timestamp) -> String {
    format!("topup_{}", now.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Appends a leg suffix to a base id for a pot-to-pot transfer, which is
/// always executed as a withdraw leg followed by a deposit leg sharing one
/// base id (§4.6.2 "Transfer mechanics").
#[must_use]
pub fn withdraw_leg(base: &str) -> String {
    format!("{base}_withdraw")
}

/// See [`withdraw_leg`].
#[must_use]
pub fn deposit_leg(base: &str) -> String {
    format!("{base}_deposit")
}

/// Builds a dedupe id scoped to one rule's execution cycle, used by the
/// sweep executor for per-source legs: `sweep_<rule_id>_<timestampISO>_<source>`.
#[must_use]
pub fn sweep_source_id(rule_id: &RuleId, now: Timestamp, source: &str) -> String {
    format!("sweep_{rule_id}_{}_{source}", now.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn module_transfer_id_is_deterministic_for_the_same_instant() {
        let ts = chrono::Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let a = module_transfer_id("autosorter", ts, "holding", "bills");
        let b = module_transfer_id("autosorter", ts, "holding", "bills");
        assert_eq!(a, b);
        assert_eq!(a, "autosorter_2026-01-02T03:04:05Z_holding_bills");
    }

    #[test]
    fn leg_suffixes_are_distinct() {
        let base = "autosorter_x_holding_bills";
        assert_ne!(withdraw_leg(base), deposit_leg(base));
        assert!(withdraw_leg(base).ends_with("_withdraw"));
        assert!(deposit_leg(base).ends_with("_deposit"));
    }
}
