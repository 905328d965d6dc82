use chrono::Duration;
use core_types::Timestamp;

/// Auto-topup duplicate-execution window (§4.5 "Duplicate suppression").
pub const AUTO_TOPUP_COOLDOWN: Duration = Duration::minutes(5);

/// Payday-sweep duplicate-execution window (§4.5 "Duplicate suppression").
pub const PAYDAY_SWEEP_COOLDOWN: Duration = Duration::days(7);

/// Whether `last_executed` falls inside `cooldown` of `now` — the shared
/// check behind auto-topup's 5-minute and payday-sweep's 7-day duplicate
/// suppression. Executors consult this before their first money-moving
/// call; it is the primary defence against a scheduler tick, a manual
/// invocation, and a dependency re-run all firing the same rule at once.
#[must_use]
pub fn is_duplicate_execution(last_executed: Option<Timestamp>, now: Timestamp, cooldown: Duration) -> bool {
    match last_executed {
        Some(last) => now - last < cooldown,
        None => false,
    }
}
