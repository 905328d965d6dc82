use metrics::{counter, describe_counter, describe_histogram, histogram, Counter, Histogram, Unit};

pub(crate) fn describe() {
    describe_counter!("sync_engine.accounts_synced", Unit::Count, "accounts synced successfully per tick");
    describe_counter!("sync_engine.accounts_skipped", Unit::Count, "accounts skipped per tick (reauth needed, no new data)");
    describe_counter!("sync_engine.accounts_failed", Unit::Count, "accounts that failed to sync per tick");
    describe_counter!("sync_engine.reauth_flagged", Unit::Count, "accounts newly flagged as needing reauthentication");
    describe_histogram!("sync_engine.tick_duration_seconds", Unit::Seconds, "wall time of one global sync tick");
}

/// Held by the global sync ticker (§4.2, §4.8 "Global sync ticker").
#[derive(Debug, Clone)]
pub struct SyncMetrics {
    accounts_synced: Counter,
    accounts_skipped: Counter,
    accounts_failed: Counter,
    reauth_flagged: Counter,
    tick_duration: Histogram,
}

impl SyncMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts_synced: counter!("sync_engine.accounts_synced"),
            accounts_skipped: counter!("sync_engine.accounts_skipped"),
            accounts_failed: counter!("sync_engine.accounts_failed"),
            reauth_flagged: counter!("sync_engine.reauth_flagged"),
            tick_duration: histogram!("sync_engine.tick_duration_seconds"),
        }
    }

    pub fn record_tick(&self, synced: usize, skipped: usize, failed: usize, duration_secs: f64) {
        self.accounts_synced.increment(synced as u64);
        self.accounts_skipped.increment(skipped as u64);
        self.accounts_failed.increment(failed as u64);
        self.tick_duration.record(duration_secs);
    }

    pub fn record_reauth_flagged(&self) {
        self.reauth_flagged.increment(1);
    }
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}
