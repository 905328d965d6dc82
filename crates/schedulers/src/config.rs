use std::time::Duration;

/// Tunables for the two global tickers (§4.8).
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often the global sync ticker invokes §4.2 across every account.
    pub sync_interval: Duration,
    /// How often the global automation ticker invokes §4.7 without a
    /// preceding sync.
    pub automation_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { sync_interval: Duration::from_secs(10 * 60), automation_interval: Duration::from_secs(5 * 60) }
    }
}
