use std::time::Duration;

use chrono::Duration as ChronoDuration;

/// Tunables for the per-account sync algorithm (§4.2).
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Deadline for a single, non-paginated API call.
    pub default_timeout: Duration,
    /// Deadline for a call made with `auto_paginate: true`.
    pub paginated_timeout: Duration,
    /// How far back a first-time account sync looks (the API's hard
    /// history limit).
    pub first_time_window: ChronoDuration,
    /// How far back a first-time bills-pot sync looks.
    pub bills_window: ChronoDuration,
    /// Slice width used to chunk a first-time bills-pot pull.
    pub bills_chunk: ChronoDuration,
    /// Maximum transactions committed per incremental account sync.
    pub max_commit_batch: usize,
    /// Merchant-name substrings (case-insensitive) that classify a
    /// bills-pot transaction as `subscription`.
    pub subscription_merchants: Vec<String>,
    /// Description prefix (case-insensitive) that classifies a bills-pot
    /// transaction as `pot_transfer`.
    pub pot_transfer_prefix: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            paginated_timeout: Duration::from_secs(120),
            first_time_window: ChronoDuration::days(89),
            bills_window: ChronoDuration::days(90),
            bills_chunk: ChronoDuration::days(10),
            max_commit_batch: 1_000,
            subscription_merchants: Vec::new(),
            pot_transfer_prefix: "pot:".into(),
        }
    }
}
