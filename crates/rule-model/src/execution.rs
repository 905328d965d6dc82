use std::collections::VecDeque;

use core_types::{Amount, Timestamp};
use serde::{Deserialize, Serialize};

/// The outcome of one rule execution, rolling-history style (§7
/// "User-visible behavior": last 5 entries with timestamp, success flag,
/// error string).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub timestamp: Timestamp,
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub amount: Option<Amount>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl ExecutionRecord {
    #[must_use]
    pub fn success(timestamp: Timestamp, amount: Amount, reason: impl Into<String>) -> Self {
        Self { timestamp, success: true, error: None, amount: Some(amount), reason: Some(reason.into()) }
    }

    #[must_use]
    pub fn failure(timestamp: Timestamp, error: impl Into<String>) -> Self {
        Self { timestamp, success: false, error: Some(error.into()), amount: None, reason: None }
    }
}

/// The maximum number of entries kept in a rule's rolling history.
pub const HISTORY_LIMIT: usize = 5;

/// Execution metadata carried on a [`crate::Rule`] row (§3 "Rule":
/// "execution-metadata blob holding the last outcome and a running
/// execution count").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    #[serde(default)]
    pub history: VecDeque<ExecutionRecord>,
    #[serde(default)]
    pub execution_count: u64,
}

impl ExecutionMetadata {
    /// Appends a record, evicting the oldest entry once [`HISTORY_LIMIT`] is
    /// exceeded, and increments the execution counter.
    pub fn record(&mut self, record: ExecutionRecord) {
        self.history.push_back(record);
        while self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.execution_count += 1;
    }

    #[must_use]
    pub fn last_result(&self) -> Option<&ExecutionRecord> {
        self.history.back()
    }
}
