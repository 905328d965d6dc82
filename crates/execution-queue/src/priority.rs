use serde::{Deserialize, Serialize};

/// Priority class a queued item runs under (§4.5 "Priority mapping").
/// Ordered so that `CRITICAL > HIGH > NORMAL > LOW > BACKGROUND`; derived
/// `Ord` follows declaration order, which the `#[repr]`-free variant order
/// below matches intentionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    Background,
    Low,
    Normal,
    High,
    Critical,
}

impl Priority {
    /// One demotion step, used when a dependency-gated item is re-enqueued
    /// so it doesn't repeatedly jump the line ahead of its own unmet
    /// dependency (§4.5 "Dependency gating").
    #[must_use]
    pub const fn demoted(self) -> Self {
        Self::Low
    }
}

/// What caused an item to be enqueued, used to look up the default
/// priority when the caller doesn't override it (§4.5 "Priority mapping
/// (default)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityHint {
    BalanceThreshold,
    PaydayDetection,
    Sweep,
    Autosorter,
    AutoTopup,
    ManualOnly,
    Manual,
}

impl PriorityHint {
    #[must_use]
    pub const fn default_priority(self) -> Priority {
        match self {
            Self::BalanceThreshold => Priority::Critical,
            Self::PaydayDetection => Priority::High,
            Self::Sweep | Self::Autosorter => Priority::Normal,
            Self::AutoTopup => Priority::Low,
            Self::ManualOnly => Priority::Background,
            // Manual invocations override with NORMAL or higher; NORMAL is
            // the floor applied here, callers may pass a higher priority
            // explicitly instead of this hint.
            Self::Manual => Priority::Normal,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
            Self::Background => "background",
        };
        f.write_str(s)
    }
}
