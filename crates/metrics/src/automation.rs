use metrics::{counter, describe_counter, Counter, Unit};

pub(crate) fn describe() {
    describe_counter!("automation.rules_enqueued", Unit::Count, "rules that fired and were enqueued");
    describe_counter!("automation.rules_skipped", Unit::Count, "rules evaluated but not enqueued");
    describe_counter!(
        "automation.automation_trigger_enqueued",
        Unit::Count,
        "deferred automation_trigger autosorter rules enqueued"
    );
}

/// Held by `automation-integration`'s evaluate-and-enqueue pass (§4.7).
#[derive(Debug, Clone)]
pub struct AutomationMetrics {
    rules_enqueued: Counter,
    rules_skipped: Counter,
    automation_trigger_enqueued: Counter,
}

impl AutomationMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules_enqueued: counter!("automation.rules_enqueued"),
            rules_skipped: counter!("automation.rules_skipped"),
            automation_trigger_enqueued: counter!("automation.automation_trigger_enqueued"),
        }
    }

    pub fn record_summary(&self, enqueued: usize, skipped: usize, automation_trigger_enqueued: usize) {
        self.rules_enqueued.increment(enqueued as u64);
        self.rules_skipped.increment(skipped as u64);
        self.automation_trigger_enqueued.increment(automation_trigger_enqueued as u64);
    }
}

impl Default for AutomationMetrics {
    fn default() -> Self {
        Self::new()
    }
}
