use metrics::{counter, describe_counter, describe_gauge, gauge, Counter, Gauge, Unit};

pub(crate) fn describe() {
    describe_counter!("execution_queue.enqueued", Unit::Count, "items enqueued, by rule family");
    describe_counter!("execution_queue.completed", Unit::Count, "items that finished running, by outcome");
    describe_counter!("execution_queue.requeued", Unit::Count, "items requeued after a transient failure");
    describe_gauge!("execution_queue.depth", Unit::Count, "items currently waiting or running");
}

/// Mirrors `execution_queue::RuleFamilyTag` without this crate needing a
/// dependency on `execution-queue` to name three label strings. The owning
/// crate maps its own enum to this one at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFamilyLabel {
    PotSweep,
    Autosorter,
    AutoTopup,
}

/// One handle per rule family/outcome label pair, held by the execution
/// queue's worker loop (§4.5 "Execution Queue").
#[derive(Debug, Clone)]
pub struct QueueMetrics {
    enqueued_sweep: Counter,
    enqueued_autosorter: Counter,
    enqueued_auto_topup: Counter,
    completed_success: Counter,
    completed_benign: Counter,
    completed_failed: Counter,
    requeued: Counter,
    depth: Gauge,
}

impl QueueMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            enqueued_sweep: counter!("execution_queue.enqueued", "family" => "pot_sweep"),
            enqueued_autosorter: counter!("execution_queue.enqueued", "family" => "autosorter"),
            enqueued_auto_topup: counter!("execution_queue.enqueued", "family" => "auto_topup"),
            completed_success: counter!("execution_queue.completed", "outcome" => "success"),
            completed_benign: counter!("execution_queue.completed", "outcome" => "benign"),
            completed_failed: counter!("execution_queue.completed", "outcome" => "failed"),
            requeued: counter!("execution_queue.requeued"),
            depth: gauge!("execution_queue.depth"),
        }
    }

    pub fn record_enqueued(&self, family: RuleFamilyLabel) {
        match family {
            RuleFamilyLabel::PotSweep => self.enqueued_sweep.increment(1),
            RuleFamilyLabel::Autosorter => self.enqueued_autosorter.increment(1),
            RuleFamilyLabel::AutoTopup => self.enqueued_auto_topup.increment(1),
        }
    }

    pub fn record_success(&self) {
        self.completed_success.increment(1);
    }

    pub fn record_benign_outcome(&self) {
        self.completed_benign.increment(1);
    }

    pub fn record_failure(&self) {
        self.completed_failed.increment(1);
    }

    pub fn record_requeue(&self) {
        self.requeued.increment(1);
    }

    pub fn set_depth(&self, depth: usize) {
        self.depth.set(depth as f64);
    }
}

impl Default for QueueMetrics {
    fn default() -> Self {
        Self::new()
    }
}
