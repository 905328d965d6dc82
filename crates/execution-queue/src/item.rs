use std::{future::Future, pin::Pin};

use core_types::{AccountId, Amount, CoreError, RuleId, Timestamp, UserId};

use crate::priority::Priority;

/// The result of running one queued job, independent of which rule family
/// produced it (§4.6 "Aggregate result").
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub amount_moved: Amount,
    pub summary: String,
}

impl ExecutionOutcome {
    #[must_use]
    pub fn new(amount_moved: Amount, summary: impl Into<String>) -> Self {
        Self { amount_moved, summary: summary.into() }
    }
}

/// A job's boxed, one-shot invocation. Built by `automation-integration` by
/// capturing the rule, its resolved context, and the rule executor behind a
/// closure, so the queue itself never needs to know about rule configs or
/// bank clients (§4.5 "the executor invocation closure").
pub type JobFuture = Pin<Box<dyn Future<Output = Result<ExecutionOutcome, CoreError>> + Send>>;
pub type Job = Box<dyn FnOnce() -> JobFuture + Send>;

/// Why an item was enqueued, carried through for logging and the
/// automation-integration audit trail (§4.5 "metadata").
#[derive(Debug, Clone)]
pub struct ItemMetadata {
    pub trigger_reason: String,
    pub manual: bool,
    pub rule_name: String,
}

/// A minimal marker kept separate from `rule_model::RuleFamily` so this
/// crate doesn't need to depend on `rule-model` just to log which family a
/// queued item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFamilyTag {
    PotSweep,
    Autosorter,
    AutoTopup,
}

impl std::fmt::Display for RuleFamilyTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PotSweep => "pot_sweep",
            Self::Autosorter => "autosorter",
            Self::AutoTopup => "auto_topup",
        };
        f.write_str(s)
    }
}

/// One unit of work waiting to run (§4.5).
pub struct QueueItem {
    pub rule_id: RuleId,
    pub user_id: UserId,
    pub account_id: AccountId,
    pub family: RuleFamilyTag,
    pub priority: Priority,
    pub depends_on: Vec<RuleId>,
    pub metadata: ItemMetadata,
    pub enqueued_at: Timestamp,
    /// Times this item has been re-enqueued for an unmet dependency (§4.5
    /// "Dependency gating"; §9 "Queue Worker Resumption"). Capped by
    /// [`crate::QueueConfig::max_dependency_requeues`] so a dependency that
    /// never completes doesn't re-enqueue forever.
    pub requeue_count: u32,
    pub(crate) sequence: u64,
    pub(crate) job: Option<Job>,
}

impl std::fmt::Debug for QueueItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueItem")
            .field("rule_id", &self.rule_id)
            .field("user_id", &self.user_id)
            .field("account_id", &self.account_id)
            .field("priority", &self.priority)
            .field("depends_on", &self.depends_on)
            .field("metadata", &self.metadata)
            .field("enqueued_at", &self.enqueued_at)
            .field("requeue_count", &self.requeue_count)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

impl QueueItem {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rule_id: RuleId,
        user_id: UserId,
        account_id: AccountId,
        family: RuleFamilyTag,
        priority: Priority,
        depends_on: Vec<RuleId>,
        metadata: ItemMetadata,
        enqueued_at: Timestamp,
        job: Job,
    ) -> Self {
        Self {
            rule_id,
            user_id,
            account_id,
            family,
            priority,
            depends_on,
            metadata,
            enqueued_at,
            requeue_count: 0,
            sequence: 0,
            job: Some(job),
        }
    }
}

/// Strict priority descending; ties broken by earlier enqueue sequence
/// (§4.5 "Ordering").
impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}
impl Eq for QueueItem {}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // BinaryHeap is a max-heap: higher priority, and (for equal
        // priority) the *earlier* sequence number, must compare greater.
        self.priority.cmp(&other.priority).then_with(|| other.sequence.cmp(&self.sequence))
    }
}
