use std::{
    collections::{BinaryHeap, HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration as StdDuration,
};

use core_types::RuleId;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::{
    error::ExecutionQueueError,
    item::{ExecutionOutcome, QueueItem},
};

/// Tunables for the queue and its worker pool (§4.5 "Workers", "Capacity").
#[derive(Debug, Clone, Copy)]
pub struct QueueConfig {
    pub capacity: usize,
    pub worker_count: usize,
    pub pop_timeout: StdDuration,
    pub inter_job_pause: StdDuration,
    /// Maximum times a dependency-gated item is demoted and re-enqueued
    /// before it's dropped as failed, so a dependency that never completes
    /// can't re-enqueue its dependent forever (§9 "Queue Worker
    /// Resumption").
    pub max_dependency_requeues: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            worker_count: 3,
            pop_timeout: StdDuration::from_secs(1),
            inter_job_pause: StdDuration::from_millis(100),
            max_dependency_requeues: 10,
        }
    }
}

/// Running totals and a bounded per-rule execution history, updated as
/// workers complete items (§4.5 "update statistics").
#[derive(Debug, Default, Clone)]
pub struct QueueStats {
    pub total_completed: u64,
    pub total_failed: u64,
    pub total_dropped_at_capacity: u64,
    pub per_rule_execution_counts: HashMap<RuleId, u64>,
}

/// The maximum number of recent outcomes retained per rule in the history
/// map, mirroring `rule_model::HISTORY_LIMIT`'s bounded-history shape.
const RULE_HISTORY_LIMIT: usize = 5;

struct Inner {
    heap: Mutex<BinaryHeap<QueueItem>>,
    next_sequence: AtomicU64,
    running: AtomicBool,
    notify: Notify,
    completed_this_cycle: Mutex<HashSet<RuleId>>,
    stats: Mutex<QueueStats>,
    history: Mutex<HashMap<RuleId, Vec<String>>>,
    config: QueueConfig,
}

/// The process-wide money-moving job queue (§4.5 "Execution Queue").
///
/// Cloning an `ExecutionQueue` is cheap and shares the same underlying
/// state; every clone talks to the same heap, worker set, and statistics.
#[derive(Clone)]
pub struct ExecutionQueue {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ExecutionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.inner.heap.lock().len();
        f.debug_struct("ExecutionQueue").field("len", &len).finish_non_exhaustive()
    }
}

impl ExecutionQueue {
    #[must_use]
    pub fn new(config: QueueConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                heap: Mutex::new(BinaryHeap::new()),
                next_sequence: AtomicU64::new(0),
                running: AtomicBool::new(true),
                notify: Notify::new(),
                completed_this_cycle: Mutex::new(HashSet::new()),
                stats: Mutex::new(QueueStats::default()),
                history: Mutex::new(HashMap::new()),
                config,
            }),
        }
    }

    /// Enqueues `item`, dropping and logging it if the queue is at capacity
    /// or has been stopped (§4.5 "Capacity").
    pub fn enqueue(&self, mut item: QueueItem) -> Result<(), ExecutionQueueError> {
        if !self.inner.running.load(Ordering::SeqCst) {
            return Err(ExecutionQueueError::Stopped);
        }

        let mut heap = self.inner.heap.lock();
        if heap.len() >= self.inner.config.capacity {
            self.inner.stats.lock().total_dropped_at_capacity += 1;
            warn!(
                target: "execution_queue", rule_id = %item.rule_id, capacity = self.inner.config.capacity,
                "queue at capacity, dropping item"
            );
            return Err(ExecutionQueueError::QueueFull { capacity: self.inner.config.capacity });
        }

        item.sequence = self.inner.next_sequence.fetch_add(1, Ordering::SeqCst);
        debug!(
            target: "execution_queue", rule_id = %item.rule_id, priority = %item.priority,
            depends_on = item.depends_on.len(), "enqueued item"
        );
        heap.push(item);
        drop(heap);
        self.inner.notify.notify_one();
        Ok(())
    }

    /// Clears the "completed this cycle" set, marking the start of a new
    /// automation pass over a user's rules (§4.5 "Dependency gating").
    pub fn begin_cycle(&self) {
        self.inner.completed_this_cycle.lock().clear();
    }

    /// Cooperative shutdown: workers finish their current item, then exit,
    /// rather than being cancelled mid-call (§4.5 "Cancellation").
    pub fn stop(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn stats(&self) -> QueueStats {
        self.inner.stats.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.heap.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawns the fixed-size worker pool (§4.5 "Workers") and returns a
    /// handle whose tasks can be awaited for a clean shutdown.
    #[must_use]
    pub fn spawn_workers(&self) -> Vec<tokio::task::JoinHandle<()>> {
        (0..self.inner.config.worker_count)
            .map(|worker_index| {
                let queue = self.clone();
                tokio::spawn(async move { queue.worker_loop(worker_index).await })
            })
            .collect()
    }

    async fn worker_loop(&self, worker_index: usize) {
        info!(target: "execution_queue", worker_index, "worker started");
        while self.inner.running.load(Ordering::SeqCst) {
            let Some(mut item) = self.wait_and_pop().await else { continue };

            if !self.dependencies_satisfied(&item.depends_on) {
                if item.requeue_count >= self.inner.config.max_dependency_requeues {
                    warn!(
                        target: "execution_queue", worker_index, rule_id = %item.rule_id,
                        requeue_count = item.requeue_count, "dependency never satisfied, dropping item"
                    );
                    self.inner.stats.lock().total_failed += 1;
                    continue;
                }

                debug!(
                    target: "execution_queue", rule_id = %item.rule_id,
                    "dependencies not yet satisfied, re-enqueuing demoted"
                );
                item.priority = item.priority.demoted();
                item.requeue_count += 1;
                if self.enqueue(item).is_err() {
                    warn!(target: "execution_queue", worker_index, "dropped dependency-gated re-enqueue at capacity");
                }
                continue;
            }

            self.run_item(worker_index, item).await;
            tokio::time::sleep(self.inner.config.inter_job_pause).await;
        }
        info!(target: "execution_queue", worker_index, "worker stopped");
    }

    async fn wait_and_pop(&self) -> Option<QueueItem> {
        if let Some(item) = self.inner.heap.lock().pop() {
            return Some(item);
        }
        let _ = tokio::time::timeout(self.inner.config.pop_timeout, self.inner.notify.notified()).await;
        self.inner.heap.lock().pop()
    }

    fn dependencies_satisfied(&self, depends_on: &[RuleId]) -> bool {
        if depends_on.is_empty() {
            return true;
        }
        let completed = self.inner.completed_this_cycle.lock();
        depends_on.iter().all(|dep| completed.contains(dep))
    }

    async fn run_item(&self, worker_index: usize, mut item: QueueItem) {
        let job = item.job.take().expect("queue item job is only taken once, by its own worker");
        let rule_id = item.rule_id.clone();

        let outcome = job().await;
        match &outcome {
            Ok(ExecutionOutcome { amount_moved, summary }) => {
                info!(
                    target: "execution_queue", worker_index, rule_id = %rule_id,
                    %amount_moved, %summary, "job completed"
                );
                self.inner.stats.lock().total_completed += 1;
                self.record_history(&rule_id, summary.clone());
            }
            Err(err) => {
                if err.is_benign_outcome() {
                    debug!(target: "execution_queue", worker_index, rule_id = %rule_id, %err, "job skipped");
                } else {
                    warn!(target: "execution_queue", worker_index, rule_id = %rule_id, %err, "job failed");
                    self.inner.stats.lock().total_failed += 1;
                }
            }
        }

        *self.inner.stats.lock().per_rule_execution_counts.entry(rule_id.clone()).or_insert(0) += 1;
        self.inner.completed_this_cycle.lock().insert(rule_id);
    }

    fn record_history(&self, rule_id: &RuleId, summary: String) {
        let mut history = self.inner.history.lock();
        let entries = history.entry(rule_id.clone()).or_default();
        entries.push(summary);
        if entries.len() > RULE_HISTORY_LIMIT {
            entries.remove(0);
        }
    }

    #[must_use]
    pub fn history_for(&self, rule_id: &RuleId) -> Vec<String> {
        self.inner.history.lock().get(rule_id).cloned().unwrap_or_default()
    }
}
