#![warn(missing_debug_implementations)]
#![deny(unused_must_use, rust_2018_idioms, unreachable_pub)]

//! Single process-wide queue that serializes money-moving operations
//! (§4.5 "Execution Queue").
//!
//! `automation-integration` builds [`QueueItem`]s (closing over a rule, its
//! resolved executor, and context) and pushes them in; a fixed worker pool
//! pops by priority, gates on declared dependencies, and runs each job to
//! completion before picking up the next.

mod cooldown;
mod error;
mod item;
mod priority;
mod queue;

pub use cooldown::{is_duplicate_execution, AUTO_TOPUP_COOLDOWN, PAYDAY_SWEEP_COOLDOWN};
pub use error::ExecutionQueueError;
pub use item::{ExecutionOutcome, Job, JobFuture, ItemMetadata, QueueItem, RuleFamilyTag};
pub use priority::{Priority, PriorityHint};
pub use queue::{ExecutionQueue, QueueConfig, QueueStats};

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use core_types::{AccountId, Amount, CoreError, RuleId, Timestamp, UserId};

    use super::*;

    fn item(rule_id: &str, priority: Priority, depends_on: Vec<RuleId>) -> QueueItem {
        QueueItem::new(
            RuleId::from(rule_id),
            UserId::from("user_1"),
            AccountId::from("acc_1"),
            RuleFamilyTag::PotSweep,
            priority,
            depends_on,
            ItemMetadata { trigger_reason: "test".into(), manual: false, rule_name: "r".into() },
            Timestamp::default(),
            Box::new(|| Box::pin(async { Ok(ExecutionOutcome::new(Amount::ZERO, "ok")) })),
        )
    }

    #[test]
    fn higher_priority_pops_before_lower() {
        let queue = ExecutionQueue::new(QueueConfig::default());
        queue.enqueue(item("low", Priority::Low, vec![])).unwrap();
        queue.enqueue(item("critical", Priority::Critical, vec![])).unwrap();
        queue.enqueue(item("normal", Priority::Normal, vec![])).unwrap();

        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn enqueue_past_capacity_is_dropped_and_counted() {
        let queue = ExecutionQueue::new(QueueConfig { capacity: 1, ..QueueConfig::default() });
        queue.enqueue(item("first", Priority::Normal, vec![])).unwrap();

        let result = queue.enqueue(item("second", Priority::Normal, vec![]));
        assert!(matches!(result, Err(ExecutionQueueError::QueueFull { capacity: 1 })));
        assert_eq!(queue.stats().total_dropped_at_capacity, 1);
    }

    #[test]
    fn enqueue_after_stop_is_rejected() {
        let queue = ExecutionQueue::new(QueueConfig::default());
        queue.stop();
        let result = queue.enqueue(item("late", Priority::Normal, vec![]));
        assert!(matches!(result, Err(ExecutionQueueError::Stopped)));
    }

    #[tokio::test(start_paused = true)]
    async fn worker_pool_processes_an_independent_item() {
        let queue = ExecutionQueue::new(QueueConfig {
            worker_count: 1,
            pop_timeout: Duration::from_millis(50),
            inter_job_pause: Duration::from_millis(1),
            ..QueueConfig::default()
        });
        queue.enqueue(item("solo", Priority::Normal, vec![])).unwrap();

        let handles = queue.spawn_workers();
        tokio::time::advance(Duration::from_millis(200)).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        queue.stop();
        for handle in handles {
            let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
        }

        assert_eq!(queue.stats().total_completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dependency_gated_item_is_demoted_and_retried() {
        let queue = ExecutionQueue::new(QueueConfig {
            worker_count: 1,
            pop_timeout: Duration::from_millis(20),
            inter_job_pause: Duration::from_millis(1),
            ..QueueConfig::default()
        });

        // depends on a rule id that will never complete in this test.
        queue.enqueue(item("dependent", Priority::Critical, vec![RuleId::from("never")])).unwrap();

        let handles = queue.spawn_workers();
        tokio::time::advance(Duration::from_millis(100)).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        queue.stop();
        for handle in handles {
            let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
        }

        // Never completes because its dependency never does; it should
        // have been re-enqueued at least once rather than counted done.
        assert_eq!(queue.stats().total_completed, 0);
    }

    #[test]
    fn benign_outcomes_do_not_inflate_failure_count() {
        assert!(CoreError::DuplicateSuppressed("x".into()).is_benign_outcome());
    }
}
