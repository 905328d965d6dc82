use std::{collections::HashMap, sync::Arc, time::Duration};

use automation_integration::AutomationIntegration;
use core_types::{RuleId, Timestamp};
use parking_lot::Mutex;
use rule_model::{Rule, RuleStore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{cadence::ticker_cadence_for, error::SchedulerError};

/// Owns the lifecycle of every per-rule ticker (§4.8 "Per-rule tickers").
///
/// One `tokio` task per ticked rule, keyed by [`RuleId`]. Adding, replacing,
/// or removing a rule's ticker is the caller's responsibility at the CRUD
/// boundary (§4.8: "When a rule is created, its scheduler is added; when
/// toggled off, removed; when edited, replaced.") — `register_rule`,
/// `unregister_rule`, and `replace_rule` are the public hooks a rule-CRUD
/// surface calls.
pub struct RuleTickerRegistry {
    integration: Arc<AutomationIntegration>,
    tickers: Mutex<HashMap<RuleId, JoinHandle<()>>>,
}

impl std::fmt::Debug for RuleTickerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleTickerRegistry").field("active_tickers", &self.tickers.lock().len()).finish_non_exhaustive()
    }
}

impl RuleTickerRegistry {
    #[must_use]
    pub fn new(integration: Arc<AutomationIntegration>) -> Self {
        Self { integration, tickers: Mutex::new(HashMap::new()) }
    }

    /// Reads every enabled rule across every user and starts a ticker for
    /// each one whose trigger type needs one (§4.8 "Startup registration").
    /// A rule without a dedicated cadence is left to the global automation
    /// ticker; that's not an error here.
    pub async fn register_all(&self, rule_store: &dyn RuleStore) -> Result<usize, SchedulerError> {
        let rules = rule_store.list_all_enabled_rules().await?;
        let mut started = 0;
        for rule in &rules {
            if self.register_rule(rule) {
                started += 1;
            }
        }
        info!(target: "schedulers", rules_seen = rules.len(), tickers_started = started, "startup ticker registration complete");
        Ok(started)
    }

    /// Starts a ticker for `rule` if its trigger type needs one. Returns
    /// `false` (not an error) for calendar-aligned or manual triggers.
    /// Replaces any ticker already registered under this rule's id.
    pub fn register_rule(&self, rule: &Rule) -> bool {
        let Some(cadence) = ticker_cadence_for(rule) else {
            return false;
        };
        let interval = cadence.interval();
        let rule_id = rule.id.clone();
        let integration = self.integration.clone();
        let handle = spawn_rule_ticker(rule_id.clone(), interval, integration);

        if let Some(previous) = self.tickers.lock().insert(rule_id.clone(), handle) {
            previous.abort();
        }
        debug!(target: "schedulers", rule_id = %rule_id, interval_secs = interval.as_secs(), "per-rule ticker registered");
        true
    }

    /// Stops and removes `rule_id`'s ticker, if one exists. A no-op for
    /// rules that never had a dedicated ticker.
    pub fn unregister_rule(&self, rule_id: &RuleId) {
        if let Some(handle) = self.tickers.lock().remove(rule_id) {
            handle.abort();
            debug!(target: "schedulers", rule_id = %rule_id, "per-rule ticker unregistered");
        }
    }

    /// An edit changes a rule's trigger type or cadence fields in place, so
    /// the old ticker (if any) is torn down before the new one (if any) is
    /// started (§4.8: "when edited, replaced").
    pub fn replace_rule(&self, rule: &Rule) {
        self.unregister_rule(&rule.id);
        self.register_rule(rule);
    }

    /// Number of rules currently holding a dedicated ticker. Exposed for
    /// tests and health reporting, not part of the scheduling algorithm.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.tickers.lock().len()
    }
}

impl Drop for RuleTickerRegistry {
    fn drop(&mut self) {
        for (_, handle) in self.tickers.lock().drain() {
            handle.abort();
        }
    }
}

fn spawn_rule_ticker(
    rule_id: RuleId,
    interval: Duration,
    integration: Arc<AutomationIntegration>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let now: Timestamp = chrono::Utc::now();
            if let Err(err) = integration.run_single_rule(&rule_id, now).await {
                warn!(target: "schedulers", rule_id = %rule_id, %err, "per-rule tick failed, will retry next tick");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use core_types::{AccountId, Amount, CoreError, PotId, UserId};
    use execution_queue::{ExecutionOutcome, ExecutionQueue, QueueConfig};
    use local_store::{Account, InMemoryLocalStore, LocalStore};
    use rule_executors::ExecutionContext;
    use rule_model::{
        current_version, AutoTopupConfig, AutoTopupTrigger, ExecutionMetadata, InMemoryRuleStore, RuleConfig,
    };
    use trigger_eval::{Decision, TriggerContext, TriggerEvalError, TriggerEvaluator};

    use super::*;

    struct AlwaysFireEvaluator;

    #[async_trait]
    impl TriggerEvaluator for AlwaysFireEvaluator {
        async fn evaluate(&self, _rule: &Rule, _ctx: &TriggerContext) -> Result<Decision, TriggerEvalError> {
            Ok(Decision::fire("always fires, for testing"))
        }
    }

    struct RecordingExecutor;

    #[async_trait]
    impl rule_executors::RuleExecutor for RecordingExecutor {
        async fn run(&self, _rule: &Rule, _ctx: &ExecutionContext) -> Result<ExecutionOutcome, CoreError> {
            Ok(ExecutionOutcome::new(Amount::minor_units(1), "ran"))
        }
    }

    fn minute_rule(id: &str) -> Rule {
        Rule {
            id: RuleId::from(id),
            user_id: UserId::from("user_1"),
            name: "topup".into(),
            enabled: true,
            config: RuleConfig::AutoTopup {
                version: current_version(),
                config: AutoTopupConfig {
                    source_account_id: AccountId::from("acc_1"),
                    target_pot_id: PotId::from("pot_target"),
                    amount: Amount::minor_units(1_000),
                    target_balance: None,
                    trigger: AutoTopupTrigger::Minute { interval_minutes: 1 },
                    min_balance: None,
                },
            },
            created: Timestamp::default(),
            updated: Timestamp::default(),
            last_executed: None,
            execution_metadata: ExecutionMetadata::default(),
        }
    }

    fn manual_only_sweep(id: &str) -> Rule {
        Rule {
            id: RuleId::from(id),
            user_id: UserId::from("user_1"),
            name: "manual sweep".into(),
            enabled: true,
            config: RuleConfig::PotSweep {
                version: current_version(),
                config: rule_model::SweepConfig {
                    sources: vec![],
                    target_pot_name: "Savings".into(),
                    trigger: rule_model::SweepTrigger::Manual,
                },
            },
            created: Timestamp::default(),
            updated: Timestamp::default(),
            last_executed: None,
            execution_metadata: ExecutionMetadata::default(),
        }
    }

    async fn test_integration() -> Arc<AutomationIntegration> {
        let store: Arc<dyn LocalStore> = Arc::new(InMemoryLocalStore::default());
        store
            .upsert_account(&Account {
                id: AccountId::from("acc_1"),
                user_id: UserId::from("user_1"),
                description: "Main".into(),
                account_type: "uk_retail".into(),
                created: Timestamp::default(),
                closed: false,
                active_for_sync: true,
                last_sync: None,
                last_known_balance: None,
            })
            .await
            .unwrap();
        Arc::new(AutomationIntegration::new(
            store,
            Arc::new(InMemoryRuleStore::default()),
            Arc::new(AlwaysFireEvaluator),
            Arc::new(RecordingExecutor),
            ExecutionQueue::new(QueueConfig::default()),
        ))
    }

    #[tokio::test]
    async fn rule_needing_a_cadence_gets_a_ticker() {
        let registry = RuleTickerRegistry::new(test_integration().await);
        assert!(registry.register_rule(&minute_rule("rule_1")));
        assert_eq!(registry.active_count(), 1);
    }

    #[tokio::test]
    async fn manual_only_rule_gets_no_ticker() {
        let registry = RuleTickerRegistry::new(test_integration().await);
        assert!(!registry.register_rule(&manual_only_sweep("rule_1")));
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn unregister_removes_the_ticker() {
        let registry = RuleTickerRegistry::new(test_integration().await);
        registry.register_rule(&minute_rule("rule_1"));
        registry.unregister_rule(&RuleId::from("rule_1"));
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn replace_swaps_the_old_ticker_for_a_new_one() {
        let registry = RuleTickerRegistry::new(test_integration().await);
        registry.register_rule(&minute_rule("rule_1"));
        registry.replace_rule(&minute_rule("rule_1"));
        assert_eq!(registry.active_count(), 1);
    }

    #[tokio::test]
    async fn startup_registration_only_starts_tickers_for_cadenced_rules() {
        let rule_store = Arc::new(InMemoryRuleStore::default());
        rule_store.create_rule(minute_rule("rule_1")).await.unwrap();
        rule_store.create_rule(manual_only_sweep("rule_2")).await.unwrap();

        let registry = RuleTickerRegistry::new(test_integration().await);
        let started = registry.register_all(rule_store.as_ref()).await.unwrap();
        assert_eq!(started, 1);
        assert_eq!(registry.active_count(), 1);
    }
}
