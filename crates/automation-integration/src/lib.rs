#![warn(missing_debug_implementations)]
#![deny(unused_must_use, rust_2018_idioms, unreachable_pub)]

//! Wires a successful sync, a timed tick, or a manual request onto the
//! execution queue (§4.7 "Sync-Automation Integration").
//!
//! Depends on `sync-engine` only to implement its [`sync_engine::PostSyncHook`]
//! trait; nothing here is depended on by `sync-engine` itself (§9 "Cyclic
//! Module References").

mod account_resolve;
mod error;
mod hook;
mod integration;
mod priority;

pub use error::IntegrationError;
pub use integration::{AutomationIntegration, RunSummary};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use core_types::{AccountId, Amount, CoreError, PotId, RuleId, Timestamp, UserId};
    use execution_queue::{ExecutionOutcome, ExecutionQueue, QueueConfig};
    use local_store::{Account, InMemoryLocalStore, LocalStore, Pot};
    use rule_executors::ExecutionContext;
    use rule_model::{
        current_version, AutoTopupConfig, AutoTopupTrigger, AutosorterConfig, AutosorterTrigger,
        ExecutionMetadata, InMemoryRuleStore, Rule, RuleConfig, RuleStore, SweepConfig, SweepTrigger,
    };
    use sync_engine::PostSyncHook;
    use trigger_eval::{Decision, TriggerContext, TriggerEvaluator};

    use super::*;

    /// Fires every rule it's asked about, and records which rules it was
    /// asked about.
    struct AlwaysFireEvaluator;

    #[async_trait]
    impl TriggerEvaluator for AlwaysFireEvaluator {
        async fn evaluate(
            &self,
            _rule: &Rule,
            _ctx: &TriggerContext,
        ) -> Result<Decision, trigger_eval::TriggerEvalError> {
            Ok(Decision::fire("always fires, for testing"))
        }
    }

    struct NeverFireEvaluator;

    #[async_trait]
    impl TriggerEvaluator for NeverFireEvaluator {
        async fn evaluate(
            &self,
            _rule: &Rule,
            _ctx: &TriggerContext,
        ) -> Result<Decision, trigger_eval::TriggerEvalError> {
            Ok(Decision::skip("never fires, for testing"))
        }
    }

    struct RecordingExecutor;

    #[async_trait]
    impl rule_executors::RuleExecutor for RecordingExecutor {
        async fn run(&self, _rule: &Rule, _ctx: &ExecutionContext) -> Result<ExecutionOutcome, CoreError> {
            Ok(ExecutionOutcome::new(Amount::minor_units(1), "ran"))
        }
    }

    async fn store_with_account_and_pot(account_id: &str, pot_id: &str, pot_name: &str) -> InMemoryLocalStore {
        let store = InMemoryLocalStore::default();
        store
            .upsert_account(&Account {
                id: AccountId::from(account_id),
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
        store
            .upsert_pot(&Pot {
                id: PotId::from(pot_id),
                account_id: AccountId::from(account_id),
                user_id: UserId::from("user_1"),
                name: pot_name.into(),
                style: None,
                balance: Amount::ZERO,
                currency: "GBP".into(),
                created: Timestamp::default(),
                updated: Timestamp::default(),
                deleted: false,
                goal: Amount::ZERO,
                pot_current_id: None,
                category: None,
            })
            .await
            .unwrap();
        store
    }

    fn topup_rule(id: &str, source_account_id: &str) -> Rule {
        Rule {
            id: RuleId::from(id),
            user_id: UserId::from("user_1"),
            name: "topup".into(),
            enabled: true,
            config: RuleConfig::AutoTopup {
                version: current_version(),
                config: AutoTopupConfig {
                    source_account_id: AccountId::from(source_account_id),
                    target_pot_id: PotId::from("pot_target"),
                    amount: Amount::minor_units(1_000),
                    target_balance: None,
                    trigger: AutoTopupTrigger::BalanceThreshold,
                    min_balance: None,
                },
            },
            created: Timestamp::default(),
            updated: Timestamp::default(),
            last_executed: None,
            execution_metadata: ExecutionMetadata::default(),
        }
    }

    fn automation_trigger_rule(id: &str, holding_pot_id: &str) -> Rule {
        Rule {
            id: RuleId::from(id),
            user_id: UserId::from("user_1"),
            name: "deferred autosorter".into(),
            enabled: true,
            config: RuleConfig::Autosorter {
                version: current_version(),
                config: AutosorterConfig {
                    holding_pot_id: PotId::from(holding_pot_id),
                    bills_pot_id: PotId::from("pot_bills"),
                    priority_pots: vec![],
                    goal_pots: vec![],
                    investment_pots: vec![],
                    holding_reserve_amount: None,
                    holding_reserve_percentage: None,
                    min_holding_balance: Amount::ZERO,
                    include_goal_pots: true,
                    payday_date: None,
                    trigger: AutosorterTrigger::AutomationTrigger,
                },
            },
            created: Timestamp::default(),
            updated: Timestamp::default(),
            last_executed: None,
            execution_metadata: ExecutionMetadata::default(),
        }
    }

    #[tokio::test]
    async fn firing_rule_is_enqueued_and_counted() {
        let store: Arc<dyn LocalStore> =
            Arc::new(store_with_account_and_pot("acc_1", "pot_target", "Target").await);
        let rule_store = Arc::new(InMemoryRuleStore::default());
        let rule = topup_rule("rule_1", "acc_1");
        rule_store.create_rule(rule).await.unwrap();

        let integration = AutomationIntegration::new(
            store,
            rule_store,
            Arc::new(AlwaysFireEvaluator),
            Arc::new(RecordingExecutor),
            ExecutionQueue::new(QueueConfig::default()),
        );

        let summary = integration.run_for_user(&UserId::from("user_1"), Timestamp::default()).await.unwrap();
        assert_eq!(summary.enqueued, 1);
        assert_eq!(summary.skipped, 0);
    }

    #[tokio::test]
    async fn non_firing_rule_is_skipped_not_enqueued() {
        let store: Arc<dyn LocalStore> =
            Arc::new(store_with_account_and_pot("acc_1", "pot_target", "Target").await);
        let rule_store = Arc::new(InMemoryRuleStore::default());
        let rule = topup_rule("rule_1", "acc_1");
        rule_store.create_rule(rule).await.unwrap();

        let integration = AutomationIntegration::new(
            store,
            rule_store,
            Arc::new(NeverFireEvaluator),
            Arc::new(RecordingExecutor),
            ExecutionQueue::new(QueueConfig::default()),
        );

        let summary = integration.run_for_user(&UserId::from("user_1"), Timestamp::default()).await.unwrap();
        assert_eq!(summary.enqueued, 0);
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn automation_trigger_rule_is_enqueued_depending_on_primary_batch() {
        let store: Arc<dyn LocalStore> =
            Arc::new(store_with_account_and_pot("acc_1", "pot_target", "Target").await);
        store
            .upsert_pot(&Pot {
                id: PotId::from("pot_holding"),
                account_id: AccountId::from("acc_1"),
                user_id: UserId::from("user_1"),
                name: "Holding".into(),
                style: None,
                balance: Amount::ZERO,
                currency: "GBP".into(),
                created: Timestamp::default(),
                updated: Timestamp::default(),
                deleted: false,
                goal: Amount::ZERO,
                pot_current_id: None,
                category: None,
            })
            .await
            .unwrap();

        let rule_store = Arc::new(InMemoryRuleStore::default());
        rule_store.create_rule(topup_rule("rule_topup", "acc_1")).await.unwrap();
        rule_store.create_rule(automation_trigger_rule("rule_deferred", "pot_holding")).await.unwrap();

        let integration = AutomationIntegration::new(
            store,
            rule_store,
            Arc::new(AlwaysFireEvaluator),
            Arc::new(RecordingExecutor),
            ExecutionQueue::new(QueueConfig::default()),
        );

        let summary = integration.run_for_user(&UserId::from("user_1"), Timestamp::default()).await.unwrap();
        assert_eq!(summary.enqueued, 1);
        assert_eq!(summary.automation_trigger_enqueued, 1);
    }

    #[tokio::test]
    async fn rule_with_unresolvable_pot_is_skipped_not_an_error() {
        let store: Arc<dyn LocalStore> = Arc::new(InMemoryLocalStore::default());
        let rule_store = Arc::new(InMemoryRuleStore::default());
        let rule = Rule {
            id: RuleId::from("rule_sweep"),
            user_id: UserId::from("user_1"),
            name: "sweep".into(),
            enabled: true,
            config: RuleConfig::PotSweep {
                version: current_version(),
                config: SweepConfig {
                    sources: vec![],
                    target_pot_name: "Nonexistent".into(),
                    trigger: SweepTrigger::Manual,
                },
            },
            created: Timestamp::default(),
            updated: Timestamp::default(),
            last_executed: None,
            execution_metadata: ExecutionMetadata::default(),
        };
        rule_store.create_rule(rule).await.unwrap();

        let integration = AutomationIntegration::new(
            store,
            rule_store,
            Arc::new(AlwaysFireEvaluator),
            Arc::new(RecordingExecutor),
            ExecutionQueue::new(QueueConfig::default()),
        );

        let summary = integration.run_for_user(&UserId::from("user_1"), Timestamp::default()).await.unwrap();
        assert_eq!(summary.enqueued, 0);
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn manual_execution_bypasses_evaluator_and_always_enqueues() {
        let store: Arc<dyn LocalStore> =
            Arc::new(store_with_account_and_pot("acc_1", "pot_target", "Target").await);
        let rule_store = Arc::new(InMemoryRuleStore::default());
        rule_store.create_rule(topup_rule("rule_1", "acc_1")).await.unwrap();

        let queue = ExecutionQueue::new(QueueConfig::default());
        let integration = AutomationIntegration::new(
            store,
            rule_store,
            Arc::new(NeverFireEvaluator),
            Arc::new(RecordingExecutor),
            queue.clone(),
        );

        integration.execute_manual(&RuleId::from("rule_1"), Timestamp::default()).await.unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn post_sync_hook_restricts_to_the_synced_account() {
        let store = Arc::new(store_with_account_and_pot("acc_1", "pot_target", "Target").await);
        // A second account's pot with the same rule never resolves to acc_2,
        // so it's filtered out of acc_2's post-sync batch.
        let local_store: Arc<dyn LocalStore> = store;
        let rule_store = Arc::new(InMemoryRuleStore::default());
        rule_store.create_rule(topup_rule("rule_1", "acc_1")).await.unwrap();

        let integration = AutomationIntegration::new(
            local_store,
            rule_store,
            Arc::new(AlwaysFireEvaluator),
            Arc::new(RecordingExecutor),
            ExecutionQueue::new(QueueConfig::default()),
        );

        PostSyncHook::on_account_synced(&integration, &UserId::from("user_1"), &AccountId::from("acc_2"))
            .await;
        assert_eq!(integration.handle_account_synced(
            &UserId::from("user_1"),
            &AccountId::from("acc_1"),
        ).await.unwrap().enqueued, 1);
    }

    #[tokio::test]
    async fn run_single_rule_fetches_fresh_and_skips_if_disabled() {
        let store: Arc<dyn LocalStore> =
            Arc::new(store_with_account_and_pot("acc_1", "pot_target", "Target").await);
        let rule_store = Arc::new(InMemoryRuleStore::default());
        let mut rule = topup_rule("rule_1", "acc_1");
        rule.enabled = false;
        rule_store.create_rule(rule.clone()).await.unwrap();

        let integration = AutomationIntegration::new(
            store,
            rule_store.clone(),
            Arc::new(AlwaysFireEvaluator),
            Arc::new(RecordingExecutor),
            ExecutionQueue::new(QueueConfig::default()),
        );

        let summary =
            integration.run_single_rule(&RuleId::from("rule_1"), Timestamp::default()).await.unwrap();
        assert_eq!(summary.enqueued, 0);

        rule.enabled = true;
        rule_store.update_rule(rule).await.unwrap();
        let summary =
            integration.run_single_rule(&RuleId::from("rule_1"), Timestamp::default()).await.unwrap();
        assert_eq!(summary.enqueued, 1);
    }
}
