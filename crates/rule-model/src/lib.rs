#![warn(missing_debug_implementations)]
#![deny(unused_must_use, rust_2018_idioms, unreachable_pub)]

//! Typed rule family configs (sweep, autosorter, auto-topup) and their CRUD
//! (§4.3 "Rule Model").
//!
//! Each family is a tagged variant of [`RuleConfig`] with its own strongly
//! typed fields rather than the schemaless blob the source carries (§9
//! "Dynamic Rule Config"). Config is validated and normalized on every read
//! and write through a [`RuleStore`] implementation.

mod config;
mod error;
mod execution;
mod memory;
mod rule;
mod sqlx_store;
mod store;
mod validate;

pub use config::{
    current_version, AllocationTarget, AllocationType, AutoTopupConfig, AutoTopupTrigger,
    AutosorterConfig, AutosorterTrigger, RuleConfig, SweepConfig, SweepSource, SweepStrategy,
    SweepTrigger, TransactionFilter,
};
pub use error::RuleModelError;
pub use execution::{ExecutionMetadata, ExecutionRecord, HISTORY_LIMIT};
pub use memory::InMemoryRuleStore;
pub use rule::{Rule, RuleFamily};
pub use sqlx_store::SqlxRuleStore;
pub use store::RuleStore;
pub use validate::validate_and_normalize;

#[cfg(test)]
mod tests {
    use core_types::{AccountId, Amount, PotId, RuleId, Timestamp, UserId};

    use super::*;

    fn sample_rule() -> Rule {
        Rule {
            id: RuleId::from("rule_1"),
            user_id: UserId::from("user_1"),
            name: "Coffee top-up".into(),
            enabled: true,
            config: RuleConfig::AutoTopup {
                version: current_version(),
                config: AutoTopupConfig {
                    source_account_id: AccountId::from("acc_1"),
                    target_pot_id: PotId::from("pot_1"),
                    amount: Amount::minor_units(10_000),
                    target_balance: Some(Amount::minor_units(5_000)),
                    trigger: AutoTopupTrigger::BalanceThreshold,
                    min_balance: Some(Amount::minor_units(1_000)),
                },
            },
            created: Timestamp::default(),
            updated: Timestamp::default(),
            last_executed: None,
            execution_metadata: ExecutionMetadata::default(),
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips_semantically_equal() {
        let store = InMemoryRuleStore::default();
        let rule = sample_rule();
        store.create_rule(rule.clone()).await.unwrap();

        let fetched = store.get_rule(&rule.id).await.unwrap().unwrap();
        assert_eq!(fetched, rule);
        assert_eq!(fetched.family(), RuleFamily::AutoTopup);
    }

    #[tokio::test]
    async fn disabling_a_rule_excludes_it_from_enabled_listing() {
        let store = InMemoryRuleStore::default();
        let mut rule = sample_rule();
        store.create_rule(rule.clone()).await.unwrap();

        rule.enabled = false;
        store.update_rule(rule.clone()).await.unwrap();

        assert!(store.list_enabled_rules(&rule.user_id).await.unwrap().is_empty());
        assert_eq!(store.list_rules_for_user(&rule.user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn record_execution_updates_last_executed_and_history() {
        let store = InMemoryRuleStore::default();
        let rule = sample_rule();
        store.create_rule(rule.clone()).await.unwrap();

        let now = Timestamp::default();
        store
            .record_execution(&rule.id, ExecutionRecord::success(now, Amount::minor_units(4_500), "ok"))
            .await
            .unwrap();

        let fetched = store.get_rule(&rule.id).await.unwrap().unwrap();
        assert_eq!(fetched.last_executed, Some(now));
        assert_eq!(fetched.execution_metadata.execution_count, 1);
    }
}
