#![warn(missing_debug_implementations)]
#![deny(unused_must_use, rust_2018_idioms, unreachable_pub)]

//! Per-rule "should this fire right now" predicate (§4.4 "Trigger
//! Evaluation").
//!
//! This crate knows nothing about queues, executors, or schedulers — it
//! answers one question, given a [`rule_model::Rule`] and a
//! [`context::TriggerContext`]: does the rule's configured trigger condition
//! hold right now. Callers (`automation-integration`) decide what to do with
//! a fired decision.

mod balance;
mod context;
mod error;
mod evaluator;

pub use balance::{live_account_balance, live_pot_balance};
pub use context::{Decision, TriggerContext};
pub use error::TriggerEvalError;
pub use evaluator::{target_balance_transfer_amount, DefaultTriggerEvaluator, TriggerEvaluator};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use bank_client::{
        BankClient, BankClientError, BankPot, BankAccount, BankTransaction, ExchangedTokens,
        TransactionQuery, WhoAmI,
    };
    use core_types::{AccountId, Amount, PotId, RuleId, Timestamp, UserId};
    use local_store::{InMemoryLocalStore, LocalStore};
    use rule_model::{
        current_version, AutoTopupConfig, AutoTopupTrigger, ExecutionMetadata, Rule, RuleConfig,
        SweepConfig, SweepSource, SweepStrategy, SweepTrigger,
    };

    use super::*;

    /// A stub bank client returning fixed data, standing in for the real
    /// HTTP client in these unit tests.
    #[derive(Debug, Default)]
    struct StubBankClient {
        balance: parking_lot::Mutex<Option<Amount>>,
        fail_balance: bool,
    }

    #[async_trait]
    impl BankClient for StubBankClient {
        async fn get_accounts(&self, _user_id: &UserId) -> Result<Vec<BankAccount>, BankClientError> {
            Ok(vec![])
        }

        async fn get_pots(
            &self,
            _user_id: &UserId,
            _account_id: &AccountId,
        ) -> Result<Vec<BankPot>, BankClientError> {
            Ok(vec![])
        }

        async fn get_balance(
            &self,
            _user_id: &UserId,
            _account_id: &AccountId,
        ) -> Result<Amount, BankClientError> {
            if self.fail_balance {
                return Err(BankClientError::BankTransient("stub failure".into()));
            }
            Ok((*self.balance.lock()).unwrap_or(Amount::ZERO))
        }

        async fn get_transactions(
            &self,
            _user_id: &UserId,
            _account_id: &str,
            _query: TransactionQuery,
        ) -> Result<Vec<BankTransaction>, BankClientError> {
            Ok(vec![])
        }

        async fn deposit_to_pot(
            &self,
            _user_id: &UserId,
            _pot_id: &PotId,
            _from_account_id: &AccountId,
            _amount: Amount,
            _dedupe_id: &str,
        ) -> Result<(), BankClientError> {
            Ok(())
        }

        async fn withdraw_from_pot(
            &self,
            _user_id: &UserId,
            _pot_id: &PotId,
            _to_account_id: &AccountId,
            _amount: Amount,
            _dedupe_id: &str,
        ) -> Result<(), BankClientError> {
            Ok(())
        }

        async fn annotate_transaction(
            &self,
            _user_id: &UserId,
            _txn_id: &str,
            _notes: &str,
        ) -> Result<(), BankClientError> {
            Ok(())
        }

        async fn whoami(&self, _user_id: &UserId) -> Result<WhoAmI, BankClientError> {
            Err(BankClientError::BankTransient("stub does not implement whoami".into()))
        }

        async fn exchange_code_for_token(
            &self,
            _client_id: &str,
            _client_secret: &str,
            _redirect_uri: &str,
            _code: &str,
        ) -> Result<ExchangedTokens, BankClientError> {
            Err(BankClientError::BankTransient("stub does not implement oauth".into()))
        }

        async fn refresh_access_token(
            &self,
            _user_id: &UserId,
        ) -> Result<ExchangedTokens, BankClientError> {
            Err(BankClientError::BankTransient("stub does not implement oauth".into()))
        }
    }

    fn sample_sweep_rule(trigger: SweepTrigger) -> Rule {
        Rule {
            id: RuleId::from("rule_1"),
            user_id: UserId::from("user_1"),
            name: "Test sweep".into(),
            enabled: true,
            config: RuleConfig::PotSweep {
                version: current_version(),
                config: SweepConfig {
                    sources: vec![SweepSource {
                        pot_name: "main account".into(),
                        strategy: SweepStrategy::AllAvailable,
                        amount: None,
                        percentage: None,
                        min_balance: None,
                        priority: 0,
                    }],
                    target_pot_name: "Savings".into(),
                    trigger,
                },
            },
            created: Timestamp::default(),
            updated: Timestamp::default(),
            last_executed: None,
            execution_metadata: ExecutionMetadata::default(),
        }
    }

    fn ctx(now: Timestamp) -> TriggerContext {
        TriggerContext {
            now,
            user_id: UserId::from("user_1"),
            primary_account_id: AccountId::from("acc_1"),
        }
    }

    #[tokio::test]
    async fn disabled_rule_never_fires() {
        let bank = Arc::new(StubBankClient::default());
        let store = Arc::new(InMemoryLocalStore::default());
        let evaluator = DefaultTriggerEvaluator::new(bank, store);

        let mut rule = sample_sweep_rule(SweepTrigger::Manual);
        rule.enabled = false;

        let decision = evaluator.evaluate(&rule, &ctx(Timestamp::default())).await.unwrap();
        assert!(!decision.should_fire);
    }

    #[tokio::test]
    async fn manual_sweep_never_fires_on_its_own() {
        let bank = Arc::new(StubBankClient::default());
        let store = Arc::new(InMemoryLocalStore::default());
        let evaluator = DefaultTriggerEvaluator::new(bank, store);

        let rule = sample_sweep_rule(SweepTrigger::Manual);
        let decision = evaluator.evaluate(&rule, &ctx(Timestamp::default())).await.unwrap();
        assert!(!decision.should_fire);
    }

    #[tokio::test]
    async fn balance_threshold_sweep_fires_when_balance_meets_threshold() {
        let bank = Arc::new(StubBankClient {
            balance: parking_lot::Mutex::new(Some(Amount::minor_units(10_000))),
            fail_balance: false,
        });
        let store = Arc::new(InMemoryLocalStore::default());
        let evaluator = DefaultTriggerEvaluator::new(bank, store);

        let rule = sample_sweep_rule(SweepTrigger::BalanceThreshold {
            trigger_threshold: Amount::minor_units(5_000),
        });
        let decision = evaluator.evaluate(&rule, &ctx(Timestamp::default())).await.unwrap();
        assert!(decision.should_fire);
    }

    #[tokio::test]
    async fn balance_threshold_sweep_skips_below_threshold() {
        let bank = Arc::new(StubBankClient {
            balance: parking_lot::Mutex::new(Some(Amount::minor_units(1_000))),
            fail_balance: false,
        });
        let store = Arc::new(InMemoryLocalStore::default());
        let evaluator = DefaultTriggerEvaluator::new(bank, store);

        let rule = sample_sweep_rule(SweepTrigger::BalanceThreshold {
            trigger_threshold: Amount::minor_units(5_000),
        });
        let decision = evaluator.evaluate(&rule, &ctx(Timestamp::default())).await.unwrap();
        assert!(!decision.should_fire);
    }

    #[tokio::test]
    async fn live_balance_falls_back_to_stale_cache_on_bank_failure() {
        let bank = Arc::new(StubBankClient { balance: parking_lot::Mutex::new(None), fail_balance: true });
        let store = Arc::new(InMemoryLocalStore::default());
        let account_id = AccountId::from("acc_1");
        store
            .upsert_account(&local_store::Account {
                id: account_id.clone(),
                user_id: UserId::from("user_1"),
                description: "Main".into(),
                account_type: "uk_retail".into(),
                created: Timestamp::default(),
                closed: false,
                active_for_sync: true,
                last_sync: None,
                last_known_balance: Some(Amount::minor_units(7_500)),
            })
            .await
            .unwrap();

        let balance = live_account_balance(bank.as_ref(), store.as_ref(), &UserId::from("user_1"), &account_id)
            .await
            .unwrap();
        assert_eq!(balance, Amount::minor_units(7_500));
    }

    #[tokio::test]
    async fn auto_topup_balance_threshold_respects_min_balance_gate() {
        let bank = Arc::new(StubBankClient::default());
        let store = Arc::new(InMemoryLocalStore::default());
        let pot_id = PotId::from("pot_1");
        store
            .upsert_pot(&local_store::Pot {
                id: pot_id.clone(),
                account_id: AccountId::from("acc_1"),
                user_id: UserId::from("user_1"),
                name: "Spending".into(),
                style: None,
                balance: Amount::minor_units(2_000),
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

        let evaluator = DefaultTriggerEvaluator::new(bank, Arc::clone(&store));
        let rule = Rule {
            id: RuleId::from("rule_2"),
            user_id: UserId::from("user_1"),
            name: "Top up spending".into(),
            enabled: true,
            config: RuleConfig::AutoTopup {
                version: current_version(),
                config: AutoTopupConfig {
                    source_account_id: AccountId::from("acc_1"),
                    target_pot_id: pot_id,
                    amount: Amount::minor_units(1_000),
                    target_balance: None,
                    trigger: AutoTopupTrigger::BalanceThreshold,
                    min_balance: Some(Amount::minor_units(5_000)),
                },
            },
            created: Timestamp::default(),
            updated: Timestamp::default(),
            last_executed: None,
            execution_metadata: ExecutionMetadata::default(),
        };

        let decision = evaluator.evaluate(&rule, &ctx(Timestamp::default())).await.unwrap();
        assert!(!decision.should_fire, "balance threshold trigger compares pot balance to min_balance");
    }

    #[tokio::test]
    async fn payday_detection_fires_on_qualifying_deposit_with_no_prior_execution() {
        let bank = Arc::new(StubBankClient::default());
        let store = Arc::new(InMemoryLocalStore::default());
        let account_id = AccountId::from("acc_1");
        let now = Timestamp::default();

        store
            .insert_transactions(&[local_store::Transaction {
                id: "txn_1".into(),
                account_id: account_id.clone(),
                user_id: UserId::from("user_1"),
                created: now - chrono::Duration::days(2),
                settled: None,
                amount: Amount::minor_units(200_000),
                currency: "GBP".into(),
                description: "ACME CORP PAYROLL".into(),
                category: None,
                merchant: None,
                notes: None,
                is_load: false,
                metadata: serde_json::Value::Null,
                pot_current_id: None,
            }])
            .await
            .unwrap();

        let evaluator = DefaultTriggerEvaluator::new(bank, store);
        let rule = sample_sweep_rule(SweepTrigger::PaydayDetection {
            payday_threshold: Amount::minor_units(50_000),
            payday_description_pattern: None,
        });

        let decision = evaluator.evaluate(&rule, &ctx(now)).await.unwrap();
        assert!(decision.should_fire, "a fresh qualifying deposit with no prior execution should fire");
    }

    #[tokio::test]
    async fn payday_detection_skips_within_cooldown_of_last_execution() {
        let bank = Arc::new(StubBankClient::default());
        let store = Arc::new(InMemoryLocalStore::default());
        let account_id = AccountId::from("acc_1");
        let now = Timestamp::default();

        store
            .insert_transactions(&[local_store::Transaction {
                id: "txn_1".into(),
                account_id: account_id.clone(),
                user_id: UserId::from("user_1"),
                created: now - chrono::Duration::days(2),
                settled: None,
                amount: Amount::minor_units(200_000),
                currency: "GBP".into(),
                description: "ACME CORP PAYROLL".into(),
                category: None,
                merchant: None,
                notes: None,
                is_load: false,
                metadata: serde_json::Value::Null,
                pot_current_id: None,
            }])
            .await
            .unwrap();

        let evaluator = DefaultTriggerEvaluator::new(bank, store);
        let mut rule = sample_sweep_rule(SweepTrigger::PaydayDetection {
            payday_threshold: Amount::minor_units(50_000),
            payday_description_pattern: None,
        });
        rule.last_executed = Some(now - chrono::Duration::days(3));

        let decision = evaluator.evaluate(&rule, &ctx(now)).await.unwrap();
        assert!(!decision.should_fire, "an execution within the 7-day cooldown suppresses a re-fire");
    }

    #[test]
    fn target_balance_transfer_amount_clamps_to_available_and_max() {
        let target = Amount::minor_units(10_000);
        let current = Amount::minor_units(2_000);
        let configured_max = Amount::minor_units(5_000);
        let available = Amount::minor_units(3_000);

        assert_eq!(
            target_balance_transfer_amount(target, current, configured_max, available),
            Amount::minor_units(3_000)
        );
        assert_eq!(
            target_balance_transfer_amount(target, current, Amount::minor_units(1_000), available),
            Amount::minor_units(1_000)
        );
    }
}
