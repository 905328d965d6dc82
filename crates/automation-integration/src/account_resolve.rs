use core_types::{AccountId, UserId};
use local_store::LocalStore;
use rule_model::{Rule, RuleConfig};

use crate::error::IntegrationError;

/// Resolves the account a rule's queue item and trigger context should be
/// stamped with, by following its referenced pots to their owning account
/// (§4.7 step 3).
///
/// Auto-topup names its source account directly. Autosorter names a
/// concrete holding pot, looked up by id. Sweep only names pots by string
/// (its `"main account"` sentinel has no pot at all), so it is resolved by
/// scanning the user's accounts for one whose pots contain the configured
/// target pot name — the same lookup `rule_executors::sweep` performs once
/// the account is already known.
pub async fn resolve_account_for_rule(
    local_store: &dyn LocalStore,
    rule: &Rule,
) -> Result<AccountId, IntegrationError> {
    match &rule.config {
        RuleConfig::AutoTopup { config, .. } => Ok(config.source_account_id.clone()),
        RuleConfig::Autosorter { config, .. } => {
            let pot = local_store.get_pot(&config.holding_pot_id).await?.ok_or_else(|| {
                IntegrationError::AccountUnresolved {
                    rule_id: rule.id.clone(),
                    reason: format!("holding pot {} not found", config.holding_pot_id),
                }
            })?;
            Ok(pot.account_id)
        }
        RuleConfig::PotSweep { config, .. } => {
            resolve_sweep_account(local_store, &rule.user_id, &config.target_pot_name)
                .await
                .ok_or_else(|| IntegrationError::AccountUnresolved {
                    rule_id: rule.id.clone(),
                    reason: format!("no account of this user has a pot named {:?}", config.target_pot_name),
                })
        }
    }
}

async fn resolve_sweep_account(
    local_store: &dyn LocalStore,
    user_id: &UserId,
    target_pot_name: &str,
) -> Option<AccountId> {
    let accounts = local_store.list_syncable_accounts().await.ok()?;
    for account in accounts.into_iter().filter(|a| &a.user_id == user_id) {
        let pots = local_store.list_pots_for_account(&account.id).await.ok()?;
        if pots.iter().any(|p| p.name == target_pot_name && p.is_usable()) {
            return Some(account.id);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use core_types::{Amount, PotId};
    use local_store::InMemoryLocalStore;
    use rule_model::{
        current_version, AutoTopupConfig, AutoTopupTrigger, AutosorterConfig, AutosorterTrigger,
        ExecutionMetadata, RuleConfig, SweepConfig, SweepTrigger,
    };

    use super::*;

    fn base_rule(config: RuleConfig) -> Rule {
        Rule {
            id: core_types::RuleId::from("rule_1"),
            user_id: UserId::from("user_1"),
            name: "test".into(),
            enabled: true,
            config,
            created: core_types::Timestamp::default(),
            updated: core_types::Timestamp::default(),
            last_executed: None,
            execution_metadata: ExecutionMetadata::default(),
        }
    }

    #[tokio::test]
    async fn auto_topup_resolves_to_its_configured_source_account() {
        let store = InMemoryLocalStore::default();
        let rule = base_rule(RuleConfig::AutoTopup {
            version: current_version(),
            config: AutoTopupConfig {
                source_account_id: AccountId::from("acc_source"),
                target_pot_id: PotId::from("pot_1"),
                amount: Amount::minor_units(1_000),
                target_balance: None,
                trigger: AutoTopupTrigger::BalanceThreshold,
                min_balance: None,
            },
        });

        let resolved = resolve_account_for_rule(&store, &rule).await.unwrap();
        assert_eq!(resolved, AccountId::from("acc_source"));
    }

    #[tokio::test]
    async fn autosorter_resolves_via_its_holding_pot() {
        let store = InMemoryLocalStore::default();
        store
            .upsert_pot(&local_store::Pot {
                id: PotId::from("pot_holding"),
                account_id: AccountId::from("acc_2"),
                user_id: UserId::from("user_1"),
                name: "Holding".into(),
                style: None,
                balance: Amount::ZERO,
                currency: "GBP".into(),
                created: core_types::Timestamp::default(),
                updated: core_types::Timestamp::default(),
                deleted: false,
                goal: Amount::ZERO,
                pot_current_id: None,
                category: None,
            })
            .await
            .unwrap();

        let rule = base_rule(RuleConfig::Autosorter {
            version: current_version(),
            config: AutosorterConfig {
                holding_pot_id: PotId::from("pot_holding"),
                bills_pot_id: PotId::from("pot_bills"),
                priority_pots: vec![],
                goal_pots: vec![],
                investment_pots: vec![],
                holding_reserve_amount: None,
                holding_reserve_percentage: None,
                min_holding_balance: Amount::ZERO,
                include_goal_pots: true,
                payday_date: None,
                trigger: AutosorterTrigger::ManualOnly,
            },
        });

        let resolved = resolve_account_for_rule(&store, &rule).await.unwrap();
        assert_eq!(resolved, AccountId::from("acc_2"));
    }

    #[tokio::test]
    async fn sweep_resolves_by_scanning_for_the_named_target_pot() {
        let store = InMemoryLocalStore::default();
        store
            .upsert_account(&local_store::Account {
                id: AccountId::from("acc_3"),
                user_id: UserId::from("user_1"),
                description: "Main".into(),
                account_type: "uk_retail".into(),
                created: core_types::Timestamp::default(),
                closed: false,
                active_for_sync: true,
                last_sync: None,
                last_known_balance: None,
            })
            .await
            .unwrap();
        store
            .upsert_pot(&local_store::Pot {
                id: PotId::from("pot_savings"),
                account_id: AccountId::from("acc_3"),
                user_id: UserId::from("user_1"),
                name: "Savings".into(),
                style: None,
                balance: Amount::ZERO,
                currency: "GBP".into(),
                created: core_types::Timestamp::default(),
                updated: core_types::Timestamp::default(),
                deleted: false,
                goal: Amount::ZERO,
                pot_current_id: None,
                category: None,
            })
            .await
            .unwrap();

        let rule = base_rule(RuleConfig::PotSweep {
            version: current_version(),
            config: SweepConfig {
                sources: vec![],
                target_pot_name: "Savings".into(),
                trigger: SweepTrigger::Manual,
            },
        });

        let resolved = resolve_account_for_rule(&store, &rule).await.unwrap();
        assert_eq!(resolved, AccountId::from("acc_3"));
    }

    #[tokio::test]
    async fn sweep_with_no_matching_pot_anywhere_fails_to_resolve() {
        let store = InMemoryLocalStore::default();
        let rule = base_rule(RuleConfig::PotSweep {
            version: current_version(),
            config: SweepConfig {
                sources: vec![],
                target_pot_name: "Nonexistent".into(),
                trigger: SweepTrigger::Manual,
            },
        });

        let result = resolve_account_for_rule(&store, &rule).await;
        assert!(matches!(result, Err(IntegrationError::AccountUnresolved { .. })));
    }
}
