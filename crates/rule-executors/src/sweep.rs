use bank_client::{deposit_leg, sweep_source_id, withdraw_leg, BankClient};
use core_types::{Amount, CoreError, Timestamp};
use execution_queue::{is_duplicate_execution, PAYDAY_SWEEP_COOLDOWN};
use local_store::LocalStore;
use rule_model::{SweepConfig, SweepSource, SweepStrategy, SweepTrigger};
use tracing::warn;

use crate::context::ExecutionContext;

const MAIN_ACCOUNT_SENTINEL: &str = "main account";

/// One source's contribution to a sweep run (§4.6.1 "Record source name,
/// amount moved, and strategy").
#[derive(Debug, Clone, PartialEq)]
pub struct SweepSourceResult {
    pub source_name: String,
    pub strategy: SweepStrategy,
    pub amount_moved: Amount,
}

/// The aggregate outcome of one sweep rule's run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SweepResult {
    pub total_moved: Amount,
    pub sources: Vec<SweepSourceResult>,
    pub errors: Vec<String>,
}

/// Executes a `pot_sweep` rule: for each configured source, in priority
/// order, computes and moves the source's contribution into the target pot
/// (§4.6.1).
pub async fn execute_sweep(
    bank_client: &dyn BankClient,
    local_store: &dyn LocalStore,
    rule_id: &core_types::RuleId,
    config: &SweepConfig,
    last_executed: Option<Timestamp>,
    ctx: &ExecutionContext,
) -> Result<SweepResult, CoreError> {
    if matches!(config.trigger, SweepTrigger::PaydayDetection { .. })
        && is_duplicate_execution(last_executed, ctx.now, PAYDAY_SWEEP_COOLDOWN)
    {
        return Err(CoreError::DuplicateSuppressed("recently executed".into()));
    }

    let target_pot = local_store
        .list_pots_for_account(&ctx.account_id)
        .await?
        .into_iter()
        .find(|p| p.name == config.target_pot_name && p.is_usable())
        .ok_or_else(|| CoreError::ConfigInvalid(format!("target pot {:?} not found", config.target_pot_name)))?;

    let mut sources = config.sources.clone();
    sources.sort_by_key(|s| s.priority);

    let mut result = SweepResult::default();
    for source in &sources {
        match execute_source(bank_client, local_store, rule_id, source, &target_pot.id, ctx).await {
            Ok(Some(source_result)) => {
                result.total_moved = result.total_moved + source_result.amount_moved;
                result.sources.push(source_result);
            }
            Ok(None) => {}
            Err(err) => {
                warn!(
                    target: "rule_executors", rule_id = %rule_id, source = %source.pot_name, %err,
                    "sweep source failed"
                );
                result.errors.push(format!("{}: {err}", source.pot_name));
            }
        }
    }
    Ok(result)
}

async fn execute_source(
    bank_client: &dyn BankClient,
    local_store: &dyn LocalStore,
    rule_id: &core_types::RuleId,
    source: &SweepSource,
    target_pot_id: &core_types::PotId,
    ctx: &ExecutionContext,
) -> Result<Option<SweepSourceResult>, CoreError> {
    let is_main_account = source.pot_name.eq_ignore_ascii_case(MAIN_ACCOUNT_SENTINEL);

    let balance = if is_main_account {
        bank_client.get_balance(&ctx.user_id, &ctx.account_id).await?
    } else {
        local_store
            .list_pots_for_account(&ctx.account_id)
            .await?
            .into_iter()
            .find(|p| p.name == source.pot_name && p.is_usable())
            .map(|p| p.balance)
            .ok_or_else(|| CoreError::ConfigInvalid(format!("sweep source pot {:?} not found", source.pot_name)))?
    };

    let amount_to_move = amount_for_strategy(source, balance);
    if !amount_to_move.is_positive() {
        return Ok(None);
    }

    let base_dedupe = sweep_source_id(rule_id, ctx.now, &source.pot_name);

    if is_main_account {
        bank_client
            .deposit_to_pot(&ctx.user_id, target_pot_id, &ctx.account_id, amount_to_move, &base_dedupe)
            .await?;
    } else {
        let source_pot = local_store
            .list_pots_for_account(&ctx.account_id)
            .await?
            .into_iter()
            .find(|p| p.name == source.pot_name)
            .ok_or_else(|| CoreError::ConfigInvalid(format!("sweep source pot {:?} not found", source.pot_name)))?;

        bank_client
            .withdraw_from_pot(
                &ctx.user_id,
                &source_pot.id,
                &ctx.account_id,
                amount_to_move,
                &withdraw_leg(&base_dedupe),
            )
            .await?;
        bank_client
            .deposit_to_pot(
                &ctx.user_id,
                target_pot_id,
                &ctx.account_id,
                amount_to_move,
                &deposit_leg(&base_dedupe),
            )
            .await?;
    }

    Ok(Some(SweepSourceResult {
        source_name: source.pot_name.clone(),
        strategy: source.strategy,
        amount_moved: amount_to_move,
    }))
}

fn amount_for_strategy(source: &SweepSource, balance: Amount) -> Amount {
    match source.strategy {
        SweepStrategy::FixedAmount => source.amount.unwrap_or(Amount::ZERO).min(balance),
        SweepStrategy::Percentage => balance.floor_mul_fraction(source.percentage.unwrap_or(0.0)),
        SweepStrategy::RemainingBalance => match source.min_balance {
            Some(min_balance) => balance.saturating_sub(min_balance),
            None => balance,
        },
        SweepStrategy::AllAvailable => balance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_amount_never_exceeds_balance() {
        let source = SweepSource {
            pot_name: "main account".into(),
            strategy: SweepStrategy::FixedAmount,
            amount: Some(Amount::minor_units(10_000)),
            percentage: None,
            min_balance: None,
            priority: 0,
        };
        assert_eq!(amount_for_strategy(&source, Amount::minor_units(5_000)), Amount::minor_units(5_000));
    }

    #[test]
    fn remaining_balance_at_min_balance_moves_zero() {
        let source = SweepSource {
            pot_name: "Spending".into(),
            strategy: SweepStrategy::RemainingBalance,
            amount: None,
            percentage: None,
            min_balance: Some(Amount::minor_units(1_000)),
            priority: 0,
        };
        assert_eq!(amount_for_strategy(&source, Amount::minor_units(1_000)), Amount::ZERO);
    }

    #[test]
    fn percentage_strategy_floors_and_guards_non_finite() {
        let source = SweepSource {
            pot_name: "main account".into(),
            strategy: SweepStrategy::Percentage,
            amount: None,
            percentage: Some(0.1),
            min_balance: None,
            priority: 0,
        };
        assert_eq!(amount_for_strategy(&source, Amount::minor_units(999)), Amount::minor_units(99));
    }
}
