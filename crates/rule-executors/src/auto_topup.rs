use bank_client::{topup_id, BankClient};
use core_types::{Amount, CoreError};
use execution_queue::{is_duplicate_execution, AUTO_TOPUP_COOLDOWN};
use rule_model::AutoTopupConfig;

use crate::context::ExecutionContext;

/// The outcome of one auto-topup execution attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoTopupResult {
    pub amount_moved: Amount,
    pub summary: String,
}

/// Executes an `auto_topup` rule (§4.6.3).
pub async fn execute_auto_topup(
    bank_client: &dyn BankClient,
    config: &AutoTopupConfig,
    last_executed: Option<core_types::Timestamp>,
    ctx: &ExecutionContext,
) -> Result<AutoTopupResult, CoreError> {
    if is_duplicate_execution(last_executed, ctx.now, AUTO_TOPUP_COOLDOWN) {
        return Err(CoreError::DuplicateSuppressed("recently executed".into()));
    }

    let current_target_balance = {
        let pots = bank_client.get_pots(&ctx.user_id, &ctx.account_id).await?;
        pots.into_iter()
            .find(|p| p.id == config.target_pot_id)
            .map(|p| p.balance)
            .unwrap_or(Amount::ZERO)
    };

    let transfer_amount = match config.target_balance {
        Some(target_balance) => {
            let shortfall = target_balance.saturating_sub(current_target_balance);
            shortfall.min(config.amount)
        }
        None => config.amount,
    };

    if !transfer_amount.is_positive() {
        return Ok(AutoTopupResult {
            amount_moved: Amount::ZERO,
            summary: "target balance already met, nothing to transfer".into(),
        });
    }

    let source_balance = bank_client.get_balance(&ctx.user_id, &config.source_account_id).await?;
    if source_balance < transfer_amount {
        return Err(CoreError::InsufficientFunds(format!(
            "{source_balance} < {transfer_amount}"
        )));
    }

    let dedupe_id = topup_id(ctx.now);
    bank_client
        .deposit_to_pot(&ctx.user_id, &config.target_pot_id, &config.source_account_id, transfer_amount, &dedupe_id)
        .await?;

    Ok(AutoTopupResult {
        amount_moved: transfer_amount,
        summary: format!("topped up {transfer_amount} from {}", config.source_account_id),
    })
}

#[cfg(test)]
mod tests {
    use core_types::PotId;

    use super::*;

    #[test]
    fn target_balance_transfer_is_capped_by_configured_amount() {
        let shortfall = Amount::minor_units(10_000).saturating_sub(Amount::minor_units(2_000));
        assert_eq!(shortfall.min(Amount::minor_units(5_000)), Amount::minor_units(5_000));
    }

    #[test]
    fn target_pot_id_matches_config() {
        let pot_id = PotId::from("pot_1");
        assert_eq!(pot_id.as_str(), "pot_1");
    }
}
