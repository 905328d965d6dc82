use bank_client::BankClient;
use core_types::{AccountId, Amount, PotId, UserId};
use local_store::LocalStore;
use tracing::warn;

use crate::error::TriggerEvalError;

/// Reads an account's live balance from the bank, falling back to the most
/// recently cached value on a transient failure (§4.4 "Live balance
/// reads"). Caches a successful live read back into `local_store` for the
/// next fallback.
pub async fn live_account_balance(
    bank_client: &dyn BankClient,
    local_store: &dyn LocalStore,
    user_id: &UserId,
    account_id: &AccountId,
) -> Result<Amount, TriggerEvalError> {
    match bank_client.get_balance(user_id, account_id).await {
        Ok(balance) => {
            local_store.update_account_balance(account_id, balance).await?;
            Ok(balance)
        }
        Err(err) => {
            let account = local_store.get_account(account_id).await?;
            match account.and_then(|a| a.last_known_balance) {
                Some(stale) => {
                    warn!(
                        target: "trigger_eval",
                        %account_id, error = %err,
                        "live balance read failed, falling back to stale cached balance"
                    );
                    Ok(stale)
                }
                None => Err(err.into()),
            }
        }
    }
}

/// Reads a pot's live balance by listing its owning account's pots,
/// falling back to the pot's persisted balance on failure.
pub async fn live_pot_balance(
    bank_client: &dyn BankClient,
    local_store: &dyn LocalStore,
    user_id: &UserId,
    account_id: &AccountId,
    pot_id: &PotId,
) -> Result<Amount, TriggerEvalError> {
    match bank_client.get_pots(user_id, account_id).await {
        Ok(pots) => match pots.into_iter().find(|p| &p.id == pot_id) {
            Some(pot) => Ok(pot.balance),
            None => fallback_pot_balance(local_store, pot_id).await,
        },
        Err(err) => {
            warn!(
                target: "trigger_eval", %pot_id, error = %err,
                "live pot balance read failed, falling back to stale cached balance"
            );
            fallback_pot_balance(local_store, pot_id).await
        }
    }
}

async fn fallback_pot_balance(
    local_store: &dyn LocalStore,
    pot_id: &PotId,
) -> Result<Amount, TriggerEvalError> {
    Ok(local_store.get_pot(pot_id).await?.map(|p| p.balance).unwrap_or(Amount::ZERO))
}
