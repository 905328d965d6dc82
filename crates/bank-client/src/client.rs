use async_trait::async_trait;
use core_types::{AccountId, Amount, PotId, UserId};

use crate::{
    error::BankClientError,
    types::{BankAccount, BankPot, BankTransaction, ExchangedTokens, TransactionQuery, WhoAmI},
};

/// Thin typed wrapper over the bank's REST API (§4.1).
///
/// Every method here is attempted once; on a 401 or an error whose message
/// looks like an expired/invalid token, the implementation refreshes the
/// access token and retries exactly once before surfacing an error. Callers
/// never see that retry happen. Money-moving calls are never retried
/// automatically after a *non*-auth error — the caller decides.
#[async_trait]
pub trait BankClient: Send + Sync {
    /// Lists every account visible to `user_id`.
    async fn get_accounts(&self, user_id: &UserId) -> Result<Vec<BankAccount>, BankClientError>;

    /// Lists non-deleted pots for an account.
    async fn get_pots(
        &self,
        user_id: &UserId,
        account_id: &AccountId,
    ) -> Result<Vec<BankPot>, BankClientError>;

    /// Reads an account's current live balance.
    async fn get_balance(
        &self,
        user_id: &UserId,
        account_id: &AccountId,
    ) -> Result<Amount, BankClientError>;

    /// Lists transactions for an account (or, for bills-pot sync, a pot's
    /// `pot_current_id` used in place of an account id) matching `query`.
    async fn get_transactions(
        &self,
        user_id: &UserId,
        account_id: &str,
        query: TransactionQuery,
    ) -> Result<Vec<BankTransaction>, BankClientError>;

    /// Moves money from `from_account_id` into `pot_id`. `dedupe_id` must be
    /// non-empty and identical on any retry of the same logical transfer.
    async fn deposit_to_pot(
        &self,
        user_id: &UserId,
        pot_id: &PotId,
        from_account_id: &AccountId,
        amount: Amount,
        dedupe_id: &str,
    ) -> Result<(), BankClientError>;

    /// Moves money from `pot_id` into `to_account_id`.
    async fn withdraw_from_pot(
        &self,
        user_id: &UserId,
        pot_id: &PotId,
        to_account_id: &AccountId,
        amount: Amount,
        dedupe_id: &str,
    ) -> Result<(), BankClientError>;

    /// Attaches a note to an existing transaction.
    async fn annotate_transaction(
        &self,
        user_id: &UserId,
        txn_id: &str,
        notes: &str,
    ) -> Result<(), BankClientError>;

    /// Reports the identity the current token is authenticated as.
    async fn whoami(&self, user_id: &UserId) -> Result<WhoAmI, BankClientError>;

    /// Exchanges an OAuth authorization code for a fresh token pair.
    async fn exchange_code_for_token(
        &self,
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
        code: &str,
    ) -> Result<ExchangedTokens, BankClientError>;

    /// Refreshes `user_id`'s access token using its stored refresh token.
    async fn refresh_access_token(
        &self,
        user_id: &UserId,
    ) -> Result<ExchangedTokens, BankClientError>;
}
