use async_trait::async_trait;
use core_types::{AccountId, PotId, Timestamp, UserId};

use crate::{
    error::LocalStoreError,
    models::{Account, BillsPotTransaction, Pot, PotCategory, Transaction, TransferIntent},
};

/// Persisted mirror of users' accounts, pots, transactions, and category
/// assignments (§3). Owned by `sync-engine`, `trigger-eval`,
/// `rule-executors`, and `automation-integration`; none of them reach
/// `sqlx` directly.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Reads an account by id, regardless of `closed`/`active_for_sync`.
    async fn get_account(&self, account_id: &AccountId) -> Result<Option<Account>, LocalStoreError>;

    /// Inserts or updates an account row.
    async fn upsert_account(&self, account: &Account) -> Result<(), LocalStoreError>;

    /// Lists every account eligible for sync (`active_for_sync && !closed`)
    /// across all users.
    async fn list_syncable_accounts(&self) -> Result<Vec<Account>, LocalStoreError>;

    /// Stamps `last_sync` on an account.
    async fn mark_account_synced(
        &self,
        account_id: &AccountId,
        at: Timestamp,
    ) -> Result<(), LocalStoreError>;

    /// Caches the most recently observed live balance for an account, used
    /// as the stale fallback for future balance checks (§4.4).
    async fn update_account_balance(
        &self,
        account_id: &AccountId,
        balance: core_types::Amount,
    ) -> Result<(), LocalStoreError>;

    /// Reads a pot by id.
    async fn get_pot(&self, pot_id: &PotId) -> Result<Option<Pot>, LocalStoreError>;

    /// Inserts or updates a pot row, preserving any existing category
    /// assignment.
    async fn upsert_pot(&self, pot: &Pot) -> Result<(), LocalStoreError>;

    /// Lists non-deleted pots for an account.
    async fn list_pots_for_account(&self, account_id: &AccountId) -> Result<Vec<Pot>, LocalStoreError>;

    /// Lists every non-deleted pot of a user assigned to `category`.
    async fn list_pots_by_category(
        &self,
        user_id: &UserId,
        category: PotCategory,
    ) -> Result<Vec<Pot>, LocalStoreError>;

    /// Assigns (or reassigns) a pot's category.
    async fn set_pot_category(
        &self,
        pot_id: &PotId,
        category: PotCategory,
    ) -> Result<(), LocalStoreError>;

    /// The most recent transaction for `(account, user)`, ordered by
    /// `(created desc, id desc)` — the sync cursor (§4.2 step 3).
    async fn latest_transaction(
        &self,
        account_id: &AccountId,
        user_id: &UserId,
    ) -> Result<Option<Transaction>, LocalStoreError>;

    /// Idempotently inserts transactions, skipping any id already present.
    /// Returns the number actually inserted.
    async fn insert_transactions(
        &self,
        transactions: &[Transaction],
    ) -> Result<usize, LocalStoreError>;

    /// Lists transactions for an account within `[since, before)`, most
    /// recent first. Used by the trigger evaluator for lookback windows.
    async fn list_transactions_since(
        &self,
        account_id: &AccountId,
        since: Timestamp,
        before: Timestamp,
    ) -> Result<Vec<Transaction>, LocalStoreError>;

    /// Idempotently inserts a bills-pot transaction row.
    async fn upsert_bills_transaction(
        &self,
        txn: &BillsPotTransaction,
    ) -> Result<(), LocalStoreError>;

    /// Sums `|amount|` of outgoing (negative) bills-pot transactions for
    /// `pot_id` created on or after `since`, excluding `pot_transfer`-typed
    /// rows (§4.6.2 "Bills replenishment").
    async fn bills_spending_since(
        &self,
        pot_id: &PotId,
        since: Timestamp,
    ) -> Result<core_types::Amount, LocalStoreError>;

    /// The most recent bills-pot transaction for `pot_id`, ordered by
    /// `created desc` — the incremental-sync cursor for the specialized
    /// bills-pot pull (§4.2 "Bills pot sync (specialized)"), distinct from
    /// the account-level cursor `latest_transaction` provides.
    async fn latest_bills_transaction(
        &self,
        pot_id: &PotId,
    ) -> Result<Option<BillsPotTransaction>, LocalStoreError>;

    /// Records a pot-to-pot transfer intent before the first leg executes.
    async fn record_transfer_intent(&self, intent: &TransferIntent) -> Result<(), LocalStoreError>;

    /// Advances a transfer intent's status.
    async fn update_transfer_intent_status(
        &self,
        base_dedupe_id: &str,
        status: crate::models::TransferIntentStatus,
    ) -> Result<(), LocalStoreError>;

    /// Lists transfer intents that never reached `Completed` — scanned on
    /// startup to complete or log orphaned two-leg transfers.
    async fn list_incomplete_transfer_intents(&self) -> Result<Vec<TransferIntent>, LocalStoreError>;
}
