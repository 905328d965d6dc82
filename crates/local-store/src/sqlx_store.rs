use std::str::FromStr;

use chrono::{DateTime, Utc};
use core_types::{AccountId, Amount, PotId, Timestamp, UserId};
use sqlx::SqlitePool;

use crate::{
    error::LocalStoreError,
    models::{
        Account, BillsPotTransaction, BillsTransactionType, Pot, PotCategory, Transaction,
        TransferIntent, TransferIntentStatus,
    },
    store::LocalStore,
};

/// A [`LocalStore`] backed by SQLite via `sqlx`. Schema creation/migration
/// is out of scope for the core (§1 Non-goals) — callers are expected to
/// have already run the adjacent migration tooling.
#[derive(Debug, Clone)]
pub struct SqlxLocalStore {
    pool: SqlitePool,
}

impl SqlxLocalStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Starts a transaction scoped to one account's sync, so that every
    /// write for that account commits or rolls back together (§4.2
    /// "Timeout and cancellation", §9 "Database rollback-then-continue").
    pub async fn begin_account_sync(&self) -> Result<AccountSyncSession<'_>, LocalStoreError> {
        let txn = self.pool.begin().await?;
        Ok(AccountSyncSession { txn })
    }
}

/// A single account's in-flight sync transaction. Dropping without calling
/// [`Self::commit`] rolls back every write made through it — the caller
/// does not need an explicit rollback call on the error path.
#[derive(Debug)]
pub struct AccountSyncSession<'c> {
    txn: sqlx::Transaction<'c, sqlx::Sqlite>,
}

impl<'c> AccountSyncSession<'c> {
    pub async fn upsert_account(&mut self, account: &Account) -> Result<(), LocalStoreError> {
        sqlx::query(
            "INSERT INTO accounts (id, user_id, description, account_type, created, closed, \
             active_for_sync, last_sync, last_known_balance) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET description = excluded.description, \
             account_type = excluded.account_type, closed = excluded.closed, \
             active_for_sync = excluded.active_for_sync",
        )
        .bind(account.id.as_str())
        .bind(account.user_id.as_str())
        .bind(&account.description)
        .bind(&account.account_type)
        .bind(account.created)
        .bind(account.closed)
        .bind(account.active_for_sync)
        .bind(account.last_sync)
        .bind(account.last_known_balance.map(core_types::Amount::as_minor_units))
        .execute(&mut *self.txn)
        .await?;
        Ok(())
    }

    pub async fn upsert_pot(&mut self, pot: &Pot) -> Result<(), LocalStoreError> {
        sqlx::query(
            "INSERT INTO pots (id, account_id, user_id, name, style, balance, currency, \
             created, updated, deleted, goal, pot_current_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, style = excluded.style, \
             balance = excluded.balance, deleted = excluded.deleted, goal = excluded.goal, \
             updated = excluded.updated, pot_current_id = excluded.pot_current_id",
        )
        .bind(pot.id.as_str())
        .bind(pot.account_id.as_str())
        .bind(pot.user_id.as_str())
        .bind(&pot.name)
        .bind(&pot.style)
        .bind(pot.balance.as_minor_units())
        .bind(&pot.currency)
        .bind(pot.created)
        .bind(pot.updated)
        .bind(pot.deleted)
        .bind(pot.goal.as_minor_units())
        .bind(&pot.pot_current_id)
        .execute(&mut *self.txn)
        .await?;
        Ok(())
    }

    pub async fn insert_transactions(
        &mut self,
        transactions: &[Transaction],
    ) -> Result<usize, LocalStoreError> {
        let mut inserted = 0;
        for txn in transactions {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO transactions (id, account_id, user_id, created, settled, \
                 amount, currency, description, category, merchant, notes, is_load, metadata, \
                 pot_current_id) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&txn.id)
            .bind(txn.account_id.as_str())
            .bind(txn.user_id.as_str())
            .bind(txn.created)
            .bind(txn.settled)
            .bind(txn.amount.as_minor_units())
            .bind(&txn.currency)
            .bind(&txn.description)
            .bind(&txn.category)
            .bind(&txn.merchant)
            .bind(&txn.notes)
            .bind(txn.is_load)
            .bind(txn.metadata.to_string())
            .bind(&txn.pot_current_id)
            .execute(&mut *self.txn)
            .await?;
            if result.rows_affected() > 0 {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    pub async fn upsert_bills_transaction(
        &mut self,
        txn: &BillsPotTransaction,
    ) -> Result<(), LocalStoreError> {
        sqlx::query(
            "INSERT INTO bills_pot_transactions (transaction_id, account_id, user_id, pot_id, \
             created, amount, description, transaction_type, is_pot_withdrawal) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(transaction_id) DO UPDATE SET \
             transaction_type = excluded.transaction_type, \
             is_pot_withdrawal = excluded.is_pot_withdrawal",
        )
        .bind(&txn.transaction_id)
        .bind(txn.account_id.as_str())
        .bind(txn.user_id.as_str())
        .bind(txn.pot_id.as_str())
        .bind(txn.created)
        .bind(txn.amount.as_minor_units())
        .bind(&txn.description)
        .bind(txn.transaction_type.as_str())
        .bind(txn.is_pot_withdrawal)
        .execute(&mut *self.txn)
        .await?;
        Ok(())
    }

    pub async fn mark_account_synced(
        &mut self,
        account_id: &AccountId,
        at: Timestamp,
    ) -> Result<(), LocalStoreError> {
        sqlx::query("UPDATE accounts SET last_sync = ? WHERE id = ?")
            .bind(at)
            .bind(account_id.as_str())
            .execute(&mut *self.txn)
            .await?;
        Ok(())
    }

    /// Commits every write made through this session. Consumes `self`;
    /// on an error path, simply drop the session instead to roll back.
    pub async fn commit(self) -> Result<(), LocalStoreError> {
        self.txn.commit().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl LocalStore for SqlxLocalStore {
    async fn get_account(&self, account_id: &AccountId) -> Result<Option<Account>, LocalStoreError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT id, user_id, description, account_type, created, closed, \
             active_for_sync, last_sync, last_known_balance FROM accounts WHERE id = ?",
        )
        .bind(account_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn upsert_account(&self, account: &Account) -> Result<(), LocalStoreError> {
        sqlx::query(
            "INSERT INTO accounts (id, user_id, description, account_type, created, closed, \
             active_for_sync, last_sync, last_known_balance) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET description = excluded.description, \
             account_type = excluded.account_type, closed = excluded.closed, \
             active_for_sync = excluded.active_for_sync",
        )
        .bind(account.id.as_str())
        .bind(account.user_id.as_str())
        .bind(&account.description)
        .bind(&account.account_type)
        .bind(account.created)
        .bind(account.closed)
        .bind(account.active_for_sync)
        .bind(account.last_sync)
        .bind(account.last_known_balance.map(core_types::Amount::as_minor_units))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_syncable_accounts(&self) -> Result<Vec<Account>, LocalStoreError> {
        let rows = sqlx::query_as::<_, AccountRow>(
            "SELECT id, user_id, description, account_type, created, closed, \
             active_for_sync, last_sync, last_known_balance FROM accounts WHERE active_for_sync = 1 AND closed = 0",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn mark_account_synced(
        &self,
        account_id: &AccountId,
        at: Timestamp,
    ) -> Result<(), LocalStoreError> {
        sqlx::query("UPDATE accounts SET last_sync = ? WHERE id = ?")
            .bind(at)
            .bind(account_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_account_balance(
        &self,
        account_id: &AccountId,
        balance: Amount,
    ) -> Result<(), LocalStoreError> {
        sqlx::query("UPDATE accounts SET last_known_balance = ? WHERE id = ?")
            .bind(balance.as_minor_units())
            .bind(account_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_pot(&self, pot_id: &PotId) -> Result<Option<Pot>, LocalStoreError> {
        let row = sqlx::query_as::<_, PotRow>(
            "SELECT p.id, p.account_id, p.user_id, p.name, p.style, p.balance, p.currency, \
             p.created, p.updated, p.deleted, p.goal, p.pot_current_id, c.category \
             FROM pots p LEFT JOIN user_pot_categories c ON c.pot_id = p.id WHERE p.id = ?",
        )
        .bind(pot_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn upsert_pot(&self, pot: &Pot) -> Result<(), LocalStoreError> {
        sqlx::query(
            "INSERT INTO pots (id, account_id, user_id, name, style, balance, currency, \
             created, updated, deleted, goal, pot_current_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, style = excluded.style, \
             balance = excluded.balance, deleted = excluded.deleted, goal = excluded.goal, \
             updated = excluded.updated, pot_current_id = excluded.pot_current_id",
        )
        .bind(pot.id.as_str())
        .bind(pot.account_id.as_str())
        .bind(pot.user_id.as_str())
        .bind(&pot.name)
        .bind(&pot.style)
        .bind(pot.balance.as_minor_units())
        .bind(&pot.currency)
        .bind(pot.created)
        .bind(pot.updated)
        .bind(pot.deleted)
        .bind(pot.goal.as_minor_units())
        .bind(&pot.pot_current_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_pots_for_account(&self, account_id: &AccountId) -> Result<Vec<Pot>, LocalStoreError> {
        let rows = sqlx::query_as::<_, PotRow>(
            "SELECT p.id, p.account_id, p.user_id, p.name, p.style, p.balance, p.currency, \
             p.created, p.updated, p.deleted, p.goal, p.pot_current_id, c.category \
             FROM pots p LEFT JOIN user_pot_categories c ON c.pot_id = p.id \
             WHERE p.account_id = ? AND p.deleted = 0",
        )
        .bind(account_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_pots_by_category(
        &self,
        user_id: &UserId,
        category: PotCategory,
    ) -> Result<Vec<Pot>, LocalStoreError> {
        let rows = sqlx::query_as::<_, PotRow>(
            "SELECT p.id, p.account_id, p.user_id, p.name, p.style, p.balance, p.currency, \
             p.created, p.updated, p.deleted, p.goal, p.pot_current_id, c.category \
             FROM pots p JOIN user_pot_categories c ON c.pot_id = p.id \
             WHERE p.user_id = ? AND c.category = ? AND p.deleted = 0",
        )
        .bind(user_id.as_str())
        .bind(category.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn set_pot_category(
        &self,
        pot_id: &PotId,
        category: PotCategory,
    ) -> Result<(), LocalStoreError> {
        sqlx::query(
            "INSERT INTO user_pot_categories (pot_id, category) VALUES (?, ?) \
             ON CONFLICT(pot_id) DO UPDATE SET category = excluded.category",
        )
        .bind(pot_id.as_str())
        .bind(category.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn latest_transaction(
        &self,
        account_id: &AccountId,
        user_id: &UserId,
    ) -> Result<Option<Transaction>, LocalStoreError> {
        let row = sqlx::query_as::<_, TransactionRow>(
            "SELECT id, account_id, user_id, created, settled, amount, currency, description, \
             category, merchant, notes, is_load, metadata, pot_current_id FROM transactions \
             WHERE account_id = ? AND user_id = ? ORDER BY created DESC, id DESC LIMIT 1",
        )
        .bind(account_id.as_str())
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn insert_transactions(
        &self,
        transactions: &[Transaction],
    ) -> Result<usize, LocalStoreError> {
        let mut inserted = 0;
        for txn in transactions {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO transactions (id, account_id, user_id, created, settled, \
                 amount, currency, description, category, merchant, notes, is_load, metadata, \
                 pot_current_id) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&txn.id)
            .bind(txn.account_id.as_str())
            .bind(txn.user_id.as_str())
            .bind(txn.created)
            .bind(txn.settled)
            .bind(txn.amount.as_minor_units())
            .bind(&txn.currency)
            .bind(&txn.description)
            .bind(&txn.category)
            .bind(&txn.merchant)
            .bind(&txn.notes)
            .bind(txn.is_load)
            .bind(txn.metadata.to_string())
            .bind(&txn.pot_current_id)
            .execute(&self.pool)
            .await?;
            if result.rows_affected() > 0 {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn list_transactions_since(
        &self,
        account_id: &AccountId,
        since: Timestamp,
        before: Timestamp,
    ) -> Result<Vec<Transaction>, LocalStoreError> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT id, account_id, user_id, created, settled, amount, currency, description, \
             category, merchant, notes, is_load, metadata, pot_current_id FROM transactions \
             WHERE account_id = ? AND created >= ? AND created < ? ORDER BY created DESC",
        )
        .bind(account_id.as_str())
        .bind(since)
        .bind(before)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn upsert_bills_transaction(
        &self,
        txn: &BillsPotTransaction,
    ) -> Result<(), LocalStoreError> {
        sqlx::query(
            "INSERT INTO bills_pot_transactions (transaction_id, account_id, user_id, pot_id, \
             created, amount, description, transaction_type, is_pot_withdrawal) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(transaction_id) DO UPDATE SET \
             transaction_type = excluded.transaction_type, \
             is_pot_withdrawal = excluded.is_pot_withdrawal",
        )
        .bind(&txn.transaction_id)
        .bind(txn.account_id.as_str())
        .bind(txn.user_id.as_str())
        .bind(txn.pot_id.as_str())
        .bind(txn.created)
        .bind(txn.amount.as_minor_units())
        .bind(&txn.description)
        .bind(txn.transaction_type.as_str())
        .bind(txn.is_pot_withdrawal)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn bills_spending_since(
        &self,
        pot_id: &PotId,
        since: Timestamp,
    ) -> Result<Amount, LocalStoreError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(-amount), 0) FROM bills_pot_transactions \
             WHERE pot_id = ? AND created >= ? AND amount < 0 AND transaction_type != 'pot_transfer'",
        )
        .bind(pot_id.as_str())
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(Amount::minor_units(row.0))
    }

    async fn latest_bills_transaction(
        &self,
        pot_id: &PotId,
    ) -> Result<Option<BillsPotTransaction>, LocalStoreError> {
        let row = sqlx::query_as::<_, BillsPotTransactionRow>(
            "SELECT transaction_id, account_id, user_id, pot_id, created, amount, description, \
             transaction_type, is_pot_withdrawal FROM bills_pot_transactions \
             WHERE pot_id = ? ORDER BY created DESC LIMIT 1",
        )
        .bind(pot_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn record_transfer_intent(&self, intent: &TransferIntent) -> Result<(), LocalStoreError> {
        sqlx::query(
            "INSERT INTO transfer_intents (base_dedupe_id, user_id, source_pot_id, \
             source_account_id, target_pot_id, target_account_id, amount, status, created) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&intent.base_dedupe_id)
        .bind(intent.user_id.as_str())
        .bind(intent.source_pot_id.as_ref().map(core_types::PotId::as_str))
        .bind(intent.source_account_id.as_ref().map(core_types::AccountId::as_str))
        .bind(intent.target_pot_id.as_ref().map(core_types::PotId::as_str))
        .bind(intent.target_account_id.as_ref().map(core_types::AccountId::as_str))
        .bind(intent.amount.as_minor_units())
        .bind(intent.status.as_str())
        .bind(intent.created)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_transfer_intent_status(
        &self,
        base_dedupe_id: &str,
        status: TransferIntentStatus,
    ) -> Result<(), LocalStoreError> {
        sqlx::query("UPDATE transfer_intents SET status = ? WHERE base_dedupe_id = ?")
            .bind(status.as_str())
            .bind(base_dedupe_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_incomplete_transfer_intents(&self) -> Result<Vec<TransferIntent>, LocalStoreError> {
        let rows = sqlx::query_as::<_, TransferIntentRow>(
            "SELECT base_dedupe_id, user_id, source_pot_id, source_account_id, target_pot_id, \
             target_account_id, amount, status, created FROM transfer_intents \
             WHERE status != 'completed'",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: String,
    user_id: String,
    description: String,
    account_type: String,
    created: DateTime<Utc>,
    closed: bool,
    active_for_sync: bool,
    last_sync: Option<DateTime<Utc>>,
    last_known_balance: Option<i64>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: AccountId::from(row.id),
            user_id: UserId::from(row.user_id),
            description: row.description,
            account_type: row.account_type,
            last_known_balance: row.last_known_balance.map(Amount::minor_units),
            created: row.created,
            closed: row.closed,
            active_for_sync: row.active_for_sync,
            last_sync: row.last_sync,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PotRow {
    id: String,
    account_id: String,
    user_id: String,
    name: String,
    style: Option<String>,
    balance: i64,
    currency: String,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
    deleted: bool,
    goal: i64,
    pot_current_id: Option<String>,
    category: Option<String>,
}

impl TryFrom<PotRow> for Pot {
    type Error = LocalStoreError;

    fn try_from(row: PotRow) -> Result<Self, Self::Error> {
        let category = row
            .category
            .map(|c| PotCategory::from_str(&c))
            .transpose()
            .map_err(LocalStoreError::InvalidCategory)?;
        Ok(Self {
            id: PotId::from(row.id),
            account_id: AccountId::from(row.account_id),
            user_id: UserId::from(row.user_id),
            name: row.name,
            style: row.style,
            balance: Amount::minor_units(row.balance),
            currency: row.currency,
            created: row.created,
            updated: row.updated,
            deleted: row.deleted,
            goal: Amount::minor_units(row.goal),
            pot_current_id: row.pot_current_id,
            category,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: String,
    account_id: String,
    user_id: String,
    created: DateTime<Utc>,
    settled: Option<DateTime<Utc>>,
    amount: i64,
    currency: String,
    description: String,
    category: Option<String>,
    merchant: Option<String>,
    notes: Option<String>,
    is_load: bool,
    metadata: String,
    pot_current_id: Option<String>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = LocalStoreError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let metadata = serde_json::from_str(&row.metadata).unwrap_or(serde_json::Value::Null);
        Ok(Self {
            id: row.id,
            account_id: AccountId::from(row.account_id),
            user_id: UserId::from(row.user_id),
            created: row.created,
            settled: row.settled,
            amount: Amount::minor_units(row.amount),
            currency: row.currency,
            description: row.description,
            category: row.category,
            merchant: row.merchant,
            notes: row.notes,
            is_load: row.is_load,
            metadata,
            pot_current_id: row.pot_current_id,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BillsPotTransactionRow {
    transaction_id: String,
    account_id: String,
    user_id: String,
    pot_id: String,
    created: DateTime<Utc>,
    amount: i64,
    description: String,
    transaction_type: String,
    is_pot_withdrawal: bool,
}

impl TryFrom<BillsPotTransactionRow> for BillsPotTransaction {
    type Error = LocalStoreError;

    fn try_from(row: BillsPotTransactionRow) -> Result<Self, Self::Error> {
        let transaction_type = BillsTransactionType::from_str(&row.transaction_type)
            .map_err(LocalStoreError::InvalidCategory)?;
        Ok(Self {
            transaction_id: row.transaction_id,
            account_id: AccountId::from(row.account_id),
            user_id: UserId::from(row.user_id),
            pot_id: PotId::from(row.pot_id),
            created: row.created,
            amount: Amount::minor_units(row.amount),
            description: row.description,
            transaction_type,
            is_pot_withdrawal: row.is_pot_withdrawal,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TransferIntentRow {
    base_dedupe_id: String,
    user_id: String,
    source_pot_id: Option<String>,
    source_account_id: Option<String>,
    target_pot_id: Option<String>,
    target_account_id: Option<String>,
    amount: i64,
    status: String,
    created: DateTime<Utc>,
}

impl TryFrom<TransferIntentRow> for TransferIntent {
    type Error = LocalStoreError;

    fn try_from(row: TransferIntentRow) -> Result<Self, Self::Error> {
        let status = TransferIntentStatus::from_str(&row.status)
            .map_err(LocalStoreError::InvalidCategory)?;
        Ok(Self {
            base_dedupe_id: row.base_dedupe_id,
            user_id: UserId::from(row.user_id),
            source_pot_id: row.source_pot_id.map(PotId::from),
            source_account_id: row.source_account_id.map(AccountId::from),
            target_pot_id: row.target_pot_id.map(PotId::from),
            target_account_id: row.target_account_id.map(AccountId::from),
            amount: Amount::minor_units(row.amount),
            status,
            created: row.created,
        })
    }
}
