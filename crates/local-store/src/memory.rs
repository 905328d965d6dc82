use std::collections::HashMap;

use async_trait::async_trait;
use core_types::{AccountId, Amount, PotId, Timestamp, UserId};
use parking_lot::Mutex;

use crate::{
    error::LocalStoreError,
    models::{BillsPotTransaction, PotCategory, Transaction, TransferIntent, TransferIntentStatus},
    store::LocalStore,
    Account, Pot,
};

/// An in-memory [`LocalStore`] for tests in this crate and its downstream
/// consumers (`trigger-eval`, `rule-executors`, `automation-integration`)
/// that exercise logic above the persistence layer and don't need a real
/// database. Never used in production.
#[derive(Debug, Default)]
pub struct InMemoryLocalStore {
    inner: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<AccountId, Account>,
    pots: HashMap<PotId, Pot>,
    categories: HashMap<PotId, PotCategory>,
    transactions: Vec<Transaction>,
    bills_transactions: HashMap<String, BillsPotTransaction>,
    transfer_intents: HashMap<String, TransferIntent>,
}

#[async_trait]
impl LocalStore for InMemoryLocalStore {
    async fn get_account(&self, account_id: &AccountId) -> Result<Option<Account>, LocalStoreError> {
        Ok(self.inner.lock().accounts.get(account_id).cloned())
    }

    async fn upsert_account(&self, account: &Account) -> Result<(), LocalStoreError> {
        self.inner.lock().accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn list_syncable_accounts(&self) -> Result<Vec<Account>, LocalStoreError> {
        Ok(self.inner.lock().accounts.values().filter(|a| a.is_syncable()).cloned().collect())
    }

    async fn mark_account_synced(
        &self,
        account_id: &AccountId,
        at: Timestamp,
    ) -> Result<(), LocalStoreError> {
        if let Some(account) = self.inner.lock().accounts.get_mut(account_id) {
            account.last_sync = Some(at);
        }
        Ok(())
    }

    async fn update_account_balance(
        &self,
        account_id: &AccountId,
        balance: Amount,
    ) -> Result<(), LocalStoreError> {
        if let Some(account) = self.inner.lock().accounts.get_mut(account_id) {
            account.last_known_balance = Some(balance);
        }
        Ok(())
    }

    async fn get_pot(&self, pot_id: &PotId) -> Result<Option<Pot>, LocalStoreError> {
        let inner = self.inner.lock();
        Ok(inner.pots.get(pot_id).cloned().map(|mut p| {
            p.category = inner.categories.get(pot_id).copied();
            p
        }))
    }

    async fn upsert_pot(&self, pot: &Pot) -> Result<(), LocalStoreError> {
        let mut inner = self.inner.lock();
        if let Some(category) = pot.category {
            inner.categories.insert(pot.id.clone(), category);
        }
        inner.pots.insert(pot.id.clone(), pot.clone());
        Ok(())
    }

    async fn list_pots_for_account(&self, account_id: &AccountId) -> Result<Vec<Pot>, LocalStoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .pots
            .values()
            .filter(|p| &p.account_id == account_id && !p.deleted)
            .cloned()
            .map(|mut p| {
                p.category = inner.categories.get(&p.id).copied();
                p
            })
            .collect())
    }

    async fn list_pots_by_category(
        &self,
        user_id: &UserId,
        category: PotCategory,
    ) -> Result<Vec<Pot>, LocalStoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .pots
            .values()
            .filter(|p| {
                &p.user_id == user_id
                    && !p.deleted
                    && inner.categories.get(&p.id).copied() == Some(category)
            })
            .cloned()
            .map(|mut p| {
                p.category = Some(category);
                p
            })
            .collect())
    }

    async fn set_pot_category(
        &self,
        pot_id: &PotId,
        category: PotCategory,
    ) -> Result<(), LocalStoreError> {
        self.inner.lock().categories.insert(pot_id.clone(), category);
        Ok(())
    }

    async fn latest_transaction(
        &self,
        account_id: &AccountId,
        user_id: &UserId,
    ) -> Result<Option<Transaction>, LocalStoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .transactions
            .iter()
            .filter(|t| &t.account_id == account_id && &t.user_id == user_id)
            .max_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)))
            .cloned())
    }

    async fn insert_transactions(
        &self,
        transactions: &[Transaction],
    ) -> Result<usize, LocalStoreError> {
        let mut inner = self.inner.lock();
        let mut inserted = 0;
        for txn in transactions {
            if inner.transactions.iter().any(|t| t.id == txn.id) {
                continue;
            }
            inner.transactions.push(txn.clone());
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn list_transactions_since(
        &self,
        account_id: &AccountId,
        since: Timestamp,
        before: Timestamp,
    ) -> Result<Vec<Transaction>, LocalStoreError> {
        let mut txns: Vec<Transaction> = self
            .inner
            .lock()
            .transactions
            .iter()
            .filter(|t| &t.account_id == account_id && t.created >= since && t.created < before)
            .cloned()
            .collect();
        txns.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(txns)
    }

    async fn upsert_bills_transaction(
        &self,
        txn: &BillsPotTransaction,
    ) -> Result<(), LocalStoreError> {
        self.inner.lock().bills_transactions.insert(txn.transaction_id.clone(), txn.clone());
        Ok(())
    }

    async fn bills_spending_since(
        &self,
        pot_id: &PotId,
        since: Timestamp,
    ) -> Result<Amount, LocalStoreError> {
        let inner = self.inner.lock();
        let total: i64 = inner
            .bills_transactions
            .values()
            .filter(|t| {
                &t.pot_id == pot_id
                    && t.created >= since
                    && t.amount.as_minor_units() < 0
                    && !matches!(t.transaction_type, crate::models::BillsTransactionType::PotTransfer)
            })
            .map(|t| -t.amount.as_minor_units())
            .sum();
        Ok(Amount::minor_units(total))
    }

    async fn latest_bills_transaction(
        &self,
        pot_id: &PotId,
    ) -> Result<Option<BillsPotTransaction>, LocalStoreError> {
        Ok(self
            .inner
            .lock()
            .bills_transactions
            .values()
            .filter(|t| &t.pot_id == pot_id)
            .max_by_key(|t| t.created)
            .cloned())
    }

    async fn record_transfer_intent(&self, intent: &TransferIntent) -> Result<(), LocalStoreError> {
        self.inner.lock().transfer_intents.insert(intent.base_dedupe_id.clone(), intent.clone());
        Ok(())
    }

    async fn update_transfer_intent_status(
        &self,
        base_dedupe_id: &str,
        status: TransferIntentStatus,
    ) -> Result<(), LocalStoreError> {
        if let Some(intent) = self.inner.lock().transfer_intents.get_mut(base_dedupe_id) {
            intent.status = status;
        }
        Ok(())
    }

    async fn list_incomplete_transfer_intents(&self) -> Result<Vec<TransferIntent>, LocalStoreError> {
        Ok(self
            .inner
            .lock()
            .transfer_intents
            .values()
            .filter(|i| i.status != TransferIntentStatus::Completed)
            .cloned()
            .collect())
    }
}
