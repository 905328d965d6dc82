#![warn(missing_debug_implementations)]
#![deny(unused_must_use, rust_2018_idioms, unreachable_pub)]

//! Persisted mirror of users' accounts, pots, transactions, category
//! assignments, and pot-to-pot transfer intents (§3 of the design).
//!
//! Rules themselves are owned by `rule-model`, not this crate — everything
//! here is data the sync engine produces and the trigger evaluator and rule
//! executors read.

mod error;
mod memory;
mod models;
mod sqlx_store;
mod store;

pub use error::LocalStoreError;
pub use memory::InMemoryLocalStore;
pub use models::{
    Account, BillsPotTransaction, BillsTransactionType, Pot, PotCategory, Transaction,
    TransferIntent, TransferIntentStatus,
};
pub use sqlx_store::{AccountSyncSession, SqlxLocalStore};
pub use store::LocalStore;

#[cfg(test)]
mod tests {
    use core_types::{AccountId, PotId, UserId};

    use super::*;

    fn sample_account() -> Account {
        Account {
            id: AccountId::from("acc_1"),
            user_id: UserId::from("user_1"),
            description: "Main".into(),
            account_type: "uk_retail".into(),
            created: Timestamp::default(),
            closed: false,
            active_for_sync: true,
            last_sync: None,
            last_known_balance: None,
        }
    }

    fn sample_pot() -> Pot {
        Pot {
            id: PotId::from("pot_1"),
            account_id: AccountId::from("acc_1"),
            user_id: UserId::from("user_1"),
            name: "Bills".into(),
            style: None,
            balance: core_types::Amount::minor_units(1_000),
            currency: "GBP".into(),
            created: Timestamp::default(),
            updated: Timestamp::default(),
            deleted: false,
            goal: core_types::Amount::ZERO,
            pot_current_id: Some("pot_current_1".into()),
            category: None,
        }
    }

    use core_types::Timestamp;

    #[tokio::test]
    async fn in_memory_store_round_trips_account_and_pot() {
        let store = InMemoryLocalStore::default();
        store.upsert_account(&sample_account()).await.unwrap();
        store.upsert_pot(&sample_pot()).await.unwrap();

        let account = store.get_account(&AccountId::from("acc_1")).await.unwrap().unwrap();
        assert!(account.is_syncable());

        let pot = store.get_pot(&PotId::from("pot_1")).await.unwrap().unwrap();
        assert_eq!(pot.balance.as_minor_units(), 1_000);
    }

    #[tokio::test]
    async fn in_memory_store_lists_pots_by_category() {
        let store = InMemoryLocalStore::default();
        store.upsert_pot(&sample_pot()).await.unwrap();
        store.set_pot_category(&PotId::from("pot_1"), PotCategory::Bills).await.unwrap();

        let pots =
            store.list_pots_by_category(&UserId::from("user_1"), PotCategory::Bills).await.unwrap();
        assert_eq!(pots.len(), 1);
        assert_eq!(pots[0].id, PotId::from("pot_1"));
    }

    #[tokio::test]
    async fn insert_transactions_is_idempotent() {
        let store = InMemoryLocalStore::default();
        let txn = Transaction {
            id: "txn_1".into(),
            account_id: AccountId::from("acc_1"),
            user_id: UserId::from("user_1"),
            created: Timestamp::default(),
            settled: None,
            amount: core_types::Amount::minor_units(-500),
            currency: "GBP".into(),
            description: "Coffee".into(),
            category: None,
            merchant: None,
            notes: None,
            is_load: false,
            metadata: serde_json::Value::Null,
            pot_current_id: None,
        };
        assert_eq!(store.insert_transactions(&[txn.clone()]).await.unwrap(), 1);
        assert_eq!(store.insert_transactions(&[txn]).await.unwrap(), 0);
    }
}
