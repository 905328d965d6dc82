use std::{collections::HashSet, time::Duration};

use bank_client::{BankClient, BankClientError, BankTransaction, Since, TransactionQuery};
use core_types::{AccountId, Amount, PotId, Timestamp, UserId};
use local_store::{Account, BillsPotTransaction, Pot, PotCategory, SqlxLocalStore, Transaction};

use crate::{classify::classify_bills_transaction, config::SyncConfig, error::SyncEngineError};

/// What one successful [`sync_account`] run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountSyncOutcome {
    pub transactions_committed: usize,
    pub bills_transactions_committed: usize,
}

/// Runs the per-account sync algorithm (§4.2). `Ok(None)` means the account
/// was skipped — not present at the bank, or closed — which is not an
/// error.
pub async fn sync_account(
    bank_client: &dyn BankClient,
    local_store: &SqlxLocalStore,
    user_id: &UserId,
    account_id: &AccountId,
    now: Timestamp,
    config: &SyncConfig,
) -> Result<Option<AccountSyncOutcome>, SyncEngineError> {
    use local_store::LocalStore as _;

    // 1. Refresh account metadata.
    let accounts = with_timeout(config.default_timeout, bank_client.get_accounts(user_id)).await?;
    let Some(bank_account) = accounts.into_iter().find(|a| &a.id == account_id) else {
        return Ok(None);
    };
    if bank_account.closed {
        return Ok(None);
    }

    let existing = local_store.get_account(account_id).await?;

    // 2. Refresh pots.
    let live_pots = with_timeout(config.default_timeout, bank_client.get_pots(user_id, account_id)).await?;
    let bills_pot_ids: HashSet<PotId> = local_store
        .list_pots_by_category(user_id, PotCategory::Bills)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();

    // 3. Determine the sync cursor and pull general-account transactions.
    let cursor = local_store.latest_transaction(account_id, user_id).await?;
    let (query, timeout) = match &cursor {
        None => (
            TransactionQuery {
                since: Some(Since::Date(now - config.first_time_window)),
                before: None,
                auto_paginate: false,
            },
            config.default_timeout,
        ),
        Some(cursor) => (
            TransactionQuery {
                since: Some(Since::TransactionId(cursor.id.clone())),
                before: Some(now),
                auto_paginate: true,
            },
            config.paginated_timeout,
        ),
    };
    let raw_transactions =
        with_timeout(timeout, bank_client.get_transactions(user_id, account_id.as_str(), query)).await?;

    let accepted_transactions: Vec<Transaction> = match &cursor {
        Some(cursor) => raw_transactions
            .iter()
            .filter(|t| t.id != cursor.id && t.created > cursor.created)
            .take(config.max_commit_batch)
            .map(|t| to_local_transaction(t, account_id, user_id))
            .collect(),
        None => raw_transactions.iter().map(|t| to_local_transaction(t, account_id, user_id)).collect(),
    };

    // Bills pot sync (specialized): pulled before the write transaction
    // opens, same as the general pull above.
    let mut bills_batches: Vec<(PotId, Vec<BankTransaction>)> = Vec::new();
    for bank_pot in live_pots.iter().filter(|p| !p.deleted && bills_pot_ids.contains(&p.id)) {
        let Some(pot_current_id) = &bank_pot.pot_current_id else { continue };
        let bills_cursor = local_store.latest_bills_transaction(&bank_pot.id).await?;
        let transactions =
            fetch_bills_pot_transactions(bank_client, user_id, pot_current_id, bills_cursor.as_ref(), now, config)
                .await?;
        bills_batches.push((bank_pot.id.clone(), transactions));
    }

    // Everything from here writes through one session, so a timeout or
    // error aborts the whole account's sync without a partial commit
    // (§4.2 "Timeout and cancellation").
    let mut session = local_store.begin_account_sync().await?;

    session
        .upsert_account(&Account {
            id: account_id.clone(),
            user_id: user_id.clone(),
            description: bank_account.description,
            account_type: bank_account.account_type,
            created: bank_account.created,
            closed: bank_account.closed,
            active_for_sync: existing.as_ref().map_or(true, |a| a.active_for_sync),
            last_sync: existing.as_ref().and_then(|a| a.last_sync),
            last_known_balance: existing.as_ref().and_then(|a| a.last_known_balance),
        })
        .await?;

    for bank_pot in live_pots.iter().filter(|p| !p.deleted) {
        session
            .upsert_pot(&Pot {
                id: bank_pot.id.clone(),
                account_id: account_id.clone(),
                user_id: user_id.clone(),
                name: bank_pot.name.clone(),
                style: bank_pot.style.clone(),
                balance: bank_pot.balance,
                currency: bank_pot.currency.clone(),
                created: bank_pot.created,
                updated: bank_pot.updated,
                deleted: bank_pot.deleted,
                goal: bank_pot.goal_amount.unwrap_or(Amount::ZERO),
                pot_current_id: bank_pot.pot_current_id.clone(),
                category: None,
            })
            .await?;
    }

    let transactions_committed = session.insert_transactions(&accepted_transactions).await?;

    // 4. Extract `pot_current_id` happens inside `to_local_transaction`.
    let mut bills_transactions_committed = 0;
    for (pot_id, transactions) in &bills_batches {
        for txn in transactions {
            let transaction_type =
                classify_bills_transaction(txn, &config.subscription_merchants, &config.pot_transfer_prefix);
            session
                .upsert_bills_transaction(&BillsPotTransaction {
                    transaction_id: txn.id.clone(),
                    account_id: account_id.clone(),
                    user_id: user_id.clone(),
                    pot_id: pot_id.clone(),
                    created: txn.created,
                    amount: txn.amount,
                    description: txn.description.clone(),
                    transaction_type,
                    is_pot_withdrawal: txn.is_pot_withdrawal(),
                })
                .await?;
            bills_transactions_committed += 1;
        }
    }

    session.mark_account_synced(account_id, now).await?;
    session.commit().await?;

    Ok(Some(AccountSyncOutcome { transactions_committed, bills_transactions_committed }))
}

/// Pulls the bills-pot-specific transaction set: chunked across the full
/// lookback window on a first run, cursor-based otherwise (§4.2 "Bills pot
/// sync (specialized)").
async fn fetch_bills_pot_transactions(
    bank_client: &dyn BankClient,
    user_id: &UserId,
    pot_current_id: &str,
    cursor: Option<&BillsPotTransaction>,
    now: Timestamp,
    config: &SyncConfig,
) -> Result<Vec<BankTransaction>, SyncEngineError> {
    let raw = match cursor {
        None => {
            let mut all = Vec::new();
            let mut slice_start = now - config.bills_window;
            while slice_start < now {
                let slice_end = (slice_start + config.bills_chunk).min(now);
                let query = TransactionQuery {
                    since: Some(Since::Date(slice_start)),
                    before: Some(slice_end),
                    auto_paginate: false,
                };
                let mut page = with_timeout(
                    config.default_timeout,
                    bank_client.get_transactions(user_id, pot_current_id, query),
                )
                .await?;
                all.append(&mut page);
                slice_start = slice_end;
            }
            all
        }
        Some(cursor) => {
            let query = TransactionQuery {
                since: Some(Since::TransactionId(cursor.transaction_id.clone())),
                before: Some(now),
                auto_paginate: true,
            };
            with_timeout(config.paginated_timeout, bank_client.get_transactions(user_id, pot_current_id, query))
                .await?
        }
    };

    Ok(match cursor {
        Some(cursor) => {
            raw.into_iter().filter(|t| t.id != cursor.transaction_id && t.created > cursor.created).collect()
        }
        None => raw,
    })
}

fn to_local_transaction(bt: &BankTransaction, account_id: &AccountId, user_id: &UserId) -> Transaction {
    Transaction {
        id: bt.id.clone(),
        account_id: account_id.clone(),
        user_id: user_id.clone(),
        created: bt.created,
        settled: bt.settled,
        amount: bt.amount,
        currency: bt.currency.clone(),
        description: bt.description.clone(),
        category: bt.category.clone(),
        merchant: bt.merchant.clone(),
        notes: bt.notes.clone(),
        is_load: bt.is_load,
        metadata: bt.metadata.clone(),
        pot_current_id: bt.pot_current_id(),
    }
}

async fn with_timeout<F, T>(duration: Duration, fut: F) -> Result<T, SyncEngineError>
where
    F: std::future::Future<Output = Result<T, BankClientError>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(SyncEngineError::Timeout(duration)),
    }
}
