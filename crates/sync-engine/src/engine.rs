use std::sync::Arc;

use bank_client::{BankClient, BankClientError};
use chrono::Utc;
use local_store::SqlxLocalStore;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use crate::{
    account_sync::{self, AccountSyncOutcome},
    config::SyncConfig,
    error::SyncEngineError,
    hook::PostSyncHook,
    reauth::ReauthTracker,
};

/// Orchestrates account sync across every syncable account (§4.2
/// "Concurrency"): at most one sync run in flight process-wide, accounts
/// within a run processed one at a time so a stuck account can't starve the
/// rest of their database connections.
pub struct SyncEngine {
    bank_client: Arc<dyn BankClient>,
    local_store: Arc<SqlxLocalStore>,
    post_sync_hook: Arc<dyn PostSyncHook>,
    reauth_tracker: Arc<dyn ReauthTracker>,
    config: SyncConfig,
    in_flight: AsyncMutex<()>,
}

/// Tally returned by [`SyncEngine::sync_all_accounts`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncRunSummary {
    pub accounts_synced: usize,
    pub accounts_skipped: usize,
    pub accounts_failed: usize,
}

impl SyncEngine {
    pub fn new(
        bank_client: Arc<dyn BankClient>,
        local_store: Arc<SqlxLocalStore>,
        post_sync_hook: Arc<dyn PostSyncHook>,
        reauth_tracker: Arc<dyn ReauthTracker>,
        config: SyncConfig,
    ) -> Self {
        Self { bank_client, local_store, post_sync_hook, reauth_tracker, config, in_flight: AsyncMutex::new(()) }
    }

    /// Runs one sync tick over every syncable account. If a run is already
    /// in flight, waits for it rather than overlapping — the scheduler is
    /// expected to call this on a fixed interval, not to fan out calls of
    /// its own.
    pub async fn sync_all_accounts(&self) -> Result<SyncRunSummary, SyncEngineError> {
        use local_store::LocalStore as _;

        let _guard = self.in_flight.lock().await;
        let now = Utc::now();
        let mut summary = SyncRunSummary::default();

        let accounts = self.local_store.list_syncable_accounts().await?;
        for account in accounts {
            if self.reauth_tracker.needs_reauth(&account.user_id).await {
                summary.accounts_skipped += 1;
                continue;
            }

            let result = account_sync::sync_account(
                self.bank_client.as_ref(),
                &self.local_store,
                &account.user_id,
                &account.id,
                now,
                &self.config,
            )
            .await;

            match result {
                Ok(Some(AccountSyncOutcome { transactions_committed, bills_transactions_committed })) => {
                    summary.accounts_synced += 1;
                    info!(
                        target: "sync_engine",
                        account_id = %account.id,
                        transactions_committed,
                        bills_transactions_committed,
                        "account synced",
                    );
                    self.post_sync_hook.on_account_synced(&account.user_id, &account.id).await;
                }
                Ok(None) => {
                    summary.accounts_skipped += 1;
                }
                Err(SyncEngineError::BankClient(BankClientError::ReauthRequired(message))) => {
                    summary.accounts_failed += 1;
                    self.reauth_tracker.mark_needs_reauth(&account.user_id).await;
                    warn!(
                        target: "sync_engine",
                        account_id = %account.id,
                        message,
                        "account flagged as needing reauthentication",
                    );
                }
                Err(err) => {
                    summary.accounts_failed += 1;
                    warn!(
                        target: "sync_engine",
                        account_id = %account.id,
                        error = %err,
                        "account sync failed, will retry next tick",
                    );
                }
            }
        }

        Ok(summary)
    }
}
