use async_trait::async_trait;
use core_types::{AccountId, UserId};

/// What the sync engine calls after successfully syncing one account (§4.2
/// step 6, §9 "Cyclic Module References").
///
/// Declared here rather than depended on from `automation-integration`, so
/// the sync engine has no dependency at all on the integration crate — only
/// on this narrow trait. `automation-integration` implements it;
/// `schedulers`, which already depends on both crates, does the wiring.
#[async_trait]
pub trait PostSyncHook: Send + Sync {
    async fn on_account_synced(&self, user_id: &UserId, account_id: &AccountId);
}

/// Does nothing. Used wherever no automation trigger should run off the
/// back of a sync (tests, or a sync-only deployment).
#[derive(Debug, Default)]
pub struct NoopPostSyncHook;

#[async_trait]
impl PostSyncHook for NoopPostSyncHook {
    async fn on_account_synced(&self, _user_id: &UserId, _account_id: &AccountId) {}
}
