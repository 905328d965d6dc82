use async_trait::async_trait;
use core_types::{AccountId, UserId};
use sync_engine::PostSyncHook;
use tracing::warn;

use crate::integration::AutomationIntegration;

#[async_trait]
impl PostSyncHook for AutomationIntegration {
    async fn on_account_synced(&self, user_id: &UserId, account_id: &AccountId) {
        if let Err(err) = self.handle_account_synced(user_id, account_id).await {
            warn!(
                target: "automation_integration", %user_id, %account_id, %err,
                "post-sync automation pass failed",
            );
        }
    }
}
