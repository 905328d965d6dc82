use std::collections::HashSet;

use async_trait::async_trait;
use core_types::UserId;
use parking_lot::Mutex;

/// Tracks which users need to redo the OAuth dance (§4.2 "Failure
/// semantics": `ErrReauthRequired` "marks the User as needing
/// reauthentication (observable to the UI) and skips their accounts on
/// subsequent ticks until corrected"). The actual UI surface is out of
/// scope; this is the narrow interface it would read from and clear.
#[async_trait]
pub trait ReauthTracker: Send + Sync {
    async fn mark_needs_reauth(&self, user_id: &UserId);

    async fn needs_reauth(&self, user_id: &UserId) -> bool;

    /// Called once reauthentication succeeds (out of scope here, but the
    /// clearing interface belongs next to the marking one).
    async fn clear_reauth(&self, user_id: &UserId);
}

/// An in-memory [`ReauthTracker`]. Fine for a single-process deployment;
/// a persisted implementation would back this with the same table the
/// (out-of-scope) user record lives in.
#[derive(Debug, Default)]
pub struct InMemoryReauthTracker {
    flagged: Mutex<HashSet<UserId>>,
}

#[async_trait]
impl ReauthTracker for InMemoryReauthTracker {
    async fn mark_needs_reauth(&self, user_id: &UserId) {
        self.flagged.lock().insert(user_id.clone());
    }

    async fn needs_reauth(&self, user_id: &UserId) -> bool {
        self.flagged.lock().contains(user_id)
    }

    async fn clear_reauth(&self, user_id: &UserId) {
        self.flagged.lock().remove(user_id);
    }
}
