use core_types::{AccountId, Timestamp, UserId};

/// What an executor needs beyond the rule itself: the instant it is
/// running at and the account the rule's pots are resolved against.
/// Resolved by the caller (`automation-integration`), the same way it
/// resolves an account id to stamp a queue item (§4.7 step 3).
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub now: Timestamp,
    pub user_id: UserId,
    pub account_id: AccountId,
}
