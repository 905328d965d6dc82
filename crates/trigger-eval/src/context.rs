use core_types::{AccountId, Timestamp, UserId};

/// What the evaluator needs beyond the rule itself: the current instant and
/// which account anchors "main account" balance reads and lookback
/// transaction queries. Resolved by the caller (`automation-integration`)
/// from the rule's referenced pots, the same resolution it performs to
/// stamp a queue item's account id (§4.7 step 3).
#[derive(Debug, Clone)]
pub struct TriggerContext {
    pub now: Timestamp,
    pub user_id: UserId,
    pub primary_account_id: AccountId,
}

/// The result of evaluating a rule's trigger: whether it should fire now,
/// and a human-readable reason either way (§4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub should_fire: bool,
    pub reason: String,
}

impl Decision {
    #[must_use]
    pub fn fire(reason: impl Into<String>) -> Self {
        Self { should_fire: true, reason: reason.into() }
    }

    #[must_use]
    pub fn skip(reason: impl Into<String>) -> Self {
        Self { should_fire: false, reason: reason.into() }
    }
}
