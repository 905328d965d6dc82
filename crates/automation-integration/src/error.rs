use core_types::{CoreError, RuleId};
use execution_queue::ExecutionQueueError;
use local_store::LocalStoreError;
use rule_model::RuleModelError;
use trigger_eval::TriggerEvalError;

/// Errors surfaced while deciding whether to enqueue a rule, as distinct
/// from errors a queued job itself returns (§4.7, §4.8).
#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    #[error(transparent)]
    RuleModel(#[from] RuleModelError),

    #[error(transparent)]
    LocalStore(#[from] LocalStoreError),

    #[error(transparent)]
    TriggerEval(#[from] TriggerEvalError),

    #[error(transparent)]
    Queue(#[from] ExecutionQueueError),

    /// A rule's referenced pots could not be resolved to an owning account
    /// (§4.7 step 3). The rule is skipped for this cycle, not disabled.
    #[error("could not resolve an account for rule {rule_id}: {reason}")]
    AccountUnresolved { rule_id: RuleId, reason: String },

    /// A manual-execution request named a rule that doesn't exist.
    #[error("rule not found: {0}")]
    RuleNotFound(RuleId),
}

impl From<IntegrationError> for CoreError {
    fn from(err: IntegrationError) -> Self {
        match err {
            IntegrationError::RuleModel(e) => e.into(),
            IntegrationError::LocalStore(e) => e.into(),
            IntegrationError::TriggerEval(e) => e.into(),
            IntegrationError::Queue(e) => e.into(),
            IntegrationError::AccountUnresolved { rule_id, reason } => {
                Self::ConfigInvalid(format!("rule {rule_id}: {reason}"))
            }
            IntegrationError::RuleNotFound(id) => Self::Fatal(format!("rule not found: {id}")),
        }
    }
}
