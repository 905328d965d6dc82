use core_types::CoreError;
use rule_model::RuleModelError;

/// Errors surfaced while starting up or registering tickers (§4.8).
/// A single rule's ticker failing to execute one tick is logged and
/// retried next tick, never returned here.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error(transparent)]
    RuleModel(#[from] RuleModelError),
}

impl From<SchedulerError> for CoreError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::RuleModel(e) => e.into(),
        }
    }
}
