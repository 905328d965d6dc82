use core_types::{CoreError, RuleId};

/// Errors surfaced by a [`crate::RuleStore`] implementation or config
/// validation.
#[derive(Debug, thiserror::Error)]
pub enum RuleModelError {
    #[error("rule not found: {0}")]
    RuleNotFound(RuleId),

    #[error("invalid rule config: {0}")]
    InvalidConfig(String),

    #[error("rule model backend error: {0}")]
    Backend(#[from] sqlx::Error),
}

impl From<RuleModelError> for CoreError {
    fn from(err: RuleModelError) -> Self {
        match err {
            RuleModelError::RuleNotFound(id) => Self::Fatal(format!("rule not found: {id}")),
            RuleModelError::InvalidConfig(m) => Self::ConfigInvalid(m),
            RuleModelError::Backend(e) => Self::BankTransient(e.to_string()),
        }
    }
}
