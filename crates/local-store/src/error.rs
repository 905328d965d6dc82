use core_types::{AccountId, CoreError, PotId};

/// Errors surfaced by a [`crate::LocalStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum LocalStoreError {
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("pot not found: {0}")]
    PotNotFound(PotId),

    #[error("invalid pot category: {0}")]
    InvalidCategory(String),

    #[error("local store backend error: {0}")]
    Backend(#[from] sqlx::Error),
}

impl From<LocalStoreError> for CoreError {
    fn from(err: LocalStoreError) -> Self {
        match err {
            LocalStoreError::AccountNotFound(id) => {
                Self::Fatal(format!("account not found: {id}"))
            }
            LocalStoreError::PotNotFound(id) => Self::Fatal(format!("pot not found: {id}")),
            LocalStoreError::InvalidCategory(m) => Self::ConfigInvalid(m),
            LocalStoreError::Backend(e) => Self::BankTransient(e.to_string()),
        }
    }
}
