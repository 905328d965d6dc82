use std::time::Duration;

use bank_client::BankClientError;
use core_types::CoreError;
use local_store::LocalStoreError;

#[derive(Debug, thiserror::Error)]
pub enum SyncEngineError {
    #[error(transparent)]
    BankClient(#[from] BankClientError),

    #[error(transparent)]
    LocalStore(#[from] LocalStoreError),

    /// A single API call exceeded its bounded deadline (§4.2 "Timeout and
    /// cancellation").
    #[error("bank API call timed out after {0:?}")]
    Timeout(Duration),
}

impl From<SyncEngineError> for CoreError {
    fn from(err: SyncEngineError) -> Self {
        match err {
            SyncEngineError::BankClient(e) => e.into(),
            SyncEngineError::LocalStore(e) => e.into(),
            SyncEngineError::Timeout(d) => Self::BankTransient(format!("timed out after {d:?}")),
        }
    }
}
