use core_types::CoreError;

/// Errors surfaced while evaluating a rule's trigger.
#[derive(Debug, thiserror::Error)]
pub enum TriggerEvalError {
    #[error("bank client error: {0}")]
    BankClient(#[from] bank_client::BankClientError),

    #[error("local store error: {0}")]
    LocalStore(#[from] local_store::LocalStoreError),
}

impl From<TriggerEvalError> for CoreError {
    fn from(err: TriggerEvalError) -> Self {
        match err {
            TriggerEvalError::BankClient(e) => e.into(),
            TriggerEvalError::LocalStore(e) => e.into(),
        }
    }
}
