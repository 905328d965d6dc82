use core_types::UserId;

/// Errors raised by a [`crate::TokenStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
    /// No user row exists for the given id.
    #[error("no stored credentials for user {0}")]
    UserNotFound(UserId),

    /// The backing database rejected the query or connection.
    #[error("token store backend error: {0}")]
    Backend(#[from] sqlx::Error),
}
