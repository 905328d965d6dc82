use core_types::CoreError;

/// Errors surfaced by a [`crate::BankClient`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum BankClientError {
    /// Refresh itself failed with `invalid_grant`/`refresh_token`/`expired`.
    /// The caller must treat the user as needing to redo the OAuth flow.
    #[error("reauthentication required: {0}")]
    ReauthRequired(String),

    /// Any other refresh failure (network error talking to the token
    /// endpoint, 5xx from the bank, etc).
    #[error("transient authentication failure: {0}")]
    AuthTransient(String),

    /// 5xx, network error, or timeout. Safe to retry on the next tick.
    #[error("transient bank API failure: {0}")]
    BankTransient(String),

    /// The bank rejected a money-moving call for insufficient funds.
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// No stored credentials, or the user record could not be read.
    #[error("no usable credentials: {0}")]
    NoCredentials(String),

    /// A call was made with a malformed argument (e.g. empty dedupe id).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<BankClientError> for CoreError {
    fn from(err: BankClientError) -> Self {
        match err {
            BankClientError::ReauthRequired(m) => Self::ReauthRequired(m),
            BankClientError::AuthTransient(m) => Self::AuthTransient(m),
            BankClientError::BankTransient(m) => Self::BankTransient(m),
            BankClientError::InsufficientFunds(m) => Self::InsufficientFunds(m),
            BankClientError::NoCredentials(m) => Self::BankTransient(m),
            BankClientError::InvalidRequest(m) => Self::ConfigInvalid(m),
        }
    }
}

/// Returns `true` when an error message looks like an expired/invalid token
/// rather than some other kind of failure. Used by the client to decide
/// whether a non-401 error is still worth one refresh+retry, per the design's
/// token-refresh rule: "any error whose message contains
/// `unauthorized|token|expired|invalid`".
#[must_use]
pub fn looks_like_auth_error(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    ["unauthorized", "token", "expired", "invalid"].iter().any(|needle| lower.contains(needle))
}

/// Returns `true` when a refresh failure should be reported as
/// [`BankClientError::ReauthRequired`] rather than
/// [`BankClientError::AuthTransient`].
#[must_use]
pub fn looks_like_reauth_required(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    ["invalid_grant", "refresh_token", "expired"].iter().any(|needle| lower.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_error_detection_is_case_insensitive() {
        assert!(looks_like_auth_error("Unauthorized"));
        assert!(looks_like_auth_error("Access TOKEN has expired"));
        assert!(!looks_like_auth_error("connection reset by peer"));
    }

    #[test]
    fn reauth_required_detection_matches_known_phrases() {
        assert!(looks_like_reauth_required("error: invalid_grant"));
        assert!(looks_like_reauth_required("refresh_token is no longer valid"));
        assert!(!looks_like_reauth_required("service unavailable"));
    }
}
