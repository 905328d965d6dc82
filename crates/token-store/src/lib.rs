#![warn(missing_debug_implementations)]
#![deny(unused_must_use, rust_2018_idioms, unreachable_pub)]

//! Persistence for per-user bank API OAuth state (§4.1 of the design).
//!
//! A [`User`] is created on first successful OAuth exchange and updated on
//! every token refresh; the core never deletes one. Writes are serialized on
//! the database row itself — this crate does not add an additional lock
//! beyond whatever the backing store provides, per the concurrency model's
//! "shared-resource policy".

mod error;
mod sqlx_store;

pub use error::TokenStoreError;
pub use sqlx_store::SqlxTokenStore;

use async_trait::async_trait;
use core_types::{Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// OAuth credentials and client registration details for one bank user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Stable bank user identifier; unique, never reused.
    pub bank_user_id: UserId,
    /// Current access token.
    pub access_token: String,
    /// Current refresh token.
    pub refresh_token: String,
    /// Token type as reported by the bank (typically `"Bearer"`).
    pub token_type: String,
    /// Seconds from `acquired_at` until the access token expires.
    pub expires_in: i64,
    /// When the current token pair was acquired.
    pub acquired_at: Timestamp,
    /// OAuth client id used for this user's authorization code flow.
    pub client_id: String,
    /// OAuth client secret used for this user's authorization code flow.
    pub client_secret: String,
    /// Redirect URI registered for this user's authorization code flow.
    pub redirect_uri: String,
    /// Set when a refresh attempt has surfaced `ErrReauthRequired`. While
    /// true, the sync engine skips this user's accounts.
    pub needs_reauth: bool,
}

impl User {
    /// Whether the access token has expired, judged against `now`.
    #[must_use]
    pub fn is_access_token_expired(&self, now: Timestamp) -> bool {
        let expiry = self.acquired_at + chrono::Duration::seconds(self.expires_in);
        now >= expiry
    }
}

/// Fresh token material returned by a successful OAuth exchange or refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPair {
    /// New access token.
    pub access_token: String,
    /// New refresh token (the bank may or may not rotate this).
    pub refresh_token: String,
    /// Token type as reported by the bank.
    pub token_type: String,
    /// Seconds until the new access token expires.
    pub expires_in: i64,
}

/// Persists and refreshes per-user bank API credentials.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Loads the stored user, if any.
    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, TokenStoreError>;

    /// Inserts a new user record from a completed OAuth code exchange.
    async fn create_user(&self, user: User) -> Result<(), TokenStoreError>;

    /// Persists a refreshed token pair for an existing user, clearing
    /// `needs_reauth` and stamping a fresh `acquired_at`.
    async fn update_tokens(
        &self,
        user_id: &UserId,
        tokens: TokenPair,
        acquired_at: Timestamp,
    ) -> Result<(), TokenStoreError>;

    /// Marks a user as needing to redo the OAuth dance. Observable to the
    /// UI; the sync engine consults this to skip the user's accounts.
    async fn mark_needs_reauth(&self, user_id: &UserId) -> Result<(), TokenStoreError>;

    /// Lists every user that is not currently marked as needing reauth.
    async fn list_active_users(&self) -> Result<Vec<User>, TokenStoreError>;
}

/// An in-memory [`TokenStore`] used by tests and the bank-client doctest
/// harness; never used in production.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    users: parking_lot::Mutex<std::collections::HashMap<UserId, User>>,
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, TokenStoreError> {
        Ok(self.users.lock().get(user_id).cloned())
    }

    async fn create_user(&self, user: User) -> Result<(), TokenStoreError> {
        self.users.lock().insert(user.bank_user_id.clone(), user);
        Ok(())
    }

    async fn update_tokens(
        &self,
        user_id: &UserId,
        tokens: TokenPair,
        acquired_at: Timestamp,
    ) -> Result<(), TokenStoreError> {
        let mut users = self.users.lock();
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| TokenStoreError::UserNotFound(user_id.clone()))?;
        user.access_token = tokens.access_token;
        user.refresh_token = tokens.refresh_token;
        user.token_type = tokens.token_type;
        user.expires_in = tokens.expires_in;
        user.acquired_at = acquired_at;
        user.needs_reauth = false;
        Ok(())
    }

    async fn mark_needs_reauth(&self, user_id: &UserId) -> Result<(), TokenStoreError> {
        let mut users = self.users.lock();
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| TokenStoreError::UserNotFound(user_id.clone()))?;
        user.needs_reauth = true;
        Ok(())
    }

    async fn list_active_users(&self) -> Result<Vec<User>, TokenStoreError> {
        Ok(self.users.lock().values().filter(|u| !u.needs_reauth).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            bank_user_id: UserId::from("user_1"),
            access_token: "access".into(),
            refresh_token: "refresh".into(),
            token_type: "Bearer".into(),
            expires_in: 3600,
            acquired_at: Timestamp::default(),
            client_id: "client".into(),
            client_secret: "secret".into(),
            redirect_uri: "https://example.test/callback".into(),
            needs_reauth: false,
        }
    }

    #[tokio::test]
    async fn mark_needs_reauth_excludes_user_from_active_list() {
        let store = InMemoryTokenStore::default();
        store.create_user(sample_user()).await.unwrap();
        store.mark_needs_reauth(&UserId::from("user_1")).await.unwrap();
        assert!(store.list_active_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_tokens_clears_needs_reauth() {
        let store = InMemoryTokenStore::default();
        let mut user = sample_user();
        user.needs_reauth = true;
        store.create_user(user).await.unwrap();

        store
            .update_tokens(
                &UserId::from("user_1"),
                TokenPair {
                    access_token: "new-access".into(),
                    refresh_token: "new-refresh".into(),
                    token_type: "Bearer".into(),
                    expires_in: 7200,
                },
                Timestamp::default(),
            )
            .await
            .unwrap();

        let stored = store.get_user(&UserId::from("user_1")).await.unwrap().unwrap();
        assert!(!stored.needs_reauth);
        assert_eq!(stored.access_token, "new-access");
    }

    #[test]
    fn access_token_expiry_is_computed_from_acquisition_time() {
        let mut user = sample_user();
        user.expires_in = 60;
        user.acquired_at = Timestamp::default();
        assert!(!user.is_access_token_expired(user.acquired_at + chrono::Duration::seconds(30)));
        assert!(user.is_access_token_expired(user.acquired_at + chrono::Duration::seconds(61)));
    }
}
