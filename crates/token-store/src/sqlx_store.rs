use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{Timestamp, UserId};
use sqlx::SqlitePool;

use crate::{TokenPair, TokenStore, TokenStoreError, User};

/// A [`TokenStore`] backed by the `users` table of the shared database
/// connection (SQLite via `sqlx`, as configured by `DATABASE_URL`).
///
/// Writes are ordinary `UPDATE ... WHERE bank_user_id = ?` statements; the
/// database row itself is the serialization point, per the design's
/// shared-resource policy — this type adds no additional locking.
#[derive(Debug, Clone)]
pub struct SqlxTokenStore {
    pool: SqlitePool,
}

impl SqlxTokenStore {
    /// Wraps an existing connection pool. Schema creation/migration is out
    /// of scope for the core (§1 Non-goals).
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for SqlxTokenStore {
    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, TokenStoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT bank_user_id, access_token, refresh_token, token_type, expires_in, \
             acquired_at, client_id, client_secret, redirect_uri, needs_reauth \
             FROM users WHERE bank_user_id = ?",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn create_user(&self, user: User) -> Result<(), TokenStoreError> {
        sqlx::query(
            "INSERT INTO users (bank_user_id, access_token, refresh_token, token_type, \
             expires_in, acquired_at, client_id, client_secret, redirect_uri, needs_reauth) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0)",
        )
        .bind(user.bank_user_id.as_str())
        .bind(&user.access_token)
        .bind(&user.refresh_token)
        .bind(&user.token_type)
        .bind(user.expires_in)
        .bind(user.acquired_at)
        .bind(&user.client_id)
        .bind(&user.client_secret)
        .bind(&user.redirect_uri)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_tokens(
        &self,
        user_id: &UserId,
        tokens: TokenPair,
        acquired_at: Timestamp,
    ) -> Result<(), TokenStoreError> {
        let result = sqlx::query(
            "UPDATE users SET access_token = ?, refresh_token = ?, token_type = ?, \
             expires_in = ?, acquired_at = ?, needs_reauth = 0 WHERE bank_user_id = ?",
        )
        .bind(&tokens.access_token)
        .bind(&tokens.refresh_token)
        .bind(&tokens.token_type)
        .bind(tokens.expires_in)
        .bind(acquired_at)
        .bind(user_id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(TokenStoreError::UserNotFound(user_id.clone()));
        }
        Ok(())
    }

    async fn mark_needs_reauth(&self, user_id: &UserId) -> Result<(), TokenStoreError> {
        let result = sqlx::query("UPDATE users SET needs_reauth = 1 WHERE bank_user_id = ?")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(TokenStoreError::UserNotFound(user_id.clone()));
        }
        Ok(())
    }

    async fn list_active_users(&self) -> Result<Vec<User>, TokenStoreError> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT bank_user_id, access_token, refresh_token, token_type, expires_in, \
             acquired_at, client_id, client_secret, redirect_uri, needs_reauth \
             FROM users WHERE needs_reauth = 0",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    bank_user_id: String,
    access_token: String,
    refresh_token: String,
    token_type: String,
    expires_in: i64,
    acquired_at: DateTime<Utc>,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    needs_reauth: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            bank_user_id: UserId::from(row.bank_user_id),
            access_token: row.access_token,
            refresh_token: row.refresh_token,
            token_type: row.token_type,
            expires_in: row.expires_in,
            acquired_at: row.acquired_at,
            client_id: row.client_id,
            client_secret: row.client_secret,
            redirect_uri: row.redirect_uri,
            needs_reauth: row.needs_reauth,
        }
    }
}
