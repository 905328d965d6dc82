use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use core_types::{AccountId, Amount, PotId, UserId};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use token_store::{TokenPair, TokenStore};
use tracing::{instrument, warn};

use crate::{
    client::BankClient,
    error::{looks_like_auth_error, looks_like_reauth_required, BankClientError},
    types::{
        BankAccount, BankPot, BankTransaction, ExchangedTokens, Since, TransactionQuery, WhoAmI,
    },
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const PAGINATED_TIMEOUT: Duration = Duration::from_secs(120);

/// Production [`BankClient`] backed by an HTTP REST API.
///
/// Holds an [`Arc`] to the shared [`TokenStore`] so that a refreshed token
/// pair is persisted before the request is retried — never leave a refresh
/// unpersisted across a retry, or the next call just refreshes again.
#[derive(Debug, Clone)]
pub struct HttpBankClient {
    http: Client,
    base_url: String,
    token_store: Arc<dyn TokenStore>,
}

impl HttpBankClient {
    /// Builds a client pointed at `base_url`, using `token_store` for
    /// credential lookup and persisting refreshes.
    #[must_use]
    pub fn new(base_url: impl Into<String>, token_store: Arc<dyn TokenStore>) -> Self {
        Self { http: Client::new(), base_url: base_url.into(), token_store }
    }

    async fn access_token(&self, user_id: &UserId) -> Result<String, BankClientError> {
        let user = self
            .token_store
            .get_user(user_id)
            .await
            .map_err(|e| BankClientError::NoCredentials(e.to_string()))?
            .ok_or_else(|| BankClientError::NoCredentials(format!("no user {user_id}")))?;
        if user.needs_reauth {
            return Err(BankClientError::ReauthRequired(format!(
                "user {user_id} previously marked as needing reauth"
            )));
        }
        Ok(user.access_token)
    }

    /// Executes `build_request` once; on a 401 or an auth-looking error,
    /// refreshes the token via [`Self::refresh_access_token`], persists it,
    /// and retries exactly once. §4.1 "Token refresh".
    async fn send_with_refresh<F>(
        &self,
        user_id: &UserId,
        timeout: Duration,
        build_request: F,
    ) -> Result<reqwest::Response, BankClientError>
    where
        F: Fn(&str) -> reqwest::RequestBuilder,
    {
        let token = self.access_token(user_id).await?;
        let first = self.execute(build_request(&token), timeout).await;

        let needs_refresh = match &first {
            Ok(resp) if resp.status() == StatusCode::UNAUTHORIZED => true,
            Ok(_) => false,
            Err(BankClientError::BankTransient(msg)) => looks_like_auth_error(msg),
            Err(_) => false,
        };

        if !needs_refresh {
            return first;
        }

        warn!(target: "bank_client", %user_id, "access token looked expired, refreshing");
        let refreshed = self.refresh_access_token(user_id).await?;
        self.token_store
            .update_tokens(
                user_id,
                TokenPair {
                    access_token: refreshed.access_token.clone(),
                    refresh_token: refreshed.refresh_token,
                    token_type: refreshed.token_type,
                    expires_in: refreshed.expires_in,
                },
                Utc::now(),
            )
            .await
            .map_err(|e| BankClientError::AuthTransient(e.to_string()))?;

        self.execute(build_request(&refreshed.access_token), timeout).await
    }

    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
        timeout: Duration,
    ) -> Result<reqwest::Response, BankClientError> {
        request
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| BankClientError::BankTransient(e.to_string()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn into_outcome<T: for<'de> Deserialize<'de>>(
        resp: reqwest::Response,
    ) -> Result<T, BankClientError> {
        let status = resp.status();
        if status == StatusCode::PAYMENT_REQUIRED || status == StatusCode::CONFLICT {
            let body = resp.text().await.unwrap_or_default();
            return Err(BankClientError::InsufficientFunds(body));
        }
        if status.is_server_error() {
            return Err(BankClientError::BankTransient(format!("bank API returned {status}")));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BankClientError::BankTransient(format!("bank API returned {status}: {body}")));
        }
        resp.json::<T>().await.map_err(|e| BankClientError::BankTransient(e.to_string()))
    }
}

#[derive(Deserialize)]
struct AccountsResponse {
    accounts: Vec<BankAccount>,
}

#[derive(Deserialize)]
struct PotsResponse {
    pots: Vec<BankPot>,
}

#[derive(Deserialize)]
struct BalanceResponse {
    balance: Amount,
}

#[derive(Deserialize)]
struct TransactionsResponse {
    transactions: Vec<BankTransaction>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct Pagination {
    next_since: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    token_type: String,
    expires_in: i64,
    user_id: String,
}

#[async_trait]
impl BankClient for HttpBankClient {
    #[instrument(skip(self), target = "bank_client")]
    async fn get_accounts(&self, user_id: &UserId) -> Result<Vec<BankAccount>, BankClientError> {
        let url = self.url("/accounts");
        let resp = self
            .send_with_refresh(user_id, DEFAULT_TIMEOUT, |token| {
                self.http.get(&url).bearer_auth(token)
            })
            .await?;
        Ok(Self::into_outcome::<AccountsResponse>(resp).await?.accounts)
    }

    #[instrument(skip(self), target = "bank_client")]
    async fn get_pots(
        &self,
        user_id: &UserId,
        account_id: &AccountId,
    ) -> Result<Vec<BankPot>, BankClientError> {
        let url = self.url("/pots");
        let account_id = account_id.clone();
        let resp = self
            .send_with_refresh(user_id, DEFAULT_TIMEOUT, |token| {
                self.http
                    .get(&url)
                    .bearer_auth(token)
                    .query(&[("current_account_id", account_id.as_str())])
            })
            .await?;
        Ok(Self::into_outcome::<PotsResponse>(resp).await?.pots.into_iter().filter(|p| !p.deleted).collect())
    }

    #[instrument(skip(self), target = "bank_client")]
    async fn get_balance(
        &self,
        user_id: &UserId,
        account_id: &AccountId,
    ) -> Result<Amount, BankClientError> {
        let url = self.url("/balance");
        let account_id = account_id.clone();
        let resp = self
            .send_with_refresh(user_id, DEFAULT_TIMEOUT, |token| {
                self.http.get(&url).bearer_auth(token).query(&[("account_id", account_id.as_str())])
            })
            .await?;
        Ok(Self::into_outcome::<BalanceResponse>(resp).await?.balance)
    }

    #[instrument(skip(self, query), target = "bank_client")]
    async fn get_transactions(
        &self,
        user_id: &UserId,
        account_id: &str,
        query: TransactionQuery,
    ) -> Result<Vec<BankTransaction>, BankClientError> {
        let timeout = if query.auto_paginate { PAGINATED_TIMEOUT } else { DEFAULT_TIMEOUT };
        let url = self.url("/transactions");
        let mut since = query.since;
        let mut all = Vec::new();

        loop {
            let since_param = match &since {
                Some(Since::Date(ts)) => Some(ts.to_rfc3339()),
                Some(Since::TransactionId(id)) => Some(id.clone()),
                None => None,
            };
            let before_param = query.before.map(|b| b.to_rfc3339());

            let resp = self
                .send_with_refresh(user_id, timeout, |token| {
                    let mut req = self
                        .http
                        .get(&url)
                        .bearer_auth(token)
                        .query(&[("account_id", account_id)]);
                    if let Some(since) = &since_param {
                        req = req.query(&[("since", since.as_str())]);
                    }
                    if let Some(before) = &before_param {
                        req = req.query(&[("before", before.as_str())]);
                    }
                    req
                })
                .await?;

            let page = Self::into_outcome::<TransactionsResponse>(resp).await?;
            let next_since = page.pagination.and_then(|p| p.next_since);
            all.extend(page.transactions);

            if !query.auto_paginate {
                break;
            }
            match next_since {
                Some(cursor) => since = Some(Since::TransactionId(cursor)),
                None => break,
            }
        }

        Ok(all)
    }

    #[instrument(skip(self), target = "bank_client")]
    async fn deposit_to_pot(
        &self,
        user_id: &UserId,
        pot_id: &PotId,
        from_account_id: &AccountId,
        amount: Amount,
        dedupe_id: &str,
    ) -> Result<(), BankClientError> {
        if dedupe_id.is_empty() {
            return Err(BankClientError::InvalidRequest("dedupe id must not be empty".into()));
        }
        let url = self.url(&format!("/pots/{pot_id}/deposit"));
        let from_account_id = from_account_id.clone();
        let resp = self
            .send_with_refresh(user_id, DEFAULT_TIMEOUT, |token| {
                self.http.put(&url).bearer_auth(token).form(&[
                    ("source_account_id", from_account_id.as_str()),
                    ("amount", &amount.as_minor_units().to_string()),
                    ("dedupe_id", dedupe_id),
                ])
            })
            .await?;
        Self::into_outcome::<serde_json::Value>(resp).await?;
        Ok(())
    }

    #[instrument(skip(self), target = "bank_client")]
    async fn withdraw_from_pot(
        &self,
        user_id: &UserId,
        pot_id: &PotId,
        to_account_id: &AccountId,
        amount: Amount,
        dedupe_id: &str,
    ) -> Result<(), BankClientError> {
        if dedupe_id.is_empty() {
            return Err(BankClientError::InvalidRequest("dedupe id must not be empty".into()));
        }
        let url = self.url(&format!("/pots/{pot_id}/withdraw"));
        let to_account_id = to_account_id.clone();
        let resp = self
            .send_with_refresh(user_id, DEFAULT_TIMEOUT, |token| {
                self.http.put(&url).bearer_auth(token).form(&[
                    ("destination_account_id", to_account_id.as_str()),
                    ("amount", &amount.as_minor_units().to_string()),
                    ("dedupe_id", dedupe_id),
                ])
            })
            .await?;
        Self::into_outcome::<serde_json::Value>(resp).await?;
        Ok(())
    }

    #[instrument(skip(self), target = "bank_client")]
    async fn annotate_transaction(
        &self,
        user_id: &UserId,
        txn_id: &str,
        notes: &str,
    ) -> Result<(), BankClientError> {
        let url = self.url(&format!("/transactions/{txn_id}"));
        let resp = self
            .send_with_refresh(user_id, DEFAULT_TIMEOUT, |token| {
                self.http.patch(&url).bearer_auth(token).form(&[("metadata[notes]", notes)])
            })
            .await?;
        Self::into_outcome::<serde_json::Value>(resp).await?;
        Ok(())
    }

    #[instrument(skip(self), target = "bank_client")]
    async fn whoami(&self, user_id: &UserId) -> Result<WhoAmI, BankClientError> {
        let url = self.url("/ping/whoami");
        let resp = self
            .send_with_refresh(user_id, DEFAULT_TIMEOUT, |token| {
                self.http.get(&url).bearer_auth(token)
            })
            .await?;
        Self::into_outcome::<WhoAmI>(resp).await
    }

    #[instrument(skip(self, client_secret, code), target = "bank_client")]
    async fn exchange_code_for_token(
        &self,
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
        code: &str,
    ) -> Result<ExchangedTokens, BankClientError> {
        let url = self.url("/oauth2/token");
        let resp = self
            .http
            .post(&url)
            .timeout(DEFAULT_TIMEOUT)
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("redirect_uri", redirect_uri),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| BankClientError::AuthTransient(e.to_string()))?;

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(if looks_like_reauth_required(&body) {
                BankClientError::ReauthRequired(body)
            } else {
                BankClientError::AuthTransient(body)
            });
        }

        let token: TokenResponse =
            resp.json().await.map_err(|e| BankClientError::AuthTransient(e.to_string()))?;
        Ok(ExchangedTokens {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            token_type: token.token_type,
            expires_in: token.expires_in,
            user_id: token.user_id,
        })
    }

    #[instrument(skip(self), target = "bank_client")]
    async fn refresh_access_token(
        &self,
        user_id: &UserId,
    ) -> Result<ExchangedTokens, BankClientError> {
        let user = self
            .token_store
            .get_user(user_id)
            .await
            .map_err(|e| BankClientError::NoCredentials(e.to_string()))?
            .ok_or_else(|| BankClientError::NoCredentials(format!("no user {user_id}")))?;

        let url = self.url("/oauth2/token");
        let resp = self
            .http
            .post(&url)
            .timeout(DEFAULT_TIMEOUT)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", user.client_id.as_str()),
                ("client_secret", user.client_secret.as_str()),
                ("refresh_token", user.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| BankClientError::AuthTransient(e.to_string()))?;

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            if looks_like_reauth_required(&body) {
                let _ = self.token_store.mark_needs_reauth(user_id).await;
                return Err(BankClientError::ReauthRequired(body));
            }
            return Err(BankClientError::AuthTransient(body));
        }

        let token: TokenResponse =
            resp.json().await.map_err(|e| BankClientError::AuthTransient(e.to_string()))?;
        Ok(ExchangedTokens {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            token_type: token.token_type,
            expires_in: token.expires_in,
            user_id: token.user_id,
        })
    }
}
