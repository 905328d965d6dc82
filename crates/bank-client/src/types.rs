use core_types::{AccountId, Amount, PotId, Timestamp};
use serde::{Deserialize, Serialize};

/// An account as reported by the bank API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    /// Bank account id.
    pub id: AccountId,
    /// Human-readable description.
    pub description: String,
    /// Bank-assigned account type string (e.g. `"uk_retail"`).
    #[serde(rename = "type")]
    pub account_type: String,
    /// When the account was opened.
    pub created: Timestamp,
    /// Whether the bank reports this account as closed.
    #[serde(default)]
    pub closed: bool,
}

/// A pot as reported by the bank API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankPot {
    /// Bank pot id.
    pub id: PotId,
    /// Display name.
    pub name: String,
    /// Bank-assigned style tag (e.g. `"beach"`), if any.
    pub style: Option<String>,
    /// Current balance in minor units.
    pub balance: Amount,
    /// Three-letter currency code.
    pub currency: String,
    /// Whether the bank reports this pot as deleted.
    #[serde(default)]
    pub deleted: bool,
    /// Savings goal in minor units, `0` or absent meaning no goal.
    #[serde(default)]
    pub goal_amount: Option<Amount>,
    /// The account-like identifier used to pull transactions posted against
    /// this pot, distinct from the pot's own id.
    pub pot_current_id: Option<String>,
    /// When the pot was created.
    pub created: Timestamp,
    /// When the pot was last updated.
    pub updated: Timestamp,
}

/// A transaction as reported by the bank API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransaction {
    /// Bank transaction id.
    pub id: String,
    /// When the transaction was created.
    pub created: Timestamp,
    /// When the transaction settled, if it has.
    #[serde(default)]
    pub settled: Option<Timestamp>,
    /// Signed amount in minor units; negative is an outflow.
    pub amount: Amount,
    /// Three-letter currency code.
    pub currency: String,
    /// Free-text description.
    pub description: String,
    /// Bank-assigned category, if any.
    #[serde(default)]
    pub category: Option<String>,
    /// Merchant name, if any.
    #[serde(default)]
    pub merchant: Option<String>,
    /// User-entered notes, if any.
    #[serde(default)]
    pub notes: Option<String>,
    /// Whether this transaction represents a top-up/load rather than a
    /// regular payment.
    #[serde(default)]
    pub is_load: bool,
    /// Raw, bank-specific metadata blob. Inspected for `pot_account_id` and
    /// `pot_withdrawal_id` keys by the sync engine.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl BankTransaction {
    /// Extracts the `pot_account_id` metadata key, if present, as the
    /// `pot_current_id` the sync engine persists on the local transaction
    /// row.
    #[must_use]
    pub fn pot_current_id(&self) -> Option<String> {
        self.metadata.get("pot_account_id").and_then(|v| v.as_str()).map(str::to_owned)
    }

    /// Whether this transaction's metadata carries a `pot_withdrawal_id`,
    /// marking it as an actual pot withdrawal rather than an internal
    /// transfer annotation.
    #[must_use]
    pub fn is_pot_withdrawal(&self) -> bool {
        self.metadata.get("pot_withdrawal_id").is_some()
    }
}

/// The cursor used to bound a transaction query's lower edge.
#[derive(Debug, Clone, PartialEq)]
pub enum Since {
    /// First-time sync: a wall-clock lower bound (e.g. now minus 89 days).
    Date(Timestamp),
    /// Incremental sync: the most recent locally-known transaction id. The
    /// bank API treats this as "transactions after this id", though some
    /// bank implementations also return the cursor transaction itself —
    /// callers must still filter on `created`.
    TransactionId(String),
}

/// Parameters for [`crate::BankClient::get_transactions`].
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    /// Lower bound, if any. `None` means "no lower bound" (unused by the
    /// sync engine, which always supplies one, but valid for callers that
    /// want an unbounded pull).
    pub since: Option<Since>,
    /// Upper bound, exclusive.
    pub before: Option<Timestamp>,
    /// Whether the client should transparently follow pagination links
    /// until exhausted, rather than returning only the first page.
    pub auto_paginate: bool,
}

/// The caller's identity as reported by the bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhoAmI {
    /// Whether the current token is still authenticated.
    pub authenticated: bool,
    /// The bank user id the token belongs to.
    pub user_id: String,
    /// The OAuth client id the token was issued to.
    pub client_id: String,
}

/// Fresh token material from a successful code exchange or refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangedTokens {
    /// New access token.
    pub access_token: String,
    /// New refresh token.
    pub refresh_token: String,
    /// Token type (typically `"Bearer"`).
    pub token_type: String,
    /// Seconds until the access token expires.
    pub expires_in: i64,
    /// The bank user id the tokens belong to.
    pub user_id: String,
}
