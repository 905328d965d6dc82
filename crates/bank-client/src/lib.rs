//! Typed client for the bank's open-banking REST API (§4.1).
//!
//! [`BankClient`] is the trait every other crate programs against; callers
//! outside tests should construct an [`HttpBankClient`]. The trait exists so
//! the sync engine, executors, and schedulers can run against an in-memory or
//! mocked implementation without a live bank connection.

mod client;
mod dedupe;
mod error;
mod http;
mod types;

pub use client::BankClient;
pub use dedupe::{deposit_leg, module_transfer_id, sweep_source_id, topup_id, withdraw_leg};
pub use error::{looks_like_auth_error, looks_like_reauth_required, BankClientError};
pub use http::HttpBankClient;
pub use types::{
    BankAccount, BankPot, BankTransaction, ExchangedTokens, Since, TransactionQuery, WhoAmI,
};
