//! Pulls account, pot, and transaction data from the bank API into the
//! local mirror (§4.2). Has no dependency on `automation-integration`: the
//! [`hook::PostSyncHook`] trait it calls after each account is declared
//! here, not consumed from there, so the dependency cycle the design notes
//! warn about never forms in `Cargo.toml` (§9 "Cyclic Module References").

mod account_sync;
mod classify;
mod config;
mod engine;
mod error;
mod hook;
mod reauth;

pub use account_sync::{sync_account, AccountSyncOutcome};
pub use classify::classify_bills_transaction;
pub use config::SyncConfig;
pub use engine::{SyncEngine, SyncRunSummary};
pub use error::SyncEngineError;
pub use hook::{NoopPostSyncHook, PostSyncHook};
pub use reauth::{InMemoryReauthTracker, ReauthTracker};
