#![warn(missing_debug_implementations)]
#![deny(unused_must_use, rust_2018_idioms, unreachable_pub)]

//! Starts and owns the three ticker families (§4.8 "Schedulers"): a global
//! sync ticker, a global automation ticker, and one per-rule ticker for
//! every enabled rule whose trigger type needs a dedicated cadence.
//!
//! Depends on both `sync-engine` and `automation-integration` — it is the
//! layer that wires [`automation_integration::AutomationIntegration`] into
//! `sync-engine` as its [`sync_engine::PostSyncHook`] (§9 "Cyclic Module
//! References": "schedulers → sync + integration").

mod cadence;
mod config;
mod error;
mod global;
mod registry;

pub use cadence::{ticker_cadence_for, TickerCadence};
pub use config::SchedulerConfig;
pub use error::SchedulerError;
pub use registry::RuleTickerRegistry;

use std::sync::Arc;

use automation_integration::AutomationIntegration;
use rule_model::RuleStore;
use sync_engine::SyncEngine;
use tokio::task::JoinHandle;
use tracing::info;

/// Owns every running scheduler task. Dropping it aborts all of them;
/// nothing here survives past the process that started it (§4.8 "Scheduling
/// model": scheduler threads are tied to the process root, not a
/// module-level singleton — see spec's "Global Mutable State" redesign
/// flag).
#[derive(Debug)]
pub struct Schedulers {
    sync_ticker: JoinHandle<()>,
    automation_ticker: JoinHandle<()>,
    rule_tickers: Arc<RuleTickerRegistry>,
}

impl Schedulers {
    /// Starts the two global tickers and registers a per-rule ticker for
    /// every currently enabled rule that needs one (§4.8 "Startup
    /// registration"). `integration` should already be holding the same
    /// `rule_store` instance passed here.
    pub async fn start(
        sync_engine: Arc<SyncEngine>,
        integration: Arc<AutomationIntegration>,
        rule_store: &dyn RuleStore,
        config: SchedulerConfig,
    ) -> Result<Self, SchedulerError> {
        let sync_ticker = global::spawn_sync_ticker(sync_engine, config.sync_interval);
        let automation_ticker = global::spawn_automation_ticker(integration.clone(), config.automation_interval);

        let rule_tickers = Arc::new(RuleTickerRegistry::new(integration));
        let started = rule_tickers.register_all(rule_store).await?;
        info!(
            target: "schedulers",
            sync_interval_secs = config.sync_interval.as_secs(),
            automation_interval_secs = config.automation_interval.as_secs(),
            per_rule_tickers = started,
            "schedulers started",
        );

        Ok(Self { sync_ticker, automation_ticker, rule_tickers })
    }

    /// The live per-rule ticker registry, for CRUD surfaces to call
    /// `register_rule`/`unregister_rule`/`replace_rule` on as rules change
    /// (§4.8: "When a rule is created, its scheduler is added; when toggled
    /// off, removed; when edited, replaced.").
    #[must_use]
    pub fn rule_tickers(&self) -> &Arc<RuleTickerRegistry> {
        &self.rule_tickers
    }

    /// Cooperative shutdown: aborts the two global tickers. Per-rule
    /// tickers are torn down when `self.rule_tickers`'s last `Arc` drops.
    pub fn stop(&self) {
        self.sync_ticker.abort();
        self.automation_ticker.abort();
    }
}
