use std::{sync::Arc, time::Duration};

use automation_integration::AutomationIntegration;
use sync_engine::SyncEngine;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Spawns the global sync ticker (§4.8 "Global sync ticker, every 10
/// minutes"). A missed tick (process stall, a long-running previous sync)
/// is tolerated silently — `MissedTickBehavior::Delay` just resumes on the
/// next interval rather than firing a catch-up burst.
pub fn spawn_sync_ticker(sync_engine: Arc<SyncEngine>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match sync_engine.sync_all_accounts().await {
                Ok(summary) => info!(
                    target: "schedulers",
                    accounts_synced = summary.accounts_synced,
                    accounts_skipped = summary.accounts_skipped,
                    accounts_failed = summary.accounts_failed,
                    "global sync tick complete",
                ),
                Err(err) => warn!(target: "schedulers", %err, "global sync tick failed, will retry next tick"),
            }
        }
    })
}

/// Spawns the global automation ticker (§4.8 "Global automation ticker,
/// every 5 minutes, invokes §4.7 without a preceding full sync").
pub fn spawn_automation_ticker(integration: Arc<AutomationIntegration>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let now = chrono::Utc::now();
            match integration.run_all_users(now).await {
                Ok(summary) => info!(
                    target: "schedulers",
                    enqueued = summary.enqueued,
                    skipped = summary.skipped,
                    automation_trigger_enqueued = summary.automation_trigger_enqueued,
                    "global automation tick complete",
                ),
                Err(err) => {
                    warn!(target: "schedulers", %err, "global automation tick failed, will retry next tick")
                }
            }
        }
    })
}
