//! Process root (§0 "Crate layout"): loads [`Config`], builds the
//! dependency graph bottom-up, starts the execution queue's worker pool and
//! the three scheduler families, and waits for a shutdown signal.

mod config;

use std::sync::Arc;

use clap::Parser;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;

use automation_integration::AutomationIntegration;
use bank_client::{BankClient, HttpBankClient};
use execution_queue::{ExecutionQueue, QueueConfig};
use local_store::{LocalStore, SqlxLocalStore};
use rule_executors::{DefaultRuleExecutor, NoopAlertSink, RuleExecutor};
use rule_model::{RuleStore, SqlxRuleStore};
use schedulers::{SchedulerConfig, Schedulers};
use sync_engine::{InMemoryReauthTracker, SyncConfig, SyncEngine};
use token_store::SqlxTokenStore;
use trigger_eval::{DefaultTriggerEvaluator, TriggerEvaluator};

use crate::config::Config;

fn install_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(
            "automation_core=info,sync_engine=info,automation_integration=info,\
             schedulers=info,execution_queue=info,rule_executors=info,trigger_eval=info",
        )
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::parse();
    install_tracing();

    info!(
        target: "automation_core",
        sync_interval_secs = config.sync_interval_secs,
        automation_interval_secs = config.automation_interval_secs,
        queue_worker_count = config.queue_worker_count,
        queue_capacity = config.queue_capacity,
        "starting",
    );

    automation_metrics::describe_all();

    let pool = SqlitePoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    let token_store = Arc::new(SqlxTokenStore::new(pool.clone()));
    let sqlx_local_store = Arc::new(SqlxLocalStore::new(pool.clone()));
    let local_store: Arc<dyn LocalStore> = sqlx_local_store.clone();
    let rule_store: Arc<dyn RuleStore> = Arc::new(SqlxRuleStore::new(pool));

    let bank_client: Arc<dyn BankClient> =
        Arc::new(HttpBankClient::new(config.bank_api_base_url.clone(), token_store));

    let trigger_evaluator: Arc<dyn TriggerEvaluator> =
        Arc::new(DefaultTriggerEvaluator::new(bank_client.clone(), local_store.clone()));

    let executor: Arc<dyn RuleExecutor> = Arc::new(DefaultRuleExecutor::new(
        bank_client.clone(),
        local_store.clone(),
        rule_store.clone(),
        Arc::new(NoopAlertSink),
    ));

    let queue = ExecutionQueue::new(QueueConfig {
        capacity: config.queue_capacity,
        worker_count: config.queue_worker_count,
        ..QueueConfig::default()
    });
    let worker_handles = queue.spawn_workers();

    let integration = Arc::new(AutomationIntegration::new(
        local_store,
        rule_store.clone(),
        trigger_evaluator,
        executor,
        queue.clone(),
    ));

    let sync_engine = Arc::new(SyncEngine::new(
        bank_client,
        sqlx_local_store,
        integration.clone(),
        Arc::new(InMemoryReauthTracker::default()),
        SyncConfig::default(),
    ));

    let schedulers = Schedulers::start(
        sync_engine,
        integration,
        rule_store.as_ref(),
        SchedulerConfig { sync_interval: config.sync_interval(), automation_interval: config.automation_interval() },
    )
    .await?;

    wait_for_shutdown_signal().await;
    info!(target: "automation_core", "shutdown signal received, stopping");

    schedulers.stop();
    queue.stop();
    for handle in worker_handles {
        let _ = handle.await;
    }

    info!(target: "automation_core", "stopped");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
