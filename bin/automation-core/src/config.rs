use std::time::Duration;

/// Process configuration, loaded from the environment (and CLI flags of the
/// same name) at startup. Grounded on `reth-config`'s plain-struct
/// layering, with `clap`'s `env` attribute standing in for its TOML+env
/// merge since no secret here has a sensible file-based default.
///
/// Never logged in full — [`Config::bank_api_base_url`] and
/// [`Config::database_url`] may carry credentials in their query string or
/// path, so only derived, non-secret fields are traced at startup.
#[derive(clap::Parser, Debug, Clone)]
#[command(name = "automation-core", about = "Personal-finance automation engine")]
pub struct Config {
    /// `sqlx` connection string for the local store, token store, and rule
    /// store (a single shared pool; see `local-store`'s "Concurrency
    /// model").
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Base URL of the bank's REST API.
    #[arg(long, env = "BANK_API_BASE_URL")]
    pub bank_api_base_url: String,

    /// Global sync ticker period, in seconds (§4.8 default: 10 minutes).
    #[arg(long, env = "SYNC_INTERVAL_SECS", default_value_t = 600)]
    pub sync_interval_secs: u64,

    /// Global automation ticker period, in seconds (§4.8 default: 5
    /// minutes).
    #[arg(long, env = "AUTOMATION_INTERVAL_SECS", default_value_t = 300)]
    pub automation_interval_secs: u64,

    /// Execution queue worker pool size (§4.5 "Workers").
    #[arg(long, env = "QUEUE_WORKER_COUNT", default_value_t = 3)]
    pub queue_worker_count: usize,

    /// Execution queue capacity before new enqueues are dropped (§4.5
    /// "Capacity").
    #[arg(long, env = "QUEUE_CAPACITY", default_value_t = 100)]
    pub queue_capacity: usize,

    /// Maximum number of open connections in the shared `sqlx` pool.
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 5)]
    pub database_max_connections: u32,
}

impl Config {
    #[must_use]
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    #[must_use]
    pub fn automation_interval(&self) -> Duration {
        Duration::from_secs(self.automation_interval_secs)
    }
}
