use core_types::{Amount, PotId};
use serde::{Deserialize, Serialize};

/// How a sweep source's transfer amount is computed (§4.3 "Sweep").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepStrategy {
    FixedAmount,
    Percentage,
    RemainingBalance,
    AllAvailable,
}

/// One source a sweep rule draws from, in priority order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSource {
    /// The sentinel `"main account"` refers to the primary account balance.
    pub pot_name: String,
    pub strategy: SweepStrategy,
    #[serde(default)]
    pub amount: Option<Amount>,
    /// Stored as a decimal fraction in `[0, 1]`, normalized on read.
    #[serde(default)]
    pub percentage: Option<f64>,
    #[serde(default)]
    pub min_balance: Option<Amount>,
    pub priority: i32,
}

/// Cadence/condition that causes a sweep rule to fire (§4.3, §4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trigger_type", rename_all = "snake_case")]
pub enum SweepTrigger {
    Manual,
    Monthly { trigger_day: u32 },
    Weekly { trigger_day: u32 },
    PaydayDetection {
        #[serde(default = "default_payday_threshold")]
        payday_threshold: Amount,
        #[serde(default)]
        payday_description_pattern: Option<String>,
    },
    BalanceThreshold { trigger_threshold: Amount },
}

fn default_payday_threshold() -> Amount {
    Amount::minor_units(50_000)
}

/// Config for a `pot_sweep` rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub sources: Vec<SweepSource>,
    pub target_pot_name: String,
    pub trigger: SweepTrigger,
}

/// How one autosorter allocation target receives its share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationType {
    FixedAmount,
    Percentage,
    EqualShare,
}

/// One priority, goal, or investment pot target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationTarget {
    pub pot_id: PotId,
    pub pot_name: String,
    pub allocation_type: AllocationType,
    #[serde(default)]
    pub amount: Option<Amount>,
    /// Stored as a decimal fraction in `[0, 1]`, normalized on read.
    #[serde(default)]
    pub percentage: Option<f64>,
    #[serde(default)]
    pub goal_amount: Option<Amount>,
    #[serde(default)]
    pub max_allocation: Option<Amount>,
    pub priority: i32,
    #[serde(default)]
    pub use_all_remaining: bool,
}

/// Filters gating a `transaction_based` trigger (autosorter or auto-topup).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionFilter {
    #[serde(default)]
    pub description_contains: Option<String>,
    #[serde(default)]
    pub amount_min: Option<Amount>,
    #[serde(default)]
    pub amount_max: Option<Amount>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub merchant: Option<String>,
}

/// Cadence/condition that causes an autosorter rule to fire (§4.3, §4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trigger_type", rename_all = "snake_case")]
pub enum AutosorterTrigger {
    PaydayDate { payday_date: u32 },
    TimeOfDay { day: u32, hour: u32, minute: u32 },
    TransactionBased {
        filter: TransactionFilter,
        #[serde(default = "default_lookback_hours")]
        lookback_hours: i64,
    },
    DateRange { start_day: u32, end_day: u32 },
    ManualOnly,
    /// Never fires directly; queued only as a dependent of other rules
    /// (§4.4 "automation_trigger").
    AutomationTrigger,
}

fn default_lookback_hours() -> i64 {
    24
}

/// Config for an `autosorter` rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutosorterConfig {
    pub holding_pot_id: PotId,
    pub bills_pot_id: PotId,
    #[serde(default)]
    pub priority_pots: Vec<AllocationTarget>,
    #[serde(default)]
    pub goal_pots: Vec<AllocationTarget>,
    #[serde(default)]
    pub investment_pots: Vec<AllocationTarget>,
    #[serde(default)]
    pub holding_reserve_amount: Option<Amount>,
    /// Stored as a decimal fraction in `[0, 1]`, normalized on read.
    #[serde(default)]
    pub holding_reserve_percentage: Option<f64>,
    #[serde(default = "default_min_holding_balance")]
    pub min_holding_balance: Amount,
    #[serde(default = "default_true")]
    pub include_goal_pots: bool,
    /// Day-of-month the bills-replenishment spending window is anchored to
    /// (§4.6.2 "Bills replenishment"), independent of whatever cadence
    /// `trigger` itself fires on. `None` falls back to a rolling 30-day
    /// lookback when no payday date has been configured.
    #[serde(default)]
    pub payday_date: Option<u32>,
    pub trigger: AutosorterTrigger,
}

fn default_min_holding_balance() -> Amount {
    Amount::minor_units(10_000)
}

fn default_true() -> bool {
    true
}

/// Cadence/condition that causes an auto-topup rule to fire (§4.3, §4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trigger_type", rename_all = "snake_case")]
pub enum AutoTopupTrigger {
    Monthly { trigger_day: u32 },
    Weekly { trigger_day: u32 },
    Daily { hour: u32, minute: u32 },
    Hourly { minute: u32 },
    Minute { interval_minutes: i64 },
    BalanceThreshold,
    TransactionBased {
        filter: TransactionFilter,
        #[serde(default = "default_lookback_hours")]
        lookback_hours: i64,
    },
}

/// Config for an `auto_topup` rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoTopupConfig {
    pub source_account_id: core_types::AccountId,
    pub target_pot_id: PotId,
    /// Max amount to transfer per execution.
    pub amount: Amount,
    /// If set, transfer to reach this level instead of the flat `amount`.
    #[serde(default)]
    pub target_balance: Option<Amount>,
    pub trigger: AutoTopupTrigger,
    /// If set and the rule is time-triggered, also gates on the target's
    /// current balance being below this value.
    #[serde(default)]
    pub min_balance: Option<Amount>,
}

/// A rule family's strongly typed config, tagged by family and carrying an
/// explicit schema version (§9 "Dynamic Rule Config").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family")]
pub enum RuleConfig {
    #[serde(rename = "pot_sweep")]
    PotSweep {
        #[serde(default = "current_version")]
        version: u32,
        #[serde(flatten)]
        config: SweepConfig,
    },
    #[serde(rename = "autosorter")]
    Autosorter {
        #[serde(default = "current_version")]
        version: u32,
        #[serde(flatten)]
        config: AutosorterConfig,
    },
    #[serde(rename = "auto_topup")]
    AutoTopup {
        #[serde(default = "current_version")]
        version: u32,
        #[serde(flatten)]
        config: AutoTopupConfig,
    },
}

/// The current config schema version written for new rules. Read-side
/// validation does not reject older versions; it only logs them (§9
/// "Dynamic Rule Config": unknown fields are logged, not rejected, for
/// forward compatibility).
#[must_use]
pub const fn current_version() -> u32 {
    1
}

impl RuleConfig {
    #[must_use]
    pub const fn version(&self) -> u32 {
        match self {
            Self::PotSweep { version, .. }
            | Self::Autosorter { version, .. }
            | Self::AutoTopup { version, .. } => *version,
        }
    }
}
