use core_types::{RuleId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

use crate::{config::RuleConfig, execution::ExecutionMetadata};

/// Which of the three concrete rule families a [`Rule`] belongs to (§3
/// "Rule"). Kept alongside `config`'s own tag for cheap filtering without
/// deserializing the config blob (§9 "Trigger Type Enumeration": "one
/// closed enum per rule family").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleFamily {
    PotSweep,
    Autosorter,
    AutoTopup,
}

impl RuleFamily {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PotSweep => "pot_sweep",
            Self::Autosorter => "autosorter",
            Self::AutoTopup => "auto_topup",
        }
    }

    #[must_use]
    pub const fn of(config: &RuleConfig) -> Self {
        match config {
            RuleConfig::PotSweep { .. } => Self::PotSweep,
            RuleConfig::Autosorter { .. } => Self::Autosorter,
            RuleConfig::AutoTopup { .. } => Self::AutoTopup,
        }
    }
}

impl std::str::FromStr for RuleFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pot_sweep" => Ok(Self::PotSweep),
            "autosorter" => Ok(Self::Autosorter),
            "auto_topup" => Ok(Self::AutoTopup),
            other => Err(format!("unknown rule family {other:?}")),
        }
    }
}

/// A persisted automation rule (§3 "Rule").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub user_id: UserId,
    pub name: String,
    pub enabled: bool,
    pub config: RuleConfig,
    pub created: Timestamp,
    pub updated: Timestamp,
    pub last_executed: Option<Timestamp>,
    pub execution_metadata: ExecutionMetadata,
}

impl Rule {
    #[must_use]
    pub const fn family(&self) -> RuleFamily {
        RuleFamily::of(&self.config)
    }

    /// A disabled rule is never selected for execution but remains
    /// queryable (§3 invariant).
    #[must_use]
    pub const fn is_eligible(&self) -> bool {
        self.enabled
    }
}
