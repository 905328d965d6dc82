use std::time::Duration;

use rule_model::{AutoTopupTrigger, AutosorterTrigger, Rule, RuleConfig, SweepTrigger};

/// How often a per-rule ticker re-evaluates its rule. Each variant's tick
/// period is the cadence's own natural period, not a finer polling
/// resolution — the trigger evaluator re-checks the exact field match
/// (hour/minute/day) at whatever moment the tick lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerCadence {
    /// `minute` auto-topup triggers: every configured interval.
    Minute(u32),
    /// `hourly` triggers: every 60 minutes.
    Hourly,
    /// `daily` triggers: every 24 hours.
    Daily,
    /// `weekly` triggers: every 7 days.
    Weekly,
    /// `monthly` triggers: every 30 days.
    Monthly,
    /// `balance_threshold` triggers: every 5 minutes.
    BalanceThreshold,
}

impl TickerCadence {
    #[must_use]
    pub fn interval(self) -> Duration {
        match self {
            Self::Minute(n) => Duration::from_secs(u64::from(n.max(1)) * 60),
            Self::Hourly => Duration::from_secs(60 * 60),
            Self::Daily => Duration::from_secs(24 * 60 * 60),
            Self::Weekly => Duration::from_secs(7 * 24 * 60 * 60),
            Self::Monthly => Duration::from_secs(30 * 24 * 60 * 60),
            Self::BalanceThreshold => Duration::from_secs(5 * 60),
        }
    }
}

/// Returns `Some` if this rule's trigger type requires a dedicated ticker
/// (§4.8: `minute`, `hourly`, `daily`, `weekly`, `monthly`,
/// `balance_threshold`), `None` for calendar-aligned triggers handled only
/// by the global automation ticker (`payday_date`, `time_of_day`,
/// `transaction_based`, `date_range`, `automation_trigger`, `manual_only`).
#[must_use]
pub fn ticker_cadence_for(rule: &Rule) -> Option<TickerCadence> {
    match &rule.config {
        RuleConfig::PotSweep { config, .. } => match config.trigger {
            SweepTrigger::Monthly { .. } => Some(TickerCadence::Monthly),
            SweepTrigger::Weekly { .. } => Some(TickerCadence::Weekly),
            SweepTrigger::BalanceThreshold { .. } => Some(TickerCadence::BalanceThreshold),
            SweepTrigger::Manual | SweepTrigger::PaydayDetection { .. } => None,
        },
        RuleConfig::Autosorter { config, .. } => match config.trigger {
            AutosorterTrigger::PaydayDate { .. }
            | AutosorterTrigger::TimeOfDay { .. }
            | AutosorterTrigger::TransactionBased { .. }
            | AutosorterTrigger::DateRange { .. }
            | AutosorterTrigger::ManualOnly
            | AutosorterTrigger::AutomationTrigger => None,
        },
        RuleConfig::AutoTopup { config, .. } => match config.trigger {
            AutoTopupTrigger::Monthly { .. } => Some(TickerCadence::Monthly),
            AutoTopupTrigger::Weekly { .. } => Some(TickerCadence::Weekly),
            AutoTopupTrigger::Daily { .. } => Some(TickerCadence::Daily),
            AutoTopupTrigger::Hourly { .. } => Some(TickerCadence::Hourly),
            AutoTopupTrigger::Minute { interval_minutes } => {
                Some(TickerCadence::Minute(interval_minutes.max(1) as u32))
            }
            AutoTopupTrigger::BalanceThreshold => Some(TickerCadence::BalanceThreshold),
            AutoTopupTrigger::TransactionBased { .. } => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use core_types::{Amount, PotId};
    use rule_model::{current_version, AutoTopupConfig, AutosorterConfig, ExecutionMetadata, SweepConfig};

    use super::*;

    fn rule_with(config: RuleConfig) -> Rule {
        Rule {
            id: core_types::RuleId::from("r"),
            user_id: core_types::UserId::from("u"),
            name: "r".into(),
            enabled: true,
            config,
            created: core_types::Timestamp::default(),
            updated: core_types::Timestamp::default(),
            last_executed: None,
            execution_metadata: ExecutionMetadata::default(),
        }
    }

    #[test]
    fn manual_only_autosorter_has_no_dedicated_ticker() {
        let rule = rule_with(RuleConfig::Autosorter {
            version: current_version(),
            config: AutosorterConfig {
                holding_pot_id: PotId::from("h"),
                bills_pot_id: PotId::from("b"),
                priority_pots: vec![],
                goal_pots: vec![],
                investment_pots: vec![],
                holding_reserve_amount: None,
                holding_reserve_percentage: None,
                min_holding_balance: Amount::ZERO,
                include_goal_pots: true,
                payday_date: None,
                trigger: AutosorterTrigger::ManualOnly,
            },
        });
        assert_eq!(ticker_cadence_for(&rule), None);
    }

    #[test]
    fn minute_auto_topup_uses_its_configured_interval() {
        let rule = rule_with(RuleConfig::AutoTopup {
            version: current_version(),
            config: AutoTopupConfig {
                source_account_id: core_types::AccountId::from("a"),
                target_pot_id: PotId::from("p"),
                amount: Amount::minor_units(1),
                target_balance: None,
                trigger: AutoTopupTrigger::Minute { interval_minutes: 15 },
                min_balance: None,
            },
        });
        assert_eq!(ticker_cadence_for(&rule), Some(TickerCadence::Minute(15)));
        assert_eq!(ticker_cadence_for(&rule).unwrap().interval(), Duration::from_secs(900));
    }

    #[test]
    fn weekly_sweep_ticks_every_seven_days() {
        let rule = rule_with(RuleConfig::PotSweep {
            version: current_version(),
            config: SweepConfig {
                sources: vec![],
                target_pot_name: "x".into(),
                trigger: SweepTrigger::Weekly { trigger_day: 1 },
            },
        });
        assert_eq!(ticker_cadence_for(&rule), Some(TickerCadence::Weekly));
        assert_eq!(ticker_cadence_for(&rule).unwrap().interval(), Duration::from_secs(7 * 24 * 60 * 60));
    }

    #[test]
    fn payday_sweep_has_no_dedicated_ticker() {
        let rule = rule_with(RuleConfig::PotSweep {
            version: current_version(),
            config: SweepConfig {
                sources: vec![],
                target_pot_name: "x".into(),
                trigger: SweepTrigger::PaydayDetection {
                    payday_threshold: Amount::minor_units(50_000),
                    payday_description_pattern: None,
                },
            },
        });
        assert_eq!(ticker_cadence_for(&rule), None);
    }
}
