use execution_queue::PriorityHint;
use rule_model::{AutoTopupTrigger, AutosorterTrigger, Rule, RuleConfig, SweepTrigger};

/// Maps a rule to the default priority hint its family and trigger type
/// fall under (§4.5 "Priority mapping (default)"). `balance_threshold`
/// triggers are CRITICAL regardless of family; everything else falls back
/// to its family's baseline.
#[must_use]
pub fn priority_hint_for(rule: &Rule) -> PriorityHint {
    match &rule.config {
        RuleConfig::PotSweep { config, .. } => match config.trigger {
            SweepTrigger::BalanceThreshold { .. } => PriorityHint::BalanceThreshold,
            SweepTrigger::PaydayDetection { .. } => PriorityHint::PaydayDetection,
            SweepTrigger::Manual | SweepTrigger::Monthly { .. } | SweepTrigger::Weekly { .. } => {
                PriorityHint::Sweep
            }
        },
        RuleConfig::Autosorter { config, .. } => match config.trigger {
            AutosorterTrigger::ManualOnly => PriorityHint::ManualOnly,
            _ => PriorityHint::Autosorter,
        },
        RuleConfig::AutoTopup { config, .. } => match config.trigger {
            AutoTopupTrigger::BalanceThreshold => PriorityHint::BalanceThreshold,
            _ => PriorityHint::AutoTopup,
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
    fn balance_threshold_auto_topup_is_critical_not_low() {
        let rule = rule_with(RuleConfig::AutoTopup {
            version: current_version(),
            config: AutoTopupConfig {
                source_account_id: core_types::AccountId::from("a"),
                target_pot_id: PotId::from("p"),
                amount: Amount::minor_units(1),
                target_balance: None,
                trigger: AutoTopupTrigger::BalanceThreshold,
                min_balance: None,
            },
        });
        assert_eq!(priority_hint_for(&rule), PriorityHint::BalanceThreshold);
    }

    #[test]
    fn manual_only_autosorter_is_background() {
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
        assert_eq!(priority_hint_for(&rule), PriorityHint::ManualOnly);
    }

    #[test]
    fn payday_sweep_is_high_not_normal() {
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
        assert_eq!(priority_hint_for(&rule), PriorityHint::PaydayDetection);
    }
}
