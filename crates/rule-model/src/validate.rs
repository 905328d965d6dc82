use core_types::RuleId;
use tracing::warn;

use crate::config::RuleConfig;

/// Normalizes a percentage-shaped field in place, dividing legacy values
/// `>1.0` by 100 (§8 "Percentage allocation with `p > 1.0` is normalized to
/// `p / 100` and a warning is logged").
fn normalize(rule_id: &RuleId, field: &str, value: &mut f64) {
    if !value.is_finite() {
        warn!(target: "rule_model", %rule_id, field, "non-finite percentage, clamping to 0");
        *value = 0.0;
        return;
    }
    if *value > 1.0 {
        warn!(target: "rule_model", %rule_id, field, original = *value, "percentage >= 1.0, dividing by 100");
        *value /= 100.0;
    }
}

/// Validates and normalizes a rule's config on read (§9 "Dynamic Rule
/// Config": "validate on read"; §8 "Rule CRUD round-trip ... post
/// validation normalization").
pub fn validate_and_normalize(rule_id: &RuleId, config: &mut RuleConfig) {
    match config {
        RuleConfig::PotSweep { config, .. } => {
            for source in &mut config.sources {
                if let Some(p) = &mut source.percentage {
                    normalize(rule_id, "sources[].percentage", p);
                }
            }
        }
        RuleConfig::Autosorter { config, .. } => {
            if let Some(p) = &mut config.holding_reserve_percentage {
                normalize(rule_id, "holding_reserve_percentage", p);
            }
            for target in config
                .priority_pots
                .iter_mut()
                .chain(config.goal_pots.iter_mut())
                .chain(config.investment_pots.iter_mut())
            {
                if let Some(p) = &mut target.percentage {
                    normalize(rule_id, "allocation.percentage", p);
                }
            }
        }
        RuleConfig::AutoTopup { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use core_types::Amount;

    use super::*;
    use crate::config::{SweepConfig, SweepSource, SweepStrategy, SweepTrigger};

    #[test]
    fn legacy_percentage_above_one_is_divided_by_100() {
        let rule_id = RuleId::from("rule_1");
        let mut config = RuleConfig::PotSweep {
            version: 1,
            config: SweepConfig {
                sources: vec![SweepSource {
                    pot_name: "main account".into(),
                    strategy: SweepStrategy::Percentage,
                    amount: None,
                    percentage: Some(25.0),
                    min_balance: None,
                    priority: 0,
                }],
                target_pot_name: "savings".into(),
                trigger: SweepTrigger::Manual,
            },
        };

        validate_and_normalize(&rule_id, &mut config);

        let RuleConfig::PotSweep { config, .. } = config else { unreachable!() };
        assert_eq!(config.sources[0].percentage, Some(0.25));
    }

    #[test]
    fn non_finite_percentage_clamps_to_zero() {
        let rule_id = RuleId::from("rule_1");
        let mut config = RuleConfig::PotSweep {
            version: 1,
            config: SweepConfig {
                sources: vec![SweepSource {
                    pot_name: "main account".into(),
                    strategy: SweepStrategy::Percentage,
                    amount: Some(Amount::ZERO),
                    percentage: Some(f64::NAN),
                    min_balance: None,
                    priority: 0,
                }],
                target_pot_name: "savings".into(),
                trigger: SweepTrigger::Manual,
            },
        };

        validate_and_normalize(&rule_id, &mut config);

        let RuleConfig::PotSweep { config, .. } = config else { unreachable!() };
        assert_eq!(config.sources[0].percentage, Some(0.0));
    }
}
