use std::sync::Arc;

use async_trait::async_trait;
use bank_client::BankClient;
use chrono::{Datelike, Duration, Timelike};
use core_types::{Amount, Timestamp};
use local_store::LocalStore;
use rule_model::{
    AutoTopupTrigger, AutosorterTrigger, Rule, RuleConfig, SweepTrigger, TransactionFilter,
};
use tracing::debug;

use crate::{
    balance::{live_account_balance, live_pot_balance},
    context::{Decision, TriggerContext},
    error::TriggerEvalError,
};

/// 7 days: a payday sweep that already fired this week does not fire again
/// even if another large deposit lands (§4.4 "payday_detection").
const PAYDAY_COOLDOWN: Duration = Duration::days(7);

/// How far back `payday_detection` looks for a qualifying deposit.
const PAYDAY_LOOKBACK: Duration = Duration::days(3);

/// `time_of_day` fires within this window either side of the configured
/// minute, so a scheduler tick that lands a few minutes late still counts
/// (§4.4 "time_of_day").
const TIME_OF_DAY_WINDOW: Duration = Duration::minutes(60);

/// Whether `last_executed` falls inside `cooldown` of `now`. Mirrors
/// `execution_queue::is_duplicate_execution`'s semantics for the one
/// trigger (`payday_detection`) that needs to consult a rule's own
/// execution history before deciding to fire.
fn is_duplicate_execution(last_executed: Option<Timestamp>, now: Timestamp, cooldown: Duration) -> bool {
    match last_executed {
        Some(last) => now - last < cooldown,
        None => false,
    }
}

/// Decides whether a rule's trigger condition holds right now (§4.4).
#[async_trait]
pub trait TriggerEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        rule: &Rule,
        ctx: &TriggerContext,
    ) -> Result<Decision, TriggerEvalError>;
}

/// The production [`TriggerEvaluator`], reading live state through a
/// [`BankClient`] (with stale-cache fallback) and a [`LocalStore`].
pub struct DefaultTriggerEvaluator {
    bank_client: Arc<dyn BankClient>,
    local_store: Arc<dyn LocalStore>,
}

impl DefaultTriggerEvaluator {
    #[must_use]
    pub fn new(bank_client: Arc<dyn BankClient>, local_store: Arc<dyn LocalStore>) -> Self {
        Self { bank_client, local_store }
    }

    async fn eval_sweep(
        &self,
        rule: &Rule,
        trigger: &SweepTrigger,
        ctx: &TriggerContext,
    ) -> Result<Decision, TriggerEvalError> {
        match trigger {
            SweepTrigger::Manual => Ok(Decision::skip("manual trigger, never fires on its own")),
            SweepTrigger::Monthly { trigger_day } => {
                Ok(day_of_month_decision(ctx.now, *trigger_day, "monthly sweep"))
            }
            SweepTrigger::Weekly { trigger_day } => {
                Ok(weekday_decision(ctx.now, *trigger_day, "weekly sweep"))
            }
            SweepTrigger::PaydayDetection { payday_threshold, payday_description_pattern } => {
                self.eval_payday_detection(
                    rule,
                    ctx,
                    *payday_threshold,
                    payday_description_pattern.as_deref(),
                )
                .await
            }
            SweepTrigger::BalanceThreshold { trigger_threshold } => {
                let balance = live_account_balance(
                    self.bank_client.as_ref(),
                    self.local_store.as_ref(),
                    &ctx.user_id,
                    &ctx.primary_account_id,
                )
                .await?;
                Ok(threshold_decision(balance, *trigger_threshold, "balance threshold sweep"))
            }
        }
    }

    async fn eval_autosorter(
        &self,
        rule: &Rule,
        trigger: &AutosorterTrigger,
        ctx: &TriggerContext,
    ) -> Result<Decision, TriggerEvalError> {
        match trigger {
            AutosorterTrigger::PaydayDate { payday_date } => {
                Ok(day_of_month_decision(ctx.now, *payday_date, "payday-date autosorter"))
            }
            AutosorterTrigger::TimeOfDay { day, hour, minute } => {
                Ok(self.eval_time_of_day(ctx.now, *day, *hour, *minute))
            }
            AutosorterTrigger::TransactionBased { filter, lookback_hours } => {
                self.eval_transaction_based(rule, ctx, filter, *lookback_hours, "autosorter").await
            }
            AutosorterTrigger::DateRange { start_day, end_day } => {
                Ok(date_range_decision(ctx.now, *start_day, *end_day))
            }
            AutosorterTrigger::ManualOnly => {
                Ok(Decision::skip("manual-only autosorter, never fires on its own"))
            }
            AutosorterTrigger::AutomationTrigger => Ok(Decision::skip(
                "automation_trigger rule, only fires as another rule's dependent",
            )),
        }
    }

    async fn eval_auto_topup(
        &self,
        rule: &Rule,
        config: &rule_model::AutoTopupConfig,
        ctx: &TriggerContext,
    ) -> Result<Decision, TriggerEvalError> {
        match &config.trigger {
            AutoTopupTrigger::Monthly { trigger_day } => {
                self.eval_auto_topup_cadence(
                    day_of_month_decision(ctx.now, *trigger_day, "monthly auto-topup"),
                    config,
                )
                .await
            }
            AutoTopupTrigger::Weekly { trigger_day } => {
                self.eval_auto_topup_cadence(
                    weekday_decision(ctx.now, *trigger_day, "weekly auto-topup"),
                    config,
                )
                .await
            }
            AutoTopupTrigger::Daily { hour, minute } => {
                self.eval_auto_topup_cadence(
                    time_match_decision(ctx.now, *hour, *minute, "daily auto-topup"),
                    config,
                )
                .await
            }
            AutoTopupTrigger::Hourly { minute } => {
                let decision = if ctx.now.minute() == *minute {
                    Decision::fire(format!("hourly auto-topup: minute {minute} matched"))
                } else {
                    Decision::skip(format!(
                        "hourly auto-topup: minute {} does not match configured {minute}",
                        ctx.now.minute()
                    ))
                };
                self.eval_auto_topup_cadence(decision, config).await
            }
            AutoTopupTrigger::Minute { interval_minutes } => {
                let interval = (*interval_minutes).max(1);
                let total_minutes = i64::from(ctx.now.hour()) * 60 + i64::from(ctx.now.minute());
                let decision = if total_minutes % interval == 0 {
                    Decision::fire(format!("minute auto-topup: interval {interval_minutes}m elapsed"))
                } else {
                    Decision::skip(format!(
                        "minute auto-topup: not on a {interval_minutes}m boundary"
                    ))
                };
                self.eval_auto_topup_cadence(decision, config).await
            }
            AutoTopupTrigger::BalanceThreshold => {
                let balance = live_pot_balance(
                    self.bank_client.as_ref(),
                    self.local_store.as_ref(),
                    &ctx.user_id,
                    &ctx.primary_account_id,
                    &config.target_pot_id,
                )
                .await?;
                let threshold = config.min_balance.unwrap_or(Amount::ZERO);
                Ok(threshold_decision(balance, threshold, "balance threshold auto-topup"))
            }
            AutoTopupTrigger::TransactionBased { filter, lookback_hours } => {
                self.eval_transaction_based(rule, ctx, filter, *lookback_hours, "auto-topup").await
            }
        }
    }

    /// A time-cadence auto-topup trigger additionally gates on the target
    /// pot's balance being below `min_balance`, when configured (§4.4
    /// "auto_topup" trigger types, min_balance gate).
    async fn eval_auto_topup_cadence(
        &self,
        cadence: Decision,
        config: &rule_model::AutoTopupConfig,
    ) -> Result<Decision, TriggerEvalError> {
        if !cadence.should_fire {
            return Ok(cadence);
        }
        let Some(min_balance) = config.min_balance else {
            return Ok(cadence);
        };
        let pot = self.local_store.get_pot(&config.target_pot_id).await?;
        let current = pot.map(|p| p.balance).unwrap_or(Amount::ZERO);
        if current < min_balance {
            Ok(cadence)
        } else {
            Ok(Decision::skip(format!(
                "{}; suppressed, target pot balance already at or above min_balance",
                cadence.reason
            )))
        }
    }

    async fn eval_payday_detection(
        &self,
        rule: &Rule,
        ctx: &TriggerContext,
        threshold: Amount,
        description_pattern: Option<&str>,
    ) -> Result<Decision, TriggerEvalError> {
        if is_duplicate_execution(rule.last_executed, ctx.now, PAYDAY_COOLDOWN) {
            return Ok(Decision::skip(
                "payday_detection: rule already executed within the 7-day cooldown",
            ));
        }

        let since = ctx.now - PAYDAY_LOOKBACK;
        let recent = self
            .local_store
            .list_transactions_since(&ctx.primary_account_id, since, ctx.now)
            .await?;

        let qualifies = recent.iter().any(|t| {
            t.amount >= threshold
                && description_pattern
                    .map(|pat| t.description.to_lowercase().contains(&pat.to_lowercase()))
                    .unwrap_or(true)
        });

        if qualifies {
            Ok(Decision::fire("payday_detection: qualifying deposit found in lookback window"))
        } else {
            Ok(Decision::skip("payday_detection: no qualifying deposit in lookback window"))
        }
    }

    fn eval_time_of_day(&self, now: Timestamp, day: u32, hour: u32, minute: u32) -> Decision {
        if now.day() != day {
            return Decision::skip(format!(
                "time_of_day: day {} does not match configured day {day}",
                now.day()
            ));
        }
        let configured_minutes = i64::from(hour) * 60 + i64::from(minute);
        let now_minutes = i64::from(now.hour()) * 60 + i64::from(now.minute());
        if (now_minutes - configured_minutes).abs() <= TIME_OF_DAY_WINDOW.num_minutes() {
            Decision::fire(format!("time_of_day: within window of configured {hour:02}:{minute:02}"))
        } else {
            Decision::skip(format!("time_of_day: outside window of configured {hour:02}:{minute:02}"))
        }
    }

    async fn eval_transaction_based(
        &self,
        rule: &Rule,
        ctx: &TriggerContext,
        filter: &TransactionFilter,
        lookback_hours: i64,
        label: &str,
    ) -> Result<Decision, TriggerEvalError> {
        let since = ctx.now - Duration::hours(lookback_hours.max(0));
        let candidates = self
            .local_store
            .list_transactions_since(&ctx.primary_account_id, since, ctx.now)
            .await?;

        let matched = candidates.iter().any(|t| matches_filter(t, filter));
        debug!(
            target: "trigger_eval", rule_id = %rule.id, %label,
            candidate_count = candidates.len(), matched,
            "evaluated transaction_based trigger"
        );

        if matched {
            Ok(Decision::fire(format!("{label}: matching transaction found in lookback window")))
        } else {
            Ok(Decision::skip(format!("{label}: no matching transaction in lookback window")))
        }
    }
}

#[async_trait]
impl TriggerEvaluator for DefaultTriggerEvaluator {
    async fn evaluate(
        &self,
        rule: &Rule,
        ctx: &TriggerContext,
    ) -> Result<Decision, TriggerEvalError> {
        if !rule.is_eligible() {
            return Ok(Decision::skip("rule is disabled"));
        }
        match &rule.config {
            RuleConfig::PotSweep { config, .. } => self.eval_sweep(rule, &config.trigger, ctx).await,
            RuleConfig::Autosorter { config, .. } => {
                self.eval_autosorter(rule, &config.trigger, ctx).await
            }
            RuleConfig::AutoTopup { config, .. } => self.eval_auto_topup(rule, config, ctx).await,
        }
    }
}

fn day_of_month_decision(now: Timestamp, trigger_day: u32, label: &str) -> Decision {
    let last_day_of_month = last_day_of_month(now);
    let effective_day = trigger_day.min(last_day_of_month);
    if now.day() == effective_day {
        Decision::fire(format!("{label}: day {effective_day} matched"))
    } else {
        Decision::skip(format!(
            "{label}: day {} does not match configured day {effective_day}",
            now.day()
        ))
    }
}

/// Clamps a configured trigger day to the last real day of the current
/// month, so e.g. a `trigger_day: 30` config still fires in February.
fn last_day_of_month(now: Timestamp) -> u32 {
    let (year, month) = (now.year(), now.month());
    let next_month_first = if month == 12 {
        chrono::NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        chrono::NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next_month_first
        .and_then(|d| d.pred_opt())
        .map_or(28, |d| d.day())
}

fn weekday_decision(now: Timestamp, trigger_day: u32, label: &str) -> Decision {
    let today = now.weekday().num_days_from_monday();
    if today == trigger_day {
        Decision::fire(format!("{label}: weekday {trigger_day} matched"))
    } else {
        Decision::skip(format!("{label}: weekday {today} does not match configured {trigger_day}"))
    }
}

fn time_match_decision(now: Timestamp, hour: u32, minute: u32, label: &str) -> Decision {
    if now.hour() == hour && now.minute() == minute {
        Decision::fire(format!("{label}: time {hour:02}:{minute:02} matched"))
    } else {
        Decision::skip(format!("{label}: time does not match configured {hour:02}:{minute:02}"))
    }
}

fn threshold_decision(balance: Amount, threshold: Amount, label: &str) -> Decision {
    if balance >= threshold {
        Decision::fire(format!("{label}: balance {balance} at or above threshold {threshold}"))
    } else {
        Decision::skip(format!("{label}: balance {balance} below threshold {threshold}"))
    }
}

/// `end_day < start_day` wraps across the month boundary (e.g. 28→5).
fn date_range_decision(now: Timestamp, start_day: u32, end_day: u32) -> Decision {
    let today = now.day();
    let in_range = if start_day <= end_day {
        today >= start_day && today <= end_day
    } else {
        today >= start_day || today <= end_day
    };
    if in_range {
        Decision::fire(format!("date_range: day {today} within [{start_day}, {end_day}]"))
    } else {
        Decision::skip(format!("date_range: day {today} outside [{start_day}, {end_day}]"))
    }
}

fn matches_filter(txn: &local_store::Transaction, filter: &TransactionFilter) -> bool {
    if let Some(needle) = &filter.description_contains {
        if !txn.description.to_lowercase().contains(&needle.to_lowercase()) {
            return false;
        }
    }
    if let Some(min) = filter.amount_min {
        if txn.amount < min {
            return false;
        }
    }
    if let Some(max) = filter.amount_max {
        if txn.amount > max {
            return false;
        }
    }
    if let Some(category) = &filter.category {
        if txn.category.as_deref() != Some(category.as_str()) {
            return false;
        }
    }
    if let Some(merchant) = &filter.merchant {
        if txn.merchant.as_deref() != Some(merchant.as_str()) {
            return false;
        }
    }
    true
}

/// Computes the transfer amount for a target-balance auto-topup:
/// `min(targetBalance - currentBalance, configuredMaxAmount)`, clamped to
/// `[0, available]` (§4.4 "auto_topup" target-balance mode).
#[must_use]
pub fn target_balance_transfer_amount(
    target_balance: Amount,
    current_balance: Amount,
    configured_max: Amount,
    available: Amount,
) -> Amount {
    let shortfall = target_balance.saturating_sub(current_balance);
    shortfall.min(configured_max).min(available)
}
