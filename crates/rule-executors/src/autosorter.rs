use bank_client::{deposit_leg, module_transfer_id, withdraw_leg, BankClient, BankPot};
use chrono::{Datelike, Timelike};
use core_types::{Amount, CoreError, PotId, Timestamp};
use local_store::LocalStore;
use rule_model::{AllocationTarget, AllocationType, AutosorterConfig};
use tracing::warn;

use crate::context::ExecutionContext;

/// One allocation made during an autosorter run.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationResult {
    pub pot_id: PotId,
    pub pot_name: String,
    pub amount_moved: Amount,
}

/// The aggregate outcome of one autosorter rule's run (§4.6.2).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AutosorterResult {
    pub success: bool,
    pub reason: Option<String>,
    pub bills_replenishment: Option<AllocationResult>,
    pub priority_allocations: Vec<AllocationResult>,
    pub goal_allocations: Vec<AllocationResult>,
    pub investment_allocations: Vec<AllocationResult>,
    pub total_moved: Amount,
}

/// Equal-share goal pots are capped at this fraction of the remaining
/// holding-available on every allocation (§4.6.2 "Goal pots").
const GOAL_POT_CAP_FRACTION: f64 = 0.20;

pub async fn execute_autosorter(
    bank_client: &dyn BankClient,
    local_store: &dyn LocalStore,
    rule_id: &core_types::RuleId,
    config: &AutosorterConfig,
    ctx: &ExecutionContext,
) -> Result<AutosorterResult, CoreError> {
    let live_pots = bank_client.get_pots(&ctx.user_id, &ctx.account_id).await?;
    let holding_balance = find_pot(&live_pots, &config.holding_pot_id)
        .map(|p| p.balance)
        .ok_or_else(|| CoreError::ConfigInvalid("holding pot not found".into()))?;

    let reserve = compute_reserve(config, holding_balance);
    let mut available = holding_balance.saturating_sub(reserve);

    let mut result = AutosorterResult { success: true, total_moved: Amount::ZERO, ..AutosorterResult::default() };

    if !available.is_positive() {
        result.success = false;
        result.reason = Some("no funds available for distribution".into());
        return Ok(result);
    }

    let mut already_allocated: Vec<PotId> = Vec::new();

    // 1. Bills replenishment.
    if let Some(allocation) = bills_replenishment(
        bank_client, local_store, rule_id, config, &live_pots, ctx, available,
    )
    .await?
    {
        available = available.saturating_sub(allocation.amount_moved);
        result.total_moved = result.total_moved + allocation.amount_moved;
        already_allocated.push(config.bills_pot_id.clone());
        result.bills_replenishment = Some(allocation);
    }

    // 2. Priority pots.
    for target in &config.priority_pots {
        let Some(live_pot) = find_pot(&live_pots, &target.pot_id) else { continue };
        let requested = allocation_amount(target, available, config.priority_pots.len());
        let goal_space = goal_space_remaining(target, live_pot);
        let amount = requested.min(goal_space).min(available);
        if !amount.is_positive() {
            continue;
        }
        transfer_from_holding(bank_client, rule_id, config, &target.pot_id, amount, ctx).await?;
        available = available.saturating_sub(amount);
        result.total_moved = result.total_moved + amount;
        already_allocated.push(target.pot_id.clone());
        result.priority_allocations.push(AllocationResult {
            pot_id: target.pot_id.clone(),
            pot_name: target.pot_name.clone(),
            amount_moved: amount,
        });
    }

    // 3. Goal pots.
    if config.include_goal_pots {
        already_allocated.extend(config.investment_pots.iter().map(|t| t.pot_id.clone()));
        let eligible: Vec<&BankPot> = live_pots
            .iter()
            .filter(|p| {
                p.goal_amount.map(Amount::is_positive).unwrap_or(false)
                    && !already_allocated.contains(&p.id)
                    && p.id != config.holding_pot_id
                    && p.id != config.bills_pot_id
            })
            .collect();

        let mut remaining_count = eligible.len();
        for pot in eligible {
            if remaining_count == 0 || !available.is_positive() {
                break;
            }
            let share = Amount::minor_units(available.as_minor_units() / remaining_count as i64);
            let cap_twenty_percent = available.floor_mul_fraction(GOAL_POT_CAP_FRACTION);
            let goal = pot.goal_amount.unwrap_or(Amount::ZERO);
            let goal_remaining = goal.saturating_sub(pot.balance);
            let amount = share.min(cap_twenty_percent).min(goal_remaining).min(available);

            remaining_count -= 1;
            if !amount.is_positive() {
                continue;
            }

            transfer_from_holding(bank_client, rule_id, config, &pot.id, amount, ctx).await?;
            available = available.saturating_sub(amount);
            result.total_moved = result.total_moved + amount;
            result.goal_allocations.push(AllocationResult {
                pot_id: pot.id.clone(),
                pot_name: pot.name.clone(),
                amount_moved: amount,
            });
        }
    }

    // 4. Investment pots: two-pass allocation.
    if !config.investment_pots.is_empty() && available.is_positive() {
        let allocations = allocate_investment_pots(&config.investment_pots, &live_pots, available);
        for (target, amount) in allocations {
            if !amount.is_positive() {
                continue;
            }
            transfer_from_holding(bank_client, rule_id, config, &target.pot_id, amount, ctx).await?;
            available = available.saturating_sub(amount);
            result.total_moved = result.total_moved + amount;
            result.investment_allocations.push(AllocationResult {
                pot_id: target.pot_id.clone(),
                pot_name: target.pot_name.clone(),
                amount_moved: amount,
            });
        }
    }

    Ok(result)
}

fn find_pot<'a>(pots: &'a [BankPot], pot_id: &PotId) -> Option<&'a BankPot> {
    pots.iter().find(|p| &p.id == pot_id)
}

fn compute_reserve(config: &AutosorterConfig, holding_balance: Amount) -> Amount {
    if let Some(percentage) = config.holding_reserve_percentage {
        if !percentage.is_finite() {
            warn!(target: "rule_executors", "holding_reserve_percentage is non-finite, treating as 0");
            return Amount::ZERO;
        }
        return holding_balance.floor_mul_fraction(percentage);
    }
    config.holding_reserve_amount.unwrap_or(Amount::ZERO).max(config.min_holding_balance)
}

fn allocation_amount(target: &AllocationTarget, available: Amount, sibling_count: usize) -> Amount {
    let raw = match target.allocation_type {
        AllocationType::FixedAmount => target.amount.unwrap_or(Amount::ZERO),
        AllocationType::Percentage => available.floor_mul_fraction(target.percentage.unwrap_or(0.0)),
        AllocationType::EqualShare => {
            let count = sibling_count.max(1) as i64;
            Amount::minor_units(available.as_minor_units() / count)
        }
    };
    match target.max_allocation {
        Some(max) => raw.min(max),
        None => raw,
    }
}

fn goal_space_remaining(target: &AllocationTarget, live_pot: &BankPot) -> Amount {
    let goal = target.goal_amount.or(live_pot.goal_amount);
    match goal {
        Some(goal) if goal.is_positive() => goal.saturating_sub(live_pot.balance),
        _ => Amount::minor_units(i64::MAX),
    }
}

async fn bills_replenishment(
    bank_client: &dyn BankClient,
    local_store: &dyn LocalStore,
    rule_id: &core_types::RuleId,
    config: &AutosorterConfig,
    live_pots: &[BankPot],
    ctx: &ExecutionContext,
    available: Amount,
) -> Result<Option<AllocationResult>, CoreError> {
    let since = last_payday_date(ctx.now, config.payday_date);
    let spending = local_store.bills_spending_since(&config.bills_pot_id, since).await?;
    let amount = spending.min(available);
    if !amount.is_positive() {
        return Ok(None);
    }

    transfer_from_holding(bank_client, rule_id, config, &config.bills_pot_id, amount, ctx).await?;

    let pot_name =
        find_pot(live_pots, &config.bills_pot_id).map(|p| p.name.clone()).unwrap_or_else(|| "bills".into());
    Ok(Some(AllocationResult { pot_id: config.bills_pot_id.clone(), pot_name, amount_moved: amount }))
}

/// The most recent occurrence of `payday_date` on or before `now`, clamped
/// to the last real day of whichever month it lands in (§9 "Bills-spending
/// cycle boundary"). With no configured payday date, falls back to a
/// rolling 30-day lookback.
fn last_payday_date(now: Timestamp, payday_date: Option<u32>) -> Timestamp {
    let Some(payday_date) = payday_date else {
        return now - chrono::Duration::days(30);
    };

    let this_month_day = payday_date.min(last_day_of_month(now.year(), now.month()));
    if now.day() >= this_month_day {
        return now
            .with_day(this_month_day)
            .unwrap_or(now)
            .with_hour(0)
            .and_then(|t| t.with_minute(0))
            .and_then(|t| t.with_second(0))
            .unwrap_or(now);
    }

    let (prev_year, prev_month) = if now.month() == 1 { (now.year() - 1, 12) } else { (now.year(), now.month() - 1) };
    let prev_day = payday_date.min(last_day_of_month(prev_year, prev_month));
    chrono::NaiveDate::from_ymd_opt(prev_year, prev_month, prev_day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| chrono::DateTime::<chrono::Utc>::from_naive_utc_and_offset(dt, chrono::Utc))
        .unwrap_or(now)
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    let next_month_first = if month == 12 {
        chrono::NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        chrono::NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next_month_first.and_then(|d| d.pred_opt()).map_or(28, |d| d.day())
}

async fn transfer_from_holding(
    bank_client: &dyn BankClient,
    rule_id: &core_types::RuleId,
    config: &AutosorterConfig,
    target_pot_id: &PotId,
    amount: Amount,
    ctx: &ExecutionContext,
) -> Result<(), CoreError> {
    let base = module_transfer_id("autosorter", ctx.now, rule_id.as_str(), target_pot_id.as_str());
    bank_client
        .withdraw_from_pot(&ctx.user_id, &config.holding_pot_id, &ctx.account_id, amount, &withdraw_leg(&base))
        .await?;
    bank_client.deposit_to_pot(&ctx.user_id, target_pot_id, &ctx.account_id, amount, &deposit_leg(&base)).await?;
    Ok(())
}

/// A pot with no goal has effectively unlimited remaining space.
const UNBOUNDED_SPACE: Amount = Amount::minor_units(i64::MAX);

/// Two-pass investment-pot allocation (§4.6.2 "Investment pots").
fn allocate_investment_pots(
    targets: &[AllocationTarget],
    live_pots: &[BankPot],
    available: Amount,
) -> Vec<(AllocationTarget, Amount)> {
    let count = targets.len();

    // Pass 1: initial allocation per target, capped at its goal's
    // remaining space (or unbounded without a goal).
    let mut amounts: Vec<Amount> = Vec::with_capacity(count);
    let mut goal_remaining: Vec<Amount> = Vec::with_capacity(count);
    for target in targets {
        let live_pot = find_pot(live_pots, &target.pot_id);
        let raw = allocation_amount(target, available, count);
        let space = live_pot.map(|p| goal_space_remaining(target, p)).unwrap_or(UNBOUNDED_SPACE);
        amounts.push(raw.min(space));
        goal_remaining.push(space);
    }

    let allocated_total: Amount = amounts.iter().copied().sum();
    let mut unused = available.saturating_sub(allocated_total);

    // Pass 2: redistribute unused funds, proportionally across
    // goal-bounded pots up to their remaining space, with any leftover
    // dumped into the highest-priority goal-less pot.
    if unused.is_positive() {
        let has_goal = |index: usize| goal_remaining[index].as_minor_units() < UNBOUNDED_SPACE.as_minor_units();
        let space_at = |index: usize| goal_remaining[index].saturating_sub(amounts[index]);

        let goal_bounded_space: Amount =
            (0..count).filter(|&i| has_goal(i)).map(space_at).sum();

        if goal_bounded_space.is_positive() {
            for index in 0..count {
                if !has_goal(index) {
                    continue;
                }
                let space = space_at(index);
                if !space.is_positive() {
                    continue;
                }
                let share = Amount::minor_units(
                    (i128::from(unused.as_minor_units()) * i128::from(space.as_minor_units())
                        / i128::from(goal_bounded_space.as_minor_units())) as i64,
                )
                .min(space);
                amounts[index] = amounts[index] + share;
                unused = unused.saturating_sub(share);
            }
        }

        if unused.is_positive() {
            let highest_priority_goal_less = (0..count)
                .filter(|&i| !has_goal(i))
                .min_by_key(|&i| targets[i].priority);
            if let Some(index) = highest_priority_goal_less {
                amounts[index] = amounts[index] + unused;
            }
        }
    }

    targets.iter().cloned().zip(amounts).collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn last_payday_date_clamps_to_last_day_of_february() {
        let now = chrono::Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        let last = last_payday_date(now, Some(31));
        assert_eq!(last.month(), 2);
        assert_eq!(last.day(), 28);
    }

    #[test]
    fn last_payday_date_uses_this_month_when_day_has_passed() {
        let now = chrono::Utc.with_ymd_and_hms(2026, 6, 20, 12, 0, 0).unwrap();
        let last = last_payday_date(now, Some(15));
        assert_eq!(last.month(), 6);
        assert_eq!(last.day(), 15);
    }

    #[test]
    fn no_payday_date_falls_back_to_rolling_30_days() {
        let now = chrono::Utc.with_ymd_and_hms(2026, 6, 20, 12, 0, 0).unwrap();
        let last = last_payday_date(now, None);
        assert_eq!((now - last).num_days(), 30);
    }
}
