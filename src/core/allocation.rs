//! Daily allowance allocation. Divides a monthly discretionary total into
//! exact per-day cent amounts with no lost or double-counted cents, and
//! derives today's running numbers from elapsed spend.
//!
//! Division floors toward negative infinity (`div_euclid`), keeping the
//! remainder in `0..days`. Plain `/` truncates toward zero and loses a
//! day's worth of cents whenever a negative total is not divisible by the
//! day count.

use crate::errors::{CoreError, CoreResult};
use crate::money::Cents;

/// Inputs to one budget-state computation. Spend sums cover VARIABLE-impact,
/// non-hidden, non-removed, non-superseded transactions only, bucketed by
/// local calendar day.
#[derive(Debug, Clone, Copy)]
pub struct BudgetInputs {
    pub discretionary_cents: Cents,
    pub days_in_month: u32,
    /// 1-based day of month.
    pub today_index: u32,
    pub spent_before_today_cents: Cents,
    pub spent_today_cents: Cents,
    pub next_month_days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetState {
    pub allowance_today_cents: Cents,
    pub available_start_of_day_cents: Cents,
    pub remaining_today_cents: Cents,
    pub tomorrow_preview_cents: Cents,
}

/// Largest-remainder daily distribution:
///
/// ```text
/// base = discretionary.div_euclid(days)       (floored)
/// remainder = discretionary.rem_euclid(days)  (always 0..days)
/// allowance(d) = base + (d <= remainder ? 1 : 0)
/// ```
///
/// which guarantees the allowances over the whole month sum to the
/// discretionary total exactly.
pub fn calculate_budget_state(params: BudgetInputs) -> CoreResult<BudgetState> {
    if params.days_in_month == 0 || params.next_month_days == 0 {
        return Err(CoreError::Validation(
            "daysInMonth must be at least 1".into(),
        ));
    }
    if params.today_index < 1 || params.today_index > params.days_in_month {
        return Err(CoreError::Validation(format!(
            "todayIndex {} outside month of {} days",
            params.today_index, params.days_in_month
        )));
    }

    let days = i64::from(params.days_in_month);
    let today = i64::from(params.today_index);

    let base = params.discretionary_cents.div_euclid(days);
    let remainder = params.discretionary_cents.rem_euclid(days);

    let allowance_today = allowance_for_day(base, remainder, today);
    let accrued_to_date = base * today + today.min(remainder);

    let available_start_of_day = accrued_to_date - params.spent_before_today_cents;
    let remaining_today = available_start_of_day - params.spent_today_cents;

    // Unspent balance always rolls forward, across month boundaries too.
    let tomorrow_preview = if params.today_index < params.days_in_month {
        allowance_for_day(base, remainder, today + 1) + remaining_today
    } else {
        first_day_allowance(params.discretionary_cents, i64::from(params.next_month_days))
            + remaining_today
    };

    Ok(BudgetState {
        allowance_today_cents: allowance_today,
        available_start_of_day_cents: available_start_of_day,
        remaining_today_cents: remaining_today,
        tomorrow_preview_cents: tomorrow_preview,
    })
}

fn allowance_for_day(base: Cents, remainder: Cents, day_index: i64) -> Cents {
    base + if day_index <= remainder { 1 } else { 0 }
}

fn first_day_allowance(discretionary: Cents, days_in_next_month: i64) -> Cents {
    let base = discretionary.div_euclid(days_in_next_month);
    let remainder = discretionary.rem_euclid(days_in_next_month);
    allowance_for_day(base, remainder, 1)
}
