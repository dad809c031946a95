//! Budget profile operations and the summary orchestrator that composes the
//! clock, the profile, and the ledger into the externally exposed "how much
//! is left today" object.

use serde::Serialize;
use uuid::Uuid;

use crate::clock::{local_date_of, month_bounds, resolve_zone_or, Clock};
use crate::config::Config;
use crate::core::allocation::{calculate_budget_state, BudgetInputs};
use crate::domain::{AmountSource, BudgetProfile};
use crate::errors::{CoreError, CoreResult};
use crate::money::{Cents, Currency};
use crate::storage::StorageBackend;

#[derive(Debug, Clone, Copy)]
pub struct ProfileParams {
    pub income_monthly_cents: Cents,
    pub fixed_monthly_cents: Cents,
    pub source_income: AmountSource,
    pub source_fixed: AmountSource,
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetSummary {
    pub date: String,
    pub timezone: String,
    pub currency: Currency,
    pub income_monthly_cents: Cents,
    pub fixed_monthly_cents: Cents,
    pub discretionary_monthly_cents: Cents,
    pub days_in_month: u32,
    pub allowance_today_cents: Cents,
    pub available_start_of_day_cents: Cents,
    pub spent_today_cents: Cents,
    pub remaining_today_cents: Cents,
    pub tomorrow_preview_cents: Cents,
}

pub struct BudgetService;

impl BudgetService {
    /// Returns the user's profile, creating a zeroed one on first read.
    /// Missing profiles are not an error; missing users are (checked by
    /// [`BudgetService::compute_summary`]).
    pub fn get_or_create_profile(
        store: &dyn StorageBackend,
        user_id: Uuid,
    ) -> CoreResult<BudgetProfile> {
        if let Some(existing) = store.profile(user_id)? {
            return Ok(existing);
        }

        let profile = BudgetProfile::zeroed(user_id);
        store.upsert_profile(profile.clone())?;
        Ok(profile)
    }

    pub fn set_profile(
        store: &dyn StorageBackend,
        user_id: Uuid,
        params: ProfileParams,
    ) -> CoreResult<BudgetProfile> {
        let profile = BudgetProfile {
            user_id,
            currency: Currency::Usd,
            income_monthly_cents: params.income_monthly_cents,
            fixed_monthly_cents: params.fixed_monthly_cents,
            source_income: params.source_income,
            source_fixed: params.source_fixed,
        };
        store.upsert_profile(profile.clone())?;
        Ok(profile)
    }

    /// Composes the full daily summary for a user: resolves the local
    /// calendar day, buckets this month's variable spend into before/today,
    /// and runs the allocation engine.
    pub fn compute_summary(
        store: &dyn StorageBackend,
        clock: &dyn Clock,
        config: &Config,
        user_id: Uuid,
    ) -> CoreResult<BudgetSummary> {
        let user = store
            .user(user_id)?
            .ok_or_else(|| CoreError::NotFound("User not found".into()))?;

        let zone = resolve_zone_or(user.timezone.as_deref(), &config.default_timezone);
        let day = clock.today(zone);

        let profile = Self::get_or_create_profile(store, user_id)?;
        let discretionary = profile.discretionary_cents();

        let (month_start, month_end) = month_bounds(&day);

        let mut spent_before_today: Cents = 0;
        let mut spent_today: Cents = 0;

        for tx in store.transactions_for_user(user_id)? {
            if !tx.counts_toward_budget() {
                continue;
            }
            if tx.effective_date < month_start || tx.effective_date > month_end {
                continue;
            }

            // Bucketing compares local calendar dates, never instant
            // offsets, so a DST shift cannot move a transaction across the
            // today boundary.
            let tx_day = local_date_of(tx.effective_date, zone);
            if tx_day < day.date {
                spent_before_today += tx.amount_cents;
            } else if tx_day == day.date {
                spent_today += tx.amount_cents;
            }
        }

        let state = calculate_budget_state(BudgetInputs {
            discretionary_cents: discretionary,
            days_in_month: day.days_in_month,
            today_index: day.day_index,
            spent_before_today_cents: spent_before_today,
            spent_today_cents: spent_today,
            next_month_days: day.next_month_days,
        })?;

        Ok(BudgetSummary {
            date: day.iso_date(),
            timezone: zone.name().to_string(),
            currency: Currency::Usd,
            income_monthly_cents: profile.income_monthly_cents,
            fixed_monthly_cents: profile.fixed_monthly_cents,
            discretionary_monthly_cents: discretionary,
            days_in_month: day.days_in_month,
            allowance_today_cents: state.allowance_today_cents,
            available_start_of_day_cents: state.available_start_of_day_cents,
            spent_today_cents: spent_today,
            remaining_today_cents: state.remaining_today_cents,
            tomorrow_preview_cents: state.tomorrow_preview_cents,
        })
    }
}
