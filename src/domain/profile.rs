use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::{Cents, Currency};

/// Provenance of a stored monthly amount: accepted from the recurring-stream
/// suggestions, or typed by the user. A flag, not financial state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AmountSource {
    Suggested,
    UserOverridden,
}

/// One per user. Created lazily on first read with zeroed values; never
/// deleted while the owning user exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetProfile {
    pub user_id: Uuid,
    pub currency: Currency,
    pub income_monthly_cents: Cents,
    pub fixed_monthly_cents: Cents,
    pub source_income: AmountSource,
    pub source_fixed: AmountSource,
}

impl BudgetProfile {
    pub fn zeroed(user_id: Uuid) -> Self {
        Self {
            user_id,
            currency: Currency::Usd,
            income_monthly_cents: 0,
            fixed_monthly_cents: 0,
            source_income: AmountSource::UserOverridden,
            source_fixed: AmountSource::UserOverridden,
        }
    }

    /// Income minus fixed obligations. May be negative — an overcommitted
    /// budget propagates as negative allowances rather than clamping.
    pub fn discretionary_cents(&self) -> Cents {
        self.income_monthly_cents - self.fixed_monthly_cents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discretionary_may_go_negative() {
        let mut profile = BudgetProfile::zeroed(Uuid::new_v4());
        profile.income_monthly_cents = 100_000;
        profile.fixed_monthly_cents = 130_000;
        assert_eq!(profile.discretionary_cents(), -30_000);
    }
}
