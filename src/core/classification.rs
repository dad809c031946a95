//! Default budget-impact classification. A pure policy: no store access, no
//! side effects. Runs on first ingestion of a feed transaction and again
//! when a user clears a manual override on one.

use crate::domain::BudgetImpact;
use crate::money::Cents;

/// The semantic attributes classification looks at. Feed-sourced
/// transactions carry full category data; manual entries carry none and are
/// classified by sign alone.
#[derive(Debug, Clone, Default)]
pub struct TransactionAttributes<'a> {
    pub category_primary: Option<&'a str>,
    pub transaction_code: Option<&'a str>,
    pub category_labels: &'a [String],
}

/// A transaction is transfer-like when the primary category is a transfer
/// tag, the transaction code says "transfer", or any category label
/// mentions a transfer.
pub fn is_transfer_like(attrs: &TransactionAttributes<'_>) -> bool {
    if let Some(primary) = attrs.category_primary {
        let upper = primary.to_uppercase();
        if upper == "TRANSFER_IN" || upper == "TRANSFER_OUT" {
            return true;
        }
    }

    if attrs
        .transaction_code
        .is_some_and(|code| code.eq_ignore_ascii_case("transfer"))
    {
        return true;
    }

    attrs
        .category_labels
        .iter()
        .any(|label| label.to_lowercase().contains("transfer"))
}

/// Decides the default budget impact: transfers are permanently excluded,
/// money in is income, everything else counts against the daily allowance.
pub fn default_budget_impact(attrs: &TransactionAttributes<'_>, amount_cents: Cents) -> BudgetImpact {
    if is_transfer_like(attrs) {
        return BudgetImpact::TransferExcluded;
    }

    if amount_cents < 0 {
        return BudgetImpact::IncomeExcluded;
    }

    BudgetImpact::Variable
}

/// Sign-only fallback for manual entries, which carry no category data.
pub fn classify_by_sign(amount_cents: Cents) -> BudgetImpact {
    if amount_cents < 0 {
        BudgetImpact::IncomeExcluded
    } else {
        BudgetImpact::Variable
    }
}
