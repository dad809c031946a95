//! User-facing transaction operations: manual entry, classification
//! override editing, soft deletion, and month listing. "Delete" never
//! removes a record — it hides and excludes it.

use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use crate::clock::{date_only_to_utc_noon, days_in_month, utc_noon};
use crate::core::classification::{classify_by_sign, default_budget_impact, TransactionAttributes};
use crate::domain::{BudgetImpact, Displayable, HiddenReason, Transaction, TransactionSource};
use crate::errors::{CoreError, CoreResult};
use crate::money::{usd_or_reject, Cents};
use crate::storage::StorageBackend;

#[derive(Debug, Clone)]
pub struct ManualTransactionParams {
    pub name: String,
    pub amount_cents: Cents,
    pub currency: String,
    /// `YYYY-MM-DD` in the user's local calendar.
    pub effective_date: String,
}

/// Partial update. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct TransactionPatch {
    pub budget_impact: Option<BudgetImpact>,
    pub is_hidden: Option<bool>,
    pub user_note: Option<String>,
    /// Explicitly set to `false` to clear an override and return the
    /// transaction to automatic classification.
    pub user_override_impact: Option<bool>,
}

pub struct TransactionService;

impl TransactionService {
    /// Records a manual ledger entry. Manual entries carry no category data
    /// and are classified by amount sign alone; they are never pending.
    pub fn create_manual(
        store: &dyn StorageBackend,
        user_id: Uuid,
        params: ManualTransactionParams,
    ) -> CoreResult<Uuid> {
        let currency = usd_or_reject(&params.currency)?;
        if params.name.is_empty() {
            return Err(CoreError::Validation("name must not be empty".into()));
        }
        let effective_date = date_only_to_utc_noon(&params.effective_date)?;

        let id = Uuid::new_v4();
        store.insert_transaction(Transaction {
            id,
            user_id,
            source: TransactionSource::Manual,
            item_id: None,
            account_id: None,
            feed_transaction_id: None,
            pending_feed_transaction_id: None,
            date: effective_date,
            authorized_date: None,
            effective_date,
            amount_cents: params.amount_cents,
            currency,
            pending: false,
            is_superseded: false,
            is_removed_by_feed: false,
            budget_impact: classify_by_sign(params.amount_cents),
            user_override_impact: false,
            is_hidden: false,
            hidden_reason: None,
            name: params.name,
            merchant_name: None,
            category_primary: None,
            category_detailed: None,
            user_note: None,
        })?;

        Ok(id)
    }

    /// Applies a user edit. Any change to impact, visibility, or note marks
    /// the record overridden; clearing the override re-runs automatic
    /// classification and restores default visibility. Transfers can never
    /// be edited back into a budget-impacting category.
    pub fn patch(
        store: &dyn StorageBackend,
        user_id: Uuid,
        transaction_id: Uuid,
        patch: TransactionPatch,
    ) -> CoreResult<()> {
        let tx = store
            .transaction(transaction_id)?
            .filter(|tx| tx.user_id == user_id)
            .ok_or_else(|| CoreError::NotFound("Transaction not found".into()))?;

        if tx.budget_impact == BudgetImpact::TransferExcluded
            && patch
                .budget_impact
                .is_some_and(|impact| impact != BudgetImpact::TransferExcluded)
        {
            return Err(CoreError::Validation(
                "Transfers must remain excluded".into(),
            ));
        }

        let is_user_change = patch.budget_impact.is_some()
            || patch.is_hidden.is_some()
            || patch.user_note.is_some();

        let user_override_impact = patch.user_override_impact.unwrap_or(if is_user_change {
            true
        } else {
            tx.user_override_impact
        });

        let mut budget_impact = patch.budget_impact.unwrap_or(tx.budget_impact);
        let mut is_hidden = patch.is_hidden.unwrap_or(tx.is_hidden);
        let mut hidden_reason = if is_hidden { Some(HiddenReason::User) } else { None };

        if !user_override_impact {
            budget_impact = match tx.source {
                TransactionSource::Feed => {
                    // Feed records re-run the full rule against stored
                    // category data; manual records fall back to sign only.
                    let labels: Vec<String> =
                        tx.category_primary.iter().cloned().collect();
                    let attrs = TransactionAttributes {
                        category_primary: tx.category_primary.as_deref(),
                        transaction_code: None,
                        category_labels: &labels,
                    };
                    default_budget_impact(&attrs, tx.amount_cents)
                }
                TransactionSource::Manual => classify_by_sign(tx.amount_cents),
            };
            is_hidden = false;
            hidden_reason = None;
        }

        let note = patch.user_note.clone().or_else(|| tx.user_note.clone());

        store.update_transaction(tx.id, &mut |record| {
            record.budget_impact = budget_impact;
            record.user_override_impact = user_override_impact;
            record.is_hidden = is_hidden;
            record.hidden_reason = hidden_reason;
            record.user_note = note.clone();
        })
    }

    /// Soft delete: hide, exclude, and mark overridden so re-sync cannot
    /// resurrect the record into the budget.
    pub fn delete(
        store: &dyn StorageBackend,
        user_id: Uuid,
        transaction_id: Uuid,
    ) -> CoreResult<()> {
        let tx = store
            .transaction(transaction_id)?
            .filter(|tx| tx.user_id == user_id)
            .ok_or_else(|| CoreError::NotFound("Transaction not found".into()))?;

        store.update_transaction(tx.id, &mut |record| {
            record.is_hidden = true;
            record.hidden_reason = Some(HiddenReason::User);
            record.budget_impact = BudgetImpact::UserExcluded;
            record.user_override_impact = true;
        })?;

        info!(tx = %tx.display_label(), "transaction soft-deleted");
        Ok(())
    }

    /// Transactions whose effective date falls in the given month, ordered
    /// by effective date. Hidden records are filtered out unless requested.
    /// Effective dates are stored as UTC-noon instants, so the month window
    /// selects the same calendar dates in every real-world zone.
    pub fn list_month(
        store: &dyn StorageBackend,
        user_id: Uuid,
        year: i32,
        month: u32,
        include_hidden: bool,
    ) -> CoreResult<Vec<Transaction>> {
        if !(1..=12).contains(&month) {
            return Err(CoreError::Validation(format!("invalid month: {month}")));
        }
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| CoreError::Validation(format!("invalid month: {year}-{month:02}")))?;
        let last = NaiveDate::from_ymd_opt(year, month, days_in_month(year, month))
            .ok_or_else(|| CoreError::Validation(format!("invalid month: {year}-{month:02}")))?;
        let (start, end) = (utc_noon(first), utc_noon(last));

        let txns = store
            .transactions_for_user(user_id)?
            .into_iter()
            .filter(|tx| tx.effective_date >= start && tx.effective_date <= end)
            .filter(|tx| include_hidden || tx.is_visible())
            .collect();

        Ok(txns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn manual_params(amount: Cents) -> ManualTransactionParams {
        ManualTransactionParams {
            name: "Groceries".into(),
            amount_cents: amount,
            currency: "USD".into(),
            effective_date: "2025-05-10".into(),
        }
    }

    #[test]
    fn manual_outflow_is_variable() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let id = TransactionService::create_manual(&store, user, manual_params(4200)).unwrap();

        let tx = store.transaction(id).unwrap().unwrap();
        assert_eq!(tx.budget_impact, BudgetImpact::Variable);
        assert_eq!(tx.source, TransactionSource::Manual);
        assert!(!tx.pending);
    }

    #[test]
    fn manual_inflow_is_income_excluded() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let id = TransactionService::create_manual(&store, user, manual_params(-4200)).unwrap();
        let tx = store.transaction(id).unwrap().unwrap();
        assert_eq!(tx.budget_impact, BudgetImpact::IncomeExcluded);
    }

    #[test]
    fn non_usd_currency_is_rejected() {
        let store = MemoryStore::new();
        let mut params = manual_params(100);
        params.currency = "EUR".into();
        let err = TransactionService::create_manual(&store, Uuid::new_v4(), params)
            .expect_err("non-USD must fail");
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn editing_impact_sets_override() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let id = TransactionService::create_manual(&store, user, manual_params(4200)).unwrap();

        TransactionService::patch(
            &store,
            user,
            id,
            TransactionPatch {
                budget_impact: Some(BudgetImpact::UserExcluded),
                ..Default::default()
            },
        )
        .unwrap();

        let tx = store.transaction(id).unwrap().unwrap();
        assert_eq!(tx.budget_impact, BudgetImpact::UserExcluded);
        assert!(tx.user_override_impact);
    }

    #[test]
    fn clearing_override_reclassifies_manual_by_sign() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let id = TransactionService::create_manual(&store, user, manual_params(4200)).unwrap();

        TransactionService::patch(
            &store,
            user,
            id,
            TransactionPatch {
                budget_impact: Some(BudgetImpact::UserExcluded),
                is_hidden: Some(true),
                ..Default::default()
            },
        )
        .unwrap();

        TransactionService::patch(
            &store,
            user,
            id,
            TransactionPatch {
                user_override_impact: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

        let tx = store.transaction(id).unwrap().unwrap();
        assert_eq!(tx.budget_impact, BudgetImpact::Variable);
        assert!(!tx.user_override_impact);
        assert!(!tx.is_hidden);
        assert_eq!(tx.hidden_reason, None);
    }

    #[test]
    fn transfers_cannot_be_made_budget_impacting() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let id = TransactionService::create_manual(&store, user, manual_params(4200)).unwrap();
        store
            .update_transaction(id, &mut |record| {
                record.budget_impact = BudgetImpact::TransferExcluded;
            })
            .unwrap();

        let err = TransactionService::patch(
            &store,
            user,
            id,
            TransactionPatch {
                budget_impact: Some(BudgetImpact::Variable),
                ..Default::default()
            },
        )
        .expect_err("transfer must stay excluded");
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn delete_is_soft() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let id = TransactionService::create_manual(&store, user, manual_params(4200)).unwrap();

        TransactionService::delete(&store, user, id).unwrap();

        let tx = store.transaction(id).unwrap().expect("record still exists");
        assert!(tx.is_hidden);
        assert_eq!(tx.hidden_reason, Some(HiddenReason::User));
        assert_eq!(tx.budget_impact, BudgetImpact::UserExcluded);
        assert!(tx.user_override_impact);
        assert!(!tx.counts_toward_budget());
    }

    #[test]
    fn patching_foreign_transaction_is_not_found() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let id = TransactionService::create_manual(&store, owner, manual_params(100)).unwrap();

        let err = TransactionService::patch(&store, intruder, id, TransactionPatch::default())
            .expect_err("other user's record must look absent");
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
