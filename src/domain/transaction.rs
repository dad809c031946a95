//! Ledger transaction model. Records are never hard-deleted: removal,
//! supersession, and user deletion are all expressed as status flags so the
//! audit history survives.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::{Cents, Currency};

use super::common::Displayable;

/// Where a ledger entry came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionSource {
    Feed,
    Manual,
}

/// Category determining whether a transaction counts against the daily
/// allowance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetImpact {
    Variable,
    FixedExcluded,
    TransferExcluded,
    IncomeExcluded,
    UserExcluded,
}

impl fmt::Display for BudgetImpact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BudgetImpact::Variable => "Variable",
            BudgetImpact::FixedExcluded => "Fixed (excluded)",
            BudgetImpact::TransferExcluded => "Transfer (excluded)",
            BudgetImpact::IncomeExcluded => "Income (excluded)",
            BudgetImpact::UserExcluded => "User excluded",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HiddenReason {
    User,
    Superseded,
    FeedRemoved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub source: TransactionSource,
    /// Linked item this entry was synced from. None for manual entries.
    pub item_id: Option<Uuid>,
    pub account_id: Option<String>,
    /// Feed-side identity; unique when present.
    pub feed_transaction_id: Option<String>,
    /// Feed id of the pending record this posted entry replaces.
    pub pending_feed_transaction_id: Option<String>,
    /// Feed-reported posted date, stored as a UTC-noon instant.
    pub date: DateTime<Utc>,
    pub authorized_date: Option<DateTime<Utc>>,
    /// Authorized date if known, else posted date. The only field used for
    /// day-bucketing.
    pub effective_date: DateTime<Utc>,
    pub amount_cents: Cents,
    pub currency: Currency,
    pub pending: bool,
    pub is_superseded: bool,
    pub is_removed_by_feed: bool,
    pub budget_impact: BudgetImpact,
    /// Once true, automatic reclassification must never overwrite
    /// `budget_impact`, `is_hidden`, `hidden_reason`, or `user_note`.
    pub user_override_impact: bool,
    pub is_hidden: bool,
    pub hidden_reason: Option<HiddenReason>,
    pub name: String,
    pub merchant_name: Option<String>,
    pub category_primary: Option<String>,
    pub category_detailed: Option<String>,
    pub user_note: Option<String>,
}

impl Transaction {
    /// The single "effectively visible for budgeting" predicate. Every query
    /// that feeds the allocation engine goes through this.
    pub fn counts_toward_budget(&self) -> bool {
        self.budget_impact == BudgetImpact::Variable
            && !self.is_hidden
            && !self.is_removed_by_feed
            && !self.is_superseded
    }

    pub fn is_visible(&self) -> bool {
        !self.is_hidden
    }
}

impl Displayable for Transaction {
    fn display_label(&self) -> String {
        format!("txn:{} [{}]", self.id, self.budget_impact)
    }
}
