pub mod budget_service;
pub mod recurring_service;
pub mod sync_service;
pub mod transaction_service;

pub use budget_service::{BudgetService, BudgetSummary, ProfileParams};
pub use recurring_service::{BudgetSuggestions, RecurringService};
pub use sync_service::{ItemSyncCounts, SyncCounts, SyncService};
pub use transaction_service::{ManualTransactionParams, TransactionPatch, TransactionService};
