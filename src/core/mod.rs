pub mod allocation;
pub mod classification;
pub mod services;

pub use allocation::{calculate_budget_state, BudgetInputs, BudgetState};
pub use classification::{default_budget_impact, is_transfer_like, TransactionAttributes};
