pub mod common;
pub mod item;
pub mod profile;
pub mod stream;
pub mod transaction;
pub mod user;

pub use common::Displayable;
pub use item::{ItemStatus, LinkedItem};
pub use profile::{AmountSource, BudgetProfile};
pub use stream::{RecurringStream, StreamDirection, StreamFrequency};
pub use transaction::{BudgetImpact, HiddenReason, Transaction, TransactionSource};
pub use user::User;
