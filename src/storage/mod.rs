pub mod json_backend;
pub mod memory;

use uuid::Uuid;

use crate::domain::{BudgetProfile, LinkedItem, RecurringStream, Transaction, User};
use crate::errors::CoreResult;

pub use json_backend::JsonSnapshot;
pub use memory::{Dataset, MemoryStore};

/// Abstraction over persistence backends for the budgeting dataset: a ledger
/// keyed by internal id with a unique index on the feed transaction id, a
/// profile store keyed by user id, a stream store keyed by the feed stream
/// id, plus linked items and users.
///
/// `update_*` methods apply the mutator atomically per record — concurrent
/// read-modify-write on the same id must never produce a torn update.
pub trait StorageBackend: Send + Sync {
    // Users
    fn user(&self, id: Uuid) -> CoreResult<Option<User>>;
    fn upsert_user(&self, user: User) -> CoreResult<()>;

    // Budget profiles (one per user)
    fn profile(&self, user_id: Uuid) -> CoreResult<Option<BudgetProfile>>;
    fn upsert_profile(&self, profile: BudgetProfile) -> CoreResult<()>;

    // Transactions
    fn transaction(&self, id: Uuid) -> CoreResult<Option<Transaction>>;
    fn transaction_by_feed_id(&self, feed_transaction_id: &str)
        -> CoreResult<Option<Transaction>>;
    /// Fails with `Conflict` when the feed transaction id is already taken.
    fn insert_transaction(&self, transaction: Transaction) -> CoreResult<()>;
    /// Fails with `NotFound` when the id is absent.
    fn update_transaction(
        &self,
        id: Uuid,
        mutate: &mut dyn FnMut(&mut Transaction),
    ) -> CoreResult<()>;
    fn transactions_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Transaction>>;

    // Linked items
    fn item(&self, id: Uuid) -> CoreResult<Option<LinkedItem>>;
    fn item_by_feed_id(&self, feed_item_id: &str) -> CoreResult<Option<LinkedItem>>;
    /// Fails with `Conflict` when the feed item id is already linked.
    fn insert_item(&self, item: LinkedItem) -> CoreResult<()>;
    fn update_item(&self, id: Uuid, mutate: &mut dyn FnMut(&mut LinkedItem)) -> CoreResult<()>;
    /// ACTIVE items for a user, ordered by creation time.
    fn active_items_for_user(&self, user_id: Uuid) -> CoreResult<Vec<LinkedItem>>;

    // Recurring streams
    fn stream_by_feed_id(&self, feed_stream_id: &str) -> CoreResult<Option<RecurringStream>>;
    fn upsert_stream(&self, stream: RecurringStream) -> CoreResult<()>;
    fn streams_for_item(&self, item_id: Uuid) -> CoreResult<Vec<RecurringStream>>;
    fn active_streams_for_user(&self, user_id: Uuid) -> CoreResult<Vec<RecurringStream>>;
}
