//! In-memory storage backend. Keyed tables behind one `RwLock`; per-record
//! mutators run under the write lock, which gives every `update_*` call the
//! atomicity the [`StorageBackend`] contract requires.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{BudgetProfile, LinkedItem, RecurringStream, Transaction, User};
use crate::errors::{CoreError, CoreResult};

use super::StorageBackend;

/// The whole dataset, serializable as one JSON document for the snapshot
/// backend.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub users: HashMap<Uuid, User>,
    pub profiles: HashMap<Uuid, BudgetProfile>,
    pub transactions: HashMap<Uuid, Transaction>,
    pub items: HashMap<Uuid, LinkedItem>,
    pub streams: HashMap<Uuid, RecurringStream>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<Dataset>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dataset(dataset: Dataset) -> Self {
        Self {
            data: RwLock::new(dataset),
        }
    }

    /// Clones the current dataset, for snapshot persistence.
    pub fn export(&self) -> CoreResult<Dataset> {
        let data = self.read()?;
        Ok(Dataset {
            users: data.users.clone(),
            profiles: data.profiles.clone(),
            transactions: data.transactions.clone(),
            items: data.items.clone(),
            streams: data.streams.clone(),
        })
    }

    fn read(&self) -> CoreResult<std::sync::RwLockReadGuard<'_, Dataset>> {
        self.data
            .read()
            .map_err(|_| CoreError::Storage("storage lock poisoned".into()))
    }

    fn write(&self) -> CoreResult<std::sync::RwLockWriteGuard<'_, Dataset>> {
        self.data
            .write()
            .map_err(|_| CoreError::Storage("storage lock poisoned".into()))
    }
}

impl StorageBackend for MemoryStore {
    fn user(&self, id: Uuid) -> CoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    fn upsert_user(&self, user: User) -> CoreResult<()> {
        self.write()?.users.insert(user.id, user);
        Ok(())
    }

    fn profile(&self, user_id: Uuid) -> CoreResult<Option<BudgetProfile>> {
        Ok(self.read()?.profiles.get(&user_id).cloned())
    }

    fn upsert_profile(&self, profile: BudgetProfile) -> CoreResult<()> {
        self.write()?.profiles.insert(profile.user_id, profile);
        Ok(())
    }

    fn transaction(&self, id: Uuid) -> CoreResult<Option<Transaction>> {
        Ok(self.read()?.transactions.get(&id).cloned())
    }

    fn transaction_by_feed_id(
        &self,
        feed_transaction_id: &str,
    ) -> CoreResult<Option<Transaction>> {
        Ok(self
            .read()?
            .transactions
            .values()
            .find(|tx| tx.feed_transaction_id.as_deref() == Some(feed_transaction_id))
            .cloned())
    }

    fn insert_transaction(&self, transaction: Transaction) -> CoreResult<()> {
        let mut data = self.write()?;
        if let Some(feed_id) = transaction.feed_transaction_id.as_deref() {
            let taken = data
                .transactions
                .values()
                .any(|tx| tx.feed_transaction_id.as_deref() == Some(feed_id));
            if taken {
                return Err(CoreError::Conflict(format!(
                    "feed transaction {feed_id} already stored"
                )));
            }
        }
        data.transactions.insert(transaction.id, transaction);
        Ok(())
    }

    fn update_transaction(
        &self,
        id: Uuid,
        mutate: &mut dyn FnMut(&mut Transaction),
    ) -> CoreResult<()> {
        let mut data = self.write()?;
        let tx = data
            .transactions
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("transaction {id}")))?;
        mutate(tx);
        Ok(())
    }

    fn transactions_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Transaction>> {
        let mut txns: Vec<Transaction> = self
            .read()?
            .transactions
            .values()
            .filter(|tx| tx.user_id == user_id)
            .cloned()
            .collect();
        txns.sort_by_key(|tx| tx.effective_date);
        Ok(txns)
    }

    fn item(&self, id: Uuid) -> CoreResult<Option<LinkedItem>> {
        Ok(self.read()?.items.get(&id).cloned())
    }

    fn item_by_feed_id(&self, feed_item_id: &str) -> CoreResult<Option<LinkedItem>> {
        Ok(self
            .read()?
            .items
            .values()
            .find(|item| item.feed_item_id == feed_item_id)
            .cloned())
    }

    fn insert_item(&self, item: LinkedItem) -> CoreResult<()> {
        let mut data = self.write()?;
        if data
            .items
            .values()
            .any(|existing| existing.feed_item_id == item.feed_item_id)
        {
            return Err(CoreError::Conflict(format!(
                "feed item {} already linked",
                item.feed_item_id
            )));
        }
        data.items.insert(item.id, item);
        Ok(())
    }

    fn update_item(&self, id: Uuid, mutate: &mut dyn FnMut(&mut LinkedItem)) -> CoreResult<()> {
        let mut data = self.write()?;
        let item = data
            .items
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("item {id}")))?;
        mutate(item);
        Ok(())
    }

    fn active_items_for_user(&self, user_id: Uuid) -> CoreResult<Vec<LinkedItem>> {
        let mut items: Vec<LinkedItem> = self
            .read()?
            .items
            .values()
            .filter(|item| item.user_id == user_id && item.is_active())
            .cloned()
            .collect();
        items.sort_by_key(|item| item.created_at);
        Ok(items)
    }

    fn stream_by_feed_id(&self, feed_stream_id: &str) -> CoreResult<Option<RecurringStream>> {
        Ok(self
            .read()?
            .streams
            .values()
            .find(|stream| stream.feed_stream_id == feed_stream_id)
            .cloned())
    }

    fn upsert_stream(&self, stream: RecurringStream) -> CoreResult<()> {
        let mut data = self.write()?;
        let existing_id = data
            .streams
            .values()
            .find(|s| s.feed_stream_id == stream.feed_stream_id)
            .map(|s| s.id);
        match existing_id {
            Some(id) => {
                let mut replacement = stream;
                replacement.id = id;
                data.streams.insert(id, replacement);
            }
            None => {
                data.streams.insert(stream.id, stream);
            }
        }
        Ok(())
    }

    fn streams_for_item(&self, item_id: Uuid) -> CoreResult<Vec<RecurringStream>> {
        Ok(self
            .read()?
            .streams
            .values()
            .filter(|stream| stream.item_id == item_id)
            .cloned()
            .collect())
    }

    fn active_streams_for_user(&self, user_id: Uuid) -> CoreResult<Vec<RecurringStream>> {
        Ok(self
            .read()?
            .streams
            .values()
            .filter(|stream| stream.user_id == user_id && stream.is_active)
            .cloned()
            .collect())
    }
}
