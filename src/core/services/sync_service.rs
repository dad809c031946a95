//! Feed reconciliation. Applies the external feed's added/modified/removed
//! events to the ledger through a paginated cursor protocol, preserving user
//! overrides and handling pending→posted supersession.
//!
//! The cursor is persisted only after the full page sequence completes, so a
//! crash mid-loop resumes from the last persisted cursor. That may redeliver
//! already-applied events; upsert-by-feed-id makes redelivery idempotent.

use std::collections::HashSet;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::date_only_to_utc_noon;
use crate::config::Config;
use crate::core::classification::{default_budget_impact, TransactionAttributes};
use crate::domain::{Displayable, HiddenReason, LinkedItem, Transaction, TransactionSource};
use crate::errors::{CoreError, CoreResult};
use crate::feed::{FeedClient, FeedTransaction, SecretCipher};
use crate::money::{dollars_to_cents, Currency};
use crate::storage::StorageBackend;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ItemSyncCounts {
    pub added: usize,
    pub modified: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SyncCounts {
    pub synced_items: usize,
    pub added: usize,
    pub modified: usize,
    pub removed: usize,
}

/// Item ids with a sync currently in flight. Syncs for the same item must
/// not run concurrently: both would read the same old cursor and apply
/// overlapping pages. Different items are independent.
static IN_FLIGHT: Lazy<Mutex<HashSet<Uuid>>> = Lazy::new(|| Mutex::new(HashSet::new()));

struct SyncGuard(Uuid);

impl SyncGuard {
    fn acquire(item_id: Uuid) -> CoreResult<Self> {
        let mut in_flight = IN_FLIGHT
            .lock()
            .map_err(|_| CoreError::Storage("sync guard poisoned".into()))?;
        if !in_flight.insert(item_id) {
            return Err(CoreError::Conflict(format!(
                "sync already in flight for item {item_id}"
            )));
        }
        Ok(Self(item_id))
    }
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = IN_FLIGHT.lock() {
            in_flight.remove(&self.0);
        }
    }
}

pub struct SyncService;

impl SyncService {
    /// Syncs one linked item, owner-checked. The item must exist, belong to
    /// `user_id`, and be ACTIVE.
    pub fn sync_item(
        store: &dyn StorageBackend,
        feed: &dyn FeedClient,
        cipher: &dyn SecretCipher,
        config: &Config,
        user_id: Uuid,
        item_id: Uuid,
    ) -> CoreResult<ItemSyncCounts> {
        let item = store
            .item(item_id)?
            .filter(|item| item.user_id == user_id && item.is_active())
            .ok_or_else(|| CoreError::NotFound("Linked item not found".into()))?;

        Self::sync_one_item(store, feed, cipher, config, &item)
    }

    /// Syncs every ACTIVE item for a user in creation order. A single item's
    /// failure is logged and skipped — it must not abort sibling items — and
    /// its cursor is not advanced. Configuration errors are fatal and
    /// propagate.
    pub fn sync_all_items_for_user(
        store: &dyn StorageBackend,
        feed: &dyn FeedClient,
        cipher: &dyn SecretCipher,
        config: &Config,
        user_id: Uuid,
    ) -> CoreResult<SyncCounts> {
        let items = store.active_items_for_user(user_id)?;
        let mut counts = SyncCounts {
            synced_items: items.len(),
            ..SyncCounts::default()
        };

        for item in &items {
            match Self::sync_one_item(store, feed, cipher, config, item) {
                Ok(item_counts) => {
                    counts.added += item_counts.added;
                    counts.modified += item_counts.modified;
                    counts.removed += item_counts.removed;
                }
                Err(err @ CoreError::Configuration(_)) => return Err(err),
                Err(err) => {
                    warn!(
                        item = %item.display_label(),
                        error = %err,
                        "item sync failed, continuing batch"
                    );
                }
            }
        }

        Ok(counts)
    }

    /// Webhook path: syncs the ACTIVE item matching a feed-side item id.
    /// Silently does nothing when no such item is linked.
    pub fn sync_item_by_feed_item_id(
        store: &dyn StorageBackend,
        feed: &dyn FeedClient,
        cipher: &dyn SecretCipher,
        config: &Config,
        feed_item_id: &str,
    ) -> CoreResult<()> {
        let Some(item) = store
            .item_by_feed_id(feed_item_id)?
            .filter(LinkedItem::is_active)
        else {
            return Ok(());
        };

        Self::sync_one_item(store, feed, cipher, config, &item)?;
        Ok(())
    }

    fn sync_one_item(
        store: &dyn StorageBackend,
        feed: &dyn FeedClient,
        cipher: &dyn SecretCipher,
        config: &Config,
        item: &LinkedItem,
    ) -> CoreResult<ItemSyncCounts> {
        let _guard = SyncGuard::acquire(item.id)?;
        let access_token = cipher.decrypt(&item.access_token_enc)?;

        let mut cursor = item.transactions_cursor.clone();
        let mut counts = ItemSyncCounts::default();
        let mut pages = 0u32;

        loop {
            let page =
                feed.fetch_transaction_page(&access_token, cursor.as_deref(), config.sync_page_size)?;

            for tx in page.added.iter().chain(page.modified.iter()) {
                Self::upsert_feed_transaction(store, item.user_id, item.id, tx)?;
            }
            for removed in &page.removed {
                Self::mark_removed(store, item.user_id, &removed.transaction_id)?;
            }

            counts.added += page.added.len();
            counts.modified += page.modified.len();
            counts.removed += page.removed.len();

            cursor = Some(page.next_cursor);
            if !page.has_more {
                break;
            }

            pages += 1;
            if pages >= config.max_sync_pages {
                return Err(CoreError::ExternalService(format!(
                    "feed reported more pages after {pages} for item {}",
                    item.id
                )));
            }
        }

        // Only now is the cursor durable; everything before this point is
        // safe to replay.
        store.update_item(item.id, &mut |stored| {
            stored.transactions_cursor = cursor.clone();
        })?;

        info!(
            item = %item.display_label(),
            added = counts.added,
            modified = counts.modified,
            removed = counts.removed,
            "item sync complete"
        );

        Ok(counts)
    }

    /// Upserts one added/modified feed event by feed transaction id. Factual
    /// feed fields are overwritten unconditionally — the feed is
    /// authoritative for them even when the user has overridden
    /// categorization — while override-protected fields are preserved
    /// verbatim.
    fn upsert_feed_transaction(
        store: &dyn StorageBackend,
        user_id: Uuid,
        item_id: Uuid,
        tx: &FeedTransaction,
    ) -> CoreResult<()> {
        if tx.transaction_id.is_empty() {
            return Ok(());
        }

        let amount_cents = dollars_to_cents(tx.amount);
        let date = date_only_to_utc_noon(&tx.date)?;
        let authorized_date = tx
            .authorized_date
            .as_deref()
            .map(date_only_to_utc_noon)
            .transpose()?;
        let effective_date = authorized_date.unwrap_or(date);

        let existing = store.transaction_by_feed_id(&tx.transaction_id)?;

        let attrs = TransactionAttributes {
            category_primary: tx
                .personal_finance_category
                .as_ref()
                .and_then(|c| c.primary.as_deref()),
            transaction_code: tx.transaction_code.as_deref(),
            category_labels: &tx.category,
        };
        let computed_impact = default_budget_impact(&attrs, amount_cents);

        let name = tx
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Unknown transaction".into());
        let category_primary = tx
            .personal_finance_category
            .as_ref()
            .and_then(|c| c.primary.clone());
        let category_detailed = tx
            .personal_finance_category
            .as_ref()
            .and_then(|c| c.detailed.clone());

        match existing {
            Some(stored) => {
                let preserve_override = stored.user_override_impact;
                store.update_transaction(stored.id, &mut |record| {
                    record.user_id = user_id;
                    record.source = TransactionSource::Feed;
                    record.item_id = Some(item_id);
                    record.account_id = tx.account_id.clone();
                    record.date = date;
                    record.authorized_date = authorized_date;
                    record.effective_date = effective_date;
                    record.amount_cents = amount_cents;
                    record.currency = Currency::Usd;
                    record.pending = tx.pending;
                    record.pending_feed_transaction_id = tx.pending_transaction_id.clone();
                    record.is_removed_by_feed = false;
                    record.name = name.clone();
                    record.merchant_name = tx.merchant_name.clone();
                    record.category_primary = category_primary.clone();
                    record.category_detailed = category_detailed.clone();
                    if !preserve_override {
                        record.budget_impact = computed_impact;
                        record.hidden_reason = if record.is_hidden {
                            record.hidden_reason.or(Some(HiddenReason::User))
                        } else {
                            None
                        };
                    }
                })?;
            }
            None => {
                store.insert_transaction(Transaction {
                    id: Uuid::new_v4(),
                    user_id,
                    source: TransactionSource::Feed,
                    item_id: Some(item_id),
                    account_id: tx.account_id.clone(),
                    feed_transaction_id: Some(tx.transaction_id.clone()),
                    pending_feed_transaction_id: tx.pending_transaction_id.clone(),
                    date,
                    authorized_date,
                    effective_date,
                    amount_cents,
                    currency: Currency::Usd,
                    pending: tx.pending,
                    is_superseded: false,
                    is_removed_by_feed: false,
                    budget_impact: computed_impact,
                    user_override_impact: false,
                    is_hidden: false,
                    hidden_reason: None,
                    name,
                    merchant_name: tx.merchant_name.clone(),
                    category_primary,
                    category_detailed,
                    user_note: None,
                })?;
            }
        }

        // Pending supersession: the posted record names its pending
        // predecessor, which stays in the ledger but leaves the budget.
        if let Some(pending_id) = tx.pending_transaction_id.as_deref() {
            if let Some(predecessor) = store.transaction_by_feed_id(pending_id)? {
                if predecessor.user_id == user_id {
                    store.update_transaction(predecessor.id, &mut |record| {
                        record.is_superseded = true;
                        record.is_hidden = true;
                        record.hidden_reason = Some(HiddenReason::Superseded);
                    })?;
                }
            }
        }

        Ok(())
    }

    /// Applies a feed-side removal. The record is never deleted; it is
    /// tombstoned, and default visibility flips to hidden — unless the user
    /// had an active override keeping it visible.
    fn mark_removed(
        store: &dyn StorageBackend,
        user_id: Uuid,
        feed_transaction_id: &str,
    ) -> CoreResult<()> {
        let Some(existing) = store.transaction_by_feed_id(feed_transaction_id)? else {
            return Ok(());
        };
        if existing.user_id != user_id {
            return Ok(());
        }

        let should_hide = if existing.user_override_impact {
            existing.is_hidden
        } else {
            true
        };

        store.update_transaction(existing.id, &mut |record| {
            record.is_removed_by_feed = true;
            record.is_hidden = should_hide;
            if should_hide {
                record.hidden_reason = Some(HiddenReason::FeedRemoved);
            }
        })?;

        Ok(())
    }
}
