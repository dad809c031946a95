//! Recurring stream merging. Pulls detected inflow/outflow streams from the
//! feed, upserts them by feed stream id, maps them onto ledger transactions
//! so recurring bills and paychecks leave the daily variable-spend pool, and
//! derives the suggested monthly income/fixed totals.

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::clock::date_only_to_utc_noon;
use crate::domain::{
    BudgetImpact, Displayable, LinkedItem, RecurringStream, StreamDirection, StreamFrequency,
};
use crate::errors::{CoreError, CoreResult};
use crate::feed::{FeedClient, FeedRecurringStream, SecretCipher};
use crate::money::{dollars_to_cents, Cents, Currency};
use crate::storage::StorageBackend;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BudgetSuggestions {
    pub available: bool,
    pub currency: Currency,
    pub suggested_income_monthly_cents: Cents,
    pub suggested_fixed_monthly_cents: Cents,
}

pub struct RecurringService;

impl RecurringService {
    /// Refreshes recurring streams for every ACTIVE item of a user.
    /// Per-item failures are logged and skipped.
    pub fn refresh_for_user(
        store: &dyn StorageBackend,
        feed: &dyn FeedClient,
        cipher: &dyn SecretCipher,
        user_id: Uuid,
    ) -> CoreResult<()> {
        for item in store.active_items_for_user(user_id)? {
            match Self::refresh_for_item(store, feed, cipher, &item) {
                Ok(()) => {}
                Err(err @ CoreError::Configuration(_)) => return Err(err),
                Err(err) => {
                    warn!(
                        item = %item.display_label(),
                        error = %err,
                        "recurring refresh failed for item"
                    );
                }
            }
        }
        Ok(())
    }

    /// Webhook path: refreshes the ACTIVE item matching a feed-side item
    /// id; does nothing when no such item is linked.
    pub fn refresh_for_feed_item_id(
        store: &dyn StorageBackend,
        feed: &dyn FeedClient,
        cipher: &dyn SecretCipher,
        feed_item_id: &str,
    ) -> CoreResult<()> {
        let Some(item) = store
            .item_by_feed_id(feed_item_id)?
            .filter(LinkedItem::is_active)
        else {
            return Ok(());
        };
        Self::refresh_for_item(store, feed, cipher, &item)
    }

    /// Fetches and merges both stream directions for one item. Streams
    /// absent from this refresh are marked inactive — never removed.
    pub fn refresh_for_item(
        store: &dyn StorageBackend,
        feed: &dyn FeedClient,
        cipher: &dyn SecretCipher,
        item: &LinkedItem,
    ) -> CoreResult<()> {
        let access_token = cipher.decrypt(&item.access_token_enc)?;
        let fetched = feed.fetch_recurring_streams(&access_token)?;

        let mut seen: Vec<String> = Vec::new();

        for stream in &fetched.inflow_streams {
            Self::upsert_stream(store, item, stream, StreamDirection::Inflow)?;
            seen.push(stream.stream_id.clone());
            Self::map_stream_transactions(store, item.user_id, stream, StreamDirection::Inflow)?;
        }
        for stream in &fetched.outflow_streams {
            Self::upsert_stream(store, item, stream, StreamDirection::Outflow)?;
            seen.push(stream.stream_id.clone());
            Self::map_stream_transactions(store, item.user_id, stream, StreamDirection::Outflow)?;
        }

        // An empty refresh deactivates nothing; only a refresh that saw at
        // least one stream retires the ones it no longer reports.
        if !seen.is_empty() {
            for stored in store.streams_for_item(item.id)? {
                if !seen.iter().any(|id| *id == stored.feed_stream_id) && stored.is_active {
                    let mut deactivated = stored;
                    deactivated.is_active = false;
                    store.upsert_stream(deactivated)?;
                }
            }
        }

        Ok(())
    }

    /// Suggested monthly income/fixed totals from active streams. A user
    /// with zero active linked items gets `available=false` and zero totals
    /// without triggering a refresh.
    pub fn budget_suggestions(
        store: &dyn StorageBackend,
        feed: &dyn FeedClient,
        cipher: &dyn SecretCipher,
        user_id: Uuid,
    ) -> CoreResult<BudgetSuggestions> {
        if store.active_items_for_user(user_id)?.is_empty() {
            return Ok(BudgetSuggestions {
                available: false,
                currency: Currency::Usd,
                suggested_income_monthly_cents: 0,
                suggested_fixed_monthly_cents: 0,
            });
        }

        Self::refresh_for_user(store, feed, cipher, user_id)?;

        let mut income: Cents = 0;
        let mut fixed: Cents = 0;

        for stream in store.active_streams_for_user(user_id)? {
            let monthly = monthly_equivalent(stream.suggestion_amount_cents(), stream.frequency);

            if stream.direction == StreamDirection::Inflow && stream.counts_toward_income {
                income += monthly;
            }
            if stream.direction == StreamDirection::Outflow && stream.counts_toward_fixed {
                fixed += monthly;
            }
        }

        Ok(BudgetSuggestions {
            available: true,
            currency: Currency::Usd,
            suggested_income_monthly_cents: income,
            suggested_fixed_monthly_cents: fixed,
        })
    }

    /// Upserts one stream by feed stream id. `counts_toward_*` are set only
    /// on create — they may carry user customization — while everything
    /// factual is overwritten.
    fn upsert_stream(
        store: &dyn StorageBackend,
        item: &LinkedItem,
        stream: &FeedRecurringStream,
        direction: StreamDirection,
    ) -> CoreResult<()> {
        let frequency = StreamFrequency::parse(stream.frequency.as_deref());
        let avg_amount_cents = dollars_to_cents(stream.average_amount.unwrap_or(0.0));
        let last_amount_cents = dollars_to_cents(stream.last_amount.unwrap_or(0.0));
        let predicted_next_date = stream
            .predicted_next_date
            .as_deref()
            .map(date_only_to_utc_noon)
            .transpose()?;
        let description = stream
            .description
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "Recurring stream".into());
        let is_active = stream.is_active.unwrap_or(true);

        let merged = match store.stream_by_feed_id(&stream.stream_id)? {
            Some(existing) => RecurringStream {
                direction,
                description,
                merchant_name: stream.merchant_name.clone(),
                frequency,
                avg_amount_cents,
                last_amount_cents,
                predicted_next_date,
                is_active,
                ..existing
            },
            None => RecurringStream {
                id: Uuid::new_v4(),
                user_id: item.user_id,
                item_id: item.id,
                feed_stream_id: stream.stream_id.clone(),
                direction,
                description,
                merchant_name: stream.merchant_name.clone(),
                frequency,
                avg_amount_cents,
                last_amount_cents,
                predicted_next_date,
                is_active,
                counts_toward_income: direction == StreamDirection::Inflow,
                counts_toward_fixed: direction == StreamDirection::Outflow,
                user_amount_override_cents: None,
            },
        };

        store.upsert_stream(merged)
    }

    /// Excludes every mapped ledger transaction from the variable pool,
    /// unless the user has overridden its classification.
    fn map_stream_transactions(
        store: &dyn StorageBackend,
        user_id: Uuid,
        stream: &FeedRecurringStream,
        direction: StreamDirection,
    ) -> CoreResult<()> {
        let impact = match direction {
            StreamDirection::Outflow => BudgetImpact::FixedExcluded,
            StreamDirection::Inflow => BudgetImpact::IncomeExcluded,
        };

        for feed_tx_id in stream.transaction_ids.iter().filter(|id| !id.is_empty()) {
            let Some(tx) = store.transaction_by_feed_id(feed_tx_id)? else {
                continue;
            };
            if tx.user_id != user_id || tx.user_override_impact {
                continue;
            }
            store.update_transaction(tx.id, &mut |record| {
                record.budget_impact = impact;
            })?;
        }

        Ok(())
    }
}

/// Converts a per-occurrence amount to a monthly figure, rounded to the
/// nearest cent. Unknown cadences contribute nothing.
pub fn monthly_equivalent(amount_cents: Cents, frequency: StreamFrequency) -> Cents {
    let amount = amount_cents as f64;
    match frequency {
        StreamFrequency::Monthly => amount_cents,
        StreamFrequency::SemiMonthly => (amount * 2.0).round() as Cents,
        StreamFrequency::Biweekly => (amount * 26.0 / 12.0).round() as Cents,
        StreamFrequency::Weekly => (amount * 52.0 / 12.0).round() as Cents,
        StreamFrequency::Annually => (amount / 12.0).round() as Cents,
        StreamFrequency::Unknown => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monthly_equivalent_follows_conversion_table() {
        assert_eq!(monthly_equivalent(1000, StreamFrequency::Monthly), 1000);
        assert_eq!(monthly_equivalent(1000, StreamFrequency::SemiMonthly), 2000);
        assert_eq!(monthly_equivalent(1200, StreamFrequency::Biweekly), 2600);
        assert_eq!(monthly_equivalent(1200, StreamFrequency::Weekly), 5200);
        assert_eq!(monthly_equivalent(1200, StreamFrequency::Annually), 100);
        assert_eq!(monthly_equivalent(1200, StreamFrequency::Unknown), 0);
    }

    #[test]
    fn monthly_equivalent_rounds_to_nearest_cent() {
        // 1001 * 26 / 12 = 2168.8(3)
        assert_eq!(monthly_equivalent(1001, StreamFrequency::Biweekly), 2169);
        // 100 / 12 = 8.3(3)
        assert_eq!(monthly_equivalent(100, StreamFrequency::Annually), 8);
    }

    #[test]
    fn frequency_parsing_is_case_insensitive_and_lenient() {
        assert_eq!(
            StreamFrequency::parse(Some("monthly")),
            StreamFrequency::Monthly
        );
        assert_eq!(
            StreamFrequency::parse(Some("SEMI_MONTHLY")),
            StreamFrequency::SemiMonthly
        );
        assert_eq!(StreamFrequency::parse(Some("daily")), StreamFrequency::Unknown);
        assert_eq!(StreamFrequency::parse(None), StreamFrequency::Unknown);
    }
}
