//! Abstract collaborators for the external bank-data provider and the
//! secret store. The core never constructs a concrete network client or a
//! cipher itself — both are injected, which keeps every service testable
//! with fakes and avoids hidden process-wide client state.

use serde::{Deserialize, Serialize};

use crate::errors::CoreResult;

/// Category object as reported by the feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedCategory {
    pub primary: Option<String>,
    pub detailed: Option<String>,
}

/// One added or modified transaction on a sync page. Amounts are in dollars,
/// outflows positive / inflows negative; dates are `YYYY-MM-DD` strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedTransaction {
    pub transaction_id: String,
    pub account_id: Option<String>,
    pub pending_transaction_id: Option<String>,
    pub date: String,
    pub authorized_date: Option<String>,
    pub amount: f64,
    pub pending: bool,
    pub name: Option<String>,
    pub merchant_name: Option<String>,
    pub personal_finance_category: Option<FeedCategory>,
    pub category: Vec<String>,
    pub transaction_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedRemovedTransaction {
    pub transaction_id: String,
}

/// One page of the cursor-based sync protocol.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionPage {
    pub added: Vec<FeedTransaction>,
    pub modified: Vec<FeedTransaction>,
    pub removed: Vec<FeedRemovedTransaction>,
    pub next_cursor: String,
    pub has_more: bool,
}

/// A detected recurring stream as reported by the feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedRecurringStream {
    pub stream_id: String,
    pub description: Option<String>,
    pub merchant_name: Option<String>,
    pub frequency: Option<String>,
    /// Dollars; absent amounts count as zero.
    pub average_amount: Option<f64>,
    pub last_amount: Option<f64>,
    pub is_active: Option<bool>,
    pub predicted_next_date: Option<String>,
    pub transaction_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecurringFetch {
    pub inflow_streams: Vec<FeedRecurringStream>,
    pub outflow_streams: Vec<FeedRecurringStream>,
}

/// The external transaction feed. Transport, auth, and retries against the
/// real provider are entirely the implementor's concern.
pub trait FeedClient: Send + Sync {
    /// Fetches the next sync page. `cursor` is opaque — pass through
    /// whatever the previous page returned, or `None` for a fresh item.
    fn fetch_transaction_page(
        &self,
        access_token: &str,
        cursor: Option<&str>,
        count: u32,
    ) -> CoreResult<TransactionPage>;

    fn fetch_recurring_streams(&self, access_token: &str) -> CoreResult<RecurringFetch>;
}

/// Encryption-at-rest for feed access tokens, opaque to the core.
pub trait SecretCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> CoreResult<String>;
    fn decrypt(&self, payload: &str) -> CoreResult<String>;
}
