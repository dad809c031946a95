//! Shared fixtures: an in-memory environment with a scripted feed client
//! and a transparent cipher, so every suite can exercise the services
//! without a network or a database.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use perdiem::config::Config;
use perdiem::domain::{ItemStatus, LinkedItem, User};
use perdiem::errors::{CoreError, CoreResult};
use perdiem::feed::{
    FeedClient, FeedRecurringStream, FeedTransaction, RecurringFetch, TransactionPage,
};
use perdiem::feed::SecretCipher;
use perdiem::storage::{MemoryStore, StorageBackend};

/// Reversible fake cipher. Fails closed on payloads it did not produce.
pub struct PlainCipher;

impl SecretCipher for PlainCipher {
    fn encrypt(&self, plaintext: &str) -> CoreResult<String> {
        Ok(format!("enc:{plaintext}"))
    }

    fn decrypt(&self, payload: &str) -> CoreResult<String> {
        payload
            .strip_prefix("enc:")
            .map(str::to_string)
            .ok_or_else(|| CoreError::Configuration("unrecognized token envelope".into()))
    }
}

/// Feed client that replays scripted pages/streams per access token.
#[derive(Default)]
pub struct ScriptedFeed {
    pages: Mutex<VecDeque<CoreResult<TransactionPage>>>,
    streams: Mutex<VecDeque<CoreResult<RecurringFetch>>>,
    pub seen_cursors: Mutex<Vec<Option<String>>>,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_page(&self, page: TransactionPage) {
        self.pages.lock().unwrap().push_back(Ok(page));
    }

    pub fn push_page_error(&self, message: &str) {
        self.pages
            .lock()
            .unwrap()
            .push_back(Err(CoreError::ExternalService(message.into())));
    }

    pub fn push_streams(&self, fetch: RecurringFetch) {
        self.streams.lock().unwrap().push_back(Ok(fetch));
    }
}

impl FeedClient for ScriptedFeed {
    fn fetch_transaction_page(
        &self,
        _access_token: &str,
        cursor: Option<&str>,
        _count: u32,
    ) -> CoreResult<TransactionPage> {
        self.seen_cursors
            .lock()
            .unwrap()
            .push(cursor.map(str::to_string));
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CoreError::ExternalService("no scripted page".into())))
    }

    fn fetch_recurring_streams(&self, _access_token: &str) -> CoreResult<RecurringFetch> {
        self.streams
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CoreError::ExternalService("no scripted streams".into())))
    }
}

pub struct TestEnv {
    pub store: MemoryStore,
    pub feed: ScriptedFeed,
    pub cipher: PlainCipher,
    pub config: Config,
    pub user_id: Uuid,
    pub item_id: Uuid,
}

/// One user in New York with one ACTIVE linked item.
pub fn setup_env() -> TestEnv {
    let store = MemoryStore::new();
    let user_id = Uuid::new_v4();
    store
        .upsert_user(User {
            id: user_id,
            email: "casey@example.com".into(),
            timezone: Some("America/New_York".into()),
        })
        .unwrap();

    let item_id = Uuid::new_v4();
    store
        .insert_item(LinkedItem {
            id: item_id,
            user_id,
            feed_item_id: format!("item-{item_id}"),
            access_token_enc: "enc:access-token".into(),
            transactions_cursor: None,
            status: ItemStatus::Active,
            institution_name: Some("First Example Bank".into()),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        })
        .unwrap();

    TestEnv {
        store,
        feed: ScriptedFeed::new(),
        cipher: PlainCipher,
        config: Config::default(),
        user_id,
        item_id,
    }
}

/// Adds a second ACTIVE item for the same user, created after the first.
pub fn add_item(env: &TestEnv, token: &str) -> Uuid {
    let id = Uuid::new_v4();
    env.store
        .insert_item(LinkedItem {
            id,
            user_id: env.user_id,
            feed_item_id: format!("item-{id}"),
            access_token_enc: format!("enc:{token}"),
            transactions_cursor: None,
            status: ItemStatus::Active,
            institution_name: None,
            created_at: Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
        })
        .unwrap();
    id
}

pub fn feed_tx(id: &str, date: &str, amount: f64) -> FeedTransaction {
    FeedTransaction {
        transaction_id: id.into(),
        date: date.into(),
        amount,
        name: Some(format!("txn {id}")),
        ..Default::default()
    }
}

pub fn single_page(added: Vec<FeedTransaction>, next_cursor: &str) -> TransactionPage {
    TransactionPage {
        added,
        next_cursor: next_cursor.into(),
        has_more: false,
        ..Default::default()
    }
}

pub fn stream(id: &str, frequency: &str, average: f64, tx_ids: &[&str]) -> FeedRecurringStream {
    FeedRecurringStream {
        stream_id: id.into(),
        description: Some(format!("stream {id}")),
        frequency: Some(frequency.into()),
        average_amount: Some(average),
        last_amount: Some(average),
        is_active: Some(true),
        transaction_ids: tx_ids.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}
