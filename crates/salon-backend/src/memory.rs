//! In-memory backend used for development and tests.
//!
//! Implements all four collaborator traits against process-local state.
//! Feed fan-out mirrors the hosted service: an insert is stored, then pushed
//! to every live subscription whose collection and filter match.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use salon_shared::UserId;

use crate::blobs::{Blobs, StoredBlob};
use crate::error::{AuthError, QueryError, SubscriptionError, UploadError};
use crate::feed::{ChangeFeed, FeedSubscription, InsertEvent, SubscriptionGuard};
use crate::identity::{AuthUser, Credentials, IdentityProvider};
use crate::records::{Direction, Filter, Order, Records, Row};

const FEED_CHANNEL_CAPACITY: usize = 64;
const MAX_BLOB_SIZE: usize = 8 * 1024 * 1024;

struct Account {
    password: String,
    user: AuthUser,
}

struct FeedEntry {
    id: u64,
    collection: String,
    filter: Filter,
    tx: mpsc::Sender<InsertEvent>,
}

/// Process-local stand-in for the hosted service.
pub struct MemoryBackend {
    collections: Mutex<HashMap<String, Vec<Row>>>,
    accounts: Mutex<HashMap<String, Account>>,
    blobs: Mutex<HashMap<String, Bytes>>,
    subscribers: Arc<Mutex<Vec<FeedEntry>>>,
    next_subscription: AtomicU64,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            accounts: Mutex::new(HashMap::new()),
            blobs: Mutex::new(HashMap::new()),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            next_subscription: AtomicU64::new(1),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make subsequent `insert` calls fail, to exercise write-failure paths.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of live feed registrations.
    pub fn subscription_count(&self) -> usize {
        self.subscribers.lock().expect("subscriber registry poisoned").len()
    }

    /// Re-deliver a row to matching subscribers without storing it again.
    ///
    /// Models at-least-once delivery after a reconnect.
    pub fn redeliver(&self, collection: &str, row: Row) {
        self.fan_out(collection, &row);
    }

    fn fan_out(&self, collection: &str, row: &Row) {
        let subscribers = self.subscribers.lock().expect("subscriber registry poisoned");
        for entry in subscribers.iter() {
            if entry.collection != collection || !entry.filter.matches(row) {
                continue;
            }
            let event = InsertEvent {
                collection: collection.to_string(),
                row: row.clone(),
            };
            if entry.tx.try_send(event).is_err() {
                warn!(
                    subscription = entry.id,
                    collection, "Feed channel full or closed, dropping event"
                );
            }
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MemoryBackend {
    async fn sign_up(&self, credentials: &Credentials) -> Result<AuthUser, AuthError> {
        let mut accounts = self.accounts.lock().expect("account registry poisoned");
        if accounts.contains_key(&credentials.email) {
            return Err(AuthError::AccountExists);
        }

        let user = AuthUser {
            id: UserId(Uuid::new_v4()),
            email: credentials.email.clone(),
            username: credentials.username.clone(),
        };
        accounts.insert(
            credentials.email.clone(),
            Account {
                password: credentials.password.clone(),
                user: user.clone(),
            },
        );

        debug!(user = %user.id, "Account created");
        Ok(user)
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthUser, AuthError> {
        let accounts = self.accounts.lock().expect("account registry poisoned");
        match accounts.get(&credentials.email) {
            Some(account) if account.password == credentials.password => {
                Ok(account.user.clone())
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }
}

#[async_trait]
impl Records for MemoryBackend {
    async fn select(
        &self,
        collection: &str,
        filter: Filter,
        order: Option<Order>,
    ) -> Result<Vec<Row>, QueryError> {
        let collections = self.collections.lock().expect("collection registry poisoned");
        let mut rows: Vec<Row> = collections
            .get(collection)
            .map(|rows| rows.iter().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = order {
            rows.sort_by(|a, b| {
                let cmp = compare_values(a.get(&order.column), b.get(&order.column));
                match order.direction {
                    Direction::Ascending => cmp,
                    Direction::Descending => cmp.reverse(),
                }
            });
        }

        Ok(rows)
    }

    async fn insert(&self, collection: &str, mut row: Row) -> Result<Row, QueryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(QueryError::WriteRejected("write failure injected".into()));
        }

        // Service-assigned columns
        row.entry("id".to_string())
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        row.entry("created_at".to_string())
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));

        {
            let mut collections =
                self.collections.lock().expect("collection registry poisoned");
            collections
                .entry(collection.to_string())
                .or_default()
                .push(row.clone());
        }

        self.fan_out(collection, &row);
        Ok(row)
    }

    async fn update(
        &self,
        collection: &str,
        filter: Filter,
        patch: Row,
    ) -> Result<Vec<Row>, QueryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(QueryError::WriteRejected("write failure injected".into()));
        }

        let mut collections = self.collections.lock().expect("collection registry poisoned");
        let rows = collections
            .get_mut(collection)
            .ok_or_else(|| QueryError::UnknownCollection(collection.to_string()))?;

        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|r| filter.matches(r)) {
            for (column, value) in &patch {
                row.insert(column.clone(), value.clone());
            }
            updated.push(row.clone());
        }

        Ok(updated)
    }
}

#[async_trait]
impl Blobs for MemoryBackend {
    async fn upload(
        &self,
        bucket: &str,
        object: &str,
        data: Bytes,
    ) -> Result<StoredBlob, UploadError> {
        if data.is_empty() {
            return Err(UploadError::EmptyBlob);
        }
        if data.len() > MAX_BLOB_SIZE {
            return Err(UploadError::TooLarge {
                size: data.len(),
                max: MAX_BLOB_SIZE,
            });
        }

        let path = format!("{bucket}/{object}");
        self.blobs
            .lock()
            .expect("blob registry poisoned")
            .insert(path.clone(), data);

        debug!(path = %path, "Stored blob");
        Ok(StoredBlob { path })
    }
}

impl ChangeFeed for MemoryBackend {
    fn subscribe(
        &self,
        collection: &str,
        filter: Filter,
    ) -> Result<FeedSubscription, SubscriptionError> {
        let (tx, rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);

        self.subscribers
            .lock()
            .expect("subscriber registry poisoned")
            .push(FeedEntry {
                id,
                collection: collection.to_string(),
                filter,
                tx,
            });

        debug!(subscription = id, collection, "Feed subscription opened");

        let registry = Arc::clone(&self.subscribers);
        let guard = SubscriptionGuard::new(move || {
            let mut subscribers = registry.lock().expect("subscriber registry poisoned");
            subscribers.retain(|entry| entry.id != id);
            debug!(subscription = id, "Feed subscription released");
        });

        Ok(FeedSubscription { events: rx, guard })
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering as O;
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(O::Equal),
        (Some(_), None) => O::Greater,
        (None, Some(_)) => O::Less,
        _ => O::Equal,
    }
}
