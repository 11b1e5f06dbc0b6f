//! Presence tracking.
//!
//! The tracker keeps the store's presence set current from two sources that
//! carry no ordering guarantee relative to the message stream: wholesale
//! snapshots and incremental per-user status beacons arriving on the change
//! feed (`presence` collection, rows of `user_id` / `status`).  Consumers
//! must tolerate transient staleness.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use salon_backend::{ChangeFeed, FeedSubscription, Filter, SubscriptionError};
use salon_shared::{PresenceStatus, UserId};
use salon_store::SharedStore;

/// Collection carrying per-user status beacons.
pub const PRESENCE_COLLECTION: &str = "presence";

pub struct PresenceTracker {
    store: SharedStore,
    cancelled: Arc<AtomicBool>,
    cancel_tx: Option<oneshot::Sender<()>>,
    feed_loop: Option<JoinHandle<()>>,
}

impl PresenceTracker {
    /// Subscribe to status beacons and start applying them to the store.
    pub fn open(feed: &impl ChangeFeed, store: SharedStore) -> Result<Self, SubscriptionError> {
        let subscription = feed.subscribe(PRESENCE_COLLECTION, Filter::all([]))?;

        info!("Presence tracker opened");

        let cancelled = Arc::new(AtomicBool::new(false));
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let feed_loop = tokio::spawn(feed_loop(
            subscription,
            store.clone(),
            cancelled.clone(),
            cancel_rx,
        ));

        Ok(Self {
            store,
            cancelled,
            cancel_tx: Some(cancel_tx),
            feed_loop: Some(feed_loop),
        })
    }

    /// Replace the entire online set.
    pub fn apply_snapshot(&self, online: impl IntoIterator<Item = UserId>) {
        let mut guard = self.store.lock().expect("store lock poisoned");
        guard.apply_online_snapshot(online);
    }

    /// Upsert a single user's status; unknown users are inserted.
    pub fn apply_status_change(&self, user: UserId, status: PresenceStatus) {
        let mut guard = self.store.lock().expect("store lock poisoned");
        guard.set_presence(user, status);
    }

    /// Tear down the beacon subscription and wait for the loop to finish.
    pub async fn close(mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.cancel_tx.take();
        if let Some(task) = self.feed_loop.take() {
            let _ = task.await;
        }
        info!("Presence tracker closed");
    }
}

impl Drop for PresenceTracker {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.cancel_tx.take();
    }
}

async fn feed_loop(
    mut subscription: FeedSubscription,
    store: SharedStore,
    cancelled: Arc<AtomicBool>,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    loop {
        let event = tokio::select! {
            _ = &mut cancel_rx => break,
            event = subscription.events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        if cancelled.load(Ordering::SeqCst) {
            break;
        }

        let user = event
            .row
            .get("user_id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok());
        let status = event
            .row
            .get("status")
            .and_then(Value::as_str)
            .and_then(PresenceStatus::parse);

        match (user, status) {
            (Some(user), Some(status)) => {
                let mut guard = store.lock().expect("store lock poisoned");
                guard.set_presence(UserId(user), status);
            }
            _ => warn!("Malformed presence beacon, skipping"),
        }
    }

    debug!("Presence loop ended");
    drop(subscription);
}
