//! Per-conversation message reconciliation.
//!
//! A [`MessageSyncChannel`] is scoped to exactly one conversation: opening it
//! runs the initial bulk fetch, merges it into the store, then spawns a merge
//! loop over a live change-feed subscription.  Closing (or dropping) the
//! channel cancels the loop, which releases the feed registration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use salon_backend::{ChangeFeed, FeedSubscription, Filter, Order, Records, SubscriptionError};
use salon_shared::{ConversationId, Delivery};
use salon_store::{Message, SharedStore};

use crate::error::SendError;
use crate::rows;

pub struct MessageSyncChannel<B> {
    backend: Arc<B>,
    store: SharedStore,
    conversation: ConversationId,
    /// Cancellation token checked by every async completion before it touches
    /// the store, so late arrivals cannot mutate a stale context.
    cancelled: Arc<AtomicBool>,
    cancel_tx: Option<oneshot::Sender<()>>,
    merge_loop: Option<JoinHandle<()>>,
}

impl<B> MessageSyncChannel<B>
where
    B: Records + ChangeFeed + Send + Sync + 'static,
{
    /// Open the sync channel for one conversation.
    ///
    /// Requires an authenticated user in the store.  Fetches the full history
    /// ascending by `created_at`, merges it, then subscribes to live inserts
    /// scoped to the conversation.
    pub async fn open(
        backend: Arc<B>,
        store: SharedStore,
        conversation: ConversationId,
    ) -> Result<Self, SubscriptionError> {
        {
            let guard = store.lock().expect("store lock poisoned");
            if guard.current_user().is_none() {
                return Err(SubscriptionError::NoIdentity);
            }
        }

        let filter = rows::conversation_filter(conversation);
        let history = backend
            .select(
                conversation.collection(),
                filter.clone(),
                Some(Order::asc("created_at")),
            )
            .await
            .map_err(|e| SubscriptionError::InitialFetch(e.to_string()))?;

        let mut merged = 0usize;
        {
            let mut guard = store.lock().expect("store lock poisoned");
            for row in &history {
                if let Some(message) = rows::decode_row(conversation, row) {
                    if guard.insert_message(message) {
                        merged += 1;
                    }
                }
            }
        }

        let subscription = backend.subscribe(conversation.collection(), filter.clone())?;

        info!(conversation = %conversation, history = merged, "Sync channel opened");

        let cancelled = Arc::new(AtomicBool::new(false));
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let merge_loop = tokio::spawn(merge_loop(
            subscription,
            store.clone(),
            conversation,
            filter,
            cancelled.clone(),
            cancel_rx,
        ));

        Ok(Self {
            backend,
            store,
            conversation,
            cancelled,
            cancel_tx: Some(cancel_tx),
            merge_loop: Some(merge_loop),
        })
    }

    pub fn conversation(&self) -> ConversationId {
        self.conversation
    }

    /// Send a message: optimistic local append under a locally generated id
    /// and the local clock as ordering key, then the durable write.
    ///
    /// A blank body is rejected before any store or network effect.  On write
    /// failure the optimistic entry stays, flagged [`Delivery::Failed`]; there
    /// is no automatic rollback or retry.  Returns the local entry's id.
    pub async fn send(&self, body: &str) -> Result<Uuid, SendError> {
        if body.trim().is_empty() {
            return Err(SendError::EmptyBody);
        }

        let author = {
            let guard = self.store.lock().expect("store lock poisoned");
            guard
                .current_user()
                .map(|u| u.id)
                .ok_or(SendError::NoIdentity)?
        };
        let recipient = match self.conversation {
            ConversationId::Direct(pair) => {
                Some(pair.other(author).ok_or(SendError::NotParticipant)?)
            }
            ConversationId::Channel(_) => None,
        };

        let local_id = Uuid::new_v4();
        {
            let mut guard = self.store.lock().expect("store lock poisoned");
            guard.insert_message(Message {
                id: local_id,
                conversation: self.conversation,
                author_id: author,
                body: body.to_string(),
                created_at: Utc::now(),
                delivery: Delivery::Pending,
            });
        }

        let row = rows::outgoing_row(self.conversation, author, recipient, body);
        let written = self.backend.insert(self.conversation.collection(), row).await;

        // The channel may have been closed while the write was in flight;
        // suppress the effect rather than mutate a stale context.
        let stale = self.cancelled.load(Ordering::SeqCst);

        match written {
            Ok(_stored) => {
                if !stale {
                    let mut guard = self.store.lock().expect("store lock poisoned");
                    guard.set_delivery(self.conversation, local_id, Delivery::Sent);
                }
                debug!(id = %local_id, conversation = %self.conversation, "Message sent");
                Ok(local_id)
            }
            Err(e) => {
                if !stale {
                    let mut guard = self.store.lock().expect("store lock poisoned");
                    guard.set_delivery(self.conversation, local_id, Delivery::Failed);
                }
                warn!(id = %local_id, error = %e, "Durable write failed, entry flagged unsent");
                Err(SendError::SendFailed(e))
            }
        }
    }

    /// Tear down the live subscription and wait for the merge loop to finish.
    pub async fn close(mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        // Dropping the sender wakes the merge loop.
        self.cancel_tx.take();
        if let Some(task) = self.merge_loop.take() {
            let _ = task.await;
        }
        info!(conversation = %self.conversation, "Sync channel closed");
    }
}

impl<B> Drop for MessageSyncChannel<B> {
    fn drop(&mut self) {
        // Teardown without close(): cancel the merge loop so it drops the
        // feed guard; the remote registration must not outlive the channel.
        self.cancelled.store(true, Ordering::SeqCst);
        self.cancel_tx.take();
    }
}

async fn merge_loop(
    mut subscription: FeedSubscription,
    store: SharedStore,
    conversation: ConversationId,
    filter: Filter,
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
        // The feed is already filtered, but redelivery after a reconnect may
        // be broader; only merge rows that belong to this conversation.
        if event.collection != conversation.collection() || !filter.matches(&event.row) {
            continue;
        }

        if let Some(message) = rows::decode_row(conversation, &event.row) {
            let mut guard = store.lock().expect("store lock poisoned");
            guard.insert_message(message);
        }
    }

    debug!(conversation = %conversation, "Merge loop ended");
    // `subscription.guard` drops here, releasing the feed registration.
    drop(subscription);
}
