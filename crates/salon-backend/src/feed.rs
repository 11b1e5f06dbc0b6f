//! Change feed: push notification of row inserts.
//!
//! Delivery is at-least-once; a reconnect may replay events the consumer has
//! already seen, so consumers deduplicate by entity id.  A subscription is a
//! scoped resource: dropping its guard unregisters the client from remote
//! fan-out, so teardown on every exit path comes for free.

use tokio::sync::mpsc;

use crate::error::SubscriptionError;
use crate::records::{Filter, Row};

/// A row-insert notification.
#[derive(Debug, Clone)]
pub struct InsertEvent {
    pub collection: String,
    pub row: Row,
}

/// A live subscription: the event receiver plus the RAII guard keeping the
/// registration alive.
pub struct FeedSubscription {
    pub events: mpsc::Receiver<InsertEvent>,
    pub guard: SubscriptionGuard,
}

/// Unregisters the subscription when dropped.
pub struct SubscriptionGuard {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionGuard {
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl std::fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("armed", &self.unsubscribe.is_some())
            .finish()
    }
}

pub trait ChangeFeed: Send + Sync {
    /// Register for inserts into `collection` whose rows match `filter`.
    fn subscribe(
        &self,
        collection: &str,
        filter: Filter,
    ) -> Result<FeedSubscription, SubscriptionError>;
}
