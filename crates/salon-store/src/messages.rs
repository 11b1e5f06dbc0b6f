//! Message-log operations: ordered merge, idempotent insertion, delivery
//! flag updates.
//!
//! Invariant: within one conversation the log is ordered non-decreasing by
//! `created_at`, and each message id appears exactly once.  Cross-conversation
//! ordering is unspecified; each conversation is an independent stream.

use tracing::debug;
use uuid::Uuid;

use salon_shared::{ConversationId, Delivery};

use crate::events::StoreEvent;
use crate::models::Message;
use crate::store::LocalStore;

impl LocalStore {
    /// Merge a message into its conversation's log.
    ///
    /// Inserts at the position keeping `created_at` non-decreasing; ties go
    /// after existing entries so arrival order is preserved among equal
    /// timestamps.  A duplicate id is a no-op (the change feed is
    /// at-least-once).  Returns whether the message was inserted.
    pub fn insert_message(&mut self, message: Message) -> bool {
        let log = self.messages.entry(message.conversation).or_default();

        if log.iter().any(|m| m.id == message.id) {
            debug!(id = %message.id, "Duplicate message id, ignoring");
            return false;
        }

        let position = log.partition_point(|m| m.created_at <= message.created_at);
        let conversation = message.conversation;
        let id = message.id;
        log.insert(position, message);

        self.emit(StoreEvent::MessageInserted { conversation, id });
        true
    }

    /// The ordered log for one conversation.
    pub fn messages(&self, conversation: ConversationId) -> &[Message] {
        self.messages
            .get(&conversation)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Update a message's delivery flag.  Returns whether the message exists.
    pub fn set_delivery(
        &mut self,
        conversation: ConversationId,
        id: Uuid,
        delivery: Delivery,
    ) -> bool {
        let Some(log) = self.messages.get_mut(&conversation) else {
            return false;
        };
        let Some(message) = log.iter_mut().find(|m| m.id == id) else {
            return false;
        };

        message.delivery = delivery;
        self.emit(StoreEvent::MessageUpdated { conversation, id });
        true
    }

    /// Drop a conversation's log.  The only way messages leave the store.
    pub fn unload_conversation(&mut self, conversation: ConversationId) {
        if self.messages.remove(&conversation).is_some() {
            self.emit(StoreEvent::ConversationUnloaded { conversation });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use salon_shared::{ChannelId, UserId};

    fn conversation() -> ConversationId {
        ConversationId::Channel(ChannelId::new())
    }

    fn message(conversation: ConversationId, id: Uuid, at_ms: i64) -> Message {
        Message {
            id,
            conversation,
            author_id: UserId(Uuid::new_v4()),
            body: "bonjour".to_string(),
            created_at: Utc.timestamp_millis_opt(at_ms).unwrap(),
            delivery: Delivery::Sent,
        }
    }

    #[test]
    fn out_of_order_arrival_is_sorted_by_timestamp() {
        let mut store = LocalStore::new();
        let conv = conversation();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        // Arrival order [100, 200, 150] must store as [a, c, b].
        assert!(store.insert_message(message(conv, a, 100)));
        assert!(store.insert_message(message(conv, b, 200)));
        assert!(store.insert_message(message(conv, c, 150)));

        let ids: Vec<Uuid> = store.messages(conv).iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![a, c, b]);
    }

    #[test]
    fn duplicate_ids_are_idempotent() {
        let mut store = LocalStore::new();
        let conv = conversation();
        let id = Uuid::new_v4();

        assert!(store.insert_message(message(conv, id, 100)));
        assert!(!store.insert_message(message(conv, id, 100)));
        // Redelivery after reconnect may carry the same id again.
        assert!(!store.insert_message(message(conv, id, 999)));

        assert_eq!(store.messages(conv).len(), 1);
    }

    #[test]
    fn equal_timestamps_keep_arrival_order() {
        let mut store = LocalStore::new();
        let conv = conversation();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        store.insert_message(message(conv, a, 100));
        store.insert_message(message(conv, b, 100));

        let ids: Vec<Uuid> = store.messages(conv).iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn conversations_are_independent_streams() {
        let mut store = LocalStore::new();
        let (conv_a, conv_b) = (conversation(), conversation());

        store.insert_message(message(conv_a, Uuid::new_v4(), 100));
        store.insert_message(message(conv_b, Uuid::new_v4(), 50));

        assert_eq!(store.messages(conv_a).len(), 1);
        assert_eq!(store.messages(conv_b).len(), 1);

        store.unload_conversation(conv_a);
        assert!(store.messages(conv_a).is_empty());
        assert_eq!(store.messages(conv_b).len(), 1);
    }

    #[test]
    fn set_delivery_flags_existing_message() {
        let mut store = LocalStore::new();
        let conv = conversation();
        let id = Uuid::new_v4();
        let mut msg = message(conv, id, 100);
        msg.delivery = Delivery::Pending;
        store.insert_message(msg);

        assert!(store.set_delivery(conv, id, Delivery::Failed));
        assert_eq!(store.messages(conv)[0].delivery, Delivery::Failed);

        assert!(!store.set_delivery(conv, Uuid::new_v4(), Delivery::Sent));
    }
}
