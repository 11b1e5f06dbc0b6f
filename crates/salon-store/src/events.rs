//! Typed change notifications emitted by the store.
//!
//! Consumers subscribe with [`crate::LocalStore::subscribe`]; dropping the
//! returned receiver unregisters it.

use uuid::Uuid;

use salon_shared::{ConversationId, UserId};

/// What changed in the store.  Events carry identifiers, not entity bodies;
/// consumers re-read the store for the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    CurrentUserChanged,
    ServersChanged,
    ChannelsChanged,
    ContactsChanged,
    MessageInserted {
        conversation: ConversationId,
        id: Uuid,
    },
    /// A message's delivery flag changed.
    MessageUpdated {
        conversation: ConversationId,
        id: Uuid,
    },
    ConversationUnloaded {
        conversation: ConversationId,
    },
    PresenceChanged {
        user: UserId,
    },
    /// The whole online set was replaced by a snapshot.
    PresenceSnapshotApplied,
    CallStateChanged,
}
