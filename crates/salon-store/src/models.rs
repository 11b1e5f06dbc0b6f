//! Domain model structs held in the local store.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the UI layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use salon_shared::{ChannelId, ChannelKind, ConversationId, Delivery, PresenceStatus, ServerId, UserId};

// ---------------------------------------------------------------------------
// User profile
// ---------------------------------------------------------------------------

/// A user as shown in member lists and the profile editor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    /// Object path of the avatar in the blob store, if one was uploaded.
    pub avatar_url: Option<String>,
    pub status: PresenceStatus,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Server (guild)
// ---------------------------------------------------------------------------

/// A server that groups channels and members.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Server {
    pub id: ServerId,
    pub name: String,
    /// Object path of the server icon in the blob store.
    pub icon_url: Option<String>,
    pub owner_id: UserId,
    pub members: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    pub kind: ChannelKind,
    /// `None` for channels outside any server.
    pub server_id: Option<ServerId>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Call state
// ---------------------------------------------------------------------------

/// UI-facing snapshot of the active call.
///
/// The media session owns the streams; the store only mirrors the flags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallState {
    pub conversation: ConversationId,
    pub muted: bool,
    pub video_enabled: bool,
    pub screen_sharing: bool,
}

impl CallState {
    pub fn started(conversation: ConversationId) -> Self {
        Self {
            conversation,
            muted: false,
            video_enabled: true,
            screen_sharing: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message as held in the local log.
///
/// Never mutated after creation except for its [`Delivery`] flag; removed
/// only when the conversation is unloaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Entity id.  Server-assigned for synced rows, locally generated for
    /// optimistic entries that have not been acknowledged yet.
    pub id: Uuid,
    pub conversation: ConversationId,
    pub author_id: UserId,
    pub body: String,
    /// Server timestamp for synced rows; the local clock serves as the
    /// placeholder ordering key for optimistic entries.
    pub created_at: DateTime<Utc>,
    pub delivery: Delivery,
}
