use serde::{Deserialize, Serialize};
use uuid::Uuid;

// User identity = the hosted identity provider's stable UUID
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ChannelId(pub Uuid);

impl ChannelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ServerId(pub Uuid);

impl ServerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ServerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ServerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a channel carries text messages or voice sessions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Text,
    Voice,
}

/// An unordered pair of user ids identifying a direct conversation.
///
/// Construction canonicalises the order so that `(a, b)` and `(b, a)` compare
/// and hash identically.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DirectPair {
    first: UserId,
    second: UserId,
}

impl DirectPair {
    pub fn new(a: UserId, b: UserId) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    pub fn first(&self) -> UserId {
        self.first
    }

    pub fn second(&self) -> UserId {
        self.second
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.first == user || self.second == user
    }

    /// The counterpart of `user` in this pair, or `None` if `user` is not a member.
    pub fn other(&self, user: UserId) -> Option<UserId> {
        if user == self.first {
            Some(self.second)
        } else if user == self.second {
            Some(self.first)
        } else {
            None
        }
    }
}

/// The scope of one message stream: a server channel or a DM pair.
///
/// Immutable once selected; navigation replaces it wholesale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ConversationId {
    Channel(ChannelId),
    Direct(DirectPair),
}

impl ConversationId {
    /// The record-store collection holding this conversation's messages.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Channel(_) => "messages",
            Self::Direct(_) => "direct_messages",
        }
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel(id) => write!(f, "channel:{id}"),
            Self::Direct(pair) => write!(f, "direct:{}:{}", pair.first(), pair.second()),
        }
    }
}

/// A user's visibility status as shown in the member list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Idle,
    Dnd,
    Offline,
}

impl PresenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Idle => "idle",
            Self::Dnd => "dnd",
            Self::Offline => "offline",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "online" => Some(Self::Online),
            "idle" => Some(Self::Idle),
            "dnd" => Some(Self::Dnd),
            "offline" => Some(Self::Offline),
            _ => None,
        }
    }
}

impl std::fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery state of a locally visible message.
///
/// `Pending` entries were appended optimistically and are waiting for the
/// durable write to acknowledge; `Failed` entries stay visible so the caller
/// can offer a manual resend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    Pending,
    Sent,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_pair_is_unordered() {
        let a = UserId(Uuid::new_v4());
        let b = UserId(Uuid::new_v4());
        assert_eq!(DirectPair::new(a, b), DirectPair::new(b, a));
        assert_eq!(DirectPair::new(a, b).other(a), Some(b));
        assert_eq!(DirectPair::new(a, b).other(b), Some(a));
    }

    #[test]
    fn presence_status_round_trip() {
        for s in [
            PresenceStatus::Online,
            PresenceStatus::Idle,
            PresenceStatus::Dnd,
            PresenceStatus::Offline,
        ] {
            assert_eq!(PresenceStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(PresenceStatus::parse("away"), None);
    }
}
