//! # salon-shared
//!
//! Domain types shared by every Salon crate: identifier newtypes, the
//! conversation scope (channel or direct-message pair), presence status and
//! message delivery state.

pub mod types;

pub use types::{
    ChannelId, ChannelKind, ConversationId, Delivery, DirectPair, PresenceStatus, ServerId, UserId,
};
