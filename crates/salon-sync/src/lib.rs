//! # salon-sync
//!
//! Keeps the local store consistent with the remote source of truth:
//! [`MessageSyncChannel`] reconciles one conversation's message history
//! (initial bulk fetch, live change-feed merge, optimistic send), and
//! [`PresenceTracker`] maintains the online set.
//!
//! Both are scoped resources: construction opens the live subscription,
//! `close().await` tears it down, and plain `Drop` still releases the feed
//! registration so teardown on every exit path is guaranteed.

pub mod channel;
pub mod error;
pub mod presence;
mod rows;

pub use channel::MessageSyncChannel;
pub use error::SendError;
pub use presence::PresenceTracker;
