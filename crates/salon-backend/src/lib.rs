//! # salon-backend
//!
//! Trait seams for the hosted backend-as-a-service the client is built
//! against: identity provider, durable record store, blob store and the
//! row-insert change feed.  The rest of the workspace only ever talks to
//! these traits; the [`memory::MemoryBackend`] implementation backs
//! development and tests.

pub mod blobs;
pub mod error;
pub mod feed;
pub mod identity;
pub mod memory;
pub mod records;

pub use blobs::{object_name, Blobs, StoredBlob};
pub use error::{AuthError, QueryError, SubscriptionError, UploadError};
pub use feed::{ChangeFeed, FeedSubscription, InsertEvent, SubscriptionGuard};
pub use identity::{AuthUser, Credentials, IdentityProvider};
pub use memory::MemoryBackend;
pub use records::{Direction, Filter, Order, Records, Row};

/// The full capability set a Salon client needs from the hosted service.
///
/// Blanket-implemented for anything providing all four collaborator traits,
/// so components can be generic over a single bound.
pub trait Backend: IdentityProvider + Records + Blobs + ChangeFeed + Send + Sync {}

impl<T> Backend for T where T: IdentityProvider + Records + Blobs + ChangeFeed + Send + Sync {}
