//! # salon-store
//!
//! The in-memory session cache: the single authoritative local view of the
//! current user, servers, channels, contacts, per-conversation message logs
//! and the presence set.
//!
//! The store holds no persistence — it is constructed empty at session start
//! and repopulated by the initial fetch.  It is shared as
//! `Arc<Mutex<LocalStore>>`; every mutation happens synchronously under the
//! lock, so observers never see a partially applied update.

pub mod events;
pub mod messages;
pub mod models;
pub mod presence;
pub mod store;

pub use events::StoreEvent;
pub use models::{CallState, Channel, Message, Server, UserProfile};
pub use store::{LocalStore, SharedStore};
