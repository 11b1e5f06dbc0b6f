use thiserror::Error;

use salon_backend::QueryError;

/// Errors from [`crate::MessageSyncChannel::send`].
#[derive(Error, Debug)]
pub enum SendError {
    #[error("Message body is empty")]
    EmptyBody,

    #[error("No authenticated user")]
    NoIdentity,

    #[error("Sender is not a participant of this conversation")]
    NotParticipant,

    /// The durable write failed.  The optimistic entry stays in the store,
    /// flagged unsent; the caller decides whether to offer a resend.
    #[error("Durable write failed: {0}")]
    SendFailed(#[from] QueryError),
}
