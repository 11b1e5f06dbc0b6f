use thiserror::Error;

use salon_backend::{AuthError, QueryError, SubscriptionError, UploadError};
use salon_media::MediaError;
use salon_sync::SendError;

/// Errors surfaced to the presentation layer.
///
/// None of these are fatal to the process; each is scoped to the failing
/// operation or session instance.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Subscription error: {0}")]
    Subscription(#[from] SubscriptionError),

    #[error("Send error: {0}")]
    Send(#[from] SendError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("No authenticated user")]
    NotSignedIn,

    #[error("No active conversation")]
    NoActiveConversation,

    #[error("Already in a call")]
    CallInProgress,

    #[error("Not in a call")]
    NoActiveCall,

    #[error("Malformed {0} row from the record store")]
    MalformedRow(&'static str),
}
