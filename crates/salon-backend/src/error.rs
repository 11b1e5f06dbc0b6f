use thiserror::Error;

/// Errors surfaced by the identity provider.
///
/// Shown to the user as-is; the form stays editable and no retry is attempted.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account already exists for this email")]
    AccountExists,

    #[error("Provider rejected the request: {0}")]
    Rejected(String),
}

/// Errors from the durable record store.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Malformed row: {0}")]
    MalformedRow(String),

    #[error("Write rejected: {0}")]
    WriteRejected(String),

    #[error("Record store unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the blob store.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Empty blob")]
    EmptyBlob,

    #[error("Blob too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Blob storage error: {0}")]
    Storage(String),
}

/// Errors opening a live change-feed subscription (or a conversation that
/// needs one).
#[derive(Error, Debug)]
pub enum SubscriptionError {
    #[error("No authenticated user")]
    NoIdentity,

    #[error("Initial fetch failed: {0}")]
    InitialFetch(String),

    #[error("Change feed unavailable: {0}")]
    FeedUnavailable(String),
}
