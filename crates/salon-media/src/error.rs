use thiserror::Error;

use crate::session::SessionState;

/// Errors from the device-capture layer.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Permission denied for {0}")]
    PermissionDenied(&'static str),

    #[error("No capture device available")]
    NoDevice,

    #[error("Device error: {0}")]
    Device(String),
}

/// Errors from a [`crate::MediaSession`].
#[derive(Error, Debug)]
pub enum MediaError {
    /// `start()` failed; the session is spent.  Retry by constructing a new
    /// session.
    #[error("Device acquisition failed: {0}")]
    DeviceAcquisition(#[source] CaptureError),

    /// Screen share could not start.  The session stays active; only this
    /// feature is unavailable.
    #[error("Screen capture failed: {0}")]
    ScreenCapture(#[source] CaptureError),

    #[error("Invalid operation in state {0:?}")]
    InvalidState(SessionState),
}
