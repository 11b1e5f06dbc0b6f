//! # salon-media
//!
//! Local media for voice/video calls: the device-capture seam
//! ([`DeviceCapture`], [`MediaStream`], [`MediaTrack`]) and the
//! [`MediaSession`] state machine that owns the acquired tracks for the
//! lifetime of one call.

pub mod capture;
pub mod error;
pub mod session;

pub use capture::{DeviceCapture, MediaStream, MediaTrack, TrackController, TrackKind};
pub use error::{CaptureError, MediaError};
pub use session::{MediaSession, SessionState};
