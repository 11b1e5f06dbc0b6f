//! Device capture seam: streams, tracks and the acquisition trait.
//!
//! A [`MediaTrack`] is the client-side handle to one captured device track.
//! Its [`TrackController`] counterpart stays with the capture implementation,
//! which uses it to signal device-side end-of-track (e.g. the user stopping a
//! screen share from OS chrome).  Tracks are released exactly once: `stop`
//! is guarded and release is observable through the controller.

use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::error::CaptureError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// One captured device track.
#[derive(Debug)]
pub struct MediaTrack {
    id: Uuid,
    kind: TrackKind,
    enabled: bool,
    stopped: bool,
    ended_rx: watch::Receiver<bool>,
    releases: Arc<AtomicU32>,
}

/// Device-side handle for a track, held by the capture implementation.
#[derive(Debug)]
pub struct TrackController {
    ended_tx: watch::Sender<bool>,
    releases: Arc<AtomicU32>,
}

impl MediaTrack {
    /// Create a track plus its device-side controller.
    pub fn new(kind: TrackKind) -> (Self, TrackController) {
        let (ended_tx, ended_rx) = watch::channel(false);
        let releases = Arc::new(AtomicU32::new(0));
        let track = Self {
            id: Uuid::new_v4(),
            kind,
            enabled: true,
            stopped: false,
            ended_rx,
            releases: releases.clone(),
        };
        (track, TrackController { ended_tx, releases })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    /// Pause or resume the track without releasing the device.
    pub fn set_enabled(&mut self, enabled: bool) {
        if !self.stopped {
            self.enabled = enabled;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && !self.stopped
    }

    /// Release the underlying device handle.  Guarded; a second call is a
    /// no-op.
    pub fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Watch channel carrying the device-side end-of-track notification.
    pub fn ended(&self) -> watch::Receiver<bool> {
        self.ended_rx.clone()
    }
}

impl TrackController {
    /// Signal device-side end of the track.
    pub fn end(&self) {
        let _ = self.ended_tx.send(true);
    }

    /// How many times the client released the track.  Stays at most 1.
    pub fn release_count(&self) -> u32 {
        self.releases.load(Ordering::SeqCst)
    }
}

/// A set of tracks acquired together.
#[derive(Debug)]
pub struct MediaStream {
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    /// Flip the enabled flag on every track of `kind`.
    pub fn set_enabled(&mut self, kind: TrackKind, enabled: bool) {
        for track in self.tracks.iter_mut().filter(|t| t.kind() == kind) {
            track.set_enabled(enabled);
        }
    }

    /// Whether any live track of `kind` is enabled.
    pub fn is_enabled(&self, kind: TrackKind) -> bool {
        self.tracks
            .iter()
            .any(|t| t.kind() == kind && t.is_enabled())
    }

    /// End-of-track watch for the first video track, if any.
    pub fn video_ended(&self) -> Option<watch::Receiver<bool>> {
        self.tracks
            .iter()
            .find(|t| t.kind() == TrackKind::Video)
            .map(MediaTrack::ended)
    }

    /// Release every track.
    pub fn stop_all(&mut self) {
        for track in &mut self.tracks {
            track.stop();
        }
    }
}

/// Acquisition of local capture devices.
#[async_trait]
pub trait DeviceCapture: Send + Sync {
    /// Request microphone and/or camera capture.
    async fn get_user_media(&self, audio: bool, video: bool)
        -> Result<MediaStream, CaptureError>;

    /// Request display capture (video only).
    async fn get_display_media(&self) -> Result<MediaStream, CaptureError>;
}
