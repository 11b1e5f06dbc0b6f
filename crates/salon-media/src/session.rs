//! Call-session lifecycle.
//!
//! One [`MediaSession`] per active call.  States: `Idle → Acquiring → Active
//! → Ended`; muting, camera toggling and screen share are Active-only
//! sub-flags and never change the state identity.  Ended is terminal — a new
//! call constructs a new session.

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::capture::{DeviceCapture, MediaStream, TrackKind};
use crate::error::MediaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Acquiring,
    Active,
    Ended,
}

/// Owns the local capture for one call.
///
/// The camera stream is exclusively owned here and released deterministically
/// on every exit path: `end()`, drop, or a fatal acquisition error.
pub struct MediaSession<C> {
    capture: C,
    state: SessionState,
    camera: Option<MediaStream>,
    display: Option<MediaStream>,
    display_ended: Option<watch::Receiver<bool>>,
    muted: bool,
    video_enabled: bool,
}

impl<C: DeviceCapture> MediaSession<C> {
    pub fn new(capture: C) -> Self {
        Self {
            capture,
            state: SessionState::Idle,
            camera: None,
            display: None,
            display_ended: None,
            muted: false,
            video_enabled: true,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_video_enabled(&self) -> bool {
        self.video_enabled
    }

    pub fn is_screen_sharing(&self) -> bool {
        self.display.is_some()
    }

    /// Acquire microphone and camera and go active.
    ///
    /// Denial or device failure ends the session; the caller retries by
    /// constructing a new one.
    pub async fn start(&mut self) -> Result<(), MediaError> {
        if self.state != SessionState::Idle {
            return Err(MediaError::InvalidState(self.state));
        }

        self.state = SessionState::Acquiring;
        match self.capture.get_user_media(true, true).await {
            Ok(stream) => {
                self.camera = Some(stream);
                self.muted = false;
                self.video_enabled = true;
                self.state = SessionState::Active;
                info!("Call media acquired");
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Ended;
                warn!(error = %e, "Device acquisition failed, session ended");
                Err(MediaError::DeviceAcquisition(e))
            }
        }
    }

    /// Flip microphone mute.  Returns the new muted flag.
    pub fn toggle_mute(&mut self) -> Result<bool, MediaError> {
        if self.state != SessionState::Active {
            return Err(MediaError::InvalidState(self.state));
        }

        self.muted = !self.muted;
        if let Some(camera) = self.camera.as_mut() {
            camera.set_enabled(TrackKind::Audio, !self.muted);
        }
        debug!(muted = self.muted, "Mute toggled");
        Ok(self.muted)
    }

    /// Flip the camera feed.  Returns the new enabled flag.
    pub fn toggle_video(&mut self) -> Result<bool, MediaError> {
        if self.state != SessionState::Active {
            return Err(MediaError::InvalidState(self.state));
        }

        self.video_enabled = !self.video_enabled;
        if let Some(camera) = self.camera.as_mut() {
            camera.set_enabled(TrackKind::Video, self.video_enabled);
        }
        debug!(video = self.video_enabled, "Video toggled");
        Ok(self.video_enabled)
    }

    /// Substitute display capture for the outgoing video.
    ///
    /// The camera stream is kept (not released) so it can be restored when
    /// sharing stops.  Denial leaves the session active with sharing off.
    pub async fn start_screen_share(&mut self) -> Result<(), MediaError> {
        if self.state != SessionState::Active {
            return Err(MediaError::InvalidState(self.state));
        }
        if self.display.is_some() {
            debug!("Screen share already active");
            return Ok(());
        }

        match self.capture.get_display_media().await {
            Ok(stream) => {
                self.display_ended = stream.video_ended();
                self.display = Some(stream);
                info!("Screen share started");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Screen capture failed, call continues");
                Err(MediaError::ScreenCapture(e))
            }
        }
    }

    /// Stop sharing and restore the camera as the outgoing video source.
    pub fn stop_screen_share(&mut self) {
        if let Some(mut display) = self.display.take() {
            display.stop_all();
            self.display_ended = None;
            info!("Screen share stopped, camera restored");
        }
    }

    /// Resolves when the active display stream's video track ends on the
    /// device side (the user stopped sharing via OS chrome) and reverts to
    /// the camera.  Pending while no share is active.
    pub async fn screen_share_ended(&mut self) {
        match self.display_ended.as_mut() {
            Some(ended) => {
                // A dropped sender also means the track is gone.
                let _ = ended.wait_for(|has_ended| *has_ended).await;
                debug!("Display track ended");
                self.stop_screen_share();
            }
            None => std::future::pending().await,
        }
    }

    /// End the call, releasing every acquired track.  Idempotent.
    pub fn end(&mut self) {
        if self.state == SessionState::Ended {
            debug!("end() on ended session, ignoring");
            return;
        }

        self.release_all();
        self.state = SessionState::Ended;
        info!("Media session ended");
    }
}

impl<C> MediaSession<C> {
    fn release_all(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            camera.stop_all();
        }
        if let Some(mut display) = self.display.take() {
            display.stop_all();
        }
        self.display_ended = None;
    }
}

impl<C> Drop for MediaSession<C> {
    fn drop(&mut self) {
        // Abnormal teardown still releases every device handle.
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::capture::{MediaTrack, TrackController};
    use crate::error::CaptureError;

    /// Capture double recording every controller it hands out.
    #[derive(Default)]
    struct FakeCapture {
        deny_user_media: bool,
        deny_display: bool,
        camera_controllers: Arc<Mutex<Vec<TrackController>>>,
        display_controllers: Arc<Mutex<Vec<TrackController>>>,
    }

    #[async_trait]
    impl DeviceCapture for FakeCapture {
        async fn get_user_media(
            &self,
            audio: bool,
            video: bool,
        ) -> Result<MediaStream, CaptureError> {
            if self.deny_user_media {
                return Err(CaptureError::PermissionDenied("camera"));
            }
            let mut tracks = Vec::new();
            let mut controllers = self.camera_controllers.lock().unwrap();
            if audio {
                let (track, controller) = MediaTrack::new(TrackKind::Audio);
                tracks.push(track);
                controllers.push(controller);
            }
            if video {
                let (track, controller) = MediaTrack::new(TrackKind::Video);
                tracks.push(track);
                controllers.push(controller);
            }
            Ok(MediaStream::new(tracks))
        }

        async fn get_display_media(&self) -> Result<MediaStream, CaptureError> {
            if self.deny_display {
                return Err(CaptureError::PermissionDenied("screen"));
            }
            let (track, controller) = MediaTrack::new(TrackKind::Video);
            self.display_controllers.lock().unwrap().push(controller);
            Ok(MediaStream::new(vec![track]))
        }
    }

    #[tokio::test]
    async fn toggles_outside_active_are_invalid_state() {
        let mut session = MediaSession::new(FakeCapture::default());

        assert!(matches!(
            session.toggle_mute(),
            Err(MediaError::InvalidState(SessionState::Idle))
        ));

        session.start().await.unwrap();
        session.end();

        assert!(matches!(
            session.toggle_mute(),
            Err(MediaError::InvalidState(SessionState::Ended))
        ));
        assert!(matches!(
            session.toggle_video(),
            Err(MediaError::InvalidState(SessionState::Ended))
        ));
    }

    #[tokio::test]
    async fn denied_acquisition_ends_the_session() {
        let mut session = MediaSession::new(FakeCapture {
            deny_user_media: true,
            ..Default::default()
        });

        assert!(matches!(
            session.start().await,
            Err(MediaError::DeviceAcquisition(_))
        ));
        assert_eq!(session.state(), SessionState::Ended);

        // Spent instance: starting again is invalid.
        assert!(matches!(
            session.start().await,
            Err(MediaError::InvalidState(SessionState::Ended))
        ));
    }

    #[tokio::test]
    async fn start_activates_with_both_tracks_enabled() {
        let mut session = MediaSession::new(FakeCapture::default());
        session.start().await.unwrap();

        assert_eq!(session.state(), SessionState::Active);
        assert!(!session.is_muted());
        assert!(session.is_video_enabled());

        assert!(session.toggle_mute().unwrap());
        assert!(!session.toggle_video().unwrap());
        assert!(!session.toggle_mute().unwrap());
    }

    #[tokio::test]
    async fn display_track_end_reverts_to_camera() {
        let capture = FakeCapture::default();
        let display_controllers = capture.display_controllers.clone();
        let camera_controllers = capture.camera_controllers.clone();
        let mut session = MediaSession::new(capture);

        session.start().await.unwrap();
        session.start_screen_share().await.unwrap();
        assert!(session.is_screen_sharing());

        // User stops sharing from OS chrome.
        display_controllers.lock().unwrap()[0].end();
        session.screen_share_ended().await;

        assert!(!session.is_screen_sharing());
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(display_controllers.lock().unwrap()[0].release_count(), 1);
        // Camera stream was held, not destroyed.
        for controller in camera_controllers.lock().unwrap().iter() {
            assert_eq!(controller.release_count(), 0);
        }
    }

    #[tokio::test]
    async fn denied_screen_share_leaves_call_active() {
        let mut session = MediaSession::new(FakeCapture {
            deny_display: true,
            ..Default::default()
        });
        session.start().await.unwrap();

        assert!(matches!(
            session.start_screen_share().await,
            Err(MediaError::ScreenCapture(_))
        ));
        assert_eq!(session.state(), SessionState::Active);
        assert!(!session.is_screen_sharing());
    }

    #[tokio::test]
    async fn double_end_is_idempotent_and_releases_once() {
        let capture = FakeCapture::default();
        let camera_controllers = capture.camera_controllers.clone();
        let display_controllers = capture.display_controllers.clone();
        let mut session = MediaSession::new(capture);

        session.start().await.unwrap();
        session.start_screen_share().await.unwrap();

        session.end();
        session.end();

        assert_eq!(session.state(), SessionState::Ended);
        for controller in camera_controllers
            .lock()
            .unwrap()
            .iter()
            .chain(display_controllers.lock().unwrap().iter())
        {
            assert_eq!(controller.release_count(), 1);
        }
    }

    #[tokio::test]
    async fn drop_releases_acquired_tracks() {
        let capture = FakeCapture::default();
        let camera_controllers = capture.camera_controllers.clone();
        let mut session = MediaSession::new(capture);
        session.start().await.unwrap();

        drop(session);

        for controller in camera_controllers.lock().unwrap().iter() {
            assert_eq!(controller.release_count(), 1);
        }
    }
}
