//! Session coordination: conversation selection and call lifecycle.
//!
//! Conversation switches are serialised: the previous sync channel and
//! presence tracker are fully closed (teardown awaited) before the new ones
//! open, so there is never more than one live message subscription and no
//! event is ever attributed to the wrong conversation.
//!
//! Call sessions are independent of the selection: switching conversations
//! never tears a call down; only closing the call UI does.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use salon_backend::Backend;
use salon_media::{DeviceCapture, MediaSession};
use salon_shared::ConversationId;
use salon_store::{CallState, SharedStore};
use salon_sync::{MessageSyncChannel, PresenceTracker};

use crate::error::ClientError;

pub struct SessionCoordinator<B, C> {
    backend: Arc<B>,
    store: SharedStore,
    sync: Option<MessageSyncChannel<B>>,
    presence: Option<PresenceTracker>,
    call: Option<MediaSession<C>>,
}

impl<B, C> SessionCoordinator<B, C>
where
    B: Backend + 'static,
    C: DeviceCapture,
{
    pub fn new(backend: Arc<B>, store: SharedStore) -> Self {
        Self {
            backend,
            store,
            sync: None,
            presence: None,
            call: None,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn conversation(&self) -> Option<ConversationId> {
        self.sync.as_ref().map(MessageSyncChannel::conversation)
    }

    pub fn presence(&self) -> Option<&PresenceTracker> {
        self.presence.as_ref()
    }

    /// Switch the active conversation.
    ///
    /// Closes the previous sync channel and presence tracker completely
    /// before opening the new scope; selecting the already-active
    /// conversation is a no-op.
    pub async fn select_conversation(
        &mut self,
        conversation: ConversationId,
    ) -> Result<(), ClientError> {
        if let Some(active) = &self.sync {
            if active.conversation() == conversation {
                return Ok(());
            }
        }

        if let Some(previous) = self.sync.take() {
            let previous_conversation = previous.conversation();
            previous.close().await;
            let mut guard = self.store.lock().expect("store lock poisoned");
            guard.unload_conversation(previous_conversation);
        }
        if let Some(tracker) = self.presence.take() {
            tracker.close().await;
        }

        let sync =
            MessageSyncChannel::open(self.backend.clone(), self.store.clone(), conversation)
                .await?;
        let presence = PresenceTracker::open(self.backend.as_ref(), self.store.clone())?;

        self.sync = Some(sync);
        self.presence = Some(presence);

        info!(conversation = %conversation, "Conversation selected");
        Ok(())
    }

    /// Leave the current conversation, tearing its subscriptions down.
    pub async fn clear_selection(&mut self) {
        if let Some(previous) = self.sync.take() {
            let previous_conversation = previous.conversation();
            previous.close().await;
            let mut guard = self.store.lock().expect("store lock poisoned");
            guard.unload_conversation(previous_conversation);
        }
        if let Some(tracker) = self.presence.take() {
            tracker.close().await;
        }
    }

    /// Send a message in the active conversation.
    pub async fn send_message(&self, body: &str) -> Result<Uuid, ClientError> {
        let sync = self.sync.as_ref().ok_or(ClientError::NoActiveConversation)?;
        Ok(sync.send(body).await?)
    }

    // -- call lifecycle ------------------------------------------------------

    /// Start a call in `conversation`, acquiring local media.
    ///
    /// An acquisition failure ends the new session immediately and leaves no
    /// call active; the caller may retry with a fresh capture handle.
    pub async fn start_call(
        &mut self,
        conversation: ConversationId,
        capture: C,
    ) -> Result<(), ClientError> {
        if self.call.is_some() {
            return Err(ClientError::CallInProgress);
        }

        let mut session = MediaSession::new(capture);
        session.start().await?;

        {
            let mut guard = self.store.lock().expect("store lock poisoned");
            guard.set_call(Some(CallState::started(conversation)));
        }
        self.call = Some(session);

        info!(conversation = %conversation, "Call started");
        Ok(())
    }

    pub fn toggle_mute(&mut self) -> Result<bool, ClientError> {
        let session = self.call.as_mut().ok_or(ClientError::NoActiveCall)?;
        let muted = session.toggle_mute()?;
        let mut guard = self.store.lock().expect("store lock poisoned");
        guard.update_call(|call| call.muted = muted);
        Ok(muted)
    }

    pub fn toggle_video(&mut self) -> Result<bool, ClientError> {
        let session = self.call.as_mut().ok_or(ClientError::NoActiveCall)?;
        let enabled = session.toggle_video()?;
        let mut guard = self.store.lock().expect("store lock poisoned");
        guard.update_call(|call| call.video_enabled = enabled);
        Ok(enabled)
    }

    pub async fn start_screen_share(&mut self) -> Result<(), ClientError> {
        let session = self.call.as_mut().ok_or(ClientError::NoActiveCall)?;
        session.start_screen_share().await?;
        let mut guard = self.store.lock().expect("store lock poisoned");
        guard.update_call(|call| call.screen_sharing = true);
        Ok(())
    }

    /// Resolves when the active screen share ends on the device side and the
    /// camera has been restored.  Pending while no share is running.
    pub async fn screen_share_ended(&mut self) {
        match self.call.as_mut() {
            Some(session) => {
                session.screen_share_ended().await;
                let mut guard = self.store.lock().expect("store lock poisoned");
                guard.update_call(|call| call.screen_sharing = false);
            }
            None => std::future::pending().await,
        }
    }

    /// End the active call, releasing every device track.
    pub fn end_call(&mut self) -> Result<(), ClientError> {
        let mut session = self.call.take().ok_or(ClientError::NoActiveCall)?;
        session.end();
        let mut guard = self.store.lock().expect("store lock poisoned");
        guard.set_call(None);
        info!("Call ended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use salon_backend::{Credentials, MemoryBackend, Records};
    use salon_media::{CaptureError, MediaStream, MediaTrack, TrackKind};
    use salon_shared::ChannelId;
    use salon_store::LocalStore;

    use crate::auth;

    struct GrantAllCapture;

    #[async_trait]
    impl DeviceCapture for GrantAllCapture {
        async fn get_user_media(
            &self,
            audio: bool,
            video: bool,
        ) -> Result<MediaStream, CaptureError> {
            let mut tracks = Vec::new();
            if audio {
                tracks.push(MediaTrack::new(TrackKind::Audio).0);
            }
            if video {
                tracks.push(MediaTrack::new(TrackKind::Video).0);
            }
            Ok(MediaStream::new(tracks))
        }

        async fn get_display_media(&self) -> Result<MediaStream, CaptureError> {
            Ok(MediaStream::new(vec![MediaTrack::new(TrackKind::Video).0]))
        }
    }

    async fn signed_in_coordinator(
    ) -> (Arc<MemoryBackend>, SessionCoordinator<MemoryBackend, GrantAllCapture>) {
        let backend = Arc::new(MemoryBackend::new());
        let store = LocalStore::shared();
        auth::sign_up(
            &backend,
            &store,
            &Credentials {
                email: "ana@example.com".into(),
                password: "motdepasse".into(),
                username: Some("ana".into()),
            },
        )
        .await
        .unwrap();
        let coordinator = SessionCoordinator::new(backend.clone(), store);
        (backend, coordinator)
    }

    fn channel_message(channel: ChannelId, body: &str) -> salon_backend::Row {
        json!({
            "channel_id": channel.to_string(),
            "author_id": uuid::Uuid::new_v4().to_string(),
            "content": body,
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    async fn wait_for_count(
        store: &SharedStore,
        conversation: ConversationId,
        count: usize,
    ) {
        for _ in 0..200 {
            if store.lock().unwrap().messages(conversation).len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("timed out waiting for {count} messages");
    }

    #[tokio::test]
    async fn switching_keeps_exactly_one_live_scope() {
        let (backend, mut coordinator) = signed_in_coordinator().await;
        let (channel_a, channel_b) = (ChannelId::new(), ChannelId::new());
        let conv_a = ConversationId::Channel(channel_a);
        let conv_b = ConversationId::Channel(channel_b);

        coordinator.select_conversation(conv_a).await.unwrap();
        // One message subscription plus the presence tracker.
        assert_eq!(backend.subscription_count(), 2);

        backend
            .insert("messages", channel_message(channel_a, "sur A"))
            .await
            .unwrap();
        wait_for_count(coordinator.store(), conv_a, 1).await;

        coordinator.select_conversation(conv_b).await.unwrap();
        assert_eq!(backend.subscription_count(), 2);
        assert_eq!(coordinator.conversation(), Some(conv_b));

        // A's view is unloaded and no longer subscribed: a late insert on A
        // must not mutate anything.
        backend
            .insert("messages", channel_message(channel_a, "trop tard"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let guard = coordinator.store().lock().unwrap();
        assert!(guard.messages(conv_a).is_empty());
        assert!(guard.messages(conv_b).is_empty());
        drop(guard);

        backend
            .insert("messages", channel_message(channel_b, "sur B"))
            .await
            .unwrap();
        wait_for_count(coordinator.store(), conv_b, 1).await;
    }

    #[tokio::test]
    async fn selecting_active_conversation_is_a_noop() {
        let (backend, mut coordinator) = signed_in_coordinator().await;
        let conv = ConversationId::Channel(ChannelId::new());

        coordinator.select_conversation(conv).await.unwrap();
        coordinator.select_conversation(conv).await.unwrap();

        assert_eq!(backend.subscription_count(), 2);
    }

    #[tokio::test]
    async fn send_requires_an_active_conversation() {
        let (_, coordinator) = signed_in_coordinator().await;

        let result = coordinator.send_message("bonjour").await;
        assert!(matches!(result, Err(ClientError::NoActiveConversation)));
    }

    #[tokio::test]
    async fn call_survives_conversation_switch() {
        let (_, mut coordinator) = signed_in_coordinator().await;
        let conv_a = ConversationId::Channel(ChannelId::new());
        let conv_b = ConversationId::Channel(ChannelId::new());

        coordinator.select_conversation(conv_a).await.unwrap();
        coordinator.start_call(conv_a, GrantAllCapture).await.unwrap();

        coordinator.select_conversation(conv_b).await.unwrap();

        let guard = coordinator.store().lock().unwrap();
        let call = guard.call().expect("call should survive the switch");
        assert_eq!(call.conversation, conv_a);
        drop(guard);

        coordinator.end_call().unwrap();
        assert!(coordinator.store().lock().unwrap().call().is_none());
        assert!(matches!(
            coordinator.end_call(),
            Err(ClientError::NoActiveCall)
        ));
    }

    #[tokio::test]
    async fn call_flags_mirror_into_the_store() {
        let (_, mut coordinator) = signed_in_coordinator().await;
        let conv = ConversationId::Channel(ChannelId::new());

        coordinator.start_call(conv, GrantAllCapture).await.unwrap();

        assert!(coordinator.toggle_mute().unwrap());
        assert!(!coordinator.toggle_video().unwrap());
        coordinator.start_screen_share().await.unwrap();

        let guard = coordinator.store().lock().unwrap();
        let call = guard.call().unwrap();
        assert!(call.muted);
        assert!(!call.video_enabled);
        assert!(call.screen_sharing);
        drop(guard);

        assert!(matches!(
            coordinator.start_call(conv, GrantAllCapture).await,
            Err(ClientError::CallInProgress)
        ));
    }
}
