//! The store aggregate and its entity-group accessors.
//!
//! Message-log and presence operations live in sibling modules
//! ([`crate::messages`], [`crate::presence`]) as further `impl LocalStore`
//! blocks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use salon_shared::{ChannelId, ConversationId, PresenceStatus, ServerId, UserId};

use crate::events::StoreEvent;
use crate::models::{CallState, Channel, Message, Server, UserProfile};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How the store is shared between the coordinator, the sync loops and the
/// presentation layer.
pub type SharedStore = Arc<Mutex<LocalStore>>;

/// Single mutable aggregate for all session-scoped entities.
pub struct LocalStore {
    current_user: Option<UserProfile>,
    servers: Vec<Server>,
    channels: Vec<Channel>,
    contacts: Vec<UserId>,
    pub(crate) messages: HashMap<ConversationId, Vec<Message>>,
    pub(crate) presence: HashMap<UserId, PresenceStatus>,
    call: Option<CallState>,
    events: broadcast::Sender<StoreEvent>,
}

impl LocalStore {
    /// Create an empty store.  Call once per session.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            current_user: None,
            servers: Vec::new(),
            channels: Vec::new(),
            contacts: Vec::new(),
            messages: HashMap::new(),
            presence: HashMap::new(),
            call: None,
            events,
        }
    }

    /// Create an empty store already wrapped for sharing.
    pub fn shared() -> SharedStore {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Register a change observer.  Dropping the receiver unregisters it.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: StoreEvent) {
        // Send only fails when no observer is registered, which is fine.
        let _ = self.events.send(event);
    }

    // -- current user --------------------------------------------------------

    pub fn current_user(&self) -> Option<&UserProfile> {
        self.current_user.as_ref()
    }

    pub fn set_current_user(&mut self, user: Option<UserProfile>) {
        self.current_user = user;
        self.emit(StoreEvent::CurrentUserChanged);
    }

    /// Patch the current user in place; no-op when signed out.
    pub fn update_current_user(&mut self, patch: impl FnOnce(&mut UserProfile)) {
        if let Some(user) = self.current_user.as_mut() {
            patch(user);
            self.emit(StoreEvent::CurrentUserChanged);
        }
    }

    // -- servers -------------------------------------------------------------

    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    pub fn set_servers(&mut self, servers: Vec<Server>) {
        self.servers = servers;
        self.emit(StoreEvent::ServersChanged);
    }

    pub fn upsert_server(&mut self, server: Server) {
        match self.servers.iter_mut().find(|s| s.id == server.id) {
            Some(existing) => *existing = server,
            None => self.servers.push(server),
        }
        self.emit(StoreEvent::ServersChanged);
    }

    pub fn server(&self, id: ServerId) -> Option<&Server> {
        self.servers.iter().find(|s| s.id == id)
    }

    // -- channels ------------------------------------------------------------

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn set_channels(&mut self, channels: Vec<Channel>) {
        self.channels = channels;
        self.emit(StoreEvent::ChannelsChanged);
    }

    pub fn upsert_channel(&mut self, channel: Channel) {
        match self.channels.iter_mut().find(|c| c.id == channel.id) {
            Some(existing) => *existing = channel,
            None => self.channels.push(channel),
        }
        self.emit(StoreEvent::ChannelsChanged);
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }

    // -- contacts ------------------------------------------------------------

    pub fn contacts(&self) -> &[UserId] {
        &self.contacts
    }

    pub fn set_contacts(&mut self, contacts: Vec<UserId>) {
        self.contacts = contacts;
        self.emit(StoreEvent::ContactsChanged);
    }

    pub fn add_contact(&mut self, contact: UserId) {
        if !self.contacts.contains(&contact) {
            self.contacts.push(contact);
            self.emit(StoreEvent::ContactsChanged);
        }
    }

    // -- call state ----------------------------------------------------------

    pub fn call(&self) -> Option<&CallState> {
        self.call.as_ref()
    }

    pub fn set_call(&mut self, call: Option<CallState>) {
        self.call = call;
        self.emit(StoreEvent::CallStateChanged);
    }

    /// Patch the active call's flags; no-op when no call is running.
    pub fn update_call(&mut self, patch: impl FnOnce(&mut CallState)) {
        if let Some(call) = self.call.as_mut() {
            patch(call);
            self.emit(StoreEvent::CallStateChanged);
        }
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}
