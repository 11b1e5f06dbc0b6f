//! Presence-set operations.
//!
//! Membership is unbounded, scoped to whatever the visible server and contact
//! lists reference.  A user absent from the set reads as offline.

use salon_shared::{PresenceStatus, UserId};

use crate::events::StoreEvent;
use crate::store::LocalStore;

impl LocalStore {
    /// Last-known status for a user; absent entries read as offline.
    pub fn presence(&self, user: UserId) -> PresenceStatus {
        self.presence
            .get(&user)
            .copied()
            .unwrap_or(PresenceStatus::Offline)
    }

    /// Users currently known to be online.
    pub fn online_users(&self) -> Vec<UserId> {
        self.presence
            .iter()
            .filter(|(_, status)| **status == PresenceStatus::Online)
            .map(|(user, _)| *user)
            .collect()
    }

    /// Upsert one user's status.  Unknown users are inserted.
    pub fn set_presence(&mut self, user: UserId, status: PresenceStatus) {
        let previous = self.presence.insert(user, status);
        if previous != Some(status) {
            self.emit(StoreEvent::PresenceChanged { user });
        }
    }

    /// Replace the whole online set: listed users become online, every other
    /// tracked user becomes offline.
    pub fn apply_online_snapshot(&mut self, online: impl IntoIterator<Item = UserId>) {
        for status in self.presence.values_mut() {
            *status = PresenceStatus::Offline;
        }
        for user in online {
            self.presence.insert(user, PresenceStatus::Online);
        }
        self.emit(StoreEvent::PresenceSnapshotApplied);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn unknown_user_reads_offline() {
        let store = LocalStore::new();
        assert_eq!(
            store.presence(UserId(Uuid::new_v4())),
            PresenceStatus::Offline
        );
    }

    #[test]
    fn snapshot_replaces_online_set() {
        let mut store = LocalStore::new();
        let (a, b, c) = (
            UserId(Uuid::new_v4()),
            UserId(Uuid::new_v4()),
            UserId(Uuid::new_v4()),
        );

        store.apply_online_snapshot([a, b]);
        assert_eq!(store.presence(a), PresenceStatus::Online);
        assert_eq!(store.presence(b), PresenceStatus::Online);

        store.apply_online_snapshot([c]);
        assert_eq!(store.presence(a), PresenceStatus::Offline);
        assert_eq!(store.presence(b), PresenceStatus::Offline);
        assert_eq!(store.presence(c), PresenceStatus::Online);
    }

    #[test]
    fn incremental_update_wins_over_stale_snapshot_state() {
        let mut store = LocalStore::new();
        let user = UserId(Uuid::new_v4());

        store.apply_online_snapshot([user]);
        store.set_presence(user, PresenceStatus::Dnd);

        assert_eq!(store.presence(user), PresenceStatus::Dnd);
        assert!(store.online_users().is_empty());
    }

    #[test]
    fn no_event_for_unchanged_status() {
        let mut store = LocalStore::new();
        let user = UserId(Uuid::new_v4());
        store.set_presence(user, PresenceStatus::Idle);

        let mut rx = store.subscribe();
        store.set_presence(user, PresenceStatus::Idle);
        assert!(rx.try_recv().is_err());
    }
}
