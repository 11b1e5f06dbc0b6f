//! Authentication and session bootstrap.
//!
//! On success the current user lands in the store and the initial fetch
//! populates servers, channels and contacts.  Auth failures surface to the
//! caller; the form stays editable and nothing is retried.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use salon_backend::{AuthUser, Backend, Credentials, Filter, Order};
use salon_shared::PresenceStatus;
use salon_store::{SharedStore, UserProfile};

use crate::error::ClientError;
use crate::rows;

/// Create an account, seed the profile row and bootstrap the session.
pub async fn sign_up<B: Backend>(
    backend: &Arc<B>,
    store: &SharedStore,
    credentials: &Credentials,
) -> Result<UserProfile, ClientError> {
    let auth_user = backend.sign_up(credentials).await?;

    let username = credentials
        .username
        .clone()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| auth_user.email.clone());

    let row = json!({
        "id": auth_user.id.to_string(),
        "username": username,
        "avatar_url": null,
        "status": PresenceStatus::Online.as_str(),
    })
    .as_object()
    .cloned()
    .unwrap_or_default();

    let stored = backend.insert("users", row).await?;
    let profile = rows::decode_user(&stored)?;

    info!(user = %profile.id, "Account created");
    finish_sign_in(backend, store, profile.clone()).await?;
    Ok(profile)
}

/// Sign in and bootstrap the session.
pub async fn sign_in<B: Backend>(
    backend: &Arc<B>,
    store: &SharedStore,
    credentials: &Credentials,
) -> Result<UserProfile, ClientError> {
    let auth_user = backend.sign_in(credentials).await?;
    let profile = load_or_seed_profile(backend, &auth_user).await?;

    info!(user = %profile.id, "Signed in");
    finish_sign_in(backend, store, profile.clone()).await?;
    Ok(profile)
}

/// Fetch the profile row for an authenticated user, creating it when the
/// sign-up flow never got to write one.
async fn load_or_seed_profile<B: Backend>(
    backend: &Arc<B>,
    auth_user: &AuthUser,
) -> Result<UserProfile, ClientError> {
    let existing = backend
        .select("users", Filter::eq("id", auth_user.id.to_string()), None)
        .await?;

    if let Some(row) = existing.first() {
        return rows::decode_user(row);
    }

    let row = json!({
        "id": auth_user.id.to_string(),
        "username": auth_user.username.clone().unwrap_or_else(|| auth_user.email.clone()),
        "avatar_url": null,
        "status": PresenceStatus::Online.as_str(),
    })
    .as_object()
    .cloned()
    .unwrap_or_default();

    let stored = backend.insert("users", row).await?;
    rows::decode_user(&stored)
}

async fn finish_sign_in<B: Backend>(
    backend: &Arc<B>,
    store: &SharedStore,
    profile: UserProfile,
) -> Result<(), ClientError> {
    let user_id = profile.id;
    {
        let mut guard = store.lock().expect("store lock poisoned");
        guard.set_current_user(Some(profile));
    }

    // Initial fetch: sidebar data.
    let server_rows = backend
        .select("servers", Filter::all([]), Some(Order::asc("created_at")))
        .await?;
    let channel_rows = backend
        .select("channels", Filter::all([]), Some(Order::asc("created_at")))
        .await?;
    let contact_rows = backend
        .select(
            "user_contacts",
            Filter::eq("user_id", user_id.to_string()),
            Some(Order::asc("created_at")),
        )
        .await?;

    let servers = server_rows
        .iter()
        .map(rows::decode_server)
        .collect::<Result<Vec<_>, _>>()?;
    let channels = channel_rows
        .iter()
        .map(rows::decode_channel)
        .collect::<Result<Vec<_>, _>>()?;
    let contacts = contact_rows
        .iter()
        .filter_map(|row| {
            row.get("contact_id")
                .and_then(serde_json::Value::as_str)
                .and_then(|s| uuid::Uuid::parse_str(s).ok())
                .map(salon_shared::UserId)
        })
        .collect();

    let mut guard = store.lock().expect("store lock poisoned");
    guard.set_servers(servers);
    guard.set_channels(channels);
    guard.set_contacts(contacts);

    info!(
        servers = guard.servers().len(),
        channels = guard.channels().len(),
        "Session bootstrapped"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use salon_backend::MemoryBackend;
    use salon_store::LocalStore;

    fn credentials(email: &str, username: Option<&str>) -> Credentials {
        Credentials {
            email: email.to_string(),
            password: "motdepasse".to_string(),
            username: username.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn sign_up_seeds_profile_and_store() {
        let backend = Arc::new(MemoryBackend::new());
        let store = LocalStore::shared();

        let profile = sign_up(&backend, &store, &credentials("ana@example.com", Some("ana")))
            .await
            .unwrap();

        assert_eq!(profile.username, "ana");
        assert_eq!(profile.status, PresenceStatus::Online);

        let guard = store.lock().unwrap();
        assert_eq!(guard.current_user().unwrap().id, profile.id);
    }

    #[tokio::test]
    async fn sign_in_reuses_the_profile_row() {
        let backend = Arc::new(MemoryBackend::new());
        let store = LocalStore::shared();
        let creds = credentials("ana@example.com", Some("ana"));

        let created = sign_up(&backend, &store, &creds).await.unwrap();

        let store2 = LocalStore::shared();
        let loaded = sign_in(&backend, &store2, &creds).await.unwrap();
        assert_eq!(loaded.id, created.id);
        assert_eq!(loaded.username, "ana");
    }

    #[tokio::test]
    async fn failed_sign_in_leaves_store_untouched() {
        let backend = Arc::new(MemoryBackend::new());
        let store = LocalStore::shared();

        let result = sign_in(&backend, &store, &credentials("nobody@example.com", None)).await;
        assert!(matches!(result, Err(ClientError::Auth(_))));
        assert!(store.lock().unwrap().current_user().is_none());
    }
}
