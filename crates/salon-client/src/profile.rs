//! Profile updates: username, presence status, avatar.

use std::sync::Arc;

use bytes::Bytes;
use serde_json::json;
use tracing::info;

use salon_backend::{object_name, Backend, Filter, Row, UploadError};
use salon_shared::{PresenceStatus, UserId};
use salon_store::SharedStore;

use crate::config::ClientConfig;
use crate::error::ClientError;

fn current_user_id(store: &SharedStore) -> Result<UserId, ClientError> {
    let guard = store.lock().expect("store lock poisoned");
    guard
        .current_user()
        .map(|u| u.id)
        .ok_or(ClientError::NotSignedIn)
}

/// Update username and/or status, then patch the store's current user.
pub async fn update_profile<B: Backend>(
    backend: &Arc<B>,
    store: &SharedStore,
    username: Option<String>,
    status: Option<PresenceStatus>,
) -> Result<(), ClientError> {
    let user_id = current_user_id(store)?;

    let username = username
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let mut patch = Row::new();
    if let Some(ref name) = username {
        patch.insert("username".to_string(), json!(name));
    }
    if let Some(status) = status {
        patch.insert("status".to_string(), json!(status.as_str()));
    }
    if patch.is_empty() {
        return Ok(());
    }

    backend
        .update("users", Filter::eq("id", user_id.to_string()), patch)
        .await?;

    let mut guard = store.lock().expect("store lock poisoned");
    guard.update_current_user(|user| {
        if let Some(name) = username {
            user.username = name;
        }
        if let Some(status) = status {
            user.status = status;
        }
    });

    info!(user = %user_id, "Profile updated");
    Ok(())
}

/// Upload a new avatar under a collision-resistant object name and point the
/// profile row at it.  Returns the stored object path.
pub async fn upload_avatar<B: Backend>(
    backend: &Arc<B>,
    store: &SharedStore,
    config: &ClientConfig,
    file_name: &str,
    data: Bytes,
) -> Result<String, ClientError> {
    let user_id = current_user_id(store)?;

    if data.len() > config.max_upload_bytes {
        return Err(ClientError::Upload(UploadError::TooLarge {
            size: data.len(),
            max: config.max_upload_bytes,
        }));
    }

    let object = object_name(file_name);
    let stored = backend.upload(&config.avatar_bucket, &object, data).await?;

    let mut patch = Row::new();
    patch.insert("avatar_url".to_string(), json!(stored.path));
    backend
        .update("users", Filter::eq("id", user_id.to_string()), patch)
        .await?;

    let path = stored.path.clone();
    let mut guard = store.lock().expect("store lock poisoned");
    guard.update_current_user(|user| user.avatar_url = Some(stored.path));

    info!(user = %user_id, path = %path, "Avatar updated");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    use salon_backend::{Credentials, MemoryBackend};
    use salon_store::LocalStore;

    use crate::auth;

    async fn signed_in() -> (Arc<MemoryBackend>, SharedStore) {
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
        (backend, store)
    }

    #[tokio::test]
    async fn update_profile_patches_row_and_store() {
        let (backend, store) = signed_in().await;

        update_profile(&backend, &store, Some("ana2".into()), Some(PresenceStatus::Dnd))
            .await
            .unwrap();

        let guard = store.lock().unwrap();
        let user = guard.current_user().unwrap();
        assert_eq!(user.username, "ana2");
        assert_eq!(user.status, PresenceStatus::Dnd);
    }

    #[tokio::test]
    async fn upload_avatar_stores_blob_and_patches_profile() {
        let (backend, store) = signed_in().await;
        let config = ClientConfig::default();

        let path = upload_avatar(
            &backend,
            &store,
            &config,
            "me.png",
            Bytes::from_static(b"fake-png"),
        )
        .await
        .unwrap();

        assert!(path.starts_with("avatars/"));
        assert!(path.ends_with(".png"));

        let guard = store.lock().unwrap();
        assert_eq!(
            guard.current_user().unwrap().avatar_url.as_deref(),
            Some(path.as_str())
        );
    }

    #[tokio::test]
    async fn operations_require_sign_in() {
        let backend = Arc::new(MemoryBackend::new());
        let store = LocalStore::shared();

        let result = update_profile(&backend, &store, Some("x".into()), None).await;
        assert!(matches!(result, Err(ClientError::NotSignedIn)));
    }
}
