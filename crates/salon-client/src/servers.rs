//! Server, channel and contact operations.

use std::sync::Arc;

use bytes::Bytes;
use serde_json::json;
use tracing::info;

use salon_backend::{object_name, Backend, Filter};
use salon_shared::{ChannelKind, ServerId, UserId};
use salon_store::{Channel, Server, SharedStore};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::rows;

fn current_user_id(store: &SharedStore) -> Result<UserId, ClientError> {
    let guard = store.lock().expect("store lock poisoned");
    guard
        .current_user()
        .map(|u| u.id)
        .ok_or(ClientError::NotSignedIn)
}

/// Create a server owned by the current user, with an optional icon and a
/// default `general` text channel.
pub async fn create_server<B: Backend>(
    backend: &Arc<B>,
    store: &SharedStore,
    config: &ClientConfig,
    name: &str,
    icon: Option<(&str, Bytes)>,
) -> Result<Server, ClientError> {
    let owner = current_user_id(store)?;

    let icon_url = match icon {
        Some((file_name, data)) => {
            let object = object_name(file_name);
            let stored = backend.upload(&config.icon_bucket, &object, data).await?;
            Some(stored.path)
        }
        None => None,
    };

    let row = json!({
        "name": name,
        "icon_url": icon_url,
        "owner_id": owner.to_string(),
        "members": [owner.to_string()],
    })
    .as_object()
    .cloned()
    .unwrap_or_default();

    let stored = backend.insert("servers", row).await?;
    let server = rows::decode_server(&stored)?;

    let general = create_channel(backend, store, server.id, "general", ChannelKind::Text).await?;

    {
        let mut guard = store.lock().expect("store lock poisoned");
        guard.upsert_server(server.clone());
    }

    info!(server = %server.id, channel = %general.id, "Server created");
    Ok(server)
}

/// Create a channel inside a server.
pub async fn create_channel<B: Backend>(
    backend: &Arc<B>,
    store: &SharedStore,
    server: ServerId,
    name: &str,
    kind: ChannelKind,
) -> Result<Channel, ClientError> {
    current_user_id(store)?;

    let row = json!({
        "name": name,
        "kind": kind,
        "server_id": server.to_string(),
    })
    .as_object()
    .cloned()
    .unwrap_or_default();

    let stored = backend.insert("channels", row).await?;
    let channel = rows::decode_channel(&stored)?;

    let mut guard = store.lock().expect("store lock poisoned");
    guard.upsert_channel(channel.clone());

    Ok(channel)
}

/// Add a user to the current user's contact list.
pub async fn add_contact<B: Backend>(
    backend: &Arc<B>,
    store: &SharedStore,
    contact: UserId,
) -> Result<(), ClientError> {
    let user = current_user_id(store)?;

    let already_known = {
        let guard = store.lock().expect("store lock poisoned");
        guard.contacts().contains(&contact)
    };
    if already_known {
        return Ok(());
    }

    let row = json!({
        "user_id": user.to_string(),
        "contact_id": contact.to_string(),
    })
    .as_object()
    .cloned()
    .unwrap_or_default();

    backend.insert("user_contacts", row).await?;

    let mut guard = store.lock().expect("store lock poisoned");
    guard.add_contact(contact);

    info!(user = %user, contact = %contact, "Contact added");
    Ok(())
}

/// Look up users by exact username (the add-contact search box).
pub async fn find_user<B: Backend>(
    backend: &Arc<B>,
    username: &str,
) -> Result<Option<UserId>, ClientError> {
    let rows_found = backend
        .select("users", Filter::eq("username", username), None)
        .await?;

    Ok(rows_found
        .first()
        .map(rows::decode_user)
        .transpose()?
        .map(|u| u.id))
}
