//! Row codecs for the `users`, `servers` and `channels` collections.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use salon_backend::Row;
use salon_shared::{ChannelId, ChannelKind, PresenceStatus, ServerId, UserId};
use salon_store::{Channel, Server, UserProfile};

use crate::error::ClientError;

pub(crate) fn decode_user(row: &Row) -> Result<UserProfile, ClientError> {
    let malformed = || ClientError::MalformedRow("users");

    Ok(UserProfile {
        id: UserId(uuid_column(row, "id").ok_or_else(malformed)?),
        username: str_column(row, "username")
            .ok_or_else(malformed)?
            .to_string(),
        avatar_url: str_column(row, "avatar_url").map(str::to_string),
        status: str_column(row, "status")
            .and_then(PresenceStatus::parse)
            .unwrap_or(PresenceStatus::Offline),
        created_at: timestamp_column(row).unwrap_or_else(Utc::now),
    })
}

pub(crate) fn decode_server(row: &Row) -> Result<Server, ClientError> {
    let malformed = || ClientError::MalformedRow("servers");

    let members = row
        .get("members")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|s| Uuid::parse_str(s).ok())
                .map(UserId)
                .collect()
        })
        .unwrap_or_default();

    Ok(Server {
        id: ServerId(uuid_column(row, "id").ok_or_else(malformed)?),
        name: str_column(row, "name").ok_or_else(malformed)?.to_string(),
        icon_url: str_column(row, "icon_url").map(str::to_string),
        owner_id: UserId(uuid_column(row, "owner_id").ok_or_else(malformed)?),
        members,
        created_at: timestamp_column(row).unwrap_or_else(Utc::now),
    })
}

pub(crate) fn decode_channel(row: &Row) -> Result<Channel, ClientError> {
    let malformed = || ClientError::MalformedRow("channels");

    let kind = match str_column(row, "kind") {
        Some("voice") => ChannelKind::Voice,
        _ => ChannelKind::Text,
    };

    Ok(Channel {
        id: ChannelId(uuid_column(row, "id").ok_or_else(malformed)?),
        name: str_column(row, "name").ok_or_else(malformed)?.to_string(),
        kind,
        server_id: uuid_column(row, "server_id").map(ServerId),
        created_at: timestamp_column(row).unwrap_or_else(Utc::now),
    })
}

fn str_column<'a>(row: &'a Row, column: &str) -> Option<&'a str> {
    row.get(column).and_then(Value::as_str)
}

fn uuid_column(row: &Row, column: &str) -> Option<Uuid> {
    str_column(row, column).and_then(|s| Uuid::parse_str(s).ok())
}

fn timestamp_column(row: &Row) -> Option<DateTime<Utc>> {
    str_column(row, "created_at")
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
