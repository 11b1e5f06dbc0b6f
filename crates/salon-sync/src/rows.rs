//! Row codecs: between record-store JSON rows and [`Message`] entities.
//!
//! Channel messages live in the `messages` collection
//! (`channel_id` / `author_id` columns), direct messages in
//! `direct_messages` (`sender_id` / `recipient_id`).

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use salon_backend::{Filter, Row};
use salon_shared::{ConversationId, Delivery, UserId};
use salon_store::Message;

/// The predicate scoping a record-store query or feed subscription to one
/// conversation.
pub(crate) fn conversation_filter(conversation: ConversationId) -> Filter {
    match conversation {
        ConversationId::Channel(channel) => Filter::eq("channel_id", channel.to_string()),
        ConversationId::Direct(pair) => {
            let (a, b) = (pair.first().to_string(), pair.second().to_string());
            Filter::any([
                Filter::all([
                    Filter::eq("sender_id", a.clone()),
                    Filter::eq("recipient_id", b.clone()),
                ]),
                Filter::all([
                    Filter::eq("sender_id", b),
                    Filter::eq("recipient_id", a),
                ]),
            ])
        }
    }
}

/// Build the insert row for an outgoing message.  `id` and `created_at` are
/// left for the service to assign.
pub(crate) fn outgoing_row(
    conversation: ConversationId,
    author: UserId,
    recipient: Option<UserId>,
    body: &str,
) -> Row {
    let value = match conversation {
        ConversationId::Channel(channel) => json!({
            "channel_id": channel.to_string(),
            "author_id": author.to_string(),
            "content": body,
        }),
        ConversationId::Direct(_) => json!({
            "sender_id": author.to_string(),
            "recipient_id": recipient.map(|r| r.to_string()),
            "content": body,
        }),
    };
    value.as_object().cloned().unwrap_or_default()
}

/// Decode a stored row into a [`Message`].  Malformed rows are logged and
/// skipped rather than failing the stream.
pub(crate) fn decode_row(conversation: ConversationId, row: &Row) -> Option<Message> {
    let id = parse_uuid(row.get("id"))?;
    let author_column = match conversation {
        ConversationId::Channel(_) => "author_id",
        ConversationId::Direct(_) => "sender_id",
    };
    let author = parse_uuid(row.get(author_column));
    let body = row.get("content").and_then(Value::as_str);
    let created_at = row
        .get("created_at")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    match (author, body, created_at) {
        (Some(author), Some(body), Some(created_at)) => Some(Message {
            id,
            conversation,
            author_id: UserId(author),
            body: body.to_string(),
            created_at,
            delivery: Delivery::Sent,
        }),
        _ => {
            warn!(id = %id, conversation = %conversation, "Malformed message row, skipping");
            None
        }
    }
}

fn parse_uuid(value: Option<&Value>) -> Option<Uuid> {
    value.and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use salon_shared::{ChannelId, DirectPair};

    #[test]
    fn decode_rejects_missing_columns() {
        let conversation = ConversationId::Channel(ChannelId::new());
        let row = json!({
            "id": Uuid::new_v4().to_string(),
            "content": "salut",
        })
        .as_object()
        .cloned()
        .unwrap();

        assert!(decode_row(conversation, &row).is_none());
    }

    #[test]
    fn direct_filter_matches_both_directions() {
        let (a, b) = (UserId(Uuid::new_v4()), UserId(Uuid::new_v4()));
        let filter = conversation_filter(ConversationId::Direct(DirectPair::new(a, b)));

        let row = outgoing_row(
            ConversationId::Direct(DirectPair::new(a, b)),
            b,
            Some(a),
            "ça va ?",
        );
        assert!(filter.matches(&row));
    }
}
