//! Redis pub/sub bus adapter.
//!
//! Producers `PUBLISH` JSON events on subjects such as
//! `notifications.post.like`; the worker holds a single `PSUBSCRIBE` on a
//! wildcard pattern so new subjects need no subscription change.

use futures::{Stream, StreamExt};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::models::event::{Action, NotificationEvent};

/// Default subscription pattern covering every notification subject.
pub const DEFAULT_SUBJECT_PATTERN: &str = "notifications.*.*";

/// A raw message taken off the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub subject: String,
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(subject: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            subject: subject.into(),
            payload: payload.into(),
        }
    }
}

/// Subject producers use for an action code.
pub fn subject_for(action: i32) -> String {
    let suffix = match Action::from_code(action) {
        Some(Action::LikePost) => "post.like",
        Some(Action::LikeComment) => "comment.like",
        Some(Action::ReplyPost) => "reply.post",
        Some(Action::ReplyComment) => "reply.comment",
        Some(Action::Mention) => "user.mention",
        Some(Action::Follow) => "user.follow",
        None => return format!("notifications.action.{}", action),
    };
    format!("notifications.{}", suffix)
}

/// Open a dedicated pub/sub connection and subscribe to `pattern`.
///
/// The stream ends when the connection drops.
pub async fn subscribe(
    redis_url: &str,
    pattern: &str,
) -> anyhow::Result<impl Stream<Item = BusMessage>> {
    let client = redis::Client::open(redis_url)?;
    let conn = client.get_async_connection().await?;
    let mut pubsub = conn.into_pubsub();
    pubsub.psubscribe(pattern).await?;

    tracing::info!(pattern, "subscribed to notification subjects");

    Ok(pubsub.into_on_message().map(|msg| BusMessage {
        subject: msg.get_channel_name().to_string(),
        payload: msg.get_payload_bytes().to_vec(),
    }))
}

/// Publish an event on `subject`. Returns the number of subscribers that
/// received it.
pub async fn publish(
    conn: &mut ConnectionManager,
    subject: &str,
    event: &NotificationEvent,
) -> anyhow::Result<usize> {
    let payload = serde_json::to_vec(event)?;
    let receivers: usize = conn.publish(subject, payload).await?;
    Ok(receivers)
}
