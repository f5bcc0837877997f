use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::event::ResourceType;
use crate::models::notification::Notification;

/// Event name listeners subscribe to on the recipient's channel.
pub const NEW_NOTIFICATION_EVENT: &str = "new-notification";

/// Per-recipient real-time channel.
pub fn channel_name(recipient: &str) -> String {
    format!("user-{}-notifications", recipient)
}

/// Body pushed to real-time listeners. Field names and presence are relied
/// on by the clients; every field is always serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FanoutPayload {
    pub id: Uuid,
    pub action: i32,
    pub username: String,
    pub user_id: String,
    pub user_pic: String,
    pub resource_id: String,
    pub resource_type: ResourceType,
    pub excerpt: String,
    pub read_status: bool,
    pub created_at: DateTime<Utc>,
    pub action_key: String,
}

impl From<&Notification> for FanoutPayload {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id,
            action: n.action,
            username: n.username.clone(),
            user_id: n.user_id.clone(),
            user_pic: n.user_pic.clone(),
            resource_id: n.resource_id.clone(),
            resource_type: n.resource_type,
            excerpt: n.excerpt.clone().unwrap_or_default(),
            read_status: n.read_status,
            created_at: n.created_at,
            action_key: n.action_key.clone(),
        }
    }
}

/// Real-time push backend.
/// Implementations: PusherClient (Pusher Channels HTTP API).
#[async_trait]
pub trait FanoutTransport: Send + Sync {
    async fn publish(
        &self,
        channel: &str,
        event: &str,
        payload: &FanoutPayload,
    ) -> anyhow::Result<()>;
}

/// Pushes freshly created notifications to their recipient in the
/// background. Delivery is best-effort: one attempt, failures are logged.
///
/// Clones share the same task tracker, so `drain` on any clone waits for
/// pushes spawned through all of them.
#[derive(Clone, Default)]
pub struct FanoutNotifier {
    transport: Option<Arc<dyn FanoutTransport>>,
    tasks: TaskTracker,
}

impl FanoutNotifier {
    pub fn new(transport: Option<Arc<dyn FanoutTransport>>) -> Self {
        Self {
            transport,
            tasks: TaskTracker::new(),
        }
    }

    /// A notifier with no transport; `dispatch` does nothing.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Number of pushes still running.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every push spawned so far to finish.
    pub async fn drain(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Spawn the push for `notification` and return immediately.
    ///
    /// The returned handle may be dropped; the task stays tracked until it
    /// finishes. Returns `None` when no transport is configured.
    pub fn dispatch(&self, notification: &Notification) -> Option<JoinHandle<()>> {
        let Some(transport) = self.transport.clone() else {
            debug!(owner = %notification.owner, "no fan-out transport configured, skipping");
            return None;
        };

        let channel = channel_name(&notification.owner);
        let payload = FanoutPayload::from(notification);

        Some(self.tasks.spawn(async move {
            match transport
                .publish(&channel, NEW_NOTIFICATION_EVENT, &payload)
                .await
            {
                Ok(()) => info!(channel = %channel, id = %payload.id, "real-time notification sent"),
                Err(e) => warn!(
                    channel = %channel,
                    id = %payload.id,
                    error = %e,
                    "real-time notification failed"
                ),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        calls: Mutex<Vec<(String, String, FanoutPayload)>>,
    }

    #[async_trait]
    impl FanoutTransport for RecordingTransport {
        async fn publish(
            &self,
            channel: &str,
            event: &str,
            payload: &FanoutPayload,
        ) -> anyhow::Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((channel.to_string(), event.to_string(), payload.clone()));
            Ok(())
        }
    }

    fn notification() -> Notification {
        Notification {
            id: Uuid::new_v4(),
            owner: "u1".into(),
            user_id: "u2".into(),
            username: "Jane".into(),
            user_pic: "https://example.com/jane.jpg".into(),
            user_bio: "bio".into(),
            action: 3,
            resource_type: ResourceType::Post,
            resource_id: "p1".into(),
            excerpt: None,
            action_key: "u2#p1#3#0001-01-01T00:00:00Z".into(),
            read_status: false,
            created_at: DateTime::<Utc>::from_timestamp(1000, 0).unwrap(),
        }
    }

    #[test]
    fn test_channel_name() {
        assert_eq!(channel_name("u1"), "user-u1-notifications");
    }

    #[test]
    fn test_payload_field_layout() {
        let payload = FanoutPayload::from(&notification());
        let json = serde_json::to_value(&payload).unwrap();
        let obj = json.as_object().unwrap();

        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "action",
                "action_key",
                "created_at",
                "excerpt",
                "id",
                "read_status",
                "resource_id",
                "resource_type",
                "user_id",
                "user_pic",
                "username",
            ]
        );
        assert_eq!(json["resource_type"], "POST");
        assert_eq!(json["excerpt"], "");
        assert_eq!(json["created_at"], "1970-01-01T00:16:40Z");
        assert_eq!(json["user_pic"], "https://example.com/jane.jpg");
    }

    #[tokio::test]
    async fn test_dispatch_publishes_on_recipient_channel() {
        let transport = Arc::new(RecordingTransport::default());
        let notifier = FanoutNotifier::new(Some(transport.clone() as Arc<dyn FanoutTransport>));
        assert!(notifier.is_enabled());

        let handle = notifier.dispatch(&notification()).expect("transport configured");
        handle.await.unwrap();

        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "user-u1-notifications");
        assert_eq!(calls[0].1, NEW_NOTIFICATION_EVENT);
        assert_eq!(calls[0].2.action, 3);
    }

    #[tokio::test]
    async fn test_drain_waits_for_dropped_handles() {
        struct SlowTransport(RecordingTransport);

        #[async_trait]
        impl FanoutTransport for SlowTransport {
            async fn publish(
                &self,
                channel: &str,
                event: &str,
                payload: &FanoutPayload,
            ) -> anyhow::Result<()> {
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                self.0.publish(channel, event, payload).await
            }
        }

        let transport = Arc::new(SlowTransport(RecordingTransport::default()));
        let notifier = FanoutNotifier::new(Some(transport.clone() as Arc<dyn FanoutTransport>));

        drop(notifier.dispatch(&notification()));
        drop(notifier.clone().dispatch(&notification()));
        assert_eq!(notifier.pending(), 2);

        notifier.drain().await;

        assert_eq!(notifier.pending(), 0);
        assert_eq!(transport.0.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_disabled_notifier_is_noop() {
        let notifier = FanoutNotifier::disabled();
        assert!(!notifier.is_enabled());
        assert!(notifier.dispatch(&notification()).is_none());
    }
}
