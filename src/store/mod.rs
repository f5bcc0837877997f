pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::models::notification::Notification;

/// Durable notification storage.
/// Implementations: PgStore (PostgreSQL), MemoryStore (in-process, tests and local runs).
///
/// Lookups by key are served by a per-recipient index with the key applied
/// as a filter; no implementation is required to enforce key uniqueness.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Find any stored notification for `recipient` carrying `action_key`.
    async fn find_by_recipient_and_key(
        &self,
        recipient: &str,
        action_key: &str,
    ) -> anyhow::Result<Option<Notification>>;

    /// Persist a new notification.
    async fn insert(&self, notification: &Notification) -> anyhow::Result<()>;

    /// Most recent notifications for `recipient`, newest first.
    async fn list_by_recipient(
        &self,
        recipient: &str,
        limit: i64,
    ) -> anyhow::Result<Vec<Notification>>;

    /// Mark the notification(s) with this key as read.
    /// Returns false when nothing matched.
    async fn mark_read(&self, recipient: &str, action_key: &str) -> anyhow::Result<bool>;

    async fn count_unread(&self, recipient: &str) -> anyhow::Result<i64>;
}
