use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use super::NotificationStore;
use crate::models::notification::Notification;

/// In-process store: notifications partitioned by recipient in a DashMap.
/// Lookups scan the recipient's partition, like the Postgres index does.
#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Arc<DashMap<String, Vec<Notification>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored notifications across all recipients.
    pub fn len(&self) -> usize {
        self.rows.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every notification stored for `recipient`, in insertion order.
    pub fn all_for(&self, recipient: &str) -> Vec<Notification> {
        self.rows
            .get(recipient)
            .map(|rows| rows.value().clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn find_by_recipient_and_key(
        &self,
        recipient: &str,
        action_key: &str,
    ) -> anyhow::Result<Option<Notification>> {
        Ok(self.rows.get(recipient).and_then(|rows| {
            rows.iter()
                .find(|n| n.action_key == action_key)
                .cloned()
        }))
    }

    async fn insert(&self, notification: &Notification) -> anyhow::Result<()> {
        self.rows
            .entry(notification.owner.clone())
            .or_default()
            .push(notification.clone());
        Ok(())
    }

    async fn list_by_recipient(
        &self,
        recipient: &str,
        limit: i64,
    ) -> anyhow::Result<Vec<Notification>> {
        let mut rows = self.all_for(recipient);
        // on equal timestamps the most recent insert comes first
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        rows.reverse();
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn mark_read(&self, recipient: &str, action_key: &str) -> anyhow::Result<bool> {
        let Some(mut rows) = self.rows.get_mut(recipient) else {
            return Ok(false);
        };
        let mut updated = false;
        for n in rows.iter_mut().filter(|n| n.action_key == action_key) {
            n.read_status = true;
            updated = true;
        }
        Ok(updated)
    }

    async fn count_unread(&self, recipient: &str) -> anyhow::Result<i64> {
        Ok(self
            .rows
            .get(recipient)
            .map(|rows| rows.iter().filter(|n| !n.read_status).count() as i64)
            .unwrap_or(0))
    }
}
