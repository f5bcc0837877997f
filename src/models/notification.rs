use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::ResourceType;

/// A stored notification. One row per (owner, action_key).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    /// User receiving the notification.
    pub owner: String,
    /// User who triggered it, plus a snapshot of their profile.
    pub user_id: String,
    pub username: String,
    pub user_pic: String,
    pub user_bio: String,
    pub action: i32,
    pub resource_type: ResourceType,
    pub resource_id: String,
    pub excerpt: Option<String>,
    /// Deduplication key, see [`crate::dispatch::action_key`].
    pub action_key: String,
    pub read_status: bool,
    /// Time of the originating action, not of processing.
    pub created_at: DateTime<Utc>,
}

/// A validated, not yet persisted notification. The writer assigns the id,
/// the deduplication key and the read status.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub owner: String,
    pub user_id: String,
    pub username: String,
    pub user_pic: String,
    pub user_bio: String,
    pub action: i32,
    pub resource_type: ResourceType,
    pub resource_id: String,
    pub excerpt: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewNotification {
    pub fn into_notification(self, id: Uuid, action_key: String) -> Notification {
        Notification {
            id,
            owner: self.owner,
            user_id: self.user_id,
            username: self.username,
            user_pic: self.user_pic,
            user_bio: self.user_bio,
            action: self.action,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            excerpt: self.excerpt,
            action_key,
            read_status: false,
            created_at: self.created_at,
        }
    }
}
