use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Event published on the bus whenever a user does something another user
/// should hear about. Every field defaults when absent so that a missing
/// required field is reported by the validator rather than the decoder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationEvent {
    /// User receiving the notification.
    pub owner: String,
    /// User who performed the action.
    pub trigger_user: String,
    pub username: String,
    pub user_picture: String,
    pub user_bio: String,
    /// Raw action code, see [`Action`].
    pub action: i32,
    /// POST, COMMENT or USER.
    pub resource_type: String,
    pub resource_id: String,
    pub excerpt: String,
    /// Unix timestamp (seconds) of the action.
    pub created_at: i64,
}

/// Known action codes. Codes outside this list are still accepted by the
/// pipeline so producers can introduce new actions first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    LikePost = 1,
    LikeComment = 2,
    ReplyPost = 3,
    ReplyComment = 4,
    Mention = 5,
    Follow = 6,
}

impl Action {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Action::LikePost),
            2 => Some(Action::LikeComment),
            3 => Some(Action::ReplyPost),
            4 => Some(Action::ReplyComment),
            5 => Some(Action::Mention),
            6 => Some(Action::Follow),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::LikePost => "like_post",
            Action::LikeComment => "like_comment",
            Action::ReplyPost => "reply_post",
            Action::ReplyComment => "reply_comment",
            Action::Mention => "mention",
            Action::Follow => "follow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceType {
    Post,
    Comment,
    User,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Post => "POST",
            ResourceType::Comment => "COMMENT",
            ResourceType::User => "USER",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource type '{0}'")]
pub struct UnknownResourceType(pub String);

impl FromStr for ResourceType {
    type Err = UnknownResourceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "POST" => Ok(ResourceType::Post),
            "COMMENT" => Ok(ResourceType::Comment),
            "USER" => Ok(ResourceType::User),
            other => Err(UnknownResourceType(other.to_string())),
        }
    }
}
