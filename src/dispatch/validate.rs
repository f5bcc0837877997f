use chrono::{DateTime, Utc};

use crate::errors::ValidationError;
use crate::models::event::{NotificationEvent, ResourceType};
use crate::models::notification::NewNotification;

/// Check the required fields of an event and build the candidate
/// notification from it.
///
/// Fields are checked in a fixed order (owner, trigger_user, action,
/// resource_id, resource_type, created_at) and the first failure is
/// reported.
pub fn validate_event(event: &NotificationEvent) -> Result<NewNotification, ValidationError> {
    if event.owner.is_empty() {
        return Err(ValidationError::required("owner"));
    }

    if event.trigger_user.is_empty() {
        return Err(ValidationError::required("trigger_user"));
    }

    if event.action == 0 {
        return Err(ValidationError::required("action"));
    }
    if event.action < 0 {
        return Err(ValidationError::new(
            "action",
            format!("action must be positive, got {}", event.action),
        ));
    }

    if event.resource_id.is_empty() {
        return Err(ValidationError::required("resource_id"));
    }

    if event.resource_type.is_empty() {
        return Err(ValidationError::required("resource_type"));
    }
    let resource_type: ResourceType = event
        .resource_type
        .parse()
        .map_err(|e| ValidationError::new("resource_type", format!("{}", e)))?;

    let created_at = DateTime::<Utc>::from_timestamp(event.created_at, 0)
        .ok_or_else(|| {
            ValidationError::new(
                "created_at",
                format!("created_at out of range: {}", event.created_at),
            )
        })?;

    Ok(NewNotification {
        owner: event.owner.clone(),
        user_id: event.trigger_user.clone(),
        username: event.username.clone(),
        user_pic: event.user_picture.clone(),
        user_bio: event.user_bio.clone(),
        action: event.action,
        resource_type,
        resource_id: event.resource_id.clone(),
        excerpt: (!event.excerpt.is_empty()).then(|| event.excerpt.clone()),
        created_at,
    })
}

/// A user never gets notified about their own action.
pub fn is_self_action(candidate: &NewNotification) -> bool {
    candidate.owner == candidate.user_id
}
