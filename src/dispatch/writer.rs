//! Idempotent notification writer.
//!
//! Check-then-write against the store: look for an existing notification
//! with the same (recipient, action_key) and only insert when there is none.
//! The two calls are not atomic. Two deliveries of the same logical event
//! racing each other can both miss the lookup and both insert; the store
//! has no uniqueness constraint to stop that.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::action_key::derive_action_key;
use crate::errors::DispatchError;
use crate::models::notification::{NewNotification, Notification};
use crate::store::NotificationStore;

/// Result of a successful `create_notification` call.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// A new notification was stored.
    Created(Notification),
    /// A notification with this key already exists for the recipient.
    Duplicate { action_key: String },
}

#[derive(Clone)]
pub struct NotificationWriter {
    store: Arc<dyn NotificationStore>,
}

impl NotificationWriter {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    /// Store `candidate` unless the recipient already has a notification
    /// with the same deduplication key.
    ///
    /// A failing lookup is logged and the insert goes ahead anyway: a
    /// duplicate notification is preferred over a lost one. Only a failing
    /// insert is an error.
    pub async fn create_notification(
        &self,
        candidate: NewNotification,
    ) -> Result<WriteOutcome, DispatchError> {
        let action_key =
            derive_action_key(&candidate.user_id, &candidate.resource_id, candidate.action);

        match self
            .store
            .find_by_recipient_and_key(&candidate.owner, &action_key)
            .await
        {
            Ok(Some(existing)) => {
                debug!(
                    owner = %candidate.owner,
                    action_key = %action_key,
                    existing_id = %existing.id,
                    "notification already exists, skipping"
                );
                return Ok(WriteOutcome::Duplicate { action_key });
            }
            Ok(None) => {}
            Err(e) => {
                warn!(
                    owner = %candidate.owner,
                    action_key = %action_key,
                    error = %e,
                    "duplicate check failed, writing notification anyway"
                );
            }
        }

        let notification = candidate.into_notification(Uuid::new_v4(), action_key);

        self.store
            .insert(&notification)
            .await
            .map_err(DispatchError::Persistence)?;

        info!(
            id = %notification.id,
            owner = %notification.owner,
            action = notification.action,
            resource_id = %notification.resource_id,
            "created notification"
        );

        Ok(WriteOutcome::Created(notification))
    }
}
