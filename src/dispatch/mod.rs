//! Notification dispatch pipeline.
//!
//! One bus payload goes through: decode → validate → self-action filter →
//! key derivation + idempotent write → real-time fan-out (new rows only).

pub mod action_key;
pub mod validate;
pub mod writer;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::errors::DispatchError;
use crate::models::event::NotificationEvent;
use crate::models::notification::Notification;
use crate::notification::fanout::FanoutNotifier;
use crate::store::NotificationStore;
use validate::{is_self_action, validate_event};
use writer::{NotificationWriter, WriteOutcome};

/// How a well-formed event ended up.
#[derive(Debug)]
pub enum Outcome {
    /// Owner and trigger user are the same; nothing stored.
    SelfAction,
    /// Recipient already has a notification with this key; nothing stored.
    Duplicate { action_key: String },
    /// Stored. `fanout` is the background push task, if a transport is configured.
    Created {
        notification: Notification,
        fanout: Option<JoinHandle<()>>,
    },
}

pub struct Dispatcher {
    writer: NotificationWriter,
    fanout: FanoutNotifier,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn NotificationStore>, fanout: FanoutNotifier) -> Self {
        Self {
            writer: NotificationWriter::new(store),
            fanout,
        }
    }

    /// Decode a raw bus payload and run it through the pipeline.
    pub async fn process(&self, payload: &[u8]) -> Result<Outcome, DispatchError> {
        let event: NotificationEvent = serde_json::from_slice(payload)?;
        self.process_event(&event).await
    }

    pub async fn process_event(&self, event: &NotificationEvent) -> Result<Outcome, DispatchError> {
        let candidate = validate_event(event)?;

        if is_self_action(&candidate) {
            debug!(owner = %candidate.owner, "skipping self-notification");
            return Ok(Outcome::SelfAction);
        }

        match self.writer.create_notification(candidate).await? {
            WriteOutcome::Duplicate { action_key } => Ok(Outcome::Duplicate { action_key }),
            WriteOutcome::Created(notification) => {
                let fanout = self.fanout.dispatch(&notification);
                Ok(Outcome::Created {
                    notification,
                    fanout,
                })
            }
        }
    }
}
