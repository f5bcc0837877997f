//! Event intake loop.
//!
//! Every bus message is handled in its own task; nothing orders or
//! serializes messages relative to each other, duplicates included.
//! Errors stop at the per-message boundary: they are logged and the message
//! is dropped.

use std::sync::Arc;
use std::time::Instant;

use futures::{Stream, StreamExt};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bus::BusMessage;
use crate::dispatch::{Dispatcher, Outcome};
use crate::errors::DispatchError;
use crate::models::event::Action;

pub struct NotificationWorker {
    dispatcher: Arc<Dispatcher>,
    cancel: CancellationToken,
}

impl NotificationWorker {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop taking new messages. `run` returns once in-flight messages are
    /// done; store calls already started are not cancelled.
    pub fn stop(&self) {
        info!("stopping notification worker");
        self.cancel.cancel();
    }

    /// Consume `messages` until the stream ends or `stop` is called.
    /// Returns the number of messages accepted.
    pub async fn run<S>(&self, messages: S) -> usize
    where
        S: Stream<Item = BusMessage> + Send,
    {
        let mut messages = Box::pin(messages);
        let mut in_flight = JoinSet::new();
        let mut accepted = 0usize;

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "message task panicked");
                    }
                }

                next = messages.next() => match next {
                    Some(msg) => {
                        accepted += 1;
                        let dispatcher = self.dispatcher.clone();
                        in_flight.spawn(async move {
                            handle_message(&dispatcher, msg).await;
                        });
                    }
                    None => {
                        warn!("notification subscription closed");
                        break;
                    }
                },
            }
        }

        if !in_flight.is_empty() {
            info!(in_flight = in_flight.len(), "waiting for in-flight messages");
        }
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "message task panicked");
            }
        }

        info!(accepted, "notification worker stopped");
        accepted
    }
}

/// Run one message through the pipeline and log how it ended.
pub async fn handle_message(dispatcher: &Dispatcher, msg: BusMessage) {
    let started = Instant::now();
    debug!(subject = %msg.subject, "received event");

    match dispatcher.process(&msg.payload).await {
        Ok(Outcome::Created { notification, .. }) => {
            info!(
                subject = %msg.subject,
                owner = %notification.owner,
                action = notification.action,
                kind = Action::from_code(notification.action).map_or("unknown", Action::as_str),
                resource_id = %notification.resource_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "processed notification"
            );
        }
        Ok(Outcome::Duplicate { action_key }) => {
            info!(subject = %msg.subject, action_key = %action_key, "duplicate notification skipped");
        }
        Ok(Outcome::SelfAction) => {
            debug!(subject = %msg.subject, "self-action dropped");
        }
        Err(DispatchError::Decode(e)) => {
            warn!(
                subject = %msg.subject,
                error = %e,
                raw = %String::from_utf8_lossy(&msg.payload),
                "failed to decode event"
            );
        }
        Err(DispatchError::Validation(e)) => {
            warn!(subject = %msg.subject, field = e.field, error = %e.message, "invalid event");
        }
        Err(e @ DispatchError::Persistence(_)) => {
            error!(subject = %msg.subject, error = %e, "failed to create notification");
        }
    }
}
