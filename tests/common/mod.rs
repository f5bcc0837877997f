#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use notification_worker::dispatch::Dispatcher;
use notification_worker::notification::fanout::{FanoutNotifier, FanoutPayload, FanoutTransport};
use notification_worker::store::memory::MemoryStore;
use serde_json::{json, Value};

/// Records every publish call.
#[derive(Default)]
pub struct RecordingTransport {
    pub calls: Mutex<Vec<(String, String, FanoutPayload)>>,
}

impl RecordingTransport {
    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
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

/// Fails every publish call, counting attempts.
#[derive(Default)]
pub struct FailingTransport {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl FanoutTransport for FailingTransport {
    async fn publish(&self, _: &str, _: &str, _: &FanoutPayload) -> anyhow::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("push service unavailable")
    }
}

/// Records publishes only after sleeping for `delay`.
pub struct SlowTransport {
    pub inner: RecordingTransport,
    pub delay: std::time::Duration,
}

#[async_trait]
impl FanoutTransport for SlowTransport {
    async fn publish(
        &self,
        channel: &str,
        event: &str,
        payload: &FanoutPayload,
    ) -> anyhow::Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.publish(channel, event, payload).await
    }
}

pub fn dispatcher_with(
    store: &MemoryStore,
    transport: Arc<dyn FanoutTransport>,
) -> Dispatcher {
    Dispatcher::new(Arc::new(store.clone()), FanoutNotifier::new(Some(transport)))
}

/// Scenario A's event: u2 likes u1's post p1.
pub fn like_event() -> Value {
    json!({
        "owner": "u1",
        "trigger_user": "u2",
        "username": "Jane",
        "user_picture": "https://example.com/jane.jpg",
        "user_bio": "hello",
        "action": 1,
        "resource_type": "POST",
        "resource_id": "p1",
        "created_at": 1000
    })
}

pub fn bytes(event: &Value) -> Vec<u8> {
    serde_json::to_vec(event).unwrap()
}
