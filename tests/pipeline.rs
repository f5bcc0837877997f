//! End-to-end tests of the dispatch pipeline against the in-memory store
//! and fake fan-out transports.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{
    bytes, dispatcher_with, like_event, FailingTransport, RecordingTransport, SlowTransport,
};
use notification_worker::dispatch::action_key::derive_action_key;
use notification_worker::dispatch::{Dispatcher, Outcome};
use notification_worker::errors::DispatchError;
use notification_worker::notification::fanout::FanoutNotifier;
use notification_worker::store::memory::MemoryStore;
use notification_worker::store::NotificationStore;

async fn settle(outcome: Outcome) -> Outcome {
    if let Outcome::Created { notification, fanout } = outcome {
        if let Some(handle) = fanout {
            handle.await.unwrap();
        }
        return Outcome::Created {
            notification,
            fanout: None,
        };
    }
    outcome
}

// ═══════════════════════════════════════════════════════════════════
//  Scenarios
// ═══════════════════════════════════════════════════════════════════

/// A: a like from u2 on u1's post is stored once and pushed once.
#[tokio::test]
async fn test_like_is_persisted_and_fanned_out() {
    let store = MemoryStore::new();
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = dispatcher_with(&store, transport.clone());

    let outcome = settle(dispatcher.process(&bytes(&like_event())).await.unwrap()).await;
    assert!(matches!(outcome, Outcome::Created { .. }));

    let stored = store.all_for("u1");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].action_key, derive_action_key("u2", "p1", 1));
    assert_eq!(stored[0].user_id, "u2");
    assert_eq!(stored[0].created_at.timestamp(), 1000);
    assert!(!stored[0].read_status);

    let calls = transport.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "user-u1-notifications");
    assert_eq!(calls[0].1, "new-notification");
    assert_eq!(calls[0].2.id, stored[0].id);
    assert_eq!(calls[0].2.action_key, stored[0].action_key);
}

/// B: the same event twice yields one record and one push.
#[tokio::test]
async fn test_repeated_event_is_deduplicated() {
    let store = MemoryStore::new();
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = dispatcher_with(&store, transport.clone());

    settle(dispatcher.process(&bytes(&like_event())).await.unwrap()).await;
    let second = dispatcher.process(&bytes(&like_event())).await.unwrap();

    assert!(
        matches!(second, Outcome::Duplicate { ref action_key } if *action_key == derive_action_key("u2", "p1", 1))
    );
    assert_eq!(store.len(), 1);
    assert_eq!(transport.count(), 1);
}

/// C: acting on your own content produces nothing.
#[tokio::test]
async fn test_self_action_is_suppressed() {
    let store = MemoryStore::new();
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = dispatcher_with(&store, transport.clone());

    let mut event = like_event();
    event["trigger_user"] = "u1".into();
    let outcome = dispatcher.process(&bytes(&event)).await.unwrap();

    assert!(matches!(outcome, Outcome::SelfAction));
    assert!(store.is_empty());
    assert_eq!(transport.count(), 0);
}

/// D: a missing resource_id is a validation error naming that field.
#[tokio::test]
async fn test_missing_resource_id_is_rejected() {
    let store = MemoryStore::new();
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = dispatcher_with(&store, transport.clone());

    let mut event = like_event();
    event.as_object_mut().unwrap().remove("resource_id");
    let err = dispatcher.process(&bytes(&event)).await.unwrap_err();

    match err {
        DispatchError::Validation(e) => assert_eq!(e.field, "resource_id"),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(store.is_empty());
    assert_eq!(transport.count(), 0);
}

// ═══════════════════════════════════════════════════════════════════
//  Properties
// ═══════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_each_required_field_is_cited() {
    let store = MemoryStore::new();
    let dispatcher = Dispatcher::new(Arc::new(store.clone()), FanoutNotifier::disabled());

    for field in ["owner", "trigger_user", "action", "resource_id", "resource_type"] {
        let mut event = like_event();
        event.as_object_mut().unwrap().remove(field);
        match dispatcher.process(&bytes(&event)).await {
            Err(DispatchError::Validation(e)) => assert_eq!(e.field, field),
            other => panic!("{}: expected validation error, got {:?}", field, other),
        }
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_n_submissions_store_one_record() {
    let store = MemoryStore::new();
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = dispatcher_with(&store, transport.clone());

    for i in 0..10 {
        // later likes of the same post carry later timestamps
        let mut event = like_event();
        event["created_at"] = (1000 + i * 60).into();
        settle(dispatcher.process(&bytes(&event)).await.unwrap()).await;
    }

    assert_eq!(store.len(), 1);
    assert_eq!(store.all_for("u1")[0].created_at.timestamp(), 1000);
    assert_eq!(transport.count(), 1);
}

#[tokio::test]
async fn test_distinct_actions_are_separate_notifications() {
    let store = MemoryStore::new();
    let dispatcher = Dispatcher::new(Arc::new(store.clone()), FanoutNotifier::disabled());

    let mut reply = like_event();
    reply["action"] = 3.into();
    let mut other_actor = like_event();
    other_actor["trigger_user"] = "u3".into();
    let mut other_post = like_event();
    other_post["resource_id"] = "p2".into();

    for event in [like_event(), reply, other_actor, other_post] {
        dispatcher.process(&bytes(&event)).await.unwrap();
    }
    assert_eq!(store.len(), 4);
}

#[tokio::test]
async fn test_failing_fanout_does_not_affect_persistence() {
    let store = MemoryStore::new();
    let transport = Arc::new(FailingTransport::default());
    let dispatcher = dispatcher_with(&store, transport.clone());

    let outcome = settle(dispatcher.process(&bytes(&like_event())).await.unwrap()).await;

    assert!(matches!(outcome, Outcome::Created { .. }));
    assert_eq!(store.len(), 1);
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 1);

    // a later distinct event is still processed normally
    let mut event = like_event();
    event["resource_id"] = "p2".into();
    settle(dispatcher.process(&bytes(&event)).await.unwrap()).await;
    assert_eq!(store.len(), 2);
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_slow_fanout_does_not_delay_the_write() {
    let store = MemoryStore::new();
    let transport = Arc::new(SlowTransport {
        inner: RecordingTransport::default(),
        delay: Duration::from_millis(300),
    });
    let dispatcher = dispatcher_with(&store, transport.clone());

    let outcome = dispatcher.process(&bytes(&like_event())).await.unwrap();

    let handle = match outcome {
        Outcome::Created { fanout, .. } => fanout.expect("transport configured"),
        other => panic!("expected created, got {:?}", other),
    };
    assert_eq!(store.len(), 1);
    assert!(!handle.is_finished());
    assert_eq!(transport.inner.count(), 0);

    handle.await.unwrap();
    assert_eq!(transport.inner.count(), 1);
}

#[tokio::test]
async fn test_no_transport_still_persists() {
    let store = MemoryStore::new();
    let dispatcher = Dispatcher::new(Arc::new(store.clone()), FanoutNotifier::disabled());

    let outcome = dispatcher.process(&bytes(&like_event())).await.unwrap();
    match outcome {
        Outcome::Created { fanout, .. } => assert!(fanout.is_none()),
        other => panic!("expected created, got {:?}", other),
    }
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_malformed_payload_is_decode_error() {
    let store = MemoryStore::new();
    let dispatcher = Dispatcher::new(Arc::new(store.clone()), FanoutNotifier::disabled());

    let payloads: [&[u8]; 3] = [b"not json", br#"{"owner": 5}"#, b""];
    for payload in payloads {
        let err = dispatcher.process(payload).await.unwrap_err();
        assert!(matches!(err, DispatchError::Decode(_)), "payload {:?}", payload);
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_notifications_readable_after_dispatch() {
    let store = MemoryStore::new();
    let dispatcher = Dispatcher::new(Arc::new(store.clone()), FanoutNotifier::disabled());

    let mut reply = like_event();
    reply["action"] = 3.into();
    reply["created_at"] = 2000.into();
    reply["excerpt"] = "great post".into();
    dispatcher.process(&bytes(&like_event())).await.unwrap();
    dispatcher.process(&bytes(&reply)).await.unwrap();

    let listed = store.list_by_recipient("u1", 10).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].action, 3);
    assert_eq!(listed[0].excerpt.as_deref(), Some("great post"));

    assert!(store.mark_read("u1", &listed[0].action_key).await.unwrap());
    assert_eq!(store.count_unread("u1").await.unwrap(), 1);
}
