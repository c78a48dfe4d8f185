//! Integration tests for [`update_dispatcher::InMemoryConversationStore`].
//!
//! Covers: start/advance/get round trip, double start, advance without a session, idempotent end,
//! key independence, and per-key lock serialization.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use update_dispatcher::{
    ConversationError, ConversationKey, ConversationStore, InMemoryConversationStore,
};

/// **Test: start then advance then get returns the new state and the original flow.**
#[tokio::test]
async fn test_start_advance_get_round_trip() {
    let store = InMemoryConversationStore::new();
    let key = ConversationKey::new(123, 456);

    store.start(&key, "create_income", "s1").await.unwrap();
    store.advance(&key, "s2").await.unwrap();

    let session = store.get(&key).await.unwrap().expect("session exists");
    assert_eq!(session.flow, "create_income");
    assert_eq!(session.state, "s2");
    assert!(session.updated_at >= session.created_at);
}

/// **Test: starting twice without end fails with AlreadyActive and keeps the first session.**
#[tokio::test]
async fn test_double_start_keeps_first_session() {
    let store = InMemoryConversationStore::new();
    let key = ConversationKey::new(1, 2);

    store.start(&key, "top_up", "income_creating").await.unwrap();
    let err = store
        .start(&key, "create_income", "other")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ConversationError::AlreadyActive {
            key,
            flow: "top_up".to_string()
        }
    );
    let session = store.get(&key).await.unwrap().unwrap();
    assert_eq!(session.flow, "top_up");
    assert_eq!(session.state, "income_creating");
}

/// **Test: advance without a session fails with NoSession and creates nothing.**
#[tokio::test]
async fn test_advance_without_session() {
    let store = InMemoryConversationStore::new();
    let key = ConversationKey::new(1, 2);

    assert_eq!(
        store.advance(&key, "s2").await,
        Err(ConversationError::NoSession(key))
    );
    assert!(store.get(&key).await.unwrap().is_none());
    assert!(store.is_empty().await);
}

/// **Test: end twice is not an error and leaves no session.**
#[tokio::test]
async fn test_end_is_idempotent() {
    let store = InMemoryConversationStore::new();
    let key = ConversationKey::new(1, 2);
    store.start(&key, "f", "s").await.unwrap();

    store.end(&key).await.unwrap();
    store.end(&key).await.unwrap();

    assert!(store.get(&key).await.unwrap().is_none());
    // The key may start a fresh conversation afterwards.
    store.start(&key, "f", "s").await.unwrap();
}

/// **Test: the same sender in two chats, and two senders in one chat, are independent conversations.**
#[tokio::test]
async fn test_keys_are_independent() {
    let store = InMemoryConversationStore::new();
    let a = ConversationKey::new(1, 100);
    let b = ConversationKey::new(1, 200);
    let c = ConversationKey::new(2, 100);

    store.start(&a, "f", "a").await.unwrap();
    store.start(&b, "f", "b").await.unwrap();
    store.start(&c, "f", "c").await.unwrap();
    store.end(&a).await.unwrap();

    assert!(store.get(&a).await.unwrap().is_none());
    assert_eq!(store.get(&b).await.unwrap().unwrap().state, "b");
    assert_eq!(store.get(&c).await.unwrap().unwrap().state, "c");
}

/// **Test: lock serializes read-modify-write on one key; no update is lost.**
///
/// **Setup:** A session whose state is a counter; 20 tasks each lock, read, yield, and advance to counter+1.
/// **Expected:** Final state is "20" and no two tasks were ever inside the critical section together.
#[tokio::test]
async fn test_lock_serializes_same_key() {
    let store = Arc::new(InMemoryConversationStore::new());
    let key = ConversationKey::new(9, 9);
    store.start(&key, "counter", "0").await.unwrap();

    let inside = Arc::new(AtomicUsize::new(0));
    let max_inside = Arc::new(AtomicUsize::new(0));

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let store = store.clone();
        let inside = inside.clone();
        let max_inside = max_inside.clone();
        tasks.push(tokio::spawn(async move {
            let _guard = store.lock(&key).await;
            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
            max_inside.fetch_max(now, Ordering::SeqCst);

            let current: u32 = store.get(&key).await.unwrap().unwrap().state.parse().unwrap();
            tokio::time::sleep(Duration::from_millis(1)).await;
            store.advance(&key, &(current + 1).to_string()).await.unwrap();

            inside.fetch_sub(1, Ordering::SeqCst);
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(store.get(&key).await.unwrap().unwrap().state, "20");
    assert_eq!(max_inside.load(Ordering::SeqCst), 1);
}

/// **Test: holding one key's lock does not block another key.**
#[tokio::test]
async fn test_lock_does_not_block_other_keys() {
    let store = InMemoryConversationStore::new();
    let _held = store.lock(&ConversationKey::new(1, 1)).await;

    let other = tokio::time::timeout(
        Duration::from_millis(200),
        store.lock(&ConversationKey::new(2, 1)),
    )
    .await;
    assert!(other.is_ok(), "other key must not wait for the held one");

    let same = tokio::time::timeout(
        Duration::from_millis(50),
        store.lock(&ConversationKey::new(1, 1)),
    )
    .await;
    assert!(same.is_err(), "same key must wait while held");
}
