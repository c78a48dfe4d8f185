//! # Conversation state store
//!
//! Maps a (sender, chat) pair to the conversation it is in. [`ConversationStore`] is the backend-neutral
//! interface; [`InMemoryConversationStore`] keeps sessions in process memory and loses them on restart.
//!
//! Per-key serialization is part of the trait: the dispatcher takes [`ConversationStore::lock`] before
//! reading a session and releases it after writing the outcome back, so two events of the same pair never
//! observe and advance one session concurrently. Different keys never wait on each other.

use async_trait::async_trait;
use budget_core::Event;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

use crate::error::ConversationError;

/// Identifies at most one active conversation: the sender inside one chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub sender_id: i64,
    pub chat_id: i64,
}

impl ConversationKey {
    pub fn new(sender_id: i64, chat_id: i64) -> Self {
        Self { sender_id, chat_id }
    }

    pub fn from_event(event: &Event) -> Self {
        Self::new(event.sender.id, event.chat.id)
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sender {} in chat {}", self.sender_id, self.chat_id)
    }
}

/// Live instance of a flow for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSession {
    pub flow: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Proof that the holder owns the serialization slot of one key. Released on drop.
pub struct KeyGuard {
    _guard: OwnedMutexGuard<()>,
}

impl KeyGuard {
    pub fn new(guard: OwnedMutexGuard<()>) -> Self {
        Self { _guard: guard }
    }
}

/// Table of per-key async mutexes. Entries are weak and disappear once no task holds or awaits the key.
#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: Mutex<HashMap<ConversationKey, Weak<Mutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other task holds `key`, then returns the guard for it.
    pub async fn acquire(&self, key: &ConversationKey) -> KeyGuard {
        let lock = {
            let mut locks = self.locks.lock().await;
            match locks.get(key).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    locks.retain(|_, weak| weak.strong_count() > 0);
                    let lock = Arc::new(Mutex::new(()));
                    locks.insert(*key, Arc::downgrade(&lock));
                    lock
                }
            }
        };
        KeyGuard::new(lock.lock_owned().await)
    }

    /// Number of keys currently held or awaited.
    pub async fn active(&self) -> usize {
        let locks = self.locks.lock().await;
        locks.values().filter(|weak| weak.strong_count() > 0).count()
    }
}

/// Storage backend for conversation sessions.
///
/// Implementations must serialize everything done between [`lock`](Self::lock) and dropping the guard for
/// one key, and must not make different keys wait on each other.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Acquires the serialization slot for `key`.
    async fn lock(&self, key: &ConversationKey) -> KeyGuard;

    /// Returns the active session, if any. No side effects.
    async fn get(&self, key: &ConversationKey)
        -> Result<Option<ConversationSession>, ConversationError>;

    /// Starts a session in `state`. Fails with `AlreadyActive` and keeps the existing session if one is active.
    async fn start(
        &self,
        key: &ConversationKey,
        flow: &str,
        state: &str,
    ) -> Result<(), ConversationError>;

    /// Replaces the state of the active session. Fails with `NoSession` if there is none.
    async fn advance(&self, key: &ConversationKey, state: &str) -> Result<(), ConversationError>;

    /// Removes the session. Ending a key without a session is not an error.
    async fn end(&self, key: &ConversationKey) -> Result<(), ConversationError>;
}

/// In-process [`ConversationStore`]. Optionally expires sessions idle for longer than a TTL.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConversationStore {
    sessions: Arc<RwLock<HashMap<ConversationKey, ConversationSession>>>,
    locks: Arc<KeyLocks>,
    ttl: Option<Duration>,
}

impl InMemoryConversationStore {
    /// Creates an empty store whose sessions never expire.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store; sessions not advanced for `ttl` are treated as ended.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::default()
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Number of stored sessions, expired ones included until they are swept.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn is_expired(&self, session: &ConversationSession, now: DateTime<Utc>) -> bool {
        let Some(ttl) = self.ttl else {
            return false;
        };
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now - session.updated_at >= ttl,
            Err(_) => false,
        }
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn lock(&self, key: &ConversationKey) -> KeyGuard {
        self.locks.acquire(key).await
    }

    async fn get(
        &self,
        key: &ConversationKey,
    ) -> Result<Option<ConversationSession>, ConversationError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(key)
            .filter(|s| !self.is_expired(s, Utc::now()))
            .cloned())
    }

    async fn start(
        &self,
        key: &ConversationKey,
        flow: &str,
        state: &str,
    ) -> Result<(), ConversationError> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(key) {
            if !self.is_expired(existing, now) {
                return Err(ConversationError::AlreadyActive {
                    key: *key,
                    flow: existing.flow.clone(),
                });
            }
            debug!(key = %key, flow = %existing.flow, "Replacing expired conversation");
        }
        sessions.insert(
            *key,
            ConversationSession {
                flow: flow.to_string(),
                state: state.to_string(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }

    async fn advance(&self, key: &ConversationKey, state: &str) -> Result<(), ConversationError> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(key) {
            Some(session) if !self.is_expired(session, now) => {
                session.state = state.to_string();
                session.updated_at = now;
                Ok(())
            }
            Some(_) => {
                sessions.remove(key);
                Err(ConversationError::NoSession(*key))
            }
            None => Err(ConversationError::NoSession(*key)),
        }
    }

    async fn end(&self, key: &ConversationKey) -> Result<(), ConversationError> {
        self.sessions.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_key_locks_are_pruned_after_release() {
        let locks = KeyLocks::new();
        let a = ConversationKey::new(1, 1);
        let b = ConversationKey::new(2, 1);

        let guard_a = locks.acquire(&a).await;
        let guard_b = locks.acquire(&b).await;
        assert_eq!(locks.active().await, 2);

        drop(guard_a);
        assert_eq!(locks.active().await, 1);
        drop(guard_b);
        assert_eq!(locks.active().await, 0);

        // A released key can be taken again.
        let _again = locks.acquire(&a).await;
        assert_eq!(locks.active().await, 1);
    }

    #[tokio::test]
    async fn test_expired_session_is_invisible_and_replaceable() {
        let store = InMemoryConversationStore::with_ttl(Duration::from_millis(20));
        let key = ConversationKey::new(1, 2);
        store.start(&key, "top_up", "income_creating").await.unwrap();
        assert!(store.get(&key).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(store.get(&key).await.unwrap().is_none());
        assert_eq!(
            store.advance(&key, "next").await,
            Err(ConversationError::NoSession(key))
        );
        store.start(&key, "create_income", "income_creating").await.unwrap();
        assert_eq!(store.get(&key).await.unwrap().unwrap().flow, "create_income");
    }

    #[tokio::test]
    async fn test_store_without_ttl_never_expires() {
        let store = InMemoryConversationStore::new();
        assert!(store.ttl().is_none());
        let key = ConversationKey::new(1, 2);
        store.start(&key, "f", "s").await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(store.get(&key).await.unwrap().is_some());
        assert_eq!(store.len().await, 1);
    }
}
