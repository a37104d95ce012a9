//! In-memory conversations keyed by user id.

use crate::conversation::Conversation;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Handle to one user's conversation.
pub type SessionHandle = Arc<Mutex<Conversation>>;

/// Conversations of all active users.
///
/// Each conversation has its own lock, so a slow model call for one user
/// never blocks another. Sessions live until they finish or are reset.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The user's conversation, created with `init` on first use.
    pub async fn get_or_create<F>(&self, user_id: &str, init: F) -> SessionHandle
    where
        F: FnOnce() -> Conversation,
    {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(user_id.to_string())
            .or_insert_with(|| {
                tracing::debug!("Starting conversation for {}", user_id);
                Arc::new(Mutex::new(init()))
            })
            .clone()
    }

    /// Lock the user's live conversation.
    ///
    /// A handle can go stale while waiting for its lock when the holder
    /// finishes or resets the session. The returned guard always belongs to
    /// the conversation currently stored for `user_id`.
    pub async fn lock_current<F>(&self, user_id: &str, init: F) -> OwnedMutexGuard<Conversation>
    where
        F: Fn() -> Conversation,
    {
        loop {
            let handle = self.get_or_create(user_id, &init).await;
            let guard = Arc::clone(&handle).lock_owned().await;
            if self.is_current(user_id, &handle).await {
                return guard;
            }
            tracing::debug!("Conversation for {} ended while waiting, retrying", user_id);
        }
    }

    async fn is_current(&self, user_id: &str, handle: &SessionHandle) -> bool {
        self.sessions
            .lock()
            .await
            .get(user_id)
            .is_some_and(|stored| Arc::ptr_eq(stored, handle))
    }

    pub async fn get(&self, user_id: &str) -> Option<SessionHandle> {
        self.sessions.lock().await.get(user_id).cloned()
    }

    /// Drop a conversation. Returns whether one existed.
    pub async fn remove(&self, user_id: &str) -> bool {
        let removed = self.sessions.lock().await.remove(user_id).is_some();
        if removed {
            tracing::debug!("Removed conversation for {}", user_id);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
