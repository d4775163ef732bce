//! Session store: the in-memory, ordered list of chat sessions shown in the directory.
//!
//! Order is whatever the operations produce; `add` always inserts at the front and the store never re-sorts.

use crate::models::Session;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared list of sessions (set, add, update, remove, clear).
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<Vec<Session>>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Replace the whole list.
    pub async fn set_all(&self, sessions: Vec<Session>) {
        *self.inner.write().await = sessions;
    }

    /// Insert at index 0 regardless of timestamps.
    pub async fn add(&self, session: Session) {
        self.inner.write().await.insert(0, session);
    }

    /// Replace the entry with the same `document_id`. Returns false if none matched.
    pub async fn update(&self, session: Session) -> bool {
        let mut g = self.inner.write().await;
        match g.iter_mut().find(|s| s.document_id == session.document_id) {
            Some(slot) => {
                *slot = session;
                true
            }
            None => false,
        }
    }

    pub async fn remove(&self, id: &str) {
        self.inner.write().await.retain(|s| s.document_id != id);
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    pub async fn list(&self) -> Vec<Session> {
        self.inner.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Session> {
        self.inner
            .read()
            .await
            .iter()
            .find(|s| s.document_id == id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
