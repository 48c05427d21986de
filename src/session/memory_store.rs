//! Volatile session storage.
//!
//! Plays the part of tab-scoped storage: contents vanish with the value.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::StoredSession;
use super::store::SessionStore;
use crate::CrmError;

/// Stores blobs in a `HashMap` protected by a `RwLock`.
///
/// Clones share the same map. For storage that survives a restart, use
/// [`FileSessionStore`](super::FileSessionStore).
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, StoredSession>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> CrmError {
    CrmError::Storage("session store lock poisoned".to_owned())
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, key: &str) -> Result<Option<StoredSession>, CrmError> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions.get(key).cloned())
    }

    async fn save(&self, key: &str, session: &StoredSession) -> Result<(), CrmError> {
        self.sessions
            .write()
            .map_err(poisoned)?
            .insert(key.to_owned(), session.clone());
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<(), CrmError> {
        self.sessions.write().map_err(poisoned)?.remove(key);
        Ok(())
    }
}
