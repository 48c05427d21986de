use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::audit_log::{LoginAuditEntry, LoginAuditRepository, LoginOutcome};
use crate::CrmError;

/// Bounded in-memory login history. The oldest entries are dropped first.
#[derive(Clone)]
pub struct InMemoryLoginAuditRepository {
    entries: Arc<Mutex<Vec<LoginAuditEntry>>>,
    next_id: Arc<Mutex<i64>>,
    capacity: usize,
}

impl Default for InMemoryLoginAuditRepository {
    fn default() -> Self {
        Self::with_capacity(1000)
    }
}

impl InMemoryLoginAuditRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(Mutex::new(1)),
            capacity: capacity.max(1),
        }
    }
}

fn poisoned<T>(_: T) -> CrmError {
    CrmError::Internal("audit log lock poisoned".to_owned())
}

#[async_trait]
impl LoginAuditRepository for InMemoryLoginAuditRepository {
    async fn record(
        &self,
        user_id: Option<i64>,
        username: &str,
        outcome: LoginOutcome,
        at: DateTime<Utc>,
    ) -> Result<LoginAuditEntry, CrmError> {
        let id = {
            let mut next_id = self.next_id.lock().map_err(poisoned)?;
            let id = *next_id;
            *next_id += 1;
            id
        };

        let entry = LoginAuditEntry {
            id,
            user_id,
            username: username.to_owned(),
            outcome,
            at,
        };

        let mut entries = self.entries.lock().map_err(poisoned)?;
        entries.push(entry.clone());
        if entries.len() > self.capacity {
            let overflow = entries.len() - self.capacity;
            entries.drain(..overflow);
        }
        drop(entries);

        Ok(entry)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<LoginAuditEntry>, CrmError> {
        let entries = self.entries.lock().map_err(poisoned)?;
        Ok(entries.iter().rev().take(limit).cloned().collect())
    }
}
