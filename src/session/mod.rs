//! Session lifecycle for the signed-in staff member.
//!
//! A [`Session`] lives in memory inside the [`SessionManager`] and is mirrored
//! as a [`StoredSession`] blob in either the volatile or the durable
//! [`SessionStore`], depending on the remember flag chosen at login.

mod activity;
mod file_store;
mod manager;
mod memory_store;
mod store;

pub use activity::{InactivityMonitor, InteractionSignal};
pub use file_store::FileSessionStore;
pub use manager::{SessionContext, SessionManager};
pub use memory_store::InMemorySessionStore;
pub use store::SessionStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Role;
use crate::config::SessionConfig;

/// Identity snapshot carried by a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub email: Option<String>,
    pub role: Role,
    pub ulpan: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: SessionUser,
    pub issued_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub remember_me: bool,
}

impl Session {
    pub fn new(user: SessionUser, now: DateTime<Utc>, remember_me: bool) -> Self {
        Self {
            user,
            issued_at: now,
            last_activity: now,
            remember_me,
        }
    }

    /// Both the absolute lifetime and the idle limit must still hold.
    pub fn is_valid_at(&self, now: DateTime<Utc>, config: &SessionConfig) -> bool {
        now - self.issued_at < config.session_timeout
            && now - self.last_activity < config.inactivity_timeout
    }

    pub fn to_stored(&self) -> StoredSession {
        StoredSession {
            user: self.user.clone(),
            timestamp: self.issued_at.timestamp_millis(),
            remember_me: self.remember_me,
            last_activity: Some(self.last_activity.timestamp_millis()),
        }
    }

    /// `None` when the stored timestamps are out of range.
    pub fn from_stored(stored: StoredSession) -> Option<Self> {
        let issued_at = DateTime::from_timestamp_millis(stored.timestamp)?;
        let last_activity = match stored.last_activity {
            Some(millis) => DateTime::from_timestamp_millis(millis)?,
            None => issued_at,
        };
        Some(Self {
            user: stored.user,
            issued_at,
            last_activity,
            remember_me: stored.remember_me,
        })
    }
}

/// Persisted session blob: `{user, timestamp, rememberMe, lastActivity?}`,
/// timestamps in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub user: SessionUser,
    pub timestamp: i64,
    pub remember_me: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<i64>,
}
