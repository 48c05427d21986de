use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CrmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoginOutcome {
    Success,
    Failed,
    Logout,
}

/// `user_id` is `None` for failed attempts against unknown usernames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginAuditEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub username: String,
    pub outcome: LoginOutcome,
    pub at: DateTime<Utc>,
}

#[async_trait]
pub trait LoginAuditRepository {
    async fn record(
        &self,
        user_id: Option<i64>,
        username: &str,
        outcome: LoginOutcome,
        at: DateTime<Utc>,
    ) -> Result<LoginAuditEntry, CrmError>;

    /// Most recent entries first.
    async fn recent(&self, limit: usize) -> Result<Vec<LoginAuditEntry>, CrmError>;
}
