use async_trait::async_trait;

use super::StoredSession;
use crate::CrmError;

/// Key-addressed storage for the session blob.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<StoredSession>, CrmError>;

    /// Overwrites whatever is stored under `key`.
    async fn save(&self, key: &str, session: &StoredSession) -> Result<(), CrmError>;

    /// Removing a missing key is not an error.
    async fn clear(&self, key: &str) -> Result<(), CrmError>;
}
