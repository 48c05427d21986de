//! Durable session storage.
//!
//! Each key is stored as a JSON file in a directory.

use std::path::PathBuf;

use async_trait::async_trait;

use super::StoredSession;
use super::store::SessionStore;
use crate::CrmError;

/// File-based session storage.
///
/// The blob for `key` lives at `{directory}/{key}.json`. Keys are restricted
/// to `[A-Za-z0-9_-]`.
///
/// # Example
///
/// ```rust,ignore
/// use ulpan_crm::session::FileSessionStore;
///
/// let store = FileSessionStore::new("/var/lib/ulpan-crm")?;
/// ```
pub struct FileSessionStore {
    directory: PathBuf,
}

impl FileSessionStore {
    /// Creates the directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::Storage` if the directory cannot be created.
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self, CrmError> {
        let dir = directory.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            CrmError::Storage(format!("Failed to create session directory: {e}"))
        })?;
        Ok(Self { directory: dir })
    }

    fn session_path(&self, key: &str) -> Result<PathBuf, CrmError> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(CrmError::Storage(format!("invalid session key {key:?}")));
        }
        Ok(self.directory.join(format!("{key}.json")))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self, key: &str) -> Result<Option<StoredSession>, CrmError> {
        let path = self.session_path(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| CrmError::Storage(format!("Failed to read session file: {e}")))?;
        let session = serde_json::from_str(&content)
            .map_err(|e| CrmError::Storage(format!("Failed to parse session file: {e}")))?;
        Ok(Some(session))
    }

    async fn save(&self, key: &str, session: &StoredSession) -> Result<(), CrmError> {
        let path = self.session_path(key)?;
        let content = serde_json::to_string_pretty(session)
            .map_err(|e| CrmError::Storage(format!("Failed to serialize session: {e}")))?;
        std::fs::write(&path, content)
            .map_err(|e| CrmError::Storage(format!("Failed to write session file: {e}")))
    }

    async fn clear(&self, key: &str) -> Result<(), CrmError> {
        let path = self.session_path(key)?;
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| {
                CrmError::Storage(format!("Failed to delete session file: {e}"))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use crate::session::SessionUser;

    fn blob() -> StoredSession {
        StoredSession {
            user: SessionUser {
                id: 3,
                username: "finance".to_owned(),
                name: "Finance Desk".to_owned(),
                email: Some("finance@ulpan.org.il".to_owned()),
                role: Role::Finance,
                ulpan: None,
            },
            timestamp: 1_710_061_200_000,
            remember_me: true,
            last_activity: Some(1_710_061_260_000),
        }
    }

    #[tokio::test]
    async fn test_survives_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        FileSessionStore::new(dir.path())
            .unwrap()
            .save("ulpan_crm_session", &blob())
            .await
            .unwrap();

        let reopened = FileSessionStore::new(dir.path()).unwrap();
        assert_eq!(
            reopened.load("ulpan_crm_session").await.unwrap(),
            Some(blob())
        );

        reopened.clear("ulpan_crm_session").await.unwrap();
        assert!(reopened.load("ulpan_crm_session").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path()).unwrap();

        let result = store.save("../escape", &blob()).await;
        assert!(matches!(result, Err(CrmError::Storage(_))));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("k.json"), "{not json").unwrap();
        let store = FileSessionStore::new(dir.path()).unwrap();

        assert!(matches!(store.load("k").await, Err(CrmError::Storage(_))));
    }
}
