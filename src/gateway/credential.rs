//! Delegated-access credentials and the freshness check run before every
//! backend call.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::{CrmError, LOG_TARGET, SecretString, SharedClock};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCredential {
    pub token: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl AccessCredential {
    pub fn new(token: impl Into<SecretString>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Source of the token the backend expects on every request.
///
/// The host application owns the authorization flow; the crate only asks for
/// the current credential, a silent refresh, or revocation at logout.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn current(&self) -> Result<Option<AccessCredential>, CrmError>;

    /// Attempts a silent refresh. `Ok(None)` means no credential could be
    /// obtained without user interaction.
    async fn refresh(&self) -> Result<Option<AccessCredential>, CrmError>;

    async fn revoke(&self) -> Result<(), CrmError>;
}

/// Holds a credential pushed in by the host.
///
/// `refresh` promotes a credential staged with [`stage_refresh`] and otherwise
/// hands back the current one unchanged.
///
/// [`stage_refresh`]: InMemoryCredentialProvider::stage_refresh
#[derive(Default)]
pub struct InMemoryCredentialProvider {
    current: RwLock<Option<AccessCredential>>,
    staged: Mutex<Option<AccessCredential>>,
    refreshes: AtomicUsize,
}

impl InMemoryCredentialProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: AccessCredential) -> Self {
        Self {
            current: RwLock::new(Some(credential)),
            ..Default::default()
        }
    }

    /// # Errors
    ///
    /// Returns `CrmError::Internal` if the lock is poisoned.
    pub fn set(&self, credential: Option<AccessCredential>) -> Result<(), CrmError> {
        *self.current.write().map_err(poisoned)? = credential;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `CrmError::Internal` if the lock is poisoned.
    pub fn stage_refresh(&self, credential: AccessCredential) -> Result<(), CrmError> {
        *self.staged.lock().map_err(poisoned)? = Some(credential);
        Ok(())
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

fn poisoned<T>(_: T) -> CrmError {
    CrmError::Internal("credential lock poisoned".to_owned())
}

#[async_trait]
impl CredentialProvider for InMemoryCredentialProvider {
    async fn current(&self) -> Result<Option<AccessCredential>, CrmError> {
        Ok(self.current.read().map_err(poisoned)?.clone())
    }

    async fn refresh(&self) -> Result<Option<AccessCredential>, CrmError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        let staged = self.staged.lock().map_err(poisoned)?.take();
        let mut current = self.current.write().map_err(poisoned)?;
        if let Some(credential) = staged {
            *current = Some(credential);
        }
        Ok(current.clone())
    }

    async fn revoke(&self) -> Result<(), CrmError> {
        *self.current.write().map_err(poisoned)? = None;
        Ok(())
    }
}

/// Resolves a usable token, refreshing once when the credential is inside
/// the freshness margin.
#[derive(Clone)]
pub struct CredentialGuard {
    provider: Arc<dyn CredentialProvider>,
    clock: SharedClock,
    margin: Duration,
}

impl CredentialGuard {
    pub fn new(provider: Arc<dyn CredentialProvider>, clock: SharedClock, margin: Duration) -> Self {
        Self {
            provider,
            clock,
            margin,
        }
    }

    pub fn provider(&self) -> &Arc<dyn CredentialProvider> {
        &self.provider
    }

    /// # Errors
    ///
    /// Returns `CrmError::ReauthorizationRequired` when neither the current
    /// credential nor a refreshed one is valid.
    pub async fn token(&self) -> Result<SecretString, CrmError> {
        let now = self.clock.utc();
        let current = self
            .provider
            .current()
            .await?
            .ok_or(CrmError::ReauthorizationRequired)?;

        if current.expires_at - now >= self.margin {
            return Ok(current.token);
        }

        log::info!(
            target: LOG_TARGET,
            "msg=\"refreshing access credential\", expires_at={}",
            current.expires_at
        );
        let refreshed = match self.provider.refresh().await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "msg=\"credential refresh failed\", error=\"{e}\"");
                None
            }
        };

        let now = self.clock.utc();
        match refreshed {
            Some(credential) if credential.is_valid_at(now) => Ok(credential.token),
            _ if current.is_valid_at(now) => Ok(current.token),
            _ => {
                log::warn!(target: LOG_TARGET, "msg=\"no valid access credential\"");
                Err(CrmError::ReauthorizationRequired)
            }
        }
    }
}
