use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::activity::InteractionSignal;
use super::store::SessionStore;
use super::{Session, SessionUser};
use crate::actions::{
    ChangePasswordAction, CreateUserAction, ListUsersAction, LoginAction, LoginAuditAction,
    LogoutAction, SetUserActiveAction, UpdateUserAction,
};
use crate::config::SessionConfig;
use crate::crypto::{Argon2Hasher, PasswordHasher};
use crate::gateway::CredentialProvider;
use crate::validators::PasswordPolicy;
use crate::{
    AuthorizationPolicy, CrmError, LOG_TARGET, LoginAuditEntry, LoginAuditRepository, NewUser,
    Permission, Role, SecretString, SharedClock, UserProfile, UserRepository, UserUpdate,
};

/// Read access to the signed-in user, as needed by the data managers.
#[async_trait]
pub trait SessionContext: Send + Sync {
    /// # Errors
    ///
    /// `NotAuthenticated` without a session, `SessionExpired` when the
    /// session has just been ended for exceeding a timeout.
    async fn authenticated_user(&self) -> Result<SessionUser, CrmError>;
}

/// Owns the current session and everything that creates or ends it.
///
/// Expiry is checked lazily: every accessor recomputes both timeouts and ends
/// an expired session on the spot. The session blob is written to the durable
/// store when the user asked to be remembered and to the volatile store
/// otherwise, never to both.
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use mockable::DefaultClock;
/// use ulpan_crm::config::SessionConfig;
/// use ulpan_crm::session::{FileSessionStore, InMemorySessionStore};
/// use ulpan_crm::{InMemoryLoginAuditRepository, InMemoryUserRepository, SecretString, SessionManager};
///
/// # async fn run() -> Result<(), ulpan_crm::CrmError> {
/// let manager = SessionManager::new(
///     InMemoryUserRepository::new(),
///     InMemoryLoginAuditRepository::new(),
///     Arc::new(InMemorySessionStore::new()),
///     Arc::new(FileSessionStore::new("/var/lib/ulpan-crm")?),
///     SessionConfig::default(),
///     Arc::new(DefaultClock),
/// );
///
/// if manager.restore().await.is_none() {
///     manager.login("teacher1", &SecretString::new("teach123"), true).await?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct SessionManager<U, L, H = Argon2Hasher>
where
    U: UserRepository + Clone + Send + Sync,
    L: LoginAuditRepository + Clone + Send + Sync,
    H: PasswordHasher + Clone,
{
    users: U,
    audit: L,
    hasher: H,
    policy: Arc<AuthorizationPolicy>,
    config: SessionConfig,
    password_policy: PasswordPolicy,
    volatile: Arc<dyn SessionStore>,
    durable: Arc<dyn SessionStore>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    clock: SharedClock,
    current: RwLock<Option<Session>>,
}

impl<U, L> SessionManager<U, L, Argon2Hasher>
where
    U: UserRepository + Clone + Send + Sync,
    L: LoginAuditRepository + Clone + Send + Sync,
{
    pub fn new(
        users: U,
        audit: L,
        volatile: Arc<dyn SessionStore>,
        durable: Arc<dyn SessionStore>,
        config: SessionConfig,
        clock: SharedClock,
    ) -> Self {
        let password_policy = PasswordPolicy::new().min(config.min_password_length);
        Self {
            users,
            audit,
            hasher: Argon2Hasher::default(),
            policy: Arc::new(AuthorizationPolicy::default()),
            config,
            password_policy,
            volatile,
            durable,
            credentials: None,
            clock,
            current: RwLock::new(None),
        }
    }
}

impl<U, L, H> SessionManager<U, L, H>
where
    U: UserRepository + Clone + Send + Sync,
    L: LoginAuditRepository + Clone + Send + Sync,
    H: PasswordHasher + Clone,
{
    #[must_use]
    pub fn with_hasher<H2: PasswordHasher + Clone>(self, hasher: H2) -> SessionManager<U, L, H2> {
        SessionManager {
            users: self.users,
            audit: self.audit,
            hasher,
            policy: self.policy,
            config: self.config,
            password_policy: self.password_policy,
            volatile: self.volatile,
            durable: self.durable,
            credentials: self.credentials,
            clock: self.clock,
            current: self.current,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: Arc<AuthorizationPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Delegated-access credential revoked on logout.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn policy(&self) -> &Arc<AuthorizationPolicy> {
        &self.policy
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }

    fn read_current(&self) -> RwLockReadGuard<'_, Option<Session>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_current(&self) -> RwLockWriteGuard<'_, Option<Session>> {
        self.current.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn store_for(&self, remember_me: bool) -> &Arc<dyn SessionStore> {
        if remember_me {
            &self.durable
        } else {
            &self.volatile
        }
    }

    async fn clear_stores(&self) {
        for store in [&self.volatile, &self.durable] {
            if let Err(e) = store.clear(&self.config.storage_key).await {
                log::warn!(
                    target: LOG_TARGET,
                    "msg=\"session store clear failed\", error={e:?}"
                );
            }
        }
    }

    async fn persist(&self, session: &Session) {
        if let Err(e) = self
            .store_for(session.remember_me)
            .save(&self.config.storage_key, &session.to_stored())
            .await
        {
            log::warn!(
                target: LOG_TARGET,
                "msg=\"session persist failed\", error={e:?}"
            );
        }
    }

    /// Validates the credentials and starts a new session, replacing any
    /// previous one.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials` for an unknown username, a wrong password or an
    /// inactive account alike. `Storage` if the session blob cannot be saved.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "session_login", skip_all, err)
    )]
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
        remember_me: bool,
    ) -> Result<SessionUser, CrmError> {
        let now = self.now();
        let record = LoginAction::with_hasher(
            self.users.clone(),
            self.audit.clone(),
            self.hasher.clone(),
        )
        .execute(username, password, now)
        .await?;

        let session = Session::new(record.session_user(), now, remember_me);
        self.clear_stores().await;
        self.store_for(remember_me)
            .save(&self.config.storage_key, &session.to_stored())
            .await?;

        let user = session.user.clone();
        *self.write_current() = Some(session);
        Ok(user)
    }

    /// Ends the session, clears both stores and revokes the delegated-access
    /// credential. Safe to call without a session.
    pub async fn logout(&self) {
        let previous = self.write_current().take();
        self.clear_stores().await;
        LogoutAction::new(self.audit.clone())
            .execute(
                previous.as_ref().map(|session| &session.user),
                self.credentials.as_deref(),
                self.now(),
            )
            .await;
    }

    /// The signed-in user, after re-checking both timeouts.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` without a session. `SessionExpired` when the
    /// session had run out; it is logged out before returning.
    pub async fn authenticated_user(&self) -> Result<SessionUser, CrmError> {
        let now = self.now();
        let state = {
            let current = self.read_current();
            current
                .as_ref()
                .map(|session| (session.is_valid_at(now, &self.config), session.user.clone()))
        };

        match state {
            None => Err(CrmError::NotAuthenticated),
            Some((true, user)) => Ok(user),
            Some((false, user)) => {
                log::info!(
                    target: LOG_TARGET,
                    "msg=\"session expired\", user_id={}",
                    user.id
                );
                self.logout().await;
                Err(CrmError::SessionExpired)
            }
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.authenticated_user().await.is_ok()
    }

    pub async fn current_user(&self) -> Option<SessionUser> {
        self.authenticated_user().await.ok()
    }

    pub async fn has_role(&self, role: Role) -> bool {
        self.current_user()
            .await
            .is_some_and(|user| user.role == role)
    }

    pub async fn has_permission(&self, permission: Permission) -> bool {
        let user = self.current_user().await;
        self.policy.has_permission(user.as_ref(), permission)
    }

    pub async fn can_access_ulpan(&self, ulpan: &str) -> bool {
        let user = self.current_user().await;
        self.policy.can_access_ulpan(user.as_ref(), ulpan)
    }

    /// Snapshot of the in-memory session without the expiry check.
    pub fn session(&self) -> Option<Session> {
        self.read_current().clone()
    }

    /// Picks up a persisted session, volatile store first.
    ///
    /// A stored session that has already expired is removed from both stores.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "session_restore", skip_all)
    )]
    pub async fn restore(&self) -> Option<SessionUser> {
        let now = self.now();
        for store in [&self.volatile, &self.durable] {
            let stored = match store.load(&self.config.storage_key).await {
                Ok(Some(stored)) => stored,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!(
                        target: LOG_TARGET,
                        "msg=\"session load failed\", error={e:?}"
                    );
                    continue;
                }
            };

            return match Session::from_stored(stored) {
                Some(session) if session.is_valid_at(now, &self.config) => {
                    log::info!(
                        target: LOG_TARGET,
                        "msg=\"session restored\", user_id={}, remember_me={}",
                        session.user.id,
                        session.remember_me
                    );
                    let user = session.user.clone();
                    *self.write_current() = Some(session);
                    Some(user)
                }
                _ => {
                    log::info!(target: LOG_TARGET, "msg=\"stale session purged\"");
                    self.clear_stores().await;
                    None
                }
            };
        }
        None
    }

    /// Moves last-activity forward. Ignored without a live session.
    pub fn record_interaction(&self, signal: InteractionSignal) {
        let now = self.now();
        let mut current = self.write_current();
        if let Some(session) = current.as_mut() {
            if session.is_valid_at(now, &self.config) {
                session.last_activity = now;
                log::trace!(target: LOG_TARGET, "msg=\"interaction\", signal={signal}");
            }
        }
    }

    /// Ends the session if it has been idle too long, otherwise persists the
    /// latest activity time. Returns `true` when a session was ended.
    pub async fn check_inactivity(&self) -> bool {
        let now = self.now();
        let snapshot = {
            let current = self.read_current();
            current
                .as_ref()
                .map(|session| (session.is_valid_at(now, &self.config), session.clone()))
        };

        match snapshot {
            None => false,
            Some((true, session)) => {
                self.persist(&session).await;
                false
            }
            Some((false, session)) => {
                log::info!(
                    target: LOG_TARGET,
                    "msg=\"inactivity logout\", user_id={}, idle_secs={}",
                    session.user.id,
                    (now - session.last_activity).num_seconds()
                );
                self.logout().await;
                true
            }
        }
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<UserProfile, CrmError> {
        let actor = self.authenticated_user().await?;
        CreateUserAction::with_hasher(
            self.users.clone(),
            Arc::clone(&self.policy),
            self.password_policy.clone(),
            self.hasher.clone(),
        )
        .execute(&actor, user, self.now())
        .await
    }

    /// Edits an account. Editing your own account also updates the live
    /// session's identity snapshot.
    pub async fn update_user(
        &self,
        user_id: i64,
        update: &UserUpdate,
    ) -> Result<UserProfile, CrmError> {
        let actor = self.authenticated_user().await?;
        let profile = UpdateUserAction::new(self.users.clone(), Arc::clone(&self.policy))
            .execute(&actor, user_id, update, self.now())
            .await?;

        if profile.id == actor.id {
            let refreshed = {
                let mut current = self.write_current();
                current.as_mut().map(|session| {
                    session.user.name.clone_from(&profile.name);
                    session.user.email.clone_from(&profile.email);
                    session.user.role = profile.role;
                    session.user.ulpan.clone_from(&profile.ulpan);
                    session.clone()
                })
            };
            if let Some(session) = refreshed {
                self.persist(&session).await;
            }
        }
        Ok(profile)
    }

    pub async fn deactivate_user(&self, user_id: i64) -> Result<UserProfile, CrmError> {
        self.set_user_active(user_id, false).await
    }

    pub async fn activate_user(&self, user_id: i64) -> Result<UserProfile, CrmError> {
        self.set_user_active(user_id, true).await
    }

    async fn set_user_active(&self, user_id: i64, active: bool) -> Result<UserProfile, CrmError> {
        let actor = self.authenticated_user().await?;
        SetUserActiveAction::new(self.users.clone(), Arc::clone(&self.policy))
            .execute(&actor, user_id, active, self.now())
            .await
    }

    pub async fn search_users(&self, query: &str) -> Result<Vec<UserProfile>, CrmError> {
        let actor = self.authenticated_user().await?;
        ListUsersAction::new(self.users.clone(), Arc::clone(&self.policy))
            .execute(&actor, Some(query))
            .await
    }

    pub async fn get_all_users(&self) -> Result<Vec<UserProfile>, CrmError> {
        let actor = self.authenticated_user().await?;
        ListUsersAction::new(self.users.clone(), Arc::clone(&self.policy))
            .execute(&actor, None)
            .await
    }

    pub async fn get_login_audit(&self, limit: usize) -> Result<Vec<LoginAuditEntry>, CrmError> {
        let actor = self.authenticated_user().await?;
        LoginAuditAction::new(self.audit.clone(), Arc::clone(&self.policy))
            .execute(&actor, limit)
            .await
    }

    /// Changes the signed-in user's own password.
    pub async fn change_password(
        &self,
        current_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<(), CrmError> {
        let subject = self.authenticated_user().await?;
        ChangePasswordAction::with_hasher(
            self.users.clone(),
            self.password_policy.clone(),
            self.hasher.clone(),
        )
        .execute(&subject, current_password, new_password, self.now())
        .await
    }
}

#[async_trait]
impl<U, L, H> SessionContext for SessionManager<U, L, H>
where
    U: UserRepository + Clone + Send + Sync,
    L: LoginAuditRepository + Clone + Send + Sync,
    H: PasswordHasher + Clone,
{
    async fn authenticated_user(&self) -> Result<SessionUser, CrmError> {
        SessionManager::authenticated_user(self).await
    }
}
