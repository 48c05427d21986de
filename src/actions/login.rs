use chrono::{DateTime, Utc};

use crate::crypto::{Argon2Hasher, PasswordHasher};
use crate::repository::LoginOutcome;
use crate::{CrmError, LOG_TARGET, LoginAuditRepository, SecretString, UserRecord, UserRepository};

/// Checks a username/password pair against the account store.
///
/// Unknown usernames, wrong passwords and inactive accounts all fail with the
/// same `InvalidCredentials` error.
pub struct LoginAction<U, L, H = Argon2Hasher>
where
    U: UserRepository,
    L: LoginAuditRepository,
{
    user_repository: U,
    audit_repository: L,
    hasher: H,
}

impl<U: UserRepository, L: LoginAuditRepository> LoginAction<U, L, Argon2Hasher> {
    pub fn new(user_repository: U, audit_repository: L) -> Self {
        Self {
            user_repository,
            audit_repository,
            hasher: Argon2Hasher::default(),
        }
    }
}

impl<U: UserRepository, L: LoginAuditRepository, H: PasswordHasher> LoginAction<U, L, H> {
    pub fn with_hasher(user_repository: U, audit_repository: L, hasher: H) -> Self {
        Self {
            user_repository,
            audit_repository,
            hasher,
        }
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "login", skip_all, err)
    )]
    pub async fn execute(
        &self,
        username: &str,
        password: &SecretString,
        now: DateTime<Utc>,
    ) -> Result<UserRecord, CrmError> {
        let user = self.user_repository.find_user_by_username(username).await?;

        let accepted = match &user {
            Some(user) if user.active => self
                .hasher
                .verify(password.expose_secret(), &user.hashed_password)
                .unwrap_or_else(|e| {
                    log::error!(
                        target: LOG_TARGET,
                        "msg=\"stored credential unreadable\", user_id={}, error=\"{e}\"",
                        user.id
                    );
                    false
                }),
            _ => {
                // same cost as a wrong password; the result is discarded
                let _ = self
                    .hasher
                    .verify(password.expose_secret(), &self.hasher.dummy_hash());
                false
            }
        };

        let user_id = user.as_ref().map(|u| u.id);
        let outcome = if accepted {
            LoginOutcome::Success
        } else {
            LoginOutcome::Failed
        };
        if let Err(e) = self
            .audit_repository
            .record(user_id, username, outcome, now)
            .await
        {
            log::warn!(target: LOG_TARGET, "msg=\"login audit failed\", error={e:?}");
        }

        match user {
            Some(user) if accepted => {
                self.user_repository.record_login(user.id, now).await?;
                log::info!(
                    target: LOG_TARGET,
                    "msg=\"login success\", user_id={}, role={}",
                    user.id,
                    user.role
                );
                Ok(UserRecord {
                    last_login: Some(now),
                    ..user
                })
            }
            _ => {
                log::info!(target: LOG_TARGET, "msg=\"login failed\"");
                Err(CrmError::InvalidCredentials)
            }
        }
    }
}
