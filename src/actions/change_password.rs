use chrono::{DateTime, Utc};

use crate::crypto::{Argon2Hasher, PasswordHasher};
use crate::validators::PasswordPolicy;
use crate::{CrmError, LOG_TARGET, SecretString, SessionUser, UserRepository};

/// Changes the password of the signed-in user.
pub struct ChangePasswordAction<U, H = Argon2Hasher>
where
    U: UserRepository,
{
    user_repository: U,
    password_policy: PasswordPolicy,
    hasher: H,
}

impl<U: UserRepository> ChangePasswordAction<U, Argon2Hasher> {
    pub fn new(user_repository: U) -> Self {
        Self {
            user_repository,
            password_policy: PasswordPolicy::default(),
            hasher: Argon2Hasher::default(),
        }
    }
}

impl<U: UserRepository, H: PasswordHasher> ChangePasswordAction<U, H> {
    pub fn with_hasher(user_repository: U, password_policy: PasswordPolicy, hasher: H) -> Self {
        Self {
            user_repository,
            password_policy,
            hasher,
        }
    }

    /// # Errors
    ///
    /// `InvalidCredentials` when `current_password` is wrong, a validation
    /// error when `new_password` breaks the policy.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "change_password", skip_all, err)
    )]
    pub async fn execute(
        &self,
        subject: &SessionUser,
        current_password: &SecretString,
        new_password: &SecretString,
        now: DateTime<Utc>,
    ) -> Result<(), CrmError> {
        let user = self
            .user_repository
            .find_user_by_id(subject.id)
            .await?
            .ok_or(CrmError::UserNotFound)?;

        if !self
            .hasher
            .verify(current_password.expose_secret(), &user.hashed_password)?
        {
            return Err(CrmError::InvalidCredentials);
        }

        self.password_policy
            .validate(new_password.expose_secret())?;

        let hashed = self.hasher.hash(new_password.expose_secret())?;
        self.user_repository
            .update_password(user.id, &hashed, now)
            .await?;

        log::info!(
            target: LOG_TARGET,
            "msg=\"password changed\", user_id={}",
            user.id
        );
        Ok(())
    }
}
