use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::require_ulpan_for_role;
use crate::crypto::{Argon2Hasher, PasswordHasher};
use crate::validators::{validate_email, validate_name, validate_username, PasswordPolicy};
use crate::{
    AuthorizationPolicy, CrmError, LOG_TARGET, NewUser, Role, SessionUser, UserProfile,
    UserRepository,
};

/// Creates a staff account. Admin only.
pub struct CreateUserAction<U, H = Argon2Hasher>
where
    U: UserRepository,
{
    user_repository: U,
    policy: Arc<AuthorizationPolicy>,
    password_policy: PasswordPolicy,
    hasher: H,
}

impl<U: UserRepository> CreateUserAction<U, Argon2Hasher> {
    pub fn new(user_repository: U, policy: Arc<AuthorizationPolicy>) -> Self {
        Self {
            user_repository,
            policy,
            password_policy: PasswordPolicy::default(),
            hasher: Argon2Hasher::default(),
        }
    }
}

impl<U: UserRepository, H: PasswordHasher> CreateUserAction<U, H> {
    pub fn with_hasher(
        user_repository: U,
        policy: Arc<AuthorizationPolicy>,
        password_policy: PasswordPolicy,
        hasher: H,
    ) -> Self {
        Self {
            user_repository,
            policy,
            password_policy,
            hasher,
        }
    }

    /// # Errors
    ///
    /// `PermissionDenied` for non-admin actors, `UserAlreadyExists` when the
    /// username is taken in any letter case, validation errors for bad input.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "create_user", skip_all, err)
    )]
    pub async fn execute(
        &self,
        actor: &SessionUser,
        user: &NewUser,
        now: DateTime<Utc>,
    ) -> Result<UserProfile, CrmError> {
        self.policy.require_role(Some(actor), Role::Admin)?;

        validate_username(&user.username)?;
        validate_name(&user.name)?;
        if let Some(email) = &user.email {
            validate_email(email)?;
        }
        require_ulpan_for_role(user.role, user.ulpan.as_deref())?;
        self.password_policy
            .validate(user.password.expose_secret())?;

        if self.user_repository.username_taken(&user.username).await? {
            return Err(CrmError::UserAlreadyExists);
        }

        let hashed = self.hasher.hash(user.password.expose_secret())?;
        let created = self
            .user_repository
            .create_user(user, &hashed, Some(actor.id), now)
            .await?;

        log::info!(
            target: LOG_TARGET,
            "msg=\"user created\", user_id={}, role={}, by={}",
            created.id,
            created.role,
            actor.id
        );
        Ok(created.profile())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::fixtures::{admin, new_user, seed};
    use crate::validators::ValidationError;
    use crate::InMemoryUserRepository;

    fn action(users: &InMemoryUserRepository) -> CreateUserAction<InMemoryUserRepository> {
        CreateUserAction::with_hasher(
            users.clone(),
            Arc::new(AuthorizationPolicy::default()),
            PasswordPolicy::default(),
            Argon2Hasher::fast(),
        )
    }

    #[tokio::test]
    async fn test_admin_creates_user() {
        let users = InMemoryUserRepository::new();
        let actor = admin(&users).await;

        let profile = action(&users)
            .execute(
                &actor,
                &new_user("teacher1", "teach123", Role::Teacher, Some("Шалом")),
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(profile.username, "teacher1");
        assert_eq!(profile.ulpan.as_deref(), Some("Шалом"));
        let stored = users.find_user_by_id(profile.id).await.unwrap().unwrap();
        assert_eq!(stored.created_by, Some(actor.id));
        assert_ne!(stored.hashed_password, "teach123");
    }

    #[tokio::test]
    async fn test_duplicate_username_any_case() {
        let users = InMemoryUserRepository::new();
        let actor = admin(&users).await;
        seed(&users, "Teacher1", "teach123", Role::Teacher, Some("Шалом")).await;

        for username in ["Teacher1", "teacher1", "TEACHER1"] {
            let result = action(&users)
                .execute(
                    &actor,
                    &new_user(username, "different1", Role::Finance, None),
                    Utc::now(),
                )
                .await;
            assert_eq!(result.unwrap_err(), CrmError::UserAlreadyExists);
        }
    }

    #[tokio::test]
    async fn test_non_admin_rejected() {
        let users = InMemoryUserRepository::new();
        let curator = seed(&users, "curator", "cur123", Role::Curator, None)
            .await
            .session_user();

        let result = action(&users)
            .execute(
                &curator,
                &new_user("x", "secret1", Role::Seller, None),
                Utc::now(),
            )
            .await;
        assert_eq!(
            result.unwrap_err(),
            CrmError::PermissionDenied("ADMIN".to_owned())
        );
    }

    #[tokio::test]
    async fn test_scoped_role_requires_ulpan() {
        let users = InMemoryUserRepository::new();
        let actor = admin(&users).await;

        let result = action(&users)
            .execute(
                &actor,
                &new_user("ulpan1", "secret1", Role::Ulpan, None),
                Utc::now(),
            )
            .await;
        assert_eq!(
            result.unwrap_err(),
            CrmError::Validation(ValidationError::RequiredField("ulpan".to_owned()))
        );
    }

    #[tokio::test]
    async fn test_short_password_rejected() {
        let users = InMemoryUserRepository::new();
        let actor = admin(&users).await;

        let result = action(&users)
            .execute(
                &actor,
                &new_user("seller", "12345", Role::Seller, None),
                Utc::now(),
            )
            .await;
        assert_eq!(
            result.unwrap_err(),
            CrmError::Validation(ValidationError::PasswordTooShort(6))
        );
    }
}
