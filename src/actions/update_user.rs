use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::require_ulpan_for_role;
use crate::validators::{validate_email, validate_name};
use crate::{
    AuthorizationPolicy, CrmError, LOG_TARGET, Role, SessionUser, UserProfile, UserRepository,
    UserUpdate,
};

/// Edits another account's profile fields. Admin only.
pub struct UpdateUserAction<U: UserRepository> {
    user_repository: U,
    policy: Arc<AuthorizationPolicy>,
}

impl<U: UserRepository> UpdateUserAction<U> {
    pub fn new(user_repository: U, policy: Arc<AuthorizationPolicy>) -> Self {
        UpdateUserAction {
            user_repository,
            policy,
        }
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "update_user", skip_all, err)
    )]
    pub async fn execute(
        &self,
        actor: &SessionUser,
        user_id: i64,
        update: &UserUpdate,
        now: DateTime<Utc>,
    ) -> Result<UserProfile, CrmError> {
        self.policy.require_role(Some(actor), Role::Admin)?;

        if let Some(name) = &update.name {
            validate_name(name)?;
        }
        if let Some(Some(email)) = &update.email {
            validate_email(email)?;
        }

        let existing = self
            .user_repository
            .find_user_by_id(user_id)
            .await?
            .ok_or(CrmError::UserNotFound)?;
        let role = update.role.unwrap_or(existing.role);
        let ulpan = match &update.ulpan {
            Some(ulpan) => ulpan.as_deref(),
            None => existing.ulpan.as_deref(),
        };
        require_ulpan_for_role(role, ulpan)?;

        let updated = self
            .user_repository
            .update_user(user_id, update, actor.id, now)
            .await?;

        log::info!(
            target: LOG_TARGET,
            "msg=\"user updated\", user_id={}, by={}",
            updated.id,
            actor.id
        );
        Ok(updated.profile())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::fixtures::{admin, seed};
    use crate::validators::ValidationError;
    use crate::InMemoryUserRepository;

    fn action(users: &InMemoryUserRepository) -> UpdateUserAction<InMemoryUserRepository> {
        UpdateUserAction::new(users.clone(), Arc::new(AuthorizationPolicy::default()))
    }

    #[tokio::test]
    async fn test_update_user_success() {
        let users = InMemoryUserRepository::new();
        let actor = admin(&users).await;
        let target = seed(&users, "teacher1", "teach123", Role::Teacher, Some("Шалом")).await;

        let update = UserUpdate {
            name: Some("Анна Коэн".to_owned()),
            ulpan: Some(Some("Алеф".to_owned())),
            ..Default::default()
        };
        let profile = action(&users)
            .execute(&actor, target.id, &update, Utc::now())
            .await
            .unwrap();

        assert_eq!(profile.name, "Анна Коэн");
        assert_eq!(profile.ulpan.as_deref(), Some("Алеф"));
    }

    #[tokio::test]
    async fn test_update_user_not_found() {
        let users = InMemoryUserRepository::new();
        let actor = admin(&users).await;

        let result = action(&users)
            .execute(&actor, 999, &UserUpdate::default(), Utc::now())
            .await;
        assert_eq!(result.unwrap_err(), CrmError::UserNotFound);
    }

    #[tokio::test]
    async fn test_update_user_invalid_email() {
        let users = InMemoryUserRepository::new();
        let actor = admin(&users).await;

        let update = UserUpdate {
            email: Some(Some("not-an-email".to_owned())),
            ..Default::default()
        };
        let result = action(&users).execute(&actor, actor.id, &update, Utc::now()).await;
        assert_eq!(
            result.unwrap_err(),
            CrmError::Validation(ValidationError::EmailInvalidFormat)
        );
    }

    #[tokio::test]
    async fn test_clearing_ulpan_of_scoped_role_rejected() {
        let users = InMemoryUserRepository::new();
        let actor = admin(&users).await;
        let target = seed(&users, "teacher1", "teach123", Role::Teacher, Some("Шалом")).await;

        let update = UserUpdate {
            ulpan: Some(None),
            ..Default::default()
        };
        let result = action(&users).execute(&actor, target.id, &update, Utc::now()).await;
        assert!(matches!(result, Err(CrmError::Validation(_))));

        let promote = UserUpdate {
            role: Some(Role::Curator),
            ulpan: Some(None),
            ..Default::default()
        };
        assert!(action(&users)
            .execute(&actor, target.id, &promote, Utc::now())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_teacher_cannot_update() {
        let users = InMemoryUserRepository::new();
        let teacher = seed(&users, "teacher1", "teach123", Role::Teacher, Some("Шалом"))
            .await
            .session_user();

        let result = action(&users)
            .execute(&teacher, teacher.id, &UserUpdate::default(), Utc::now())
            .await;
        assert!(matches!(result, Err(CrmError::PermissionDenied(_))));
    }
}
