use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::validators::ValidationError;
use crate::{AuthorizationPolicy, CrmError, LOG_TARGET, Role, SessionUser, UserProfile, UserRepository};

/// Soft-deletes or restores an account. Admin only.
pub struct SetUserActiveAction<U: UserRepository> {
    user_repository: U,
    policy: Arc<AuthorizationPolicy>,
}

impl<U: UserRepository> SetUserActiveAction<U> {
    pub fn new(user_repository: U, policy: Arc<AuthorizationPolicy>) -> Self {
        SetUserActiveAction {
            user_repository,
            policy,
        }
    }

    /// # Errors
    ///
    /// Admins cannot deactivate themselves.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "set_user_active", skip_all, err)
    )]
    pub async fn execute(
        &self,
        actor: &SessionUser,
        user_id: i64,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<UserProfile, CrmError> {
        self.policy.require_role(Some(actor), Role::Admin)?;

        if !active && user_id == actor.id {
            return Err(ValidationError::CannotDeactivateSelf.into());
        }

        let user = self
            .user_repository
            .set_active(user_id, active, actor.id, now)
            .await?;

        log::info!(
            target: LOG_TARGET,
            "msg=\"{}\", user_id={}, by={}",
            if active { "user activated" } else { "user deactivated" },
            user.id,
            actor.id
        );
        Ok(user.profile())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::fixtures::{admin, seed};
    use crate::InMemoryUserRepository;

    fn action(users: &InMemoryUserRepository) -> SetUserActiveAction<InMemoryUserRepository> {
        SetUserActiveAction::new(users.clone(), Arc::new(AuthorizationPolicy::default()))
    }

    #[tokio::test]
    async fn test_deactivate_then_activate() {
        let users = InMemoryUserRepository::new();
        let actor = admin(&users).await;
        let target = seed(&users, "seller", "sell123", Role::Seller, None).await;

        let off = action(&users)
            .execute(&actor, target.id, false, Utc::now())
            .await
            .unwrap();
        assert!(!off.active);

        let on = action(&users)
            .execute(&actor, target.id, true, Utc::now())
            .await
            .unwrap();
        assert!(on.active);

        let stored = users.find_user_by_id(target.id).await.unwrap().unwrap();
        assert_eq!(stored.deactivated_by, Some(actor.id));
        assert_eq!(stored.activated_by, Some(actor.id));
    }

    #[tokio::test]
    async fn test_cannot_deactivate_self() {
        let users = InMemoryUserRepository::new();
        let actor = admin(&users).await;

        let result = action(&users).execute(&actor, actor.id, false, Utc::now()).await;
        assert_eq!(
            result.unwrap_err(),
            CrmError::Validation(ValidationError::CannotDeactivateSelf)
        );
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let users = InMemoryUserRepository::new();
        let actor = admin(&users).await;

        let result = action(&users).execute(&actor, 404, false, Utc::now()).await;
        assert_eq!(result.unwrap_err(), CrmError::UserNotFound);
    }
}
