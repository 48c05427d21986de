use std::sync::Arc;

use crate::{AuthorizationPolicy, CrmError, Role, SessionUser, UserProfile, UserRecord, UserRepository};

/// Lists accounts without their credentials. Admin only.
pub struct ListUsersAction<U: UserRepository> {
    user_repository: U,
    policy: Arc<AuthorizationPolicy>,
}

impl<U: UserRepository> ListUsersAction<U> {
    pub fn new(user_repository: U, policy: Arc<AuthorizationPolicy>) -> Self {
        ListUsersAction {
            user_repository,
            policy,
        }
    }

    /// With a query, keeps accounts whose username, name, email or ulpan
    /// contains it, ignoring case. A blank query lists everything.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "list_users", skip_all, err)
    )]
    pub async fn execute(
        &self,
        actor: &SessionUser,
        query: Option<&str>,
    ) -> Result<Vec<UserProfile>, CrmError> {
        self.policy.require_role(Some(actor), Role::Admin)?;

        let users = self.user_repository.list_users().await?;
        let needle = query.map(str::trim).filter(|q| !q.is_empty()).map(str::to_lowercase);

        Ok(users
            .iter()
            .filter(|user| needle.as_deref().map_or(true, |q| matches_query(user, q)))
            .map(UserRecord::profile)
            .collect())
    }
}

fn matches_query(user: &UserRecord, needle: &str) -> bool {
    [
        Some(user.username.as_str()),
        Some(user.name.as_str()),
        user.email.as_deref(),
        user.ulpan.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::fixtures::{admin, seed};
    use crate::InMemoryUserRepository;

    fn action(users: &InMemoryUserRepository) -> ListUsersAction<InMemoryUserRepository> {
        ListUsersAction::new(users.clone(), Arc::new(AuthorizationPolicy::default()))
    }

    #[tokio::test]
    async fn test_list_all_and_search() {
        let users = InMemoryUserRepository::new();
        let actor = admin(&users).await;
        seed(&users, "teacher1", "teach123", Role::Teacher, Some("Шалом")).await;
        seed(&users, "ulpan_alef", "alef123", Role::Ulpan, Some("Алеф")).await;

        let all = action(&users).execute(&actor, None).await.unwrap();
        assert_eq!(all.len(), 3);

        let found = action(&users).execute(&actor, Some("шалом")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "teacher1");

        let blank = action(&users).execute(&actor, Some("  ")).await.unwrap();
        assert_eq!(blank.len(), 3);
    }

    #[tokio::test]
    async fn test_listing_has_no_credentials() {
        let users = InMemoryUserRepository::new();
        let actor = admin(&users).await;

        let all = action(&users).execute(&actor, None).await.unwrap();
        let json = serde_json::to_string(&all).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
    }

    #[tokio::test]
    async fn test_non_admin_rejected() {
        let users = InMemoryUserRepository::new();
        let finance = seed(&users, "finance", "fin123", Role::Finance, None)
            .await
            .session_user();

        let result = action(&users).execute(&finance, None).await;
        assert!(matches!(result, Err(CrmError::PermissionDenied(_))));
    }
}
