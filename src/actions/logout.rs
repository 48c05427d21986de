use chrono::{DateTime, Utc};

use crate::gateway::CredentialProvider;
use crate::repository::LoginOutcome;
use crate::{LOG_TARGET, LoginAuditRepository, SessionUser};

/// Audits the logout and revokes the delegated-access credential.
///
/// Never fails: revocation and audit errors are logged and dropped.
pub struct LogoutAction<L: LoginAuditRepository> {
    audit_repository: L,
}

impl<L: LoginAuditRepository> LogoutAction<L> {
    pub fn new(audit_repository: L) -> Self {
        LogoutAction { audit_repository }
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "logout", skip_all)
    )]
    pub async fn execute(
        &self,
        user: Option<&SessionUser>,
        credentials: Option<&dyn CredentialProvider>,
        now: DateTime<Utc>,
    ) {
        if let Some(provider) = credentials {
            if let Err(e) = provider.revoke().await {
                log::warn!(
                    target: LOG_TARGET,
                    "msg=\"credential revocation failed\", error={e:?}"
                );
            }
        }

        if let Some(user) = user {
            if let Err(e) = self
                .audit_repository
                .record(Some(user.id), &user.username, LoginOutcome::Logout, now)
                .await
            {
                log::warn!(target: LOG_TARGET, "msg=\"logout audit failed\", error={e:?}");
            }
            log::info!(
                target: LOG_TARGET,
                "msg=\"logout success\", user_id={}",
                user.id
            );
        }
    }
}
