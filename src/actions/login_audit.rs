use std::sync::Arc;

use crate::{
    AuthorizationPolicy, CrmError, LoginAuditEntry, LoginAuditRepository, Role, SessionUser,
};

/// Recent login attempts, newest first. Admin only.
pub struct LoginAuditAction<L: LoginAuditRepository> {
    audit_repository: L,
    policy: Arc<AuthorizationPolicy>,
}

impl<L: LoginAuditRepository> LoginAuditAction<L> {
    pub fn new(audit_repository: L, policy: Arc<AuthorizationPolicy>) -> Self {
        LoginAuditAction {
            audit_repository,
            policy,
        }
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "login_audit", skip_all, err)
    )]
    pub async fn execute(
        &self,
        actor: &SessionUser,
        limit: usize,
    ) -> Result<Vec<LoginAuditEntry>, CrmError> {
        self.policy.require_role(Some(actor), Role::Admin)?;
        self.audit_repository.recent(limit).await
    }
}
