use std::collections::HashMap;

use super::{Permission, PermissionSet, PermissionSetBuilder, Role};
use crate::{CrmError, SessionUser};

/// Role to permission table plus the ulpan-scope rule.
///
/// ```rust
/// use ulpan_crm::{AuthorizationPolicy, Permission, Role};
///
/// let policy = AuthorizationPolicy::default();
/// assert!(policy.role_has_permission(Role::Ulpan, Permission::UploadDocs));
/// assert!(!policy.role_has_permission(Role::Teacher, Permission::Delete));
/// ```
#[derive(Debug, Clone)]
pub struct AuthorizationPolicy {
    roles: HashMap<Role, PermissionSet>,
}

impl Default for AuthorizationPolicy {
    fn default() -> Self {
        use Permission::{
            CreateVoucher, Delete, Export, ManagePayments, ManageUsers, Read, UploadDocs,
            VerifyDocs, ViewAll, ViewOwnUlpan, ViewPayments, Write,
        };

        let table: [(Role, &[Permission]); 6] = [
            (Role::Admin, &[Read, Write, Delete, ManageUsers, ViewAll, Export]),
            (Role::Teacher, &[Read, Write, ViewOwnUlpan]),
            (Role::Seller, &[Read, Write, CreateVoucher]),
            (Role::Ulpan, &[Read, Write, ViewOwnUlpan, UploadDocs]),
            (Role::Finance, &[Read, Write, ViewPayments, ManagePayments]),
            (Role::Curator, &[Read, Write, VerifyDocs, ViewAll]),
        ];

        let roles = table
            .into_iter()
            .map(|(role, permissions)| {
                let set = permissions
                    .iter()
                    .fold(PermissionSetBuilder::new(), |builder, p| builder.grant(*p))
                    .build();
                (role, set)
            })
            .collect();

        Self { roles }
    }
}

impl AuthorizationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the permission set of one role.
    #[must_use]
    pub fn with_role(mut self, role: Role, permissions: PermissionSet) -> Self {
        self.roles.insert(role, permissions);
        self
    }

    pub fn permissions(&self, role: Role) -> Option<&PermissionSet> {
        self.roles.get(&role)
    }

    pub fn role_has_permission(&self, role: Role, permission: Permission) -> bool {
        self.roles.get(&role).is_some_and(|set| set.can(permission))
    }

    /// False when there is no authenticated user.
    pub fn has_permission(&self, user: Option<&SessionUser>, permission: Permission) -> bool {
        user.is_some_and(|u| self.role_has_permission(u.role, permission))
    }

    /// Whether `user` may see records of `ulpan`.
    ///
    /// Ulpan-scoped roles match their own ulpan exactly; a scoped user with no
    /// ulpan on record sees nothing.
    pub fn can_access_ulpan(&self, user: Option<&SessionUser>, ulpan: &str) -> bool {
        match user {
            None => false,
            Some(u) if u.role.is_ulpan_scoped() => u.ulpan.as_deref() == Some(ulpan),
            Some(_) => true,
        }
    }

    /// # Errors
    ///
    /// `NotAuthenticated` without a user, `PermissionDenied` naming the
    /// permission otherwise.
    pub fn require_permission(
        &self,
        user: Option<&SessionUser>,
        permission: Permission,
    ) -> Result<(), CrmError> {
        let user = user.ok_or(CrmError::NotAuthenticated)?;
        if self.role_has_permission(user.role, permission) {
            Ok(())
        } else {
            log::warn!(
                target: crate::LOG_TARGET,
                "msg=\"permission denied\", user_id={}, role={}, permission={}",
                user.id,
                user.role,
                permission
            );
            Err(CrmError::PermissionDenied(permission.as_str().to_owned()))
        }
    }

    /// # Errors
    ///
    /// `NotAuthenticated` without a user, `PermissionDenied` naming the ulpan
    /// when [`can_access_ulpan`](Self::can_access_ulpan) refuses it.
    pub fn require_ulpan_access(
        &self,
        user: Option<&SessionUser>,
        ulpan: &str,
    ) -> Result<(), CrmError> {
        let user = user.ok_or(CrmError::NotAuthenticated)?;
        if self.can_access_ulpan(Some(user), ulpan) {
            Ok(())
        } else {
            log::warn!(
                target: crate::LOG_TARGET,
                "msg=\"ulpan access denied\", user_id={}, role={}, ulpan=\"{ulpan}\"",
                user.id,
                user.role
            );
            Err(CrmError::PermissionDenied(format!("access to ulpan \"{ulpan}\"")))
        }
    }

    /// # Errors
    ///
    /// `NotAuthenticated` without a user, `PermissionDenied` naming the role
    /// otherwise.
    pub fn require_role(&self, user: Option<&SessionUser>, role: Role) -> Result<(), CrmError> {
        let user = user.ok_or(CrmError::NotAuthenticated)?;
        if user.role == role {
            Ok(())
        } else {
            log::warn!(
                target: crate::LOG_TARGET,
                "msg=\"role required\", user_id={}, role={}, required={}",
                user.id,
                user.role,
                role
            );
            Err(CrmError::PermissionDenied(role.as_str().to_owned()))
        }
    }
}
