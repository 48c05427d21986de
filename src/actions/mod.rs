//! Account operations. Each action is a small struct built from the
//! repositories it needs, with a single `execute` method.

pub mod change_password;
pub mod create_user;
pub mod list_users;
pub mod login;
pub mod login_audit;
pub mod logout;
pub mod set_active;
pub mod update_user;

pub use change_password::ChangePasswordAction;
pub use create_user::CreateUserAction;
pub use list_users::ListUsersAction;
pub use login::LoginAction;
pub use login_audit::LoginAuditAction;
pub use logout::LogoutAction;
pub use set_active::SetUserActiveAction;
pub use update_user::UpdateUserAction;

use crate::{CrmError, Role, ValidationError};

/// Scoped roles cannot exist without an ulpan to be scoped to.
fn require_ulpan_for_role(role: Role, ulpan: Option<&str>) -> Result<(), CrmError> {
    if role.is_ulpan_scoped() && !ulpan.is_some_and(|u| !u.trim().is_empty()) {
        return Err(ValidationError::RequiredField("ulpan".to_owned()).into());
    }
    Ok(())
}
