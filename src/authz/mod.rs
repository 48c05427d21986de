//! Role-based authorization with ulpan-scoped visibility.
//!
//! Everything here is pure: the policy answers questions about a
//! [`SessionUser`](crate::SessionUser) snapshot and never touches session state.

mod permission;
mod permission_set;
mod policy;
mod role;

pub use permission::Permission;
pub use permission_set::{PermissionSet, PermissionSetBuilder};
pub use policy::AuthorizationPolicy;
pub use role::Role;
