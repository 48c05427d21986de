//! Compact permission storage for a role.

use std::collections::BTreeSet;

use super::Permission;

/// A set of permissions granted to a role.
///
/// # Example
///
/// ```rust
/// use ulpan_crm::authz::{Permission, PermissionSetBuilder};
///
/// let perms = PermissionSetBuilder::new()
///     .grant(Permission::Read)
///     .grant(Permission::UploadDocs)
///     .build();
///
/// assert!(perms.can(Permission::UploadDocs));
/// assert!(!perms.can(Permission::Delete));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    permissions: BTreeSet<Permission>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, permission: Permission) {
        self.permissions.insert(permission);
    }

    pub fn revoke(&mut self, permission: Permission) {
        self.permissions.remove(&permission);
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.permissions.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Serializes to a JSON array of permission names.
    ///
    /// Format: `["read", "write", "upload_docs"]`
    pub fn to_json(&self) -> String {
        let names: Vec<&str> = self.permissions.iter().map(Permission::as_str).collect();
        serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_owned())
    }

    /// Returns None if parsing fails or any permission name is unrecognized.
    pub fn from_json(json: &str) -> Option<Self> {
        let names: Vec<String> = serde_json::from_str(json).ok()?;
        let mut set = Self::new();
        for name in names {
            set.grant(name.parse::<Permission>().ok()?);
        }
        Some(set)
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self {
            permissions: iter.into_iter().collect(),
        }
    }
}

/// Builder for creating permission sets with a fluent API.
#[must_use]
#[derive(Default)]
pub struct PermissionSetBuilder {
    set: PermissionSet,
}

impl PermissionSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, permission: Permission) -> Self {
        self.set.grant(permission);
        self
    }

    pub fn build(self) -> PermissionSet {
        self.set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_and_revoke() {
        let mut perms = PermissionSet::new();
        perms.grant(Permission::Read);
        perms.grant(Permission::Write);
        perms.grant(Permission::Read);

        assert_eq!(perms.len(), 2);
        assert!(perms.can(Permission::Write));

        perms.revoke(Permission::Write);
        assert!(!perms.can(Permission::Write));
        assert!(perms.can(Permission::Read));
    }

    #[test]
    fn test_json_format() {
        let perms: PermissionSet = [Permission::UploadDocs, Permission::Read]
            .into_iter()
            .collect();
        assert_eq!(perms.to_json(), r#"["read","upload_docs"]"#);

        let parsed = PermissionSet::from_json(&perms.to_json()).expect("should parse");
        assert_eq!(parsed, perms);
    }

    #[test]
    fn test_from_json_rejects_unknown() {
        assert!(PermissionSet::from_json(r#"["read","launch"]"#).is_none());
        assert!(PermissionSet::from_json("not json").is_none());
    }

    #[test]
    fn test_empty_set() {
        let perms = PermissionSetBuilder::new().build();
        assert!(perms.is_empty());
        assert!(!perms.can(Permission::Read));
    }
}
