use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::validators::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Read,
    Write,
    Delete,
    ManageUsers,
    ViewAll,
    Export,
    ViewOwnUlpan,
    CreateVoucher,
    UploadDocs,
    ViewPayments,
    ManagePayments,
    VerifyDocs,
}

impl Permission {
    pub const ALL: [Permission; 12] = [
        Permission::Read,
        Permission::Write,
        Permission::Delete,
        Permission::ManageUsers,
        Permission::ViewAll,
        Permission::Export,
        Permission::ViewOwnUlpan,
        Permission::CreateVoucher,
        Permission::UploadDocs,
        Permission::ViewPayments,
        Permission::ManagePayments,
        Permission::VerifyDocs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
            Self::ManageUsers => "manage_users",
            Self::ViewAll => "view_all",
            Self::Export => "export",
            Self::ViewOwnUlpan => "view_own_ulpan",
            Self::CreateVoucher => "create_voucher",
            Self::UploadDocs => "upload_docs",
            Self::ViewPayments => "view_payments",
            Self::ManagePayments => "manage_payments",
            Self::VerifyDocs => "verify_docs",
        }
    }
}

impl FromStr for Permission {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownPermission(s.to_owned()))
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_names() {
        for permission in Permission::ALL {
            assert_eq!(permission.as_str().parse(), Ok(permission));
        }
        assert_eq!(
            "fly".parse::<Permission>(),
            Err(ValidationError::UnknownPermission("fly".to_owned()))
        );
    }
}
