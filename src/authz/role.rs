use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::validators::ValidationError;

/// Staff roles. Each user holds exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Teacher,
    Seller,
    Ulpan,
    Finance,
    Curator,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Admin,
        Role::Teacher,
        Role::Seller,
        Role::Ulpan,
        Role::Finance,
        Role::Curator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Teacher => "TEACHER",
            Self::Seller => "SELLER",
            Self::Ulpan => "ULPAN",
            Self::Finance => "FINANCE",
            Self::Curator => "CURATOR",
        }
    }

    /// Human-readable name shown in views.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Admin => "Администратор",
            Self::Teacher => "Учитель",
            Self::Seller => "Продавец ваучеров",
            Self::Ulpan => "Ульпан",
            Self::Finance => "Финансовый отдел",
            Self::Curator => "Куратор",
        }
    }

    /// Roles whose visibility is limited to the ulpan on their own record.
    pub fn is_ulpan_scoped(&self) -> bool {
        matches!(self, Self::Teacher | Self::Ulpan)
    }
}

/// Parses the stored role name. Case-sensitive.
impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownRole(s.to_owned()))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
