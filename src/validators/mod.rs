//! Input validation for user records, students and document uploads.

pub mod email;
pub mod name;
pub mod password;
pub mod student;
pub mod username;

pub use email::validate_email;
pub use name::validate_name;
pub use password::PasswordPolicy;
pub use student::{validate_identity_number, validate_phone};
pub use username::validate_username;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationError {
    UsernameEmpty,
    UsernameTooLong(usize),
    UsernameInvalidCharacters,
    PasswordEmpty,
    PasswordTooShort(usize),
    PasswordTooLong(usize),
    EmailTooLong,
    EmailInvalidFormat,
    NameEmpty,
    NameTooShort(usize),
    NameTooLong(usize),
    PhoneInvalidFormat,
    IdentityNumberInvalid,
    RequiredField(String),
    FileTooLarge { max_bytes: u64 },
    UnsupportedFormat { allowed: Vec<String> },
    UnknownDocumentType(String),
    UnknownRole(String),
    UnknownPermission(String),
    FolderNotConfigured(String),
    CannotDeactivateSelf,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UsernameEmpty => write!(f, "Username cannot be empty"),
            Self::UsernameTooLong(max) => {
                write!(f, "Username is too long (max {max} characters)")
            }
            Self::UsernameInvalidCharacters => write!(
                f,
                "Username may only contain letters, digits, '.', '_' and '-'"
            ),
            Self::PasswordEmpty => write!(f, "Password cannot be empty"),
            Self::PasswordTooShort(min) => {
                write!(f, "Password must be at least {min} characters")
            }
            Self::PasswordTooLong(max) => {
                write!(f, "Password is too long (max {max} characters)")
            }
            Self::EmailTooLong => write!(f, "Email is too long (max 254 characters)"),
            Self::EmailInvalidFormat => write!(f, "Invalid email format"),
            Self::NameEmpty => write!(f, "Name cannot be empty"),
            Self::NameTooShort(min) => write!(f, "Name must be at least {min} characters"),
            Self::NameTooLong(max) => write!(f, "Name is too long (max {max} characters)"),
            Self::PhoneInvalidFormat => write!(f, "Invalid phone number format"),
            Self::IdentityNumberInvalid => write!(f, "Identity number must be 9 digits"),
            Self::RequiredField(field) => write!(f, "Required field is missing: {field}"),
            Self::FileTooLarge { max_bytes } => {
                #[allow(clippy::cast_precision_loss)]
                let max_mb = *max_bytes as f64 / (1024.0 * 1024.0);
                write!(f, "File too large. Maximum: {max_mb:.1}MB")
            }
            Self::UnsupportedFormat { allowed } => write!(
                f,
                "Unsupported file format. Supported: {}",
                allowed.join(", ")
            ),
            Self::UnknownDocumentType(name) => write!(f, "Unknown document type: {name}"),
            Self::UnknownRole(name) => write!(f, "Unknown role: {name}"),
            Self::UnknownPermission(name) => write!(f, "Unknown permission: {name}"),
            Self::FolderNotConfigured(name) => {
                write!(f, "No storage folder configured for document type {name}")
            }
            Self::CannotDeactivateSelf => write!(f, "You cannot deactivate your own account"),
        }
    }
}

impl std::error::Error for ValidationError {}
