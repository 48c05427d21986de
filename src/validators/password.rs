use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Length rules for staff passwords.
///
/// Lengths are counted in characters, not bytes, so Cyrillic and Hebrew
/// passwords are measured the way users type them.
///
/// # Examples
///
/// ```
/// use ulpan_crm::validators::PasswordPolicy;
///
/// let policy = PasswordPolicy::default();
/// assert!(policy.validate("teach123").is_ok());
/// assert!(policy.validate("abc").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordPolicy {
    /// Minimum password length (default: 6)
    pub min_length: usize,
    /// Maximum password length (default: 128)
    pub max_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 6,
            max_length: 128,
        }
    }
}

impl PasswordPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn min(mut self, len: usize) -> Self {
        self.min_length = len;
        self
    }

    #[must_use]
    pub fn max(mut self, len: usize) -> Self {
        self.max_length = len;
        self
    }

    /// # Errors
    ///
    /// Returns a `ValidationError` if the password is empty or out of bounds.
    pub fn validate(&self, password: &str) -> Result<(), ValidationError> {
        if password.is_empty() {
            return Err(ValidationError::PasswordEmpty);
        }

        let len = password.chars().count();
        if len < self.min_length {
            return Err(ValidationError::PasswordTooShort(self.min_length));
        }
        if len > self.max_length {
            return Err(ValidationError::PasswordTooLong(self.max_length));
        }

        Ok(())
    }
}
