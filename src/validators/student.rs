//! Field formats for student records (Israeli phone and identity numbers).

use std::sync::LazyLock;

use regex::Regex;

use super::ValidationError;

#[allow(clippy::unwrap_used)]
static PHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+972|972|0)[-.\s]?([23489]|5[0248]|77)[-.\s]?\d{7}$").unwrap()
});

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if PHONE_REGEX.is_match(phone.trim()) {
        Ok(())
    } else {
        Err(ValidationError::PhoneInvalidFormat)
    }
}

/// Teudat zehut: exactly nine digits.
pub fn validate_identity_number(id: &str) -> Result<(), ValidationError> {
    let id = id.trim();
    if id.len() == 9 && id.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::IdentityNumberInvalid)
    }
}
