use super::ValidationError;

const USERNAME_MAX_LENGTH: usize = 64;

/// Usernames are login keys: ASCII letters, digits, `.`, `_` and `-`.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::UsernameEmpty);
    }
    if username.len() > USERNAME_MAX_LENGTH {
        return Err(ValidationError::UsernameTooLong(USERNAME_MAX_LENGTH));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(ValidationError::UsernameInvalidCharacters);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_usernames() {
        assert!(validate_username("teacher1").is_ok());
        assert!(validate_username("finance.team").is_ok());
        assert!(validate_username("ulpan_shalom-2").is_ok());
    }

    #[test]
    fn test_invalid_usernames() {
        assert_eq!(validate_username("").unwrap_err(), ValidationError::UsernameEmpty);
        assert_eq!(
            validate_username("has space").unwrap_err(),
            ValidationError::UsernameInvalidCharacters
        );
        assert_eq!(
            validate_username(&"a".repeat(65)).unwrap_err(),
            ValidationError::UsernameTooLong(64)
        );
    }
}
