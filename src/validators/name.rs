use super::ValidationError;

const NAME_MIN_LENGTH: usize = 2;
const NAME_MAX_LENGTH: usize = 50;

/// Display names of staff and students: 2 to 50 characters after trimming.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::NameEmpty);
    }

    let len = trimmed.chars().count();
    if len < NAME_MIN_LENGTH {
        return Err(ValidationError::NameTooShort(NAME_MIN_LENGTH));
    }
    if len > NAME_MAX_LENGTH {
        return Err(ValidationError::NameTooLong(NAME_MAX_LENGTH));
    }

    Ok(())
}
