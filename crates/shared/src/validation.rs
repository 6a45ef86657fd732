//! Common validation utilities.

use validator::ValidationError;

/// Maximum length for report and dashboard names.
const MAX_NAME_LENGTH: usize = 200;

/// Maximum length for descriptions.
const MAX_DESCRIPTION_LENGTH: usize = 1000;

/// Validates a report/dashboard display name.
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("name_empty");
        err.message = Some("Name must not be empty".into());
        return Err(err);
    }
    if trimmed.len() > MAX_NAME_LENGTH {
        let mut err = ValidationError::new("name_too_long");
        err.message = Some("Name must be at most 200 characters".into());
        return Err(err);
    }
    Ok(())
}

/// Validates an optional description.
pub fn validate_description(description: &str) -> Result<(), ValidationError> {
    if description.len() > MAX_DESCRIPTION_LENGTH {
        let mut err = ValidationError::new("description_too_long");
        err.message = Some("Description must be at most 1000 characters".into());
        return Err(err);
    }
    Ok(())
}

/// Validates a metric or field identifier: lowercase alphanumeric with underscores.
pub fn validate_identifier(identifier: &str) -> Result<(), ValidationError> {
    let valid = !identifier.is_empty()
        && identifier
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_identifier");
        err.message =
            Some("Identifier must be lowercase alphanumeric with underscores".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_display_name() {
        assert!(validate_display_name("Monthly Sales Summary").is_ok());
        assert!(validate_display_name("").is_err());
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name(&"x".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_description() {
        assert!(validate_description("").is_ok());
        assert!(validate_description(&"x".repeat(1000)).is_ok());
        assert!(validate_description(&"x".repeat(1001)).is_err());
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("sales_total_mtd").is_ok());
        assert!(validate_identifier("q4_2024").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("Sales Total").is_err());
        assert!(validate_identifier("sales-total").is_err());
    }
}
