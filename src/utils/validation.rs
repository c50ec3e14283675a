//! Validation Utilities
//!
//! Input validation for staff accounts, OTP codes and patient records.

use regex::Regex;
use std::sync::OnceLock;
use validator::{ValidationError, ValidationErrors};

/// Validates email address format
pub fn validate_email(email: &str) -> bool {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    regex.is_match(email.trim())
}

/// Normalizes email address to lowercase and removes whitespace
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A mobile number is exactly 10 ASCII digits
pub fn validate_mobile(mobile: &str) -> bool {
    mobile.len() == 10 && mobile.bytes().all(|b| b.is_ascii_digit())
}

/// OTP codes are exactly 6 ASCII digits
pub fn validate_otp_code(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}

/// Validates that a name is non-empty and uses allowed characters
pub fn validate_name(name: &str) -> bool {
    let trimmed = name.trim();

    if trimmed.is_empty() || trimmed.len() > 255 {
        return false;
    }

    // Letters, spaces, dots, hyphens and apostrophes ("Dr. A. D'Souza")
    static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = NAME_REGEX
        .get_or_init(|| Regex::new(r"^[\p{L}\s.\-']+$").expect("Failed to compile name regex"));

    regex.is_match(trimmed)
}

/// Login identifiers are either a mobile number or an email address
pub fn validate_identifier(identifier: &str) -> bool {
    let trimmed = identifier.trim();
    validate_mobile(trimmed) || validate_email(trimmed)
}

/// Custom validator for email fields using the validator crate
pub fn email_validator(email: &str) -> Result<(), ValidationError> {
    if validate_email(email) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_email").with_message(messages::INVALID_EMAIL.into()))
    }
}

/// Custom validator for mobile fields
pub fn mobile_validator(mobile: &str) -> Result<(), ValidationError> {
    if validate_mobile(mobile) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_mobile").with_message(messages::INVALID_MOBILE.into()))
    }
}

/// Custom validator for name fields
pub fn name_validator(name: &str) -> Result<(), ValidationError> {
    if validate_name(name) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_name").with_message(messages::INVALID_NAME.into()))
    }
}

/// Custom validator for OTP code fields
pub fn otp_code_validator(code: &str) -> Result<(), ValidationError> {
    if validate_otp_code(code) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_otp").with_message(messages::INVALID_OTP.into()))
    }
}

/// Custom validator for mobile-or-email identifiers
pub fn identifier_validator(identifier: &str) -> Result<(), ValidationError> {
    if validate_identifier(identifier) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_identifier")
            .with_message(messages::INVALID_IDENTIFIER.into()))
    }
}

/// Flattens validator output into "field: message" pairs, sorted by field.
pub fn describe_errors(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();

    for (field, errors) in errors.field_errors() {
        for error in errors {
            let message = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("Invalid value for field '{}'", field));
            messages.push(format!("{}: {}", field, message));
        }
    }

    messages.sort();
    messages.join(", ")
}

/// Validation error messages for user-friendly responses
pub mod messages {
    pub const INVALID_EMAIL: &str = "Please enter a valid email address";
    pub const INVALID_MOBILE: &str = "Mobile number must be exactly 10 digits";
    pub const INVALID_NAME: &str = "Name must contain only letters, spaces, dots, hyphens, and apostrophes";
    pub const INVALID_OTP: &str = "OTP must be exactly 6 digits";
    pub const INVALID_IDENTIFIER: &str = "Enter a 10 digit mobile number or an email address";
    pub const INVALID_PASSWORD: &str = "Password must be between 8 and 72 characters";
    pub const FIELD_REQUIRED: &str = "This field is required";
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com"));
        assert!(validate_email("test.user+tag@domain.co.uk"));
        assert!(!validate_email("invalid.email"));
        assert!(!validate_email("@domain.com"));
        assert!(!validate_email("user@"));
        assert!(!validate_email(""));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  USER@EXAMPLE.COM  "), "user@example.com");
        assert_eq!(normalize_email("Test@Domain.org"), "test@domain.org");
    }

    #[test]
    fn test_validate_mobile() {
        assert!(validate_mobile("9876543211"));
        assert!(validate_mobile("0000000000"));
        assert!(!validate_mobile("987654321"));
        assert!(!validate_mobile("98765432110"));
        assert!(!validate_mobile("98765 4321"));
        assert!(!validate_mobile("+919876543"));
        assert!(!validate_mobile("٩٨٧٦٥٤٣٢١١"));
    }

    #[test]
    fn test_validate_otp_code() {
        assert!(validate_otp_code("000123"));
        assert!(!validate_otp_code("12345"));
        assert!(!validate_otp_code("12345a"));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Nurse Priya"));
        assert!(validate_name("Dr. Anil D'Souza"));
        assert!(validate_name("Mary-Jane"));
        assert!(!validate_name("   "));
        assert!(!validate_name("John123"));
        assert!(!validate_name(&"a".repeat(256)));
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("9876543211"));
        assert!(validate_identifier(" staff@lael.in "));
        assert!(!validate_identifier("12345"));
        assert!(!validate_identifier("not an email"));
    }

    #[derive(Validate)]
    struct Sample {
        #[validate(custom(function = "mobile_validator"))]
        mobile: String,
        #[validate(custom(function = "email_validator"))]
        email: String,
    }

    #[test]
    fn test_describe_errors() {
        let sample = Sample {
            mobile: "123".to_string(),
            email: "nope".to_string(),
        };
        let errors = sample.validate().unwrap_err();

        assert_eq!(
            describe_errors(&errors),
            format!(
                "email: {}, mobile: {}",
                messages::INVALID_EMAIL,
                messages::INVALID_MOBILE
            )
        );
    }
}
