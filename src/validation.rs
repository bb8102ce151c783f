//! Structural validation of inbound request fields.
//!
//! Request types implement [`Validate`] and are checked at the crate
//! boundary, before any flow logic runs. Failures carry the offending
//! field so callers can surface field-level detail.
//!
//! # Usage
//!
//! ```
//! use portcullis::validation::{Validate, ValidationError, validate_email, validate_length};
//!
//! struct Signup {
//!     email: String,
//!     password: String,
//! }
//!
//! impl Validate for Signup {
//!     fn validate(&self) -> Result<(), ValidationError> {
//!         validate_email(&self.email)?;
//!         validate_length(&self.password, 8, 128, "password")?;
//!         Ok(())
//!     }
//! }
//! ```

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// A field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field that failed validation, when attributable.
    pub field: Option<String>,
    pub code: ValidationErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorCode {
    Required,
    TooShort,
    TooLong,
    InvalidFormat,
}

impl ValidationError {
    pub fn for_field(
        field: impl Into<String>,
        code: ValidationErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: Some(field.into()),
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}: {}", field, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Types that can validate their own structure.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Reject empty or whitespace-only values.
pub fn validate_required(value: &str, field: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::for_field(
            field,
            ValidationErrorCode::Required,
            format!("{} is required", field),
        ));
    }
    Ok(())
}

/// Enforce an inclusive character-count range.
pub fn validate_length(
    value: &str,
    min: usize,
    max: usize,
    field: &str,
) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min {
        return Err(ValidationError::for_field(
            field,
            ValidationErrorCode::TooShort,
            format!("{} must be at least {} characters", field, min),
        ));
    }
    if len > max {
        return Err(ValidationError::for_field(
            field,
            ValidationErrorCode::TooLong,
            format!("{} must be at most {} characters", field, max),
        ));
    }
    Ok(())
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    // Pragmatic pattern: one @, non-empty local part, dotted domain.
    // Full RFC 5322 acceptance is not a goal.
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    })
}

/// Validate email shape.
///
/// Accepts most real addresses while rejecting obvious junk; the address
/// is length-capped to keep hostile input out of downstream lookups.
pub fn validate_email(value: &str) -> Result<(), ValidationError> {
    validate_required(value, "email")?;
    validate_length(value, 3, 254, "email")?;
    if !email_regex().is_match(value) {
        return Err(ValidationError::for_field(
            "email",
            ValidationErrorCode::InvalidFormat,
            "Invalid email address",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_blank() {
        assert!(validate_required("", "name").is_err());
        assert!(validate_required("   ", "name").is_err());
        assert!(validate_required("x", "name").is_ok());
    }

    #[test]
    fn length_bounds_are_inclusive() {
        assert!(validate_length("abcdefgh", 8, 128, "password").is_ok());
        let err = validate_length("abcdefg", 8, 128, "password").unwrap_err();
        assert_eq!(err.code, ValidationErrorCode::TooShort);
        assert_eq!(err.field.as_deref(), Some("password"));

        let long = "a".repeat(129);
        let err = validate_length(&long, 8, 128, "password").unwrap_err();
        assert_eq!(err.code, ValidationErrorCode::TooLong);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // Eight multibyte characters pass an eight-character minimum.
        assert!(validate_length("käsekäse", 8, 128, "password").is_ok());
    }

    #[test]
    fn accepts_reasonable_emails() {
        for ok in ["a@x.com", "first.last@sub.example.org", "user+tag@example.io"] {
            assert!(validate_email(ok).is_ok(), "expected {:?} to pass", ok);
        }
    }

    #[test]
    fn rejects_junk_emails() {
        for bad in ["", "plain", "@x.com", "a@", "a@b", "a b@x.com", "a@x .com"] {
            assert!(validate_email(bad).is_err(), "expected {:?} to fail", bad);
        }
    }
}
