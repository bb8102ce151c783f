//! Credential hashing and verification.
//!
//! Passwords are hashed with Argon2id into PHC strings. Hashing is salted
//! per call, so the same password never hashes to the same string twice,
//! while both outputs verify against the original secret. Verification is
//! infallible: a malformed or truncated stored hash verifies as `false`,
//! never as an error, and callers map `false` to an authentication failure.
//!
//! A [`PasswordPolicy`] screens candidate passwords before they are ever
//! hashed; it applies at registration and password change, not at login.

use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use thiserror::Error;

/// Hashing infrastructure failure (never a policy or verification result).
#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordHashError(String);

/// Hash a password into a PHC-format Argon2id string.
///
/// Deliberately expensive; callers running on an async executor should
/// offload to a blocking thread (the session manager does, with a timeout).
pub fn hash_password(password: &str) -> Result<String, PasswordHashError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordHashError(e.to_string()))
}

/// Verify a password against a stored PHC string.
///
/// Returns `false` for wrong passwords and for malformed hashes alike; the
/// distinction is not observable to callers or, through them, to clients.
pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

// ============================================================================
// Password policy
// ============================================================================

/// Shape requirements for a candidate password.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    /// Reject passwords consisting solely of digits.
    pub disallow_all_numeric: bool,
    /// Reject entries from the common-password screen.
    pub check_common_passwords: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            disallow_all_numeric: true,
            check_common_passwords: true,
        }
    }
}

impl PasswordPolicy {
    /// Accept-almost-anything policy for tests.
    pub fn minimal() -> Self {
        Self {
            min_length: 1,
            max_length: 128,
            disallow_all_numeric: false,
            check_common_passwords: false,
        }
    }

    pub fn validate(&self, password: &str) -> Result<(), PasswordPolicyError> {
        let len = password.chars().count();
        if len < self.min_length {
            return Err(PasswordPolicyError::TooShort {
                min: self.min_length,
                actual: len,
            });
        }
        if len > self.max_length {
            return Err(PasswordPolicyError::TooLong {
                max: self.max_length,
                actual: len,
            });
        }
        if self.disallow_all_numeric && password.chars().all(|c| c.is_ascii_digit()) {
            return Err(PasswordPolicyError::AllNumeric);
        }
        if self.check_common_passwords && is_common_password(password) {
            return Err(PasswordPolicyError::TooCommon);
        }
        Ok(())
    }
}

/// Policy rejection; surfaced to callers with field-level detail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },
    #[error("Password must be at most {max} characters (got {actual})")]
    TooLong { max: usize, actual: usize },
    #[error("Password cannot be all numbers")]
    AllNumeric,
    #[error("Password is too common")]
    TooCommon,
}

fn is_common_password(password: &str) -> bool {
    let lower = password.to_lowercase();
    if COMMON_PASSWORDS.contains(&lower.as_str()) {
        return true;
    }
    // "password123456" is still "password".
    COMMON_PASSWORDS.iter().any(|common| {
        common.len() >= 4
            && lower.starts_with(common)
            && lower[common.len()..].bytes().all(|b| b.is_ascii_digit())
    })
}

/// Frequently-breached passwords; a screen, not an exhaustive list.
static COMMON_PASSWORDS: &[&str] = &[
    "password", "passw0rd", "password1", "12345678", "123456789", "1234567890",
    "qwerty", "qwertyuiop", "qwerty123", "iloveyou", "sunshine", "princess",
    "football", "baseball", "superman", "trustno1", "letmein", "welcome",
    "welcome1", "dragon", "monkey", "shadow", "master", "hunter", "freedom",
    "starwars", "whatever", "computer", "internet", "changeme", "admin123",
    "administrator", "postgres", "mysql", "default",
];
