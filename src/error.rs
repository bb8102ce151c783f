//! Failure taxonomy for authentication and authorization flows.
//!
//! Every flow returns a typed [`AuthError`] to its caller; the transport
//! layer alone decides the wire representation. The core performs no
//! process-level side effects on failure: no exits, no response writing.
//!
//! # Detail exposure
//!
//! Error messages can leak which authentication factor failed, letting an
//! attacker enumerate accounts. [`ErrorKind::exposes_detail`] encodes the
//! policy: validation, conflict and not-found messages are safe to show,
//! while unauthorized, forbidden and internal errors fall back to a generic
//! message via [`AuthError::safe_message`].

use std::fmt;

/// Error categories surfaced by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Structurally malformed input, with field-level detail.
    Validation,
    /// Input that is well-formed but unusable (e.g. a federated profile
    /// without an email address).
    BadRequest,
    /// Duplicate email, duplicate role assignment.
    Conflict,
    /// Bad credentials or an expired/invalid/unknown token. The message is
    /// intentionally generic.
    Unauthorized,
    /// Authenticated but lacking a required role.
    Forbidden,
    /// A referenced identity or role does not exist.
    NotFound,
    /// Store or signing infrastructure failure. Never exposes internals.
    Internal,
}

impl ErrorKind {
    /// Stable string code for logs and wire bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation => "validation_error",
            Self::BadRequest => "bad_request",
            Self::Conflict => "conflict",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Internal => "internal_error",
        }
    }

    /// Whether the attached message is safe to show to a caller.
    pub fn exposes_detail(&self) -> bool {
        matches!(
            self,
            Self::Validation | Self::BadRequest | Self::Conflict | Self::NotFound
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A flow-level failure.
///
/// Carries a caller-facing message, an optional field name (for validation
/// failures), and internal details that are logged but never exposed.
#[derive(Debug)]
pub struct AuthError {
    pub kind: ErrorKind,
    /// Message subject to the exposure policy of `kind`.
    pub message: String,
    /// Offending field for validation failures.
    pub field: Option<String>,
    /// Internal context; log-only.
    pub details: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AuthError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            field: None,
            details: None,
            source: None,
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            ..Self::new(ErrorKind::Validation, message)
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Internal error wrapping its cause for logging.
    pub fn internal_from(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            details: Some(source.to_string()),
            source: Some(Box::new(source)),
            ..Self::new(ErrorKind::Internal, message)
        }
    }

    /// Attach log-only context.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// The message a caller may see, after applying the exposure policy.
    pub fn safe_message(&self) -> &str {
        if self.kind.exposes_detail() {
            return &self.message;
        }
        match self.kind {
            ErrorKind::Unauthorized => &self.message,
            ErrorKind::Forbidden => &self.message,
            _ => "An internal error occurred",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}: {} ({})", self.kind, self.message, field),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

/// Result alias used throughout the crate's flows.
pub type AuthResult<T> = Result<T, AuthError>;

// ============================================================================
// Conversions from component errors
// ============================================================================

impl From<crate::validation::ValidationError> for AuthError {
    fn from(err: crate::validation::ValidationError) -> Self {
        let message = err.message.clone();
        match err.field {
            Some(field) => AuthError::validation(field, message),
            None => AuthError::new(ErrorKind::Validation, message),
        }
    }
}

impl From<crate::password::PasswordPolicyError> for AuthError {
    fn from(err: crate::password::PasswordPolicyError) -> Self {
        AuthError::validation("password", err.to_string())
    }
}

impl From<crate::token::TokenError> for AuthError {
    fn from(err: crate::token::TokenError) -> Self {
        // Which check failed stays in the log, not in the response.
        AuthError::unauthorized("Invalid or missing token").with_details(err.to_string())
    }
}

impl From<crate::store::StoreError> for AuthError {
    fn from(err: crate::store::StoreError) -> Self {
        match err {
            // A value collision cannot happen under correct random
            // generation; treat it as an integrity violation.
            crate::store::StoreError::Conflict { .. } => {
                AuthError::internal("Refresh token store integrity violation")
                    .with_details(err.to_string())
            }
            crate::store::StoreError::Backend(detail) => {
                AuthError::internal("Refresh token store failure").with_details(detail)
            }
        }
    }
}

impl From<crate::directory::DirectoryError> for AuthError {
    fn from(err: crate::directory::DirectoryError) -> Self {
        match &err {
            crate::directory::DirectoryError::NotFound(what) => {
                AuthError::not_found(format!("{} not found", what))
            }
            crate::directory::DirectoryError::Conflict(message) => {
                AuthError::conflict(message.clone())
            }
            crate::directory::DirectoryError::Unavailable(detail) => {
                AuthError::internal("Directory unavailable").with_details(detail.clone())
            }
        }
    }
}

impl From<crate::profile::ProfileError> for AuthError {
    fn from(err: crate::profile::ProfileError) -> Self {
        AuthError::bad_request(err.to_string())
    }
}
