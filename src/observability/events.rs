//! Security event logging.
//!
//! Structured audit logging for the events this core can witness. Flows
//! emit events through the [`security_event!`] macro, which dispatches to
//! the matching `tracing` level by severity, so operators filter with the
//! usual `tracing` machinery.
//!
//! # Usage
//!
//! ```ignore
//! use portcullis::observability::SecurityEvent;
//! use portcullis::security_event;
//!
//! security_event!(
//!     SecurityEvent::AuthenticationFailure,
//!     email = %email,
//!     reason = "invalid_password",
//!     "Authentication failed"
//! );
//! ```

use std::fmt;

/// Audit-relevant events emitted by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    // Authentication
    /// New identity registered with a local credential.
    Registered,
    /// Credential check succeeded and a token pair was issued.
    AuthenticationSuccess,
    /// Credential check failed.
    AuthenticationFailure,
    /// Identity created or matched through a federated provider.
    FederatedLogin,
    /// A refresh token was exchanged for a new pair.
    TokenRefreshed,
    /// A refresh value that was already consumed (or never issued) was
    /// presented. Either a client bug or token theft.
    RefreshReuseDetected,
    /// A single refresh token was revoked.
    Logout,
    /// Every refresh token of an identity was revoked.
    LogoutAll,

    // Authorization
    /// Access granted to a protected operation.
    AccessGranted,
    /// Access denied to a protected operation.
    AccessDenied,

    // Integrity
    /// The refresh store rejected an insert for an existing value.
    IntegrityViolation,
}

impl SecurityEvent {
    /// Category for filtering and grouping.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Registered
            | Self::AuthenticationSuccess
            | Self::AuthenticationFailure
            | Self::FederatedLogin
            | Self::TokenRefreshed
            | Self::RefreshReuseDetected
            | Self::Logout
            | Self::LogoutAll => "authentication",

            Self::AccessGranted | Self::AccessDenied => "authorization",

            Self::IntegrityViolation => "integrity",
        }
    }

    /// Severity driving the `tracing` level.
    pub fn severity(&self) -> Severity {
        match self {
            Self::IntegrityViolation => Severity::Critical,

            Self::AuthenticationFailure
            | Self::RefreshReuseDetected
            | Self::AccessDenied => Severity::High,

            Self::Registered
            | Self::AuthenticationSuccess
            | Self::FederatedLogin
            | Self::LogoutAll => Severity::Medium,

            Self::TokenRefreshed | Self::Logout | Self::AccessGranted => Severity::Low,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::AuthenticationSuccess => "authentication_success",
            Self::AuthenticationFailure => "authentication_failure",
            Self::FederatedLogin => "federated_login",
            Self::TokenRefreshed => "token_refreshed",
            Self::RefreshReuseDetected => "refresh_reuse_detected",
            Self::Logout => "logout",
            Self::LogoutAll => "logout_all",
            Self::AccessGranted => "access_granted",
            Self::AccessDenied => "access_denied",
            Self::IntegrityViolation => "integrity_violation",
        }
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Event severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Log a security event with structured fields.
///
/// Automatically attaches `security_event`, `category` and `severity`
/// fields and picks the `tracing` level from the event's severity.
#[macro_export]
macro_rules! security_event {
    ($event:expr, $($field:tt)*) => {{
        let event = $event;
        let severity = event.severity();
        let category = event.category();
        let event_name = event.name();

        match severity {
            $crate::observability::Severity::Critical => {
                ::tracing::error!(
                    security_event = event_name,
                    category = category,
                    severity = "critical",
                    $($field)*
                );
            }
            $crate::observability::Severity::High => {
                ::tracing::warn!(
                    security_event = event_name,
                    category = category,
                    severity = "high",
                    $($field)*
                );
            }
            $crate::observability::Severity::Medium => {
                ::tracing::info!(
                    security_event = event_name,
                    category = category,
                    severity = "medium",
                    $($field)*
                );
            }
            $crate::observability::Severity::Low => {
                ::tracing::debug!(
                    security_event = event_name,
                    category = category,
                    severity = "low",
                    $($field)*
                );
            }
        }
    }};
}

pub use security_event;
