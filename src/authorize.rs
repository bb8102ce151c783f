//! Role-based authorization gate.
//!
//! Two checks, applied per request by the transport layer:
//!
//! - [`AuthorizationGate::authenticate`] proves a bearer access token is
//!   genuine and unexpired.
//! - [`AuthorizationGate::authorize`] decides whether the proven claims
//!   satisfy an operation's role requirement.
//!
//! Authentication does **not** re-check the identity's active flag against
//! the directory — an availability/latency trade-off. A deactivated
//! identity's already-issued access tokens therefore remain usable until
//! they expire; the exposure window is the access TTL, and revoking the
//! identity's refresh tokens prevents new pairs.

use crate::error::{AuthError, AuthResult};
use crate::observability::SecurityEvent;
use crate::security_event;
use crate::token::{AccessClaims, TokenIssuer};

const MSG_AUTH_REQUIRED: &str = "Authentication required";

/// Gate over access-token verification and role checks.
#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    issuer: TokenIssuer,
}

impl AuthorizationGate {
    /// Build from the issuer the session manager signs with.
    pub fn new(issuer: TokenIssuer) -> Self {
        Self { issuer }
    }

    /// Verify signature and expiry of a presented token.
    ///
    /// Expired, forged and malformed tokens all collapse into one generic
    /// `Unauthorized`; which check failed stays in the log.
    pub fn authenticate(&self, presented: &str) -> AuthResult<AccessClaims> {
        self.issuer
            .verify_access_token(presented)
            .map_err(AuthError::from)
    }

    /// Allow iff the claims carry at least one of the required roles.
    ///
    /// `claims: None` means the request never authenticated — a distinct
    /// precondition failure from holding the wrong roles. An empty
    /// requirement admits any authenticated identity.
    pub fn authorize(
        &self,
        claims: Option<&AccessClaims>,
        required_roles: &[&str],
    ) -> AuthResult<()> {
        let claims = match claims {
            Some(claims) => claims,
            None => {
                security_event!(
                    SecurityEvent::AccessDenied,
                    reason = "unauthenticated",
                    "Access denied"
                );
                return Err(AuthError::forbidden(MSG_AUTH_REQUIRED));
            }
        };

        if !required_roles.is_empty() && !claims.has_any_role(required_roles) {
            security_event!(
                SecurityEvent::AccessDenied,
                identity_id = %claims.sub,
                roles = %claims.roles.join(","),
                required = %required_roles.join(","),
                "Access denied"
            );
            return Err(AuthError::forbidden(format!(
                "Requires one of these roles: {}",
                required_roles.join(", ")
            )));
        }

        security_event!(
            SecurityEvent::AccessGranted,
            identity_id = %claims.sub,
            "Access granted"
        );
        Ok(())
    }

    /// Authenticate and authorize in one step, returning the claims for
    /// downstream use.
    pub fn require(&self, presented: &str, required_roles: &[&str]) -> AuthResult<AccessClaims> {
        let claims = self.authenticate(presented)?;
        self.authorize(Some(&claims), required_roles)?;
        Ok(claims)
    }
}
