//! Access-token signing and refresh-token minting.
//!
//! Access tokens are HS256 JWTs carrying identity and role claims; their
//! validity is proven by signature and expiry alone, so an issued token
//! cannot be individually revoked before it expires. Refresh tokens are
//! opaque high-entropy values whose single-use records live in the
//! [refresh store](crate::store); they carry no signature because the
//! store record is the source of truth.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;
use crate::parse::Ttl;
use crate::store::RefreshTokenRecord;

/// Number of random bytes behind a refresh-token value. Hex-encoded to a
/// 128-character string; guessing is infeasible.
pub const REFRESH_TOKEN_BYTES: usize = 64;

/// Claim set carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Identity id.
    pub sub: String,
    pub email: String,
    /// Role names granted at issuance time. Stale if roles change while
    /// the token is live; bounded by the access TTL.
    pub roles: Vec<String>,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

impl AccessClaims {
    pub fn identity_id(&self) -> &str {
        &self.sub
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|r| self.has_role(r))
    }
}

/// Why an access token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token signature invalid")]
    InvalidSignature,
    #[error("token malformed")]
    Malformed,
}

/// Signs access tokens and mints refresh-token records.
///
/// Constructed once at startup from the validated [`AuthConfig`] and passed
/// by reference (or cheap clone) into the session manager and the
/// authorization gate.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::default();
        // Expiry decisions belong to this core alone; no clock-skew grace.
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(config.access_secret.expose().as_bytes()),
            decoding: DecodingKey::from_secret(config.access_secret.expose().as_bytes()),
            validation,
        }
    }

    /// Mint a signed access token expiring `ttl` from now.
    pub fn issue_access_token(
        &self,
        identity_id: &str,
        email: &str,
        roles: Vec<String>,
        ttl: Ttl,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: identity_id.to_string(),
            email: email.to_string(),
            roles,
            iat: now.timestamp(),
            exp: ttl.deadline_from(now).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(|_| TokenError::Malformed)
    }

    /// Verify signature and expiry, returning the embedded claims.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        decode::<AccessClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            })
    }

    /// Mint an opaque refresh token expiring `ttl` from now.
    ///
    /// The value doubles as bearer credential and store lookup key; the
    /// caller is responsible for persisting the returned record.
    pub fn issue_refresh_token(&self, identity_id: &str, ttl: Ttl) -> RefreshTokenRecord {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let now = Utc::now();

        RefreshTokenRecord {
            value: hex::encode(bytes),
            identity_id: identity_id.to_string(),
            expires_at: ttl.deadline_from(now),
            created_at: now,
        }
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of debug output.
        f.debug_struct("TokenIssuer").finish_non_exhaustive()
    }
}
