//! Authentication configuration.
//!
//! All options are resolved and validated once, at process start. An
//! invalid or absent signing secret is a fatal configuration error: there
//! is no degraded mode, and nothing here is re-checked at request time.
//!
//! # Example
//!
//! ```
//! use portcullis::config::AuthConfig;
//!
//! let config = AuthConfig::builder()
//!     .access_secret("G7#kPz0rT!mWq2xULf9cDsVb8nJe4HyA$Q6tE1uO")
//!     .refresh_secret("Zr5!vN8mC2#pXk7QaW4tLb0jEf6HgU9i$D3sYe1T")
//!     .access_ttl("15m")
//!     .refresh_ttl("7d")
//!     .build()
//!     .expect("configuration is valid");
//!
//! assert_eq!(config.access_ttl.as_millis(), 15 * 60 * 1000);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::parse::{parse_ttl, Ttl, TtlError};

/// Default access-token lifetime.
pub const DEFAULT_ACCESS_TTL: &str = "15m";
/// Default refresh-token lifetime.
pub const DEFAULT_REFRESH_TTL: &str = "7d";
/// Default bound on a single password-hash computation.
pub const DEFAULT_HASH_TIMEOUT: Duration = Duration::from_secs(5);
/// Role granted to every newly registered identity.
pub const DEFAULT_ROLE: &str = "USER";

// ============================================================================
// Secret handling
// ============================================================================

/// A signing secret that redacts itself in debug output.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the raw secret material.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Constant-time equality, so comparing secrets never leaks a prefix
    /// through timing.
    pub fn ct_eq(&self, other: &SecretString) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(***)")
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Which configured secret a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    Access,
    Refresh,
}

impl fmt::Display for SecretKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access => write!(f, "access secret"),
            Self::Refresh => write!(f, "refresh secret"),
        }
    }
}

/// Minimum strength requirements for a signing secret.
///
/// Checks length first, then screens for weak substrings, then requires a
/// Shannon-entropy floor so long-but-repetitive material is still refused.
#[derive(Debug, Clone)]
pub struct SecretPolicy {
    pub min_length: usize,
    /// Minimum total Shannon entropy in bits.
    pub min_entropy_bits: f64,
    pub check_weak_patterns: bool,
}

impl Default for SecretPolicy {
    fn default() -> Self {
        Self {
            min_length: 32,
            min_entropy_bits: 64.0,
            check_weak_patterns: true,
        }
    }
}

impl SecretPolicy {
    pub fn validate(&self, kind: SecretKind, secret: &SecretString) -> Result<(), ConfigError> {
        let raw = secret.expose();

        if raw.len() < self.min_length {
            return Err(ConfigError::SecretTooShort {
                kind,
                actual: raw.len(),
                minimum: self.min_length,
            });
        }

        if self.check_weak_patterns {
            if let Some(pattern) = find_weak_pattern(raw) {
                return Err(ConfigError::WeakSecret { kind, pattern });
            }
        }

        let entropy = shannon_entropy_bits(raw);
        if entropy < self.min_entropy_bits {
            return Err(ConfigError::LowEntropySecret {
                kind,
                actual: entropy,
                minimum: self.min_entropy_bits,
            });
        }

        Ok(())
    }
}

fn find_weak_pattern(secret: &str) -> Option<&'static str> {
    const WEAK_PATTERNS: &[&str] = &[
        "secret", "password", "changeme", "default", "example", "sample",
        "letmein", "qwerty", "123456", "admin",
    ];
    let lower = secret.to_lowercase();
    WEAK_PATTERNS.iter().copied().find(|p| lower.contains(p))
}

/// Total Shannon entropy of a string in bits (per-character entropy times
/// length).
fn shannon_entropy_bits(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }
    let mut counts: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *counts.entry(c).or_insert(0) += 1;
    }
    let total = s.chars().count() as f64;
    let per_char: f64 = counts
        .values()
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum();
    per_char * total
}

// ============================================================================
// Configuration
// ============================================================================

/// Resolved authentication configuration.
///
/// Construct through [`AuthConfig::builder`] or [`AuthConfig::from_env`];
/// both paths run full validation. Pass the value by reference into the
/// components that need it; there is no process-wide instance.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Signs and verifies access tokens.
    pub access_secret: SecretString,
    /// Reserved for refresh-token material; must differ from the access
    /// secret so one provisioned value can never serve both roles.
    pub refresh_secret: SecretString,
    pub access_ttl: Ttl,
    pub refresh_ttl: Ttl,
    /// Bound on a single password-hash computation; exceeding it is a
    /// transient failure and the caller retries the whole flow.
    pub hash_timeout: Duration,
    /// Role assigned on registration and first federated login.
    pub default_role: String,
}

impl AuthConfig {
    pub fn builder() -> AuthConfigBuilder {
        AuthConfigBuilder::default()
    }

    /// Load from environment variables.
    ///
    /// Recognized: `AUTH_ACCESS_SECRET`, `AUTH_REFRESH_SECRET` (required),
    /// `AUTH_ACCESS_TTL`, `AUTH_REFRESH_TTL` (optional, `"15m"`/`"7d"`
    /// defaults), `AUTH_DEFAULT_ROLE` (optional).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::builder();

        match std::env::var("AUTH_ACCESS_SECRET") {
            Ok(v) => builder = builder.access_secret(v),
            Err(_) => return Err(ConfigError::MissingSecret(SecretKind::Access)),
        }
        match std::env::var("AUTH_REFRESH_SECRET") {
            Ok(v) => builder = builder.refresh_secret(v),
            Err(_) => return Err(ConfigError::MissingSecret(SecretKind::Refresh)),
        }
        if let Ok(v) = std::env::var("AUTH_ACCESS_TTL") {
            builder = builder.access_ttl(v);
        }
        if let Ok(v) = std::env::var("AUTH_REFRESH_TTL") {
            builder = builder.refresh_ttl(v);
        }
        if let Ok(v) = std::env::var("AUTH_DEFAULT_ROLE") {
            builder = builder.default_role(v);
        }

        builder.build()
    }
}

/// Builder for [`AuthConfig`]; validation happens in [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct AuthConfigBuilder {
    access_secret: Option<SecretString>,
    refresh_secret: Option<SecretString>,
    access_ttl: Option<String>,
    refresh_ttl: Option<String>,
    hash_timeout: Option<Duration>,
    default_role: Option<String>,
    secret_policy: Option<SecretPolicy>,
}

impl AuthConfigBuilder {
    pub fn access_secret(mut self, secret: impl Into<SecretString>) -> Self {
        self.access_secret = Some(secret.into());
        self
    }

    pub fn refresh_secret(mut self, secret: impl Into<SecretString>) -> Self {
        self.refresh_secret = Some(secret.into());
        self
    }

    pub fn access_ttl(mut self, ttl: impl Into<String>) -> Self {
        self.access_ttl = Some(ttl.into());
        self
    }

    pub fn refresh_ttl(mut self, ttl: impl Into<String>) -> Self {
        self.refresh_ttl = Some(ttl.into());
        self
    }

    pub fn hash_timeout(mut self, timeout: Duration) -> Self {
        self.hash_timeout = Some(timeout);
        self
    }

    pub fn default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = Some(role.into());
        self
    }

    /// Override the secret strength policy (tests use a relaxed one).
    pub fn secret_policy(mut self, policy: SecretPolicy) -> Self {
        self.secret_policy = Some(policy);
        self
    }

    pub fn build(self) -> Result<AuthConfig, ConfigError> {
        let policy = self.secret_policy.unwrap_or_default();

        let access_secret = self
            .access_secret
            .ok_or(ConfigError::MissingSecret(SecretKind::Access))?;
        let refresh_secret = self
            .refresh_secret
            .ok_or(ConfigError::MissingSecret(SecretKind::Refresh))?;

        policy.validate(SecretKind::Access, &access_secret)?;
        policy.validate(SecretKind::Refresh, &refresh_secret)?;

        if access_secret.ct_eq(&refresh_secret) {
            return Err(ConfigError::IdenticalSecrets);
        }

        let access_ttl = parse_ttl(
            self.access_ttl.as_deref().unwrap_or(DEFAULT_ACCESS_TTL),
        )
        .map_err(|source| ConfigError::InvalidTtl {
            which: "access_ttl",
            source,
        })?;
        let refresh_ttl = parse_ttl(
            self.refresh_ttl.as_deref().unwrap_or(DEFAULT_REFRESH_TTL),
        )
        .map_err(|source| ConfigError::InvalidTtl {
            which: "refresh_ttl",
            source,
        })?;

        Ok(AuthConfig {
            access_secret,
            refresh_secret,
            access_ttl,
            refresh_ttl,
            hash_timeout: self.hash_timeout.unwrap_or(DEFAULT_HASH_TIMEOUT),
            default_role: self.default_role.unwrap_or_else(|| DEFAULT_ROLE.to_string()),
        })
    }
}

/// Startup-fatal configuration failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not configured")]
    MissingSecret(SecretKind),
    #[error("{kind} is {actual} characters; minimum is {minimum}")]
    SecretTooShort {
        kind: SecretKind,
        actual: usize,
        minimum: usize,
    },
    #[error("{kind} contains weak pattern {pattern:?}")]
    WeakSecret {
        kind: SecretKind,
        pattern: &'static str,
    },
    #[error("{kind} entropy {actual:.1} bits is below the {minimum:.1}-bit minimum")]
    LowEntropySecret {
        kind: SecretKind,
        actual: f64,
        minimum: f64,
    },
    #[error("access and refresh secrets must differ")]
    IdenticalSecrets,
    #[error("invalid {which}")]
    InvalidTtl {
        which: &'static str,
        #[source]
        source: TtlError,
    },
}
