//! Portcullis prelude — common imports for embedding applications.
//!
//! Re-exports the types a transport layer touches when wiring the core:
//! configuration, the session manager and its request/response shapes, the
//! authorization gate, the collaborator traits and the error taxonomy.
//!
//! ```ignore
//! use portcullis::prelude::*;
//!
//! let config = AuthConfig::from_env()?;
//! let manager = SessionManager::new(config, directory, store);
//! let gate = AuthorizationGate::new(manager.issuer().clone());
//! ```

// =============================================================================
// Configuration
// =============================================================================

pub use crate::config::{AuthConfig, AuthConfigBuilder, ConfigError, SecretPolicy, SecretString};
pub use crate::parse::{parse_ttl, Ttl, TtlError};

// =============================================================================
// Session flows
// =============================================================================

pub use crate::session::{
    AuthSession, LoginRequest, RegisterRequest, SessionManager, TokenPair, UserSummary,
};

// =============================================================================
// Authorization
// =============================================================================

pub use crate::authorize::AuthorizationGate;
pub use crate::token::{AccessClaims, TokenError, TokenIssuer};

// =============================================================================
// Collaborator seams
// =============================================================================

pub use crate::directory::{
    Directory, DirectoryError, Identity, NewIdentity, Provider, Role,
};
pub use crate::profile::{FederatedProfile, GitHubProfile, GoogleProfile, ProfileError};
pub use crate::store::{MemoryRefreshStore, RefreshStore, RefreshTokenRecord, StoreError};

// =============================================================================
// Credentials and validation
// =============================================================================

pub use crate::password::{hash_password, verify_password, PasswordPolicy};
pub use crate::validation::{validate_email, validate_length, validate_required, Validate};

// =============================================================================
// Errors and observability
// =============================================================================

pub use crate::error::{AuthError, AuthResult, ErrorKind};
pub use crate::observability::{ObservabilityConfig, SecurityEvent, Severity};
