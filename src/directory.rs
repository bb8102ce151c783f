//! Identity and role directory seam.
//!
//! The directory owns Identity and Role persistence; this core consumes it
//! through the [`Directory`] trait and never touches raw storage. Email
//! lookups are case-insensitive. Identities are never hard-deleted by this
//! core; deactivation and deletion are directory-owned operations.
//!
//! An in-memory implementation for tests and examples lives in
//! [`crate::testing::MemoryDirectory`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where an identity's authentication is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provider {
    /// Local password credential.
    Local,
    Google,
    #[serde(rename = "GITHUB")]
    GitHub,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "LOCAL",
            Self::Google => "GOOGLE",
            Self::GitHub => "GITHUB",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An account capable of authenticating.
///
/// Carries the stored credential hash, so it never leaves the core as-is;
/// callers receive the [`UserSummary`](crate::session::UserSummary)
/// projection instead.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: String,
    /// Unique; compared case-insensitively on lookup.
    pub email: String,
    /// Absent for federated-only accounts.
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub provider: Provider,
    /// Provider-assigned external id, for federated identities.
    pub provider_id: Option<String>,
    pub is_active: bool,
    pub is_email_verified: bool,
    /// Resolved role names; the directory flattens the role association.
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Identity {
    /// Whether a local password credential exists for this identity.
    pub fn has_local_credential(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// Fields the core supplies when asking the directory for a new identity.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub email: String,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub provider: Provider,
    pub provider_id: Option<String>,
    pub is_email_verified: bool,
}

/// A named bundle of permissions grantable to an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    /// Unique name, e.g. `"USER"`, `"ADMIN"`.
    pub name: String,
    pub permissions: Vec<String>,
}

/// Directory failure.
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    /// A referenced identity or role does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// Duplicate email or duplicate role assignment.
    #[error("{0}")]
    Conflict(String),
    /// Backend infrastructure failure.
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Identity and role persistence owned by an external collaborator.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Case-insensitive email lookup.
    async fn find_identity_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Identity>, DirectoryError>;

    async fn find_identity_by_id(&self, id: &str) -> Result<Option<Identity>, DirectoryError>;

    /// Create an identity; `Conflict` if the email is taken.
    async fn create_identity(&self, new: NewIdentity) -> Result<Identity, DirectoryError>;

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, DirectoryError>;

    /// Grant a role; `Conflict` if already assigned, `NotFound` if either
    /// side is missing.
    async fn assign_role(&self, identity_id: &str, role_id: &str) -> Result<(), DirectoryError>;
}
