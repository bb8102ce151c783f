//! Test support utilities.
//!
//! An in-memory [`Directory`] implementation plus fixture builders used by
//! this crate's own tests and available to applications testing against
//! the same seams. Nothing here is suitable for production use: the
//! directory forgets everything on drop and the fixture secrets are
//! well-known.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::config::{AuthConfig, SecretPolicy};
use crate::directory::{Directory, DirectoryError, Identity, NewIdentity, Role};
use crate::session::SessionManager;
use crate::store::MemoryRefreshStore;

/// In-memory identity/role directory.
///
/// Email lookups are case-insensitive; identities get v4 UUID ids; role
/// assignment resolves the role id to its name and appends it to the
/// identity's projection, mirroring how a relational directory would
/// flatten the association.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    identities: RwLock<HashMap<String, Identity>>,
    roles: RwLock<Vec<Role>>,
}

impl MemoryDirectory {
    /// Empty directory: no identities, no roles provisioned.
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory with the `USER` and `ADMIN` roles provisioned.
    pub fn with_default_roles() -> Self {
        let dir = Self::new();
        dir.add_role("USER", &["profile:read", "profile:write"]);
        dir.add_role("ADMIN", &["users:read", "users:write", "roles:assign"]);
        dir
    }

    pub fn add_role(&self, name: &str, permissions: &[&str]) {
        self.roles.write().push(Role {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        });
    }

    pub fn remove_role(&self, name: &str) {
        self.roles.write().retain(|r| r.name != name);
    }

    /// Flip an identity's active flag (deactivation is directory-owned).
    pub fn set_active(&self, identity_id: &str, active: bool) {
        if let Some(identity) = self.identities.write().get_mut(identity_id) {
            identity.is_active = active;
        }
    }

    /// Direct read access for assertions.
    pub fn get_by_email(&self, email: &str) -> Option<Identity> {
        self.identities
            .read()
            .values()
            .find(|i| i.email.eq_ignore_ascii_case(email))
            .cloned()
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn find_identity_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Identity>, DirectoryError> {
        Ok(self.get_by_email(email))
    }

    async fn find_identity_by_id(&self, id: &str) -> Result<Option<Identity>, DirectoryError> {
        Ok(self.identities.read().get(id).cloned())
    }

    async fn create_identity(&self, new: NewIdentity) -> Result<Identity, DirectoryError> {
        let mut identities = self.identities.write();
        if identities
            .values()
            .any(|i| i.email.eq_ignore_ascii_case(&new.email))
        {
            return Err(DirectoryError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }

        let identity = Identity {
            id: Uuid::new_v4().to_string(),
            email: new.email,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            avatar_url: new.avatar_url,
            provider: new.provider,
            provider_id: new.provider_id,
            is_active: true,
            is_email_verified: new.is_email_verified,
            roles: Vec::new(),
            created_at: Utc::now(),
        };
        identities.insert(identity.id.clone(), identity.clone());
        Ok(identity)
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, DirectoryError> {
        Ok(self.roles.read().iter().find(|r| r.name == name).cloned())
    }

    async fn assign_role(&self, identity_id: &str, role_id: &str) -> Result<(), DirectoryError> {
        let role_name = self
            .roles
            .read()
            .iter()
            .find(|r| r.id == role_id)
            .map(|r| r.name.clone())
            .ok_or(DirectoryError::NotFound("role"))?;

        let mut identities = self.identities.write();
        let identity = identities
            .get_mut(identity_id)
            .ok_or(DirectoryError::NotFound("identity"))?;

        if identity.roles.contains(&role_name) {
            return Err(DirectoryError::Conflict(format!(
                "Role {} already assigned",
                role_name
            )));
        }
        identity.roles.push(role_name);
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// A valid configuration with well-known (test-only) secrets and default
/// TTLs.
pub fn test_config() -> AuthConfig {
    AuthConfig::builder()
        .access_secret("G7#kPz0rT!mWq2xULf9cDsVb8nJe4HyA$Q6tE1uO")
        .refresh_secret("Zr5!vN8mC2#pXk7QaW4tLb0jEf6HgU9i$D3sYe1T")
        .secret_policy(SecretPolicy::default())
        .build()
        .expect("test configuration is valid")
}

/// A session manager wired to a fresh in-memory directory (USER/ADMIN
/// provisioned) and refresh store. Handles to both collaborators are
/// returned for direct inspection.
pub fn test_manager() -> (
    SessionManager<MemoryDirectory, MemoryRefreshStore>,
    Arc<MemoryDirectory>,
    Arc<MemoryRefreshStore>,
) {
    let directory = Arc::new(MemoryDirectory::with_default_roles());
    let store = Arc::new(MemoryRefreshStore::new());
    let manager = SessionManager::new(test_config(), Arc::clone(&directory), Arc::clone(&store));
    (manager, directory, store)
}

/// Passwords that any sensible policy refuses.
pub fn weak_passwords() -> Vec<&'static str> {
    vec![
        "password", "password123", "12345678", "123456789012", "qwerty123",
        "letmein1", "welcome1", "admin123",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::Provider;

    fn new_identity(email: &str) -> NewIdentity {
        NewIdentity {
            email: email.to_string(),
            password_hash: Some("$argon2id$stub".to_string()),
            first_name: None,
            last_name: None,
            avatar_url: None,
            provider: Provider::Local,
            provider_id: None,
            is_email_verified: false,
        }
    }

    #[tokio::test]
    async fn email_lookup_is_case_insensitive() {
        let dir = MemoryDirectory::with_default_roles();
        dir.create_identity(new_identity("Mixed@Case.Com")).await.unwrap();

        assert!(dir
            .find_identity_by_email("mixed@case.com")
            .await
            .unwrap()
            .is_some());
        assert!(dir
            .find_identity_by_email("MIXED@CASE.COM")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_case_insensitively() {
        let dir = MemoryDirectory::new();
        dir.create_identity(new_identity("a@x.com")).await.unwrap();
        let err = dir.create_identity(new_identity("A@X.COM")).await.unwrap_err();
        assert!(matches!(err, DirectoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn duplicate_role_assignment_conflicts() {
        let dir = MemoryDirectory::with_default_roles();
        let identity = dir.create_identity(new_identity("a@x.com")).await.unwrap();
        let role = dir.find_role_by_name("USER").await.unwrap().unwrap();

        dir.assign_role(&identity.id, &role.id).await.unwrap();
        let err = dir.assign_role(&identity.id, &role.id).await.unwrap_err();
        assert!(matches!(err, DirectoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn assigning_unknown_role_or_identity_is_not_found() {
        let dir = MemoryDirectory::with_default_roles();
        let identity = dir.create_identity(new_identity("a@x.com")).await.unwrap();
        let role = dir.find_role_by_name("USER").await.unwrap().unwrap();

        assert!(matches!(
            dir.assign_role(&identity.id, "no-such-role").await.unwrap_err(),
            DirectoryError::NotFound("role")
        ));
        assert!(matches!(
            dir.assign_role("no-such-identity", &role.id).await.unwrap_err(),
            DirectoryError::NotFound("identity")
        ));
    }
}
