//! Session flows: register, login, refresh, logout, federated login.
//!
//! The [`SessionManager`] composes the credential verifier, token issuer,
//! refresh store and directory into short-lived, non-resumable request
//! transactions. It is constructed once at process start and passed by
//! reference into the transport layer; there is no process-wide instance.
//!
//! # Failure discipline
//!
//! Every flow returns a typed [`AuthError`]; nothing here throws across
//! the API boundary or exits the process. Login failures for an unknown
//! email, a federated-only account and a wrong password share one message,
//! so callers cannot enumerate accounts. A deactivated account reports the
//! distinct "disabled" reason for support flows.
//!
//! # Rotation
//!
//! Refresh consumes the presented record and issues a fresh pair. The
//! store's delete is the serialization point between racing refreshes: the
//! caller whose delete observes the record present wins; the other fails
//! `Unauthorized`. A consumed token is permanently dead even if the new
//! pair is never delivered — a client stranded by a response-path failure
//! re-authenticates via login.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::directory::{Directory, Identity, NewIdentity, Provider};
use crate::error::{AuthError, AuthResult};
use crate::observability::SecurityEvent;
use crate::password::{hash_password, verify_password, PasswordPolicy};
use crate::profile::FederatedProfile;
use crate::security_event;
use crate::store::{RefreshStore, StoreError};
use crate::token::TokenIssuer;
use crate::validation::{validate_email, validate_length, validate_required, Validate, ValidationError};

const MSG_INVALID_CREDENTIALS: &str = "Invalid credentials";
const MSG_ACCOUNT_DISABLED: &str = "Account is disabled";
const MSG_INVALID_REFRESH: &str = "Invalid or expired refresh token";

// ============================================================================
// Requests and responses
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_email(&self.email)?;
        validate_required(&self.password, "password")?;
        if let Some(name) = &self.first_name {
            validate_length(name, 2, 100, "first_name")?;
        }
        if let Some(name) = &self.last_name {
            validate_length(name, 2, 100, "last_name")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_email(&self.email)?;
        validate_required(&self.password, "password")?;
        Ok(())
    }
}

/// The pair returned by every successful flow. Both values are opaque
/// bearer strings to callers.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Caller-facing view of the authenticated identity.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub roles: Vec<String>,
}

impl From<&Identity> for UserSummary {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.clone(),
            email: identity.email.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            avatar_url: identity.avatar_url.clone(),
            roles: identity.roles.clone(),
        }
    }
}

/// Result of a successful register/login/refresh/federated flow.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user: UserSummary,
    pub tokens: TokenPair,
}

// ============================================================================
// Session manager
// ============================================================================

/// Orchestrates the authentication flows over the directory and refresh
/// store collaborators.
pub struct SessionManager<D, S> {
    config: AuthConfig,
    issuer: TokenIssuer,
    directory: Arc<D>,
    store: Arc<S>,
    password_policy: PasswordPolicy,
}

impl<D: Directory, S: RefreshStore> SessionManager<D, S> {
    pub fn new(config: AuthConfig, directory: Arc<D>, store: Arc<S>) -> Self {
        let issuer = TokenIssuer::new(&config);
        Self {
            config,
            issuer,
            directory,
            store,
            password_policy: PasswordPolicy::default(),
        }
    }

    /// Replace the default password policy.
    pub fn with_password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.password_policy = policy;
        self
    }

    /// The issuer this manager signs with; share it with the
    /// [authorization gate](crate::authorize::AuthorizationGate).
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Create an identity with a local credential and issue a token pair.
    ///
    /// Identity creation and default-role assignment are two directory
    /// writes with no transaction spanning them; a failure in between can
    /// leave a role-less identity. Directory implementations backed by a
    /// transactional store may close that gap.
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<AuthSession> {
        request.validate()?;
        self.password_policy.validate(&request.password)?;

        if self
            .directory
            .find_identity_by_email(&request.email)
            .await?
            .is_some()
        {
            return Err(AuthError::conflict("User with this email already exists"));
        }

        let password_hash = self.hash_credential(request.password.clone()).await?;

        let identity = self
            .directory
            .create_identity(NewIdentity {
                email: request.email.clone(),
                password_hash: Some(password_hash),
                first_name: request.first_name.clone(),
                last_name: request.last_name.clone(),
                avatar_url: None,
                provider: Provider::Local,
                provider_id: None,
                is_email_verified: false,
            })
            .await?;

        let identity = self.grant_default_role(identity).await?;

        security_event!(
            SecurityEvent::Registered,
            identity_id = %identity.id,
            email = %identity.email,
            "New identity registered"
        );

        self.issue_session(&identity).await
    }

    /// Verify a local credential and issue a token pair.
    pub async fn login(&self, request: LoginRequest) -> AuthResult<AuthSession> {
        request.validate()?;

        let identity = match self
            .directory
            .find_identity_by_email(&request.email)
            .await?
        {
            Some(identity) => identity,
            None => {
                // Burn a verification anyway so unknown emails cost the
                // same wall-clock as wrong passwords.
                let _ = self
                    .verify_credential(request.password.clone(), DUMMY_HASH.to_string())
                    .await;
                return Err(self.auth_failure(&request.email, "unknown_email"));
            }
        };

        let stored = match &identity.password_hash {
            Some(stored) => stored.clone(),
            None => return Err(self.auth_failure(&request.email, "no_local_credential")),
        };

        if !self.verify_credential(request.password.clone(), stored).await? {
            return Err(self.auth_failure(&request.email, "invalid_password"));
        }

        if !identity.is_active {
            security_event!(
                SecurityEvent::AuthenticationFailure,
                identity_id = %identity.id,
                email = %identity.email,
                reason = "account_disabled",
                "Authentication failed"
            );
            return Err(AuthError::unauthorized(MSG_ACCOUNT_DISABLED));
        }

        security_event!(
            SecurityEvent::AuthenticationSuccess,
            identity_id = %identity.id,
            email = %identity.email,
            "Identity authenticated"
        );

        self.issue_session(&identity).await
    }

    /// Exchange a refresh token for a new pair, consuming it.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<AuthSession> {
        let record = match self.store.find_by_value(refresh_token).await {
            Some(record) => record,
            None => {
                security_event!(
                    SecurityEvent::RefreshReuseDetected,
                    reason = "unknown_or_expired",
                    "Unknown, expired or already-consumed refresh token presented"
                );
                return Err(AuthError::unauthorized(MSG_INVALID_REFRESH));
            }
        };

        // Serialization point: of two racing refreshes, exactly one delete
        // observes the record present and proceeds.
        if !self.store.delete_by_value(refresh_token).await {
            security_event!(
                SecurityEvent::RefreshReuseDetected,
                identity_id = %record.identity_id,
                reason = "lost_rotation_race",
                "Concurrent refresh detected for one token value"
            );
            return Err(AuthError::unauthorized(MSG_INVALID_REFRESH));
        }

        let identity = match self.directory.find_identity_by_id(&record.identity_id).await? {
            Some(identity) if identity.is_active => identity,
            Some(identity) => {
                security_event!(
                    SecurityEvent::AuthenticationFailure,
                    identity_id = %identity.id,
                    reason = "account_disabled",
                    "Refresh denied for deactivated identity"
                );
                return Err(AuthError::unauthorized(MSG_ACCOUNT_DISABLED));
            }
            None => return Err(AuthError::unauthorized(MSG_INVALID_REFRESH)),
        };

        security_event!(
            SecurityEvent::TokenRefreshed,
            identity_id = %identity.id,
            "Refresh token rotated"
        );

        self.issue_session(&identity).await
    }

    /// Revoke one refresh token. Idempotent: revoking an unknown or
    /// already-consumed value succeeds.
    pub async fn logout(&self, refresh_token: &str) -> AuthResult<()> {
        let removed = self.store.delete_by_value(refresh_token).await;
        security_event!(
            SecurityEvent::Logout,
            removed = removed,
            "Refresh token revoked"
        );
        Ok(())
    }

    /// Revoke every refresh token owned by an identity
    /// (logout-everywhere, account deactivation). Returns the number of
    /// live tokens revoked.
    pub async fn logout_all(&self, identity_id: &str) -> AuthResult<usize> {
        let removed = self.store.delete_all_for_identity(identity_id).await;
        security_event!(
            SecurityEvent::LogoutAll,
            identity_id = %identity_id,
            removed = removed,
            "All refresh tokens revoked"
        );
        Ok(removed)
    }

    /// Issue a token pair for an externally-authenticated provider profile,
    /// creating the identity on first login.
    ///
    /// An existing identity is used as-is: a LOCAL credential is never
    /// overwritten by a federated login for the same address.
    pub async fn federated_login(&self, profile: FederatedProfile) -> AuthResult<AuthSession> {
        validate_email(&profile.email)?;

        let identity = match self.directory.find_identity_by_email(&profile.email).await? {
            Some(identity) => identity,
            None => {
                let identity = self
                    .directory
                    .create_identity(NewIdentity {
                        email: profile.email.clone(),
                        password_hash: None,
                        first_name: profile.given_name.clone(),
                        last_name: profile.family_name.clone(),
                        avatar_url: profile.avatar_url.clone(),
                        provider: profile.provider,
                        provider_id: Some(profile.external_id.clone()),
                        is_email_verified: true,
                    })
                    .await?;
                self.grant_default_role(identity).await?
            }
        };

        if !identity.is_active {
            return Err(AuthError::unauthorized(MSG_ACCOUNT_DISABLED));
        }

        security_event!(
            SecurityEvent::FederatedLogin,
            identity_id = %identity.id,
            provider = %profile.provider,
            "Federated identity authenticated"
        );

        self.issue_session(&identity).await
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn auth_failure(&self, email: &str, reason: &'static str) -> AuthError {
        security_event!(
            SecurityEvent::AuthenticationFailure,
            email = %email,
            reason = reason,
            "Authentication failed"
        );
        // One message for every credential failure; the reason stays in
        // the log.
        AuthError::unauthorized(MSG_INVALID_CREDENTIALS)
    }

    /// Assign the configured default role, tolerating an unprovisioned
    /// role catalog, then re-read the identity so the role projection is
    /// current.
    async fn grant_default_role(&self, identity: Identity) -> AuthResult<Identity> {
        match self.directory.find_role_by_name(&self.config.default_role).await? {
            Some(role) => {
                self.directory.assign_role(&identity.id, &role.id).await?;
                self.directory
                    .find_identity_by_id(&identity.id)
                    .await?
                    .ok_or_else(|| AuthError::internal("Identity vanished during registration"))
            }
            None => {
                tracing::warn!(
                    role = %self.config.default_role,
                    identity_id = %identity.id,
                    "Default role not provisioned; identity created without roles"
                );
                Ok(identity)
            }
        }
    }

    async fn issue_session(&self, identity: &Identity) -> AuthResult<AuthSession> {
        let access_token = self
            .issuer
            .issue_access_token(
                &identity.id,
                &identity.email,
                identity.roles.clone(),
                self.config.access_ttl,
            )
            .map_err(|e| {
                AuthError::internal("Access token issuance failed").with_details(e.to_string())
            })?;

        let record = self
            .issuer
            .issue_refresh_token(&identity.id, self.config.refresh_ttl);
        let refresh_token = record.value.clone();

        if let Err(err) = self.store.put(record).await {
            if matches!(err, StoreError::Conflict { .. }) {
                security_event!(
                    SecurityEvent::IntegrityViolation,
                    identity_id = %identity.id,
                    "Freshly generated refresh value collided with a stored record"
                );
            }
            return Err(err.into());
        }

        Ok(AuthSession {
            user: UserSummary::from(identity),
            tokens: TokenPair {
                access_token,
                refresh_token,
            },
        })
    }

    async fn hash_credential(&self, password: String) -> AuthResult<String> {
        let computed = tokio::time::timeout(
            self.config.hash_timeout,
            tokio::task::spawn_blocking(move || hash_password(&password)),
        )
        .await;

        match computed {
            Err(_) => Err(AuthError::internal("Credential hashing timed out")),
            Ok(Err(join)) => Err(AuthError::internal("Credential hashing task failed")
                .with_details(join.to_string())),
            Ok(Ok(Err(hash_err))) => Err(AuthError::internal_from(
                "Credential hashing failed",
                hash_err,
            )),
            Ok(Ok(Ok(hash))) => Ok(hash),
        }
    }

    async fn verify_credential(&self, password: String, stored: String) -> AuthResult<bool> {
        let computed = tokio::time::timeout(
            self.config.hash_timeout,
            tokio::task::spawn_blocking(move || verify_password(&password, &stored)),
        )
        .await;

        match computed {
            Err(_) => Err(AuthError::internal("Credential verification timed out")),
            Ok(Err(join)) => Err(AuthError::internal("Credential verification task failed")
                .with_details(join.to_string())),
            Ok(Ok(verified)) => Ok(verified),
        }
    }
}

/// Argon2id hash of an unguessable throwaway input; verified against when
/// the email is unknown so both failure paths do comparable work.
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$uP8Ki2jQbtBkxE0XSjXB0A$0oJGHl5H6efQHLTDWSi14StVDlgnHsJ1g3Duuyc1hC8";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{test_manager, MemoryDirectory};

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: "Passw0rd!unique".into(),
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
        }
    }

    #[tokio::test]
    async fn register_issues_pair_with_default_role() {
        let (manager, _dir, _store) = test_manager();
        let session = manager.register(register_request("a@x.com")).await.unwrap();

        assert_eq!(session.user.email, "a@x.com");
        assert_eq!(session.user.roles, vec!["USER".to_string()]);
        assert!(!session.tokens.access_token.is_empty());
        assert_eq!(session.tokens.refresh_token.len(), 128);

        let claims = manager
            .issuer()
            .verify_access_token(&session.tokens.access_token)
            .unwrap();
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.roles, vec!["USER".to_string()]);
    }

    #[tokio::test]
    async fn register_duplicate_email_conflicts() {
        let (manager, _dir, _store) = test_manager();
        manager.register(register_request("a@x.com")).await.unwrap();

        let err = manager
            .register(register_request("a@x.com"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn register_rejects_malformed_email_and_weak_password() {
        let (manager, _dir, _store) = test_manager();

        let err = manager
            .register(RegisterRequest {
                email: "not-an-email".into(),
                password: "Passw0rd!unique".into(),
                first_name: None,
                last_name: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = manager
            .register(RegisterRequest {
                email: "b@x.com".into(),
                password: "short".into(),
                first_name: None,
                last_name: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.field.as_deref(), Some("password"));
    }

    #[tokio::test]
    async fn login_success_and_failure_paths() {
        let (manager, _dir, _store) = test_manager();
        manager.register(register_request("a@x.com")).await.unwrap();

        let session = manager
            .login(LoginRequest {
                email: "a@x.com".into(),
                password: "Passw0rd!unique".into(),
            })
            .await
            .unwrap();
        assert_eq!(session.user.email, "a@x.com");

        let wrong = manager
            .login(LoginRequest {
                email: "a@x.com".into(),
                password: "Passw0rd!other".into(),
            })
            .await
            .unwrap_err();
        let unknown = manager
            .login(LoginRequest {
                email: "nobody@x.com".into(),
                password: "Passw0rd!unique".into(),
            })
            .await
            .unwrap_err();

        assert_eq!(wrong.kind, ErrorKind::Unauthorized);
        assert_eq!(unknown.kind, ErrorKind::Unauthorized);
        // Identical text across unknown-email and wrong-password.
        assert_eq!(wrong.message, unknown.message);
    }

    #[tokio::test]
    async fn login_email_lookup_is_case_insensitive() {
        let (manager, _dir, _store) = test_manager();
        manager.register(register_request("a@x.com")).await.unwrap();

        let session = manager
            .login(LoginRequest {
                email: "A@X.COM".into(),
                password: "Passw0rd!unique".into(),
            })
            .await
            .unwrap();
        assert_eq!(session.user.email, "a@x.com");
    }

    #[tokio::test]
    async fn login_deactivated_account_is_unauthorized() {
        let (manager, dir, _store) = test_manager();
        let session = manager.register(register_request("a@x.com")).await.unwrap();
        dir.set_active(&session.user.id, false);

        let err = manager
            .login(LoginRequest {
                email: "a@x.com".into(),
                password: "Passw0rd!unique".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
        assert_eq!(err.message, MSG_ACCOUNT_DISABLED);
    }

    #[tokio::test]
    async fn refresh_rotates_and_kills_the_old_token() {
        let (manager, _dir, _store) = test_manager();
        let session = manager.register(register_request("a@x.com")).await.unwrap();
        let old = session.tokens.refresh_token.clone();

        let rotated = manager.refresh(&old).await.unwrap();
        assert_ne!(rotated.tokens.refresh_token, old);

        let err = manager.refresh(&old).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn refresh_unknown_token_is_unauthorized() {
        let (manager, _dir, _store) = test_manager();
        let err = manager.refresh("deadbeef".repeat(16).as_str()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn refresh_for_deactivated_identity_is_unauthorized() {
        let (manager, dir, _store) = test_manager();
        let session = manager.register(register_request("a@x.com")).await.unwrap();
        dir.set_active(&session.user.id, false);

        let err = manager
            .refresh(&session.tokens.refresh_token)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
        assert_eq!(err.message, MSG_ACCOUNT_DISABLED);
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let (manager, _dir, _store) = test_manager();
        let session = manager.register(register_request("a@x.com")).await.unwrap();
        let token = session.tokens.refresh_token.clone();

        manager.logout(&token).await.unwrap();
        manager.logout(&token).await.unwrap();

        let err = manager.refresh(&token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn logout_all_revokes_every_session() {
        let (manager, _dir, _store) = test_manager();
        let first = manager.register(register_request("a@x.com")).await.unwrap();
        let second = manager
            .login(LoginRequest {
                email: "a@x.com".into(),
                password: "Passw0rd!unique".into(),
            })
            .await
            .unwrap();

        let removed = manager.logout_all(&first.user.id).await.unwrap();
        assert_eq!(removed, 2);

        assert!(manager.refresh(&first.tokens.refresh_token).await.is_err());
        assert!(manager.refresh(&second.tokens.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn federated_login_creates_verified_identity() {
        let (manager, dir, _store) = test_manager();
        let profile = FederatedProfile {
            provider: Provider::Google,
            external_id: "108127".into(),
            email: "fed@x.com".into(),
            given_name: Some("Ada".into()),
            family_name: None,
            avatar_url: None,
        };

        let session = manager.federated_login(profile).await.unwrap();
        assert_eq!(session.user.roles, vec!["USER".to_string()]);

        let identity = dir.get_by_email("fed@x.com").unwrap();
        assert_eq!(identity.provider, Provider::Google);
        assert!(identity.is_email_verified);
        assert!(identity.password_hash.is_none());
    }

    #[tokio::test]
    async fn federated_login_keeps_local_credential() {
        let (manager, dir, _store) = test_manager();
        manager.register(register_request("a@x.com")).await.unwrap();
        let before = dir.get_by_email("a@x.com").unwrap();

        let profile = FederatedProfile {
            provider: Provider::GitHub,
            external_id: "583231".into(),
            email: "a@x.com".into(),
            given_name: None,
            family_name: None,
            avatar_url: None,
        };
        manager.federated_login(profile).await.unwrap();

        let after = dir.get_by_email("a@x.com").unwrap();
        assert_eq!(after.provider, Provider::Local);
        assert_eq!(after.password_hash, before.password_hash);
    }

    #[tokio::test]
    async fn default_role_missing_is_tolerated() {
        let (manager, dir, _store) = test_manager();
        dir.remove_role("USER");

        let session = manager.register(register_request("a@x.com")).await.unwrap();
        assert!(session.user.roles.is_empty());
    }

    #[tokio::test]
    async fn directory_is_seeded_before_use() {
        let dir = MemoryDirectory::with_default_roles();
        assert!(dir.get_by_email("a@x.com").is_none());
    }
}
