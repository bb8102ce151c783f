//! # Portcullis
//!
//! Identity and access-control core: credential verification, signed
//! access tokens, rotating single-use refresh tokens and role-based
//! authorization, behind a transport-agnostic API.
//!
//! ## What this crate does
//!
//! - **Credential verification**: Argon2id hashing with per-call salts and
//!   infallible constant-time verification
//! - **Token issuance**: short-lived HS256 access tokens carrying identity
//!   and role claims, plus long-lived opaque refresh tokens
//! - **Refresh rotation**: single-use refresh records; every refresh
//!   deletes the consumed record and issues a fresh pair, and a racing
//!   reuse of the same value loses deterministically
//! - **Authorization**: per-request signature/expiry checks and role
//!   intersection decisions with distinct failure reasons
//! - **Session flows**: register, login, refresh, logout,
//!   logout-everywhere and federated (OAuth-style) login
//!
//! ## What this crate does not do
//!
//! HTTP transport, OAuth redirect/consent exchanges and Identity/Role
//! persistence live outside, behind the [`directory::Directory`] and
//! [`store::RefreshStore`] seams and the request/response types in
//! [`session`].
//!
//! ## Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use portcullis::prelude::*;
//! use portcullis::observability;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     observability::init(&ObservabilityConfig::from_env())?;
//!
//!     // Invalid secrets or TTLs fail here, at startup.
//!     let config = AuthConfig::from_env()?;
//!
//!     let directory = Arc::new(build_directory()); // your Directory impl
//!     let store = Arc::new(MemoryRefreshStore::new());
//!
//!     let sessions = SessionManager::new(config, directory, store);
//!     let gate = AuthorizationGate::new(sessions.issuer().clone());
//!
//!     // Hand `sessions` and `gate` to the transport layer.
//!     Ok(())
//! }
//! ```

pub mod authorize;
pub mod config;
pub mod directory;
pub mod error;
pub mod observability;
pub mod parse;
pub mod password;
pub mod prelude;
pub mod profile;
pub mod session;
pub mod store;
pub mod testing;
pub mod token;
pub mod validation;

pub use authorize::AuthorizationGate;
pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, AuthResult, ErrorKind};
pub use session::{AuthSession, SessionManager, TokenPair};
pub use token::{AccessClaims, TokenIssuer};
