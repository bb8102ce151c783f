//! Federated identity profiles.
//!
//! The OAuth front-door performs the redirect/consent/code exchange and
//! hands this core an already-authenticated provider profile. Each provider
//! has its own wire shape, so each gets an explicit record type; both
//! normalize into a single [`FederatedProfile`] before reaching the session
//! manager. Authenticity is the front-door's problem; structural
//! completeness is ours — a profile without an email address cannot become
//! an addressable identity and is rejected here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::directory::Provider;

/// Google OpenID Connect userinfo shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleProfile {
    /// Stable Google account id.
    pub sub: String,
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
}

/// GitHub user API shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubProfile {
    /// Numeric GitHub account id.
    pub id: i64,
    pub login: String,
    /// Display name, free-form ("First Last" by convention).
    pub name: Option<String>,
    /// Absent when the user hides their email.
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

/// Provider-independent profile consumed by the session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedProfile {
    pub provider: Provider,
    /// Provider-assigned external id.
    pub external_id: String,
    pub email: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Structurally incomplete provider profile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("Email not provided by OAuth provider {provider}")]
    MissingEmail { provider: Provider },
}

impl TryFrom<GoogleProfile> for FederatedProfile {
    type Error = ProfileError;

    fn try_from(profile: GoogleProfile) -> Result<Self, Self::Error> {
        let email = non_empty(profile.email).ok_or(ProfileError::MissingEmail {
            provider: Provider::Google,
        })?;

        Ok(Self {
            provider: Provider::Google,
            external_id: profile.sub,
            email,
            given_name: non_empty(profile.given_name),
            family_name: non_empty(profile.family_name),
            avatar_url: non_empty(profile.picture),
        })
    }
}

impl TryFrom<GitHubProfile> for FederatedProfile {
    type Error = ProfileError;

    fn try_from(profile: GitHubProfile) -> Result<Self, Self::Error> {
        let email = non_empty(profile.email).ok_or(ProfileError::MissingEmail {
            provider: Provider::GitHub,
        })?;

        // GitHub exposes one display name; split on the first space.
        let (given, family) = match non_empty(profile.name) {
            Some(name) => match name.split_once(' ') {
                Some((given, family)) => (Some(given.to_string()), Some(family.to_string())),
                None => (Some(name), None),
            },
            None => (None, None),
        };

        Ok(Self {
            provider: Provider::GitHub,
            external_id: profile.id.to_string(),
            email,
            given_name: given,
            family_name: family,
            avatar_url: non_empty(profile.avatar_url),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_profile_normalizes() {
        let profile = GoogleProfile {
            sub: "108127".into(),
            email: Some("a@x.com".into()),
            given_name: Some("Ada".into()),
            family_name: Some("Lovelace".into()),
            picture: Some("https://lh3.example/p.png".into()),
        };

        let normalized = FederatedProfile::try_from(profile).unwrap();
        assert_eq!(normalized.provider, Provider::Google);
        assert_eq!(normalized.external_id, "108127");
        assert_eq!(normalized.email, "a@x.com");
        assert_eq!(normalized.given_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn google_profile_without_email_is_rejected() {
        let profile = GoogleProfile {
            sub: "108127".into(),
            email: None,
            given_name: None,
            family_name: None,
            picture: None,
        };
        assert_eq!(
            FederatedProfile::try_from(profile).unwrap_err(),
            ProfileError::MissingEmail {
                provider: Provider::Google
            }
        );
    }

    #[test]
    fn blank_email_counts_as_missing() {
        let profile = GoogleProfile {
            sub: "108127".into(),
            email: Some("   ".into()),
            given_name: None,
            family_name: None,
            picture: None,
        };
        assert!(FederatedProfile::try_from(profile).is_err());
    }

    #[test]
    fn github_profile_splits_display_name() {
        let profile = GitHubProfile {
            id: 583231,
            login: "adal".into(),
            name: Some("Ada Lovelace".into()),
            email: Some("a@x.com".into()),
            avatar_url: Some("https://avatars.example/1".into()),
        };

        let normalized = FederatedProfile::try_from(profile).unwrap();
        assert_eq!(normalized.provider, Provider::GitHub);
        assert_eq!(normalized.external_id, "583231");
        assert_eq!(normalized.given_name.as_deref(), Some("Ada"));
        assert_eq!(normalized.family_name.as_deref(), Some("Lovelace"));
    }

    #[test]
    fn github_single_word_name() {
        let profile = GitHubProfile {
            id: 1,
            login: "mononym".into(),
            name: Some("Teller".into()),
            email: Some("t@x.com".into()),
            avatar_url: None,
        };
        let normalized = FederatedProfile::try_from(profile).unwrap();
        assert_eq!(normalized.given_name.as_deref(), Some("Teller"));
        assert_eq!(normalized.family_name, None);
    }

    #[test]
    fn github_hidden_email_is_rejected() {
        let profile = GitHubProfile {
            id: 1,
            login: "private".into(),
            name: None,
            email: None,
            avatar_url: None,
        };
        assert_eq!(
            FederatedProfile::try_from(profile).unwrap_err(),
            ProfileError::MissingEmail {
                provider: Provider::GitHub
            }
        );
    }
}
