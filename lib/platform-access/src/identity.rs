//! Provider-specific identity shapes and their normalization.
//!
//! Identity providers disagree on where the user's address lives:
//! - OIDC providers such as Hydra nest claims under `profile`
//! - GitLab exposes `email` directly
//! - GitHub may expose only a `username` when the email is private
//!
//! Each shape is one [`Identity`] variant. Supporting a new provider shape
//! means adding a variant and its arm in [`Identity::candidates`].

use filegate_core::Email;
use serde::Deserialize;

/// The nested profile block of OIDC-style identities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Profile {
    /// The profile email claim.
    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated user as produced by an identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Identity {
    /// Claims nested under `profile`, with optional top-level fallbacks.
    Nested {
        /// The nested profile.
        profile: Profile,
        /// Top-level email, if the provider also sets one.
        #[serde(default)]
        email: Option<String>,
        /// Top-level login name.
        #[serde(default)]
        username: Option<String>,
    },
    /// A top-level email.
    Direct {
        /// The email.
        email: String,
        /// Login name, if present.
        #[serde(default)]
        username: Option<String>,
    },
    /// Only a login name, used as an email surrogate.
    Login {
        /// The login name.
        username: String,
    },
    /// Authenticated, but carrying nothing usable as an address.
    Anonymous {},
}

impl Identity {
    /// Classifies a raw identity object.
    ///
    /// Values that match no known shape become [`Identity::Anonymous`].
    #[must_use]
    pub fn from_value(value: serde_json::Value) -> Self {
        serde_json::from_value(value).unwrap_or(Self::Anonymous {})
    }

    /// Creates a direct-email identity.
    #[must_use]
    pub fn email(email: impl Into<String>) -> Self {
        Self::Direct {
            email: email.into(),
            username: None,
        }
    }

    /// Creates a login-name identity.
    #[must_use]
    pub fn login(username: impl Into<String>) -> Self {
        Self::Login {
            username: username.into(),
        }
    }

    /// Candidate addresses in precedence order: profile email, top-level
    /// email, then login name.
    fn candidates(&self) -> Vec<&str> {
        match self {
            Self::Nested {
                profile,
                email,
                username,
            } => [profile.email.as_deref(), email.as_deref(), username.as_deref()]
                .into_iter()
                .flatten()
                .collect(),
            Self::Direct { email, username } => [Some(email.as_str()), username.as_deref()]
                .into_iter()
                .flatten()
                .collect(),
            Self::Login { username } => vec![username.as_str()],
            Self::Anonymous {} => Vec::new(),
        }
    }

    /// Returns the normalized address carried by this identity, if any.
    #[must_use]
    pub fn normalized_email(&self) -> Option<Email> {
        self.candidates().into_iter().find_map(Email::parse)
    }
}

/// Derives the canonical email for a request.
///
/// The identity's own candidates win; `session_email` is consulted only when
/// the identity is absent or carries nothing usable. Blank values never
/// count as a match.
#[must_use]
pub fn normalize_email(identity: Option<&Identity>, session_email: Option<&str>) -> Option<Email> {
    identity
        .and_then(Identity::normalized_email)
        .or_else(|| session_email.and_then(Email::parse))
}
