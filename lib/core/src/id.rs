//! Strongly-typed identifiers for domain entities.
//!
//! Storage roots and permission levels are keyed by configuration-supplied
//! strings, so identifiers here wrap a validated `String` rather than a
//! generated value. Emails are normalized (trimmed, lower-cased) on
//! construction so that every comparison downstream is case-insensitive.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to generate a strongly-typed, non-empty string key.
macro_rules! define_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a key, rejecting empty or whitespace-only values.
            ///
            /// # Errors
            ///
            /// Returns an error if the trimmed value is empty.
            pub fn new(value: impl Into<String>) -> Result<Self, ParseIdError> {
                let value = value.into();
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(ParseIdError {
                        id_type: stringify!($name),
                        reason: "value is empty".to_string(),
                    });
                }
                Ok(Self(trimmed.to_string()))
            }

            /// Creates a key from a built-in literal.
            #[must_use]
            pub fn from_static(value: &'static str) -> Self {
                debug_assert!(!value.trim().is_empty(), "built-in keys are non-empty");
                Self(value.to_string())
            }

            /// Returns the key as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseIdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_key!(
    /// Stable identifier of a configured storage root, used in URLs and
    /// permission keys.
    RootId
);

define_key!(
    /// Name of a permission level (e.g. `full`, `readonly`, `denied`).
    LevelName
);

impl LevelName {
    /// The conventional name of the level that grants nothing.
    pub const DENIED: &'static str = "denied";

    /// Returns the conventional `denied` level.
    #[must_use]
    pub fn denied() -> Self {
        Self::from_static(Self::DENIED)
    }

    /// Returns true if this is the conventional `denied` level.
    #[must_use]
    pub fn is_denied(&self) -> bool {
        self.0 == Self::DENIED
    }
}

/// A normalized email address.
///
/// Normalization trims surrounding whitespace and lower-cases the whole
/// address. Some identity providers only expose a login name, which is
/// accepted here as an email surrogate, so no `@` is required.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Normalizes a raw address, returning `None` when nothing remains.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_lowercase()))
    }

    /// Creates an email from a built-in literal, normalizing it.
    #[must_use]
    pub fn from_static(value: &'static str) -> Self {
        debug_assert!(!value.trim().is_empty(), "built-in emails are non-empty");
        Self(value.trim().to_lowercase())
    }

    /// Returns the normalized address.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Email {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ParseIdError {
            id_type: "Email",
            reason: "value is empty".to_string(),
        })
    }
}

impl TryFrom<String> for Email {
    type Error = ParseIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl Borrow<str> for Email {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_id_trims_value() {
        let id = RootId::new("  main ").expect("should parse");
        assert_eq!(id.as_str(), "main");
        assert_eq!(id.to_string(), "main");
    }

    #[test]
    fn root_id_rejects_empty() {
        let err = RootId::new("   ").unwrap_err();
        assert_eq!(err.id_type, "RootId");
    }

    #[test]
    fn level_name_denied() {
        let denied: LevelName = "denied".parse().expect("should parse");
        let full: LevelName = "full".parse().expect("should parse");
        assert!(denied.is_denied());
        assert!(!full.is_denied());
    }

    #[test]
    fn email_is_normalized() {
        let email = Email::parse("  User@Example.COM ").expect("should parse");
        assert_eq!(email.as_str(), "user@example.com");
        assert_eq!(email, Email::parse("user@example.com").expect("should parse"));
    }

    #[test]
    fn email_rejects_blank() {
        assert!(Email::parse("").is_none());
        assert!(Email::parse("  ").is_none());
        assert!("".parse::<Email>().is_err());
    }

    #[test]
    fn email_accepts_username_surrogate() {
        let email = Email::parse("OctoCat").expect("should parse");
        assert_eq!(email.as_str(), "octocat");
    }

    #[test]
    fn email_deserialize_normalizes() {
        let email: Email = serde_json::from_str("\"Admin@Example.com\"").expect("deserialize");
        assert_eq!(email.as_str(), "admin@example.com");
    }

    #[test]
    fn key_deserialize_rejects_empty() {
        let result: Result<RootId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn keys_work_as_str_map_keys() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(RootId::new("main").expect("should parse"), 1);
        assert_eq!(map.get("main"), Some(&1));
    }
}
