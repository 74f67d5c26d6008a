//! Authorization error types.

use std::fmt;
use std::path::PathBuf;

/// Errors loading the authorization configuration.
///
/// These never reach end users: the store logs them and installs the
/// deny-by-default aggregate instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration file could not be read.
    Unreadable {
        /// The configuration file path.
        path: PathBuf,
        /// Error details.
        details: String,
    },
    /// The configuration file is not valid JSON for the expected shape.
    Malformed {
        /// The configuration file path.
        path: PathBuf,
        /// Error details.
        details: String,
    },
    /// The configuration parsed but violates an invariant.
    Invalid {
        /// Error details.
        details: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable { path, details } => {
                write!(
                    f,
                    "failed to read authorization config '{}': {}",
                    path.display(),
                    details
                )
            }
            Self::Malformed { path, details } => {
                write!(
                    f,
                    "malformed authorization config '{}': {}",
                    path.display(),
                    details
                )
            }
            Self::Invalid { details } => {
                write!(f, "invalid authorization config: {}", details)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors rewriting the configuration file after a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    /// The aggregate could not be serialized.
    Serialize {
        /// Error details.
        details: String,
    },
    /// The file could not be written.
    Write {
        /// The configuration file path.
        path: PathBuf,
        /// Error details.
        details: String,
    },
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialize { details } => {
                write!(f, "failed to serialize authorization config: {}", details)
            }
            Self::Write { path, details } => {
                write!(
                    f,
                    "failed to write authorization config '{}': {}",
                    path.display(),
                    details
                )
            }
        }
    }
}

impl std::error::Error for PersistError {}

/// Errors from administrative rule mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// The root id is not configured.
    UnknownRoot {
        /// The requested root id.
        root_id: String,
    },
    /// The permission level is not defined in the permissions table.
    UnknownLevel {
        /// The requested level name.
        level: String,
    },
}

impl fmt::Display for AuthzError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRoot { root_id } => write!(f, "unknown storage root '{}'", root_id),
            Self::UnknownLevel { level } => write!(f, "unknown permission level '{}'", level),
        }
    }
}

impl std::error::Error for AuthzError {}
