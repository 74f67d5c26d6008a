//! Error types for the fs crate.
//!
//! Both enums are outcomes the HTTP layer maps to distinct statuses, so
//! they stay plain and matchable.

use std::fmt;
use std::path::PathBuf;

/// Why a user-supplied path was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfineError {
    /// The path resolves outside its storage root.
    OutOfBounds {
        /// The path as requested.
        requested: String,
    },
    /// The path is not a usable relative path.
    Invalid {
        /// The path as requested.
        requested: String,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// The storage root itself cannot be resolved.
    RootUnavailable {
        /// The configured root directory.
        root: PathBuf,
        /// Underlying error message.
        details: String,
    },
}

impl ConfineError {
    /// Returns true when the caller supplied a bad path, as opposed to the
    /// server having a broken root.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::RootUnavailable { .. })
    }
}

impl fmt::Display for ConfineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds { requested } => {
                write!(f, "path '{requested}' is outside the storage root")
            }
            Self::Invalid { requested, reason } => {
                write!(f, "invalid path '{requested}': {reason}")
            }
            Self::RootUnavailable { root, details } => {
                write!(f, "storage root {} is unavailable: {details}", root.display())
            }
        }
    }
}

impl std::error::Error for ConfineError {}

/// Failures of file operations on confined paths.
///
/// Paths are reported relative to the storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsError {
    /// Nothing exists at the path.
    NotFound { path: String },
    /// Something already exists where the operation would create an entry.
    AlreadyExists { path: String },
    /// The operation needs a directory but found a file, or the reverse.
    WrongKind { path: String, expected: &'static str },
    /// The operation would remove or move the storage root itself.
    RootProtected,
    /// Any other I/O failure.
    Io { path: String, details: String },
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { path } => write!(f, "'/{path}' not found"),
            Self::AlreadyExists { path } => write!(f, "'/{path}' already exists"),
            Self::WrongKind { path, expected } => write!(f, "'/{path}' is not a {expected}"),
            Self::RootProtected => write!(f, "the storage root cannot be removed or renamed"),
            Self::Io { path, details } => write!(f, "I/O error on '/{path}': {details}"),
        }
    }
}

impl std::error::Error for FsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_root_failures_are_server_side() {
        let out = ConfineError::OutOfBounds {
            requested: "../x".to_string(),
        };
        let root = ConfineError::RootUnavailable {
            root: PathBuf::from("/missing"),
            details: "No such file or directory".to_string(),
        };
        assert!(out.is_client_error());
        assert!(!root.is_client_error());
    }

    #[test]
    fn fs_error_display_uses_relative_path() {
        let err = FsError::NotFound {
            path: "docs/a.txt".to_string(),
        };
        assert_eq!(err.to_string(), "'/docs/a.txt' not found");
    }
}
