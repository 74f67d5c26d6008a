//! Error types for the platform-access crate.
//!
//! Gate failures are expected outcomes that route handlers branch on, so
//! they are a plain enum rather than a report.

use filegate_authz::Action;
use filegate_core::{Email, RootId};
use std::fmt;

/// Why the access gate refused a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// No normalized email could be derived from the request.
    Unauthenticated,
    /// The caller lacks the capability for the action on the root.
    Forbidden {
        /// The normalized caller email; `None` when authentication is disabled.
        email: Option<Email>,
        /// The refused action.
        action: Action,
        /// The root the decision applied to; `None` when no root exists.
        root_id: Option<RootId>,
    },
    /// The requested root id is not configured.
    UnknownRoot {
        /// The requested root id.
        root_id: String,
    },
}

impl AccessError {
    /// Returns true for failures of the authentication gate.
    #[must_use]
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated)
    }
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "not authenticated"),
            Self::Forbidden {
                email,
                action,
                root_id,
            } => {
                let who = email.as_ref().map_or("anonymous", Email::as_str);
                match root_id {
                    Some(root_id) => write!(f, "{who} may not {action} on root '{root_id}'"),
                    None => write!(f, "{who} may not {action}: no storage root is configured"),
                }
            }
            Self::UnknownRoot { root_id } => write!(f, "unknown storage root '{root_id}'"),
        }
    }
}

impl std::error::Error for AccessError {}
