//! Caller identification for the filegate server.
//!
//! filegate runs behind an authenticating proxy (oauth2-proxy or similar)
//! that has already completed the OAuth2/OIDC flow with GitLab, GitHub or a
//! Hydra-based provider. The proxy forwards the result in trusted headers:
//! - a JSON identity object, in whatever shape the provider produced
//! - a plain email
//! - a login name
//!
//! [`Caller`] collects these without judging them. The access gate decides
//! whether they identify anyone.

pub mod middleware;

pub use middleware::{Caller, ROOT_COOKIE, RequireAdmin};
