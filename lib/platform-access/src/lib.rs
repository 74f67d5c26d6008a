//! Identity normalization and access decisions for filegate.
//!
//! This crate provides:
//! - [`Identity`]: the provider-specific shapes an authenticated user
//!   arrives in, reduced to one normalized email by [`normalize_email`]
//! - [`AccessGate`]: the single decision point every route calls before
//!   touching the filesystem
//!
//! # Access Model
//!
//! Each request passes two gates in order:
//! - Authentication: a normalized email must be resolvable, unless the
//!   deployment runs with authentication disabled
//! - Authorization: the email must hold the capability for the requested
//!   action on the requested root
//!
//! # Example
//!
//! ```
//! use filegate_authz::{Action, AuthorizationConfig, AuthorizationStore, PermissionResolver};
//! use filegate_platform_access::{AccessGate, AccessRequest, AuthMode, Identity};
//! use std::sync::Arc;
//!
//! let store = AuthorizationStore::with_config("authorization.json", AuthorizationConfig::safe_default());
//! let gate = AccessGate::new(PermissionResolver::new(Arc::new(store)), AuthMode::Required);
//!
//! let identity = Identity::from_value(serde_json::json!({
//!     "profile": { "email": "Admin@Example.com" }
//! }));
//! let grant = gate
//!     .authorize(&AccessRequest::new(Some(&identity)), Action::Delete)
//!     .expect("seed administrator holds full access");
//!
//! assert_eq!(grant.root().id.as_str(), "main");
//! assert!(grant.permissions().capabilities.can_delete);
//! ```

pub mod error;
pub mod gate;
pub mod identity;

pub use error::AccessError;
pub use gate::{AccessGate, AccessRequest, AuthMode, Grant};
pub use identity::{Identity, Profile, normalize_email};
