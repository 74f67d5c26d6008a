//! Authorization for filegate storage roots.
//!
//! Access is governed by a per-email, per-root permission matrix loaded
//! from a JSON configuration file:
//! - [`AuthorizationStore`] owns the loaded [`AuthorizationConfig`] and its
//!   persistence, falling back to a deny-by-default aggregate when the file
//!   is missing or invalid
//! - [`PermissionResolver`] turns an email and a root into a capability set
//!
//! Any (email, root) pair without an explicit grant resolves to the
//! configured default level, which is normally `denied`.

mod error;
mod file;
mod resolver;
mod store;
mod types;

pub use error::{AuthzError, ConfigError, PersistError};
pub use file::{ConfigFile, load_config};
pub use resolver::PermissionResolver;
pub use store::{AuthorizationStore, Persistence};
pub use types::{
    AccessibleRoot, Action, AuthorizationConfig, Capabilities, ConfigMetadata,
    ResolvedPermissions, Root, Rule,
};
