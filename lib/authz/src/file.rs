//! On-disk shape of the authorization configuration.

use crate::error::ConfigError;
use crate::types::{AuthorizationConfig, Capabilities, ConfigMetadata, Root, Rule};
use filegate_core::{LevelName, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

/// The JSON document stored at the configured path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    /// Configured storage roots.
    pub storage_roots: Vec<Root>,
    /// Rules, level table and default level.
    pub authorization: AuthorizationSection,
    /// Bookkeeping.
    #[serde(default)]
    pub metadata: ConfigMetadata,
}

/// The `authorization` block of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationSection {
    /// Per-email rules.
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Capability bundle of each level name.
    pub permissions: BTreeMap<LevelName, Capabilities>,
    /// Level used when no rule entry applies.
    pub default_permission: LevelName,
}

impl ConfigFile {
    /// Validates the document and converts it into the in-memory aggregate.
    ///
    /// Rule entries naming an undefined level are dropped so that they fall
    /// back to the default level. Rules for the same normalized email are
    /// merged, later entries winning.
    ///
    /// # Errors
    ///
    /// Returns an error if root ids repeat or the default level is undefined.
    pub fn into_config(self) -> Result<AuthorizationConfig, ConfigError> {
        let Self {
            storage_roots,
            authorization,
            metadata,
        } = self;

        let mut seen = HashSet::new();
        for root in &storage_roots {
            if !seen.insert(root.id.as_str()) {
                return Err(ConfigError::Invalid {
                    details: format!("duplicate storage root id '{}'", root.id),
                }
                .into());
            }
        }

        let levels = authorization.permissions;
        if !levels.contains_key(&authorization.default_permission) {
            return Err(ConfigError::Invalid {
                details: format!(
                    "default permission '{}' is not a defined level",
                    authorization.default_permission
                ),
            }
            .into());
        }

        let mut rules: Vec<Rule> = Vec::with_capacity(authorization.rules.len());
        for mut rule in authorization.rules {
            rule.root_permissions.retain(|root_id, level| {
                let known = levels.contains_key(level);
                if !known {
                    warn!(
                        email = %rule.email,
                        root_id = %root_id,
                        level = %level,
                        "dropping rule entry with undefined permission level"
                    );
                }
                known
            });

            match rules.iter_mut().find(|existing| existing.email == rule.email) {
                Some(existing) => {
                    debug!(email = %rule.email, "merging duplicate rule");
                    existing.root_permissions.append(&mut rule.root_permissions);
                    if !rule.description.is_empty() {
                        existing.description = rule.description;
                    }
                }
                None => rules.push(rule),
            }
        }

        Ok(AuthorizationConfig {
            roots: storage_roots,
            rules,
            permission_levels: levels,
            default_permission_level: authorization.default_permission,
            metadata,
        })
    }
}

impl From<&AuthorizationConfig> for ConfigFile {
    fn from(config: &AuthorizationConfig) -> Self {
        Self {
            storage_roots: config.roots.clone(),
            authorization: AuthorizationSection {
                rules: config.rules.clone(),
                permissions: config.permission_levels.clone(),
                default_permission: config.default_permission_level.clone(),
            },
            metadata: config.metadata.clone(),
        }
    }
}

/// Reads and validates the configuration file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid JSON for the
/// expected shape, or fails validation.
pub fn load_config(path: &Path) -> Result<AuthorizationConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;

    let file: ConfigFile = serde_json::from_str(&raw).map_err(|e| ConfigError::Malformed {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;

    file.into_config()
}
