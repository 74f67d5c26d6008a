//! Authorization model types.

use chrono::{DateTime, Utc};
use filegate_core::{Email, LevelName, RootId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// A file operation that can be authorized on a storage root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// List directories.
    View,
    /// Read file contents.
    Download,
    /// Create or overwrite files and directories.
    Upload,
    /// Remove files and directories.
    Delete,
}

impl Action {
    /// Every action, in capability order.
    pub const ALL: [Self; 4] = [Self::View, Self::Download, Self::Upload, Self::Delete];

    /// Returns the action name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Download => "download",
            Self::Upload => "upload",
            Self::Delete => "delete",
        }
    }

    /// Parses an action name. Unknown names yield `None`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.as_str() == name)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The four capability bits of a permission level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// May list directories.
    #[serde(default)]
    pub can_view: bool,
    /// May read file contents.
    #[serde(default)]
    pub can_download: bool,
    /// May write files and create directories.
    #[serde(default)]
    pub can_upload: bool,
    /// May remove files and directories.
    #[serde(default)]
    pub can_delete: bool,
}

impl Capabilities {
    /// No capabilities.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            can_view: false,
            can_download: false,
            can_upload: false,
            can_delete: false,
        }
    }

    /// Every capability.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            can_view: true,
            can_download: true,
            can_upload: true,
            can_delete: true,
        }
    }

    /// Returns true if the capability matching `action` is set.
    #[must_use]
    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::View => self.can_view,
            Action::Download => self.can_download,
            Action::Upload => self.can_upload,
            Action::Delete => self.can_delete,
        }
    }
}

/// A named storage location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Root {
    /// Stable identifier used in URLs and permission keys.
    pub id: RootId,
    /// Display name.
    pub name: String,
    /// Absolute or process-relative directory.
    #[serde(rename = "path")]
    pub physical_path: PathBuf,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether this is the default root.
    #[serde(default)]
    pub is_default: bool,
}

/// Per-email mapping from root ids to permission level names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Normalized email (unique key).
    pub email: Email,
    /// Level granted on each root. Roots not listed use the default level.
    #[serde(rename = "rootPathPermissions", default)]
    pub root_permissions: BTreeMap<RootId, LevelName>,
    /// Free text.
    #[serde(default)]
    pub description: String,
}

impl Rule {
    /// Creates an empty rule for an email.
    #[must_use]
    pub fn new(email: Email) -> Self {
        Self {
            email,
            root_permissions: BTreeMap::new(),
            description: String::new(),
        }
    }

    /// Returns the level explicitly granted on a root, if any.
    #[must_use]
    pub fn level_for(&self, root_id: &str) -> Option<&LevelName> {
        self.root_permissions.get(root_id)
    }
}

/// Bookkeeping written alongside the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMetadata {
    /// When the configuration was last rewritten.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    /// Free-form version tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// The loaded authorization aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationConfig {
    /// Configured storage roots, in declaration order.
    pub roots: Vec<Root>,
    /// At most one rule per normalized email.
    pub rules: Vec<Rule>,
    /// Capability bundle of each level.
    pub permission_levels: BTreeMap<LevelName, Capabilities>,
    /// Level applied when no rule entry matches.
    pub default_permission_level: LevelName,
    /// File bookkeeping.
    pub metadata: ConfigMetadata,
}

impl AuthorizationConfig {
    /// The deny-by-default aggregate installed when the configuration file
    /// is missing or invalid.
    #[must_use]
    pub fn safe_default() -> Self {
        let main = RootId::from_static("main");
        let full = LevelName::from_static("full");

        let seed_rule = |email: &'static str| Rule {
            email: Email::from_static(email),
            root_permissions: BTreeMap::from([(main.clone(), full.clone())]),
            description: "seed administrator".to_string(),
        };

        Self {
            roots: vec![Root {
                id: main.clone(),
                name: "Main".to_string(),
                physical_path: PathBuf::from("./data"),
                description: Some("Local data directory".to_string()),
                is_default: true,
            }],
            rules: vec![
                seed_rule("admin@example.com"),
                seed_rule("owner@example.com"),
            ],
            permission_levels: default_levels(),
            default_permission_level: LevelName::denied(),
            metadata: ConfigMetadata::default(),
        }
    }

    /// Returns the root flagged as default, else the first declared root.
    #[must_use]
    pub fn default_root(&self) -> Option<&Root> {
        self.roots
            .iter()
            .find(|root| root.is_default)
            .or_else(|| self.roots.first())
    }

    /// Looks up a root by id.
    #[must_use]
    pub fn root_by_id(&self, id: &str) -> Option<&Root> {
        self.roots.iter().find(|root| root.id.as_str() == id)
    }

    /// Finds the rule for an email, comparing normalized addresses.
    #[must_use]
    pub fn find_rule(&self, email: &Email) -> Option<&Rule> {
        self.rules.iter().find(|rule| &rule.email == email)
    }

    /// Returns the capability bundle of a level, if defined.
    #[must_use]
    pub fn capabilities_of(&self, level: &str) -> Option<Capabilities> {
        self.permission_levels.get(level).copied()
    }

    /// Grants `level` on `root_id` to `email`, creating the rule if needed.
    pub(crate) fn set_root_permission(
        &mut self,
        email: &Email,
        root_id: &RootId,
        level: &LevelName,
        description: Option<String>,
    ) {
        let index = match self.rules.iter().position(|rule| &rule.email == email) {
            Some(index) => index,
            None => {
                self.rules.push(Rule::new(email.clone()));
                self.rules.len() - 1
            }
        };
        let rule = &mut self.rules[index];
        rule.root_permissions.insert(root_id.clone(), level.clone());
        if let Some(description) = description {
            rule.description = description;
        }
    }
}

/// Built-in level table used by the safe default.
///
/// `readonly` grants upload but not delete. Deployments that want a strict
/// read-only level must define it in their configuration file.
fn default_levels() -> BTreeMap<LevelName, Capabilities> {
    BTreeMap::from([
        (LevelName::from_static("full"), Capabilities::all()),
        (
            LevelName::from_static("readonly"),
            Capabilities {
                can_view: true,
                can_download: true,
                can_upload: true,
                can_delete: false,
            },
        ),
        (LevelName::denied(), Capabilities::none()),
    ])
}

/// The effective permissions of an email on one root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPermissions {
    /// The resolved level name.
    pub level: LevelName,
    /// The capability bundle of `level`.
    #[serde(flatten)]
    pub capabilities: Capabilities,
    /// The root the permissions apply to, if any root exists.
    pub root_id: Option<RootId>,
}

impl ResolvedPermissions {
    /// Permissions that grant nothing.
    #[must_use]
    pub fn denied(root_id: Option<RootId>) -> Self {
        Self {
            level: LevelName::denied(),
            capabilities: Capabilities::none(),
            root_id,
        }
    }

    /// Returns true if `action` is allowed.
    #[must_use]
    pub fn allows(&self, action: Action) -> bool {
        self.capabilities.allows(action)
    }
}

/// A root the caller may use, with the level they hold on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessibleRoot {
    /// The root.
    pub root: Root,
    /// The level explicitly granted on it.
    pub level: LevelName,
    /// The capability bundle of `level`.
    pub capabilities: Capabilities,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_parse_known_names() {
        for action in Action::ALL {
            assert_eq!(Action::parse(action.as_str()), Some(action));
        }
    }

    #[test]
    fn action_parse_unknown_name() {
        assert_eq!(Action::parse("teleport"), None);
        assert_eq!(Action::parse("VIEW"), None);
    }

    #[test]
    fn capabilities_allows_matches_bits() {
        let readonly = Capabilities {
            can_view: true,
            can_download: true,
            can_upload: true,
            can_delete: false,
        };
        assert!(readonly.allows(Action::View));
        assert!(readonly.allows(Action::Upload));
        assert!(!readonly.allows(Action::Delete));
        assert!(Action::ALL.iter().all(|a| !Capabilities::none().allows(*a)));
        assert!(Action::ALL.iter().all(|a| Capabilities::all().allows(*a)));
    }

    #[test]
    fn capabilities_serialization_format() {
        let json = serde_json::to_value(Capabilities::all()).expect("serialize");
        assert_eq!(json["canView"], true);
        assert_eq!(json["canDelete"], true);
    }

    #[test]
    fn safe_default_denies_by_default() {
        let config = AuthorizationConfig::safe_default();
        assert!(config.default_permission_level.is_denied());
        assert_eq!(config.roots.len(), 1);
        assert_eq!(config.rules.len(), 2);
        assert_eq!(
            config.default_root().map(|r| r.id.as_str()),
            Some("main")
        );
        assert_eq!(config.capabilities_of("full"), Some(Capabilities::all()));
    }

    #[test]
    fn safe_default_readonly_keeps_upload() {
        let config = AuthorizationConfig::safe_default();
        let readonly = config.capabilities_of("readonly").expect("readonly defined");
        assert!(readonly.can_upload);
        assert!(!readonly.can_delete);
    }

    #[test]
    fn default_root_falls_back_to_first() {
        let mut config = AuthorizationConfig::safe_default();
        let mut archive = config.roots[0].clone();
        archive.id = "archive".parse().expect("root id");
        config.roots[0].is_default = false;
        config.roots.push(archive);
        assert_eq!(
            config.default_root().map(|r| r.id.as_str()),
            Some("main")
        );

        config.roots[1].is_default = true;
        assert_eq!(
            config.default_root().map(|r| r.id.as_str()),
            Some("archive")
        );

        config.roots.clear();
        assert!(config.default_root().is_none());
    }

    #[test]
    fn set_root_permission_creates_and_updates_rule() {
        let mut config = AuthorizationConfig::safe_default();
        let email = Email::parse("New@Example.com").expect("email");
        let main: RootId = "main".parse().expect("root id");
        let readonly: LevelName = "readonly".parse().expect("level");
        let full: LevelName = "full".parse().expect("level");

        config.set_root_permission(&email, &main, &readonly, Some("contractor".to_string()));
        config.set_root_permission(&email, &main, &full, None);

        let rule = config.find_rule(&email).expect("rule created");
        assert_eq!(rule.level_for("main"), Some(&full));
        assert_eq!(rule.description, "contractor");
        assert_eq!(config.rules.len(), 3);
    }
}
