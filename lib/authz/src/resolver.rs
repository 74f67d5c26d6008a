//! Resolution of (email, root) pairs into capability sets.

use crate::store::AuthorizationStore;
use crate::types::{AccessibleRoot, Action, AuthorizationConfig, Capabilities, ResolvedPermissions};
use filegate_core::{Email, LevelName, RootId};
use std::sync::Arc;
use tracing::debug;

impl AuthorizationConfig {
    /// Returns the level `email` holds on `root_id`.
    ///
    /// Falls back to the default level when the email has no rule, or its
    /// rule has no entry for this root. A grant on one root says nothing
    /// about any other root.
    #[must_use]
    pub fn permission_level(&self, email: &Email, root_id: &str) -> &LevelName {
        self.find_rule(email)
            .and_then(|rule| rule.level_for(root_id))
            .filter(|level| self.permission_levels.contains_key(level.as_str()))
            .unwrap_or(&self.default_permission_level)
    }

    /// Returns the permissions of `email` on `root_id`, or on the default
    /// root when `root_id` is `None`.
    ///
    /// With no root configured at all the result grants nothing.
    #[must_use]
    pub fn permissions(&self, email: &Email, root_id: Option<&RootId>) -> ResolvedPermissions {
        let root_id = match root_id {
            Some(root_id) => root_id.clone(),
            None => match self.default_root() {
                Some(root) => root.id.clone(),
                None => return ResolvedPermissions::denied(None),
            },
        };

        let level = self.permission_level(email, root_id.as_str()).clone();
        let capabilities = self
            .capabilities_of(level.as_str())
            .unwrap_or(Capabilities::none());

        ResolvedPermissions {
            level,
            capabilities,
            root_id: Some(root_id),
        }
    }

    /// Returns true if `email` may perform the named action. Unknown action
    /// names are refused.
    #[must_use]
    pub fn can_perform(&self, email: &Email, action: &str, root_id: Option<&RootId>) -> bool {
        let Some(action) = Action::parse(action) else {
            debug!(action, "refusing unknown action");
            return false;
        };
        self.permissions(email, root_id).allows(action)
    }

    /// Returns the roots on which the rule for `email` explicitly grants a
    /// level other than `denied`, whatever capabilities that level carries.
    ///
    /// An email without a rule has no accessible roots.
    #[must_use]
    pub fn accessible_roots(&self, email: &Email) -> Vec<AccessibleRoot> {
        let Some(rule) = self.find_rule(email) else {
            return Vec::new();
        };

        self.roots
            .iter()
            .filter_map(|root| {
                let level = rule.level_for(root.id.as_str())?;
                if level.is_denied() {
                    return None;
                }
                let capabilities = self.capabilities_of(level.as_str())?;
                Some(AccessibleRoot {
                    root: root.clone(),
                    level: level.clone(),
                    capabilities,
                })
            })
            .collect()
    }
}

/// Answers permission questions against the store's current aggregate.
///
/// Every call takes a fresh snapshot, so a reload is observed by the next
/// call and never half-way through one.
#[derive(Debug, Clone)]
pub struct PermissionResolver {
    store: Arc<AuthorizationStore>,
}

impl PermissionResolver {
    /// Creates a resolver over a store.
    #[must_use]
    pub fn new(store: Arc<AuthorizationStore>) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<AuthorizationStore> {
        &self.store
    }

    /// See [`AuthorizationConfig::permission_level`].
    #[must_use]
    pub fn permission_level(&self, email: &Email, root_id: &RootId) -> LevelName {
        self.store
            .snapshot()
            .permission_level(email, root_id.as_str())
            .clone()
    }

    /// See [`AuthorizationConfig::permissions`].
    #[must_use]
    pub fn permissions(&self, email: &Email, root_id: Option<&RootId>) -> ResolvedPermissions {
        self.store.snapshot().permissions(email, root_id)
    }

    /// See [`AuthorizationConfig::can_perform`].
    #[must_use]
    pub fn can_perform(&self, email: &Email, action: &str, root_id: Option<&RootId>) -> bool {
        self.store.snapshot().can_perform(email, action, root_id)
    }

    /// Returns true if `email` may view `root_id` (or the default root).
    #[must_use]
    pub fn can_access(&self, email: &Email, root_id: Option<&RootId>) -> bool {
        self.can_perform(email, Action::View.as_str(), root_id)
    }

    /// See [`AuthorizationConfig::accessible_roots`].
    #[must_use]
    pub fn accessible_roots(&self, email: &Email) -> Vec<AccessibleRoot> {
        self.store.snapshot().accessible_roots(email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Root, Rule};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn root(id: &str, is_default: bool) -> Root {
        Root {
            id: id.parse().expect("root id"),
            name: id.to_string(),
            physical_path: PathBuf::from(format!("./{id}")),
            description: None,
            is_default,
        }
    }

    fn rule(email: &str, grants: &[(&str, &str)]) -> Rule {
        Rule {
            email: Email::parse(email).expect("email"),
            root_permissions: grants
                .iter()
                .map(|(root, level)| {
                    (
                        root.parse().expect("root id"),
                        level.parse().expect("level"),
                    )
                })
                .collect(),
            description: String::new(),
        }
    }

    fn email(raw: &str) -> Email {
        Email::parse(raw).expect("email")
    }

    fn root_id(raw: &str) -> RootId {
        raw.parse().expect("root id")
    }

    /// Roots `main` (default) and `archive`; levels from the safe default.
    fn config_with(rules: Vec<Rule>) -> AuthorizationConfig {
        AuthorizationConfig {
            roots: vec![root("main", true), root("archive", false)],
            rules,
            ..AuthorizationConfig::safe_default()
        }
    }

    fn resolver_with(rules: Vec<Rule>) -> PermissionResolver {
        let store = AuthorizationStore::with_config("unused.json", config_with(rules));
        PermissionResolver::new(Arc::new(store))
    }

    #[test]
    fn full_grant_on_default_root() {
        let resolver = resolver_with(vec![rule("admin@example.com", &[("main", "full")])]);

        let permissions = resolver.permissions(&email("admin@example.com"), None);

        assert_eq!(permissions.level.as_str(), "full");
        assert_eq!(permissions.capabilities, Capabilities::all());
        assert_eq!(permissions.root_id, Some(root_id("main")));
    }

    #[test]
    fn stranger_has_no_access() {
        let resolver = resolver_with(vec![rule("admin@example.com", &[("main", "full")])]);
        let stranger = email("stranger@example.com");

        assert!(!resolver.can_access(&stranger, None));
        assert!(resolver.accessible_roots(&stranger).is_empty());
    }

    #[test]
    fn grant_on_one_root_does_not_leak_to_another() {
        let resolver = resolver_with(vec![rule("reader@example.com", &[("main", "readonly")])]);
        let reader = email("reader@example.com");

        let archive = resolver.permissions(&reader, Some(&root_id("archive")));

        assert!(archive.level.is_denied());
        assert_eq!(archive.capabilities, Capabilities::none());
        assert_eq!(
            resolver.permission_level(&reader, &root_id("main")).as_str(),
            "readonly"
        );
    }

    #[test]
    fn unknown_action_is_refused() {
        let resolver = resolver_with(vec![rule("admin@example.com", &[("main", "full")])]);
        let admin = email("admin@example.com");

        assert!(!resolver.can_perform(&admin, "teleport", Some(&root_id("main"))));
        assert!(resolver.can_perform(&admin, "delete", Some(&root_id("main"))));
    }

    #[test]
    fn no_rule_resolves_to_default_level() {
        let config = config_with(Vec::new());
        let nobody = email("nobody@example.com");

        for root in ["main", "archive", "not-configured"] {
            assert_eq!(
                config.permission_level(&nobody, root),
                &config.default_permission_level
            );
        }
    }

    #[test]
    fn email_matching_ignores_case() {
        let config = config_with(vec![rule("User@Example.com", &[("main", "full")])]);

        assert_eq!(
            config.permission_level(&email("User@Example.com"), "main"),
            config.permission_level(&email("user@example.com"), "main"),
        );
        assert_eq!(
            config
                .permission_level(&email("USER@EXAMPLE.COM"), "main")
                .as_str(),
            "full"
        );
    }

    #[test]
    fn resolved_level_is_defined_and_bits_match() {
        let config = config_with(vec![
            rule("a@example.com", &[("main", "full"), ("archive", "readonly")]),
            rule("b@example.com", &[("archive", "denied")]),
        ]);

        for address in ["a@example.com", "b@example.com", "c@example.com"] {
            for root in ["main", "archive"] {
                let permissions = config.permissions(&email(address), Some(&root_id(root)));
                let expected = config
                    .permission_levels
                    .get(permissions.level.as_str())
                    .copied()
                    .expect("level is defined");
                assert_eq!(permissions.capabilities, expected);
            }
        }
    }

    #[test]
    fn accessible_roots_skip_denied_and_annotate_level() {
        let config = config_with(vec![rule(
            "a@example.com",
            &[("main", "denied"), ("archive", "readonly")],
        )]);

        let roots = config.accessible_roots(&email("a@example.com"));

        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].root.id.as_str(), "archive");
        assert_eq!(roots[0].level.as_str(), "readonly");
        assert!(roots.iter().all(|r| !r.level.is_denied()));
    }

    #[test]
    fn accessible_roots_keep_levels_without_view() {
        let mut config = config_with(vec![rule("drop@example.com", &[("archive", "dropbox")])]);
        config.permission_levels.insert(
            "dropbox".parse().expect("level"),
            Capabilities {
                can_upload: true,
                ..Capabilities::none()
            },
        );

        let roots = config.accessible_roots(&email("drop@example.com"));

        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].level.as_str(), "dropbox");
        assert!(!roots[0].capabilities.can_view);
        assert!(roots[0].capabilities.can_upload);
    }

    #[test]
    fn no_roots_means_denied_without_panic() {
        let config = AuthorizationConfig {
            roots: Vec::new(),
            ..config_with(vec![rule("admin@example.com", &[("main", "full")])])
        };

        let permissions = config.permissions(&email("admin@example.com"), None);

        assert_eq!(permissions.capabilities, Capabilities::none());
        assert_eq!(permissions.root_id, None);
        assert!(!config.can_perform(&email("admin@example.com"), "view", None));
    }

    #[test]
    fn undefined_level_in_rule_falls_back_to_default() {
        let mut levels = BTreeMap::new();
        levels.insert(LevelName::denied(), Capabilities::none());
        let config = AuthorizationConfig {
            permission_levels: levels,
            ..config_with(vec![rule("a@example.com", &[("main", "full")])])
        };

        assert!(
            config
                .permission_level(&email("a@example.com"), "main")
                .is_denied()
        );
    }

    #[test]
    fn resolver_observes_store_mutations() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = Arc::new(AuthorizationStore::with_config(
            dir.path().join("authorization.json"),
            config_with(Vec::new()),
        ));
        let resolver = PermissionResolver::new(Arc::clone(&store));
        let guest = email("guest@example.com");

        assert!(!resolver.can_access(&guest, None));
        store
            .upsert_root_permission(&guest, &root_id("main"), &"readonly".parse().expect("level"), None)
            .expect("upsert");
        assert!(resolver.can_access(&guest, None));
        assert!(!resolver.can_perform(&guest, "delete", None));
    }
}
