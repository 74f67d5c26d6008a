//! Owned, persisted authorization configuration.

use crate::error::{AuthzError, ConfigError, PersistError};
use crate::file::{ConfigFile, load_config};
use crate::types::{AuthorizationConfig, Root, Rule};
use chrono::Utc;
use filegate_core::{Email, LevelName, RootId};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, instrument, warn};

/// Whether a mutation reached the configuration file.
///
/// A failed write does not roll back the in-memory change: callers already
/// observe the new state, and the failure is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    /// The whole file was rewritten.
    Written,
    /// The file rewrite failed; only the in-memory aggregate changed.
    InMemoryOnly,
}

impl Persistence {
    /// Returns true if the file was rewritten.
    #[must_use]
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written)
    }
}

/// Holds the authorization aggregate and its backing file.
///
/// The aggregate is loaded lazily on first access. Readers receive an
/// `Arc` snapshot, so a reload or mutation replaces the whole aggregate at
/// once and never exposes a partially applied change.
#[derive(Debug)]
pub struct AuthorizationStore {
    path: PathBuf,
    state: RwLock<Option<Arc<AuthorizationConfig>>>,
}

impl AuthorizationStore {
    /// Creates a store backed by the file at `path`. Nothing is read until
    /// the first access.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: RwLock::new(None),
        }
    }

    /// Creates a store with an already loaded aggregate.
    #[must_use]
    pub fn with_config(path: impl Into<PathBuf>, config: AuthorizationConfig) -> Self {
        Self {
            path: path.into(),
            state: RwLock::new(Some(Arc::new(config))),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the backing file and installs the result.
    ///
    /// A missing, unreadable or invalid file installs the deny-by-default
    /// aggregate instead; this never fails.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Arc<AuthorizationConfig> {
        let config = Arc::new(self.read_effective());
        *self.write_state() = Some(Arc::clone(&config));
        config
    }

    /// Re-reads the backing file on request.
    ///
    /// Unlike [`load`](Self::load), a bad file leaves the current aggregate
    /// in place and the error is returned to the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn reload(&self) -> filegate_core::Result<Arc<AuthorizationConfig>, ConfigError> {
        let config = match load_config(&self.path) {
            Ok(config) => Arc::new(config),
            Err(report) => {
                warn!(error = %report, "reload rejected, keeping current authorization config");
                return Err(report);
            }
        };
        info!(
            roots = config.roots.len(),
            rules = config.rules.len(),
            "reloaded authorization config"
        );
        *self.write_state() = Some(Arc::clone(&config));
        Ok(config)
    }

    /// Returns the current aggregate, loading it on first use.
    #[must_use]
    pub fn snapshot(&self) -> Arc<AuthorizationConfig> {
        if let Some(config) = self.read_state().as_ref() {
            return Arc::clone(config);
        }

        let mut state = self.write_state();
        Arc::clone(state.get_or_insert_with(|| Arc::new(self.read_effective())))
    }

    /// Returns every configured root.
    #[must_use]
    pub fn list_roots(&self) -> Vec<Root> {
        self.snapshot().roots.clone()
    }

    /// Returns the root flagged as default, else the first declared root.
    #[must_use]
    pub fn default_root(&self) -> Option<Root> {
        self.snapshot().default_root().cloned()
    }

    /// Looks up a root by id.
    #[must_use]
    pub fn root_by_id(&self, id: &str) -> Option<Root> {
        self.snapshot().root_by_id(id).cloned()
    }

    /// Finds the rule for an email, ignoring case.
    #[must_use]
    pub fn find_rule(&self, email: &Email) -> Option<Rule> {
        self.snapshot().find_rule(email).cloned()
    }

    /// Returns every rule.
    #[must_use]
    pub fn all_rules(&self) -> Vec<Rule> {
        self.snapshot().rules.clone()
    }

    /// Grants `level` on `root_id` to `email`, creating the rule if absent,
    /// then rewrites the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error, without mutating anything, if the root or level is
    /// not configured.
    #[instrument(skip(self, description), fields(email = %email, root_id = %root_id, level = %level))]
    pub fn upsert_root_permission(
        &self,
        email: &Email,
        root_id: &RootId,
        level: &LevelName,
        description: Option<String>,
    ) -> Result<Persistence, AuthzError> {
        self.mutate(|config| {
            if config.root_by_id(root_id.as_str()).is_none() {
                return Err(AuthzError::UnknownRoot {
                    root_id: root_id.to_string(),
                });
            }
            if config.capabilities_of(level.as_str()).is_none() {
                return Err(AuthzError::UnknownLevel {
                    level: level.to_string(),
                });
            }
            config.set_root_permission(email, root_id, level, description);
            Ok(true)
        })
        .map(|outcome| outcome.unwrap_or(Persistence::Written))
    }

    /// Deletes the rule for `email`.
    ///
    /// Returns `None` when no rule existed; the file is only rewritten when
    /// a rule was removed.
    #[instrument(skip(self), fields(email = %email))]
    pub fn remove_rule(&self, email: &Email) -> Option<Persistence> {
        let Ok(outcome) = self.mutate::<Infallible>(|config| {
            let before = config.rules.len();
            config.rules.retain(|rule| &rule.email != email);
            Ok(config.rules.len() != before)
        });
        outcome
    }

    /// Deletes the entry for one root from the rule for `email`, removing
    /// the rule once it has no entries left.
    ///
    /// Returns `None` when there was no such entry.
    #[instrument(skip(self), fields(email = %email, root_id = %root_id))]
    pub fn remove_root_permission(&self, email: &Email, root_id: &RootId) -> Option<Persistence> {
        let Ok(outcome) = self.mutate::<Infallible>(|config| {
            let Some(index) = config.rules.iter().position(|rule| &rule.email == email) else {
                return Ok(false);
            };
            if config.rules[index]
                .root_permissions
                .remove(root_id.as_str())
                .is_none()
            {
                return Ok(false);
            }
            if config.rules[index].root_permissions.is_empty() {
                config.rules.remove(index);
            }
            Ok(true)
        });
        outcome
    }

    /// Applies `change` to a copy of the aggregate. When it reports a change
    /// the copy is stamped, installed and persisted.
    fn mutate<E>(
        &self,
        change: impl FnOnce(&mut AuthorizationConfig) -> Result<bool, E>,
    ) -> Result<Option<Persistence>, E> {
        let mut state = self.write_state();
        let current = state.get_or_insert_with(|| Arc::new(self.read_effective()));

        let mut next = (**current).clone();
        if !change(&mut next)? {
            debug!("mutation left the configuration unchanged");
            return Ok(None);
        }
        next.metadata.last_updated = Some(Utc::now());

        let persistence = match persist(&self.path, &next) {
            Ok(()) => {
                info!("authorization config written");
                Persistence::Written
            }
            Err(report) => {
                warn!(error = %report, "authorization config change kept in memory only");
                Persistence::InMemoryOnly
            }
        };
        *state = Some(Arc::new(next));
        Ok(Some(persistence))
    }

    fn read_effective(&self) -> AuthorizationConfig {
        match load_config(&self.path) {
            Ok(config) => {
                info!(
                    roots = config.roots.len(),
                    rules = config.rules.len(),
                    "loaded authorization config"
                );
                config
            }
            Err(report) => {
                warn!(error = %report, "using deny-by-default authorization config");
                AuthorizationConfig::safe_default()
            }
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, Option<Arc<AuthorizationConfig>>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, Option<Arc<AuthorizationConfig>>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Rewrites the whole configuration file through a sibling temp file.
fn persist(path: &Path, config: &AuthorizationConfig) -> filegate_core::Result<(), PersistError> {
    let json = serde_json::to_string_pretty(&ConfigFile::from(config)).map_err(|e| {
        PersistError::Serialize {
            details: e.to_string(),
        }
    })?;

    let write_err = |e: std::io::Error| PersistError::Write {
        path: path.to_path_buf(),
        details: e.to_string(),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);
    std::fs::write(&staging, json).map_err(write_err)?;
    std::fs::rename(&staging, path).map_err(write_err)?;
    Ok(())
}
