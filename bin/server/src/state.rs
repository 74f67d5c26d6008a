//! Shared application state.

use crate::config::ServerConfig;
use crate::error::ApiError;
use filegate_authz::{AuthorizationStore, PermissionResolver};
use filegate_core::Email;
use filegate_platform_access::{AccessGate, AuthMode};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::warn;

/// State handed to every route handler.
#[derive(Debug)]
pub struct AppState {
    /// The authorization store, shared with the gate's resolver.
    pub store: Arc<AuthorizationStore>,
    /// The access gate.
    pub gate: AccessGate,
    /// Server configuration.
    pub config: ServerConfig,
    admins: BTreeSet<Email>,
}

impl AppState {
    /// Creates the state, loading the authorization configuration from the
    /// configured path.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let store = Arc::new(AuthorizationStore::new(&config.authorization_config_path));
        store.load();
        Self::with_store(config, store)
    }

    /// Creates the state around an existing store.
    #[must_use]
    pub fn with_store(config: ServerConfig, store: Arc<AuthorizationStore>) -> Self {
        let admins = config
            .admin_emails
            .iter()
            .filter_map(|raw| {
                let email = Email::parse(raw);
                if email.is_none() {
                    warn!(raw = %raw, "ignoring blank admin email");
                }
                email
            })
            .collect();
        let gate = AccessGate::new(
            PermissionResolver::new(Arc::clone(&store)),
            AuthMode::from_no_auth_required(config.no_auth_required),
        );
        Self {
            store,
            gate,
            config,
            admins,
        }
    }

    /// Runs `work` against the store on the blocking thread pool.
    pub async fn with_store_blocking<T, F>(&self, work: F) -> Result<T, ApiError>
    where
        F: FnOnce(&AuthorizationStore) -> T + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || work(&store))
            .await
            .map_err(|e| ApiError::Internal {
                details: e.to_string(),
            })
    }

    /// Returns true if `email` may use the administrative endpoints.
    #[must_use]
    pub fn is_admin(&self, email: &Email) -> bool {
        self.admins.contains(email)
    }
}
