//! The per-request access decision.

use crate::error::AccessError;
use crate::identity::{Identity, normalize_email};
use filegate_authz::{
    AccessibleRoot, Action, AuthorizationConfig, Capabilities, PermissionResolver,
    ResolvedPermissions, Root,
};
use filegate_core::{Email, LevelName};
use tracing::{debug, instrument, warn};

/// Level reported on grants issued while authentication is disabled.
const UNRESTRICTED: &str = "unrestricted";

/// Whether requests must carry a resolvable identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    /// Every request needs a normalized email and a matching rule.
    #[default]
    Required,
    /// Both gates are skipped and every request is granted full access.
    Disabled,
}

impl AuthMode {
    /// Maps the `no_auth_required` deployment switch onto a mode.
    #[must_use]
    pub fn from_no_auth_required(no_auth_required: bool) -> Self {
        if no_auth_required {
            Self::Disabled
        } else {
            Self::Required
        }
    }
}

/// What a route knows about the caller and the root it asked for.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessRequest<'a> {
    identity: Option<&'a Identity>,
    session_email: Option<&'a str>,
    root_id: Option<&'a str>,
    remembered_root_id: Option<&'a str>,
}

impl<'a> AccessRequest<'a> {
    /// Starts a request for the given identity.
    #[must_use]
    pub fn new(identity: Option<&'a Identity>) -> Self {
        Self {
            identity,
            ..Self::default()
        }
    }

    /// Sets the session-level fallback email.
    #[must_use]
    pub fn with_session_email(mut self, email: Option<&'a str>) -> Self {
        self.session_email = email;
        self
    }

    /// Sets the root named explicitly by the request.
    #[must_use]
    pub fn with_root(mut self, root_id: Option<&'a str>) -> Self {
        self.root_id = root_id;
        self
    }

    /// Sets the root remembered from an earlier request in the session.
    #[must_use]
    pub fn with_remembered_root(mut self, root_id: Option<&'a str>) -> Self {
        self.remembered_root_id = root_id;
        self
    }
}

/// A successful authorization, handed to the route that asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    email: Option<Email>,
    root: Root,
    permissions: ResolvedPermissions,
}

impl Grant {
    /// The caller email. `None` only when authentication is disabled and the
    /// request carried no identity.
    #[must_use]
    pub fn email(&self) -> Option<&Email> {
        self.email.as_ref()
    }

    /// The root the grant applies to.
    #[must_use]
    pub fn root(&self) -> &Root {
        &self.root
    }

    /// The full capability set on the root.
    #[must_use]
    pub fn permissions(&self) -> &ResolvedPermissions {
        &self.permissions
    }

    /// Checks an additional action against the same grant.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Forbidden`] if the capability bit is not set.
    pub fn require(&self, action: Action) -> Result<(), AccessError> {
        if self.permissions.allows(action) {
            Ok(())
        } else {
            Err(AccessError::Forbidden {
                email: self.email.clone(),
                action,
                root_id: Some(self.root.id.clone()),
            })
        }
    }
}

/// The single decision point every route passes before touching files.
#[derive(Debug, Clone)]
pub struct AccessGate {
    resolver: PermissionResolver,
    mode: AuthMode,
}

impl AccessGate {
    /// Creates a gate.
    #[must_use]
    pub fn new(resolver: PermissionResolver, mode: AuthMode) -> Self {
        Self { resolver, mode }
    }

    /// Returns the resolver the gate consults.
    #[must_use]
    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    /// Returns the authentication mode.
    #[must_use]
    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    /// Runs the authentication gate alone.
    ///
    /// With authentication disabled this never fails, but still reports the
    /// email when one is resolvable.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Unauthenticated`] if no email is resolvable
    /// and authentication is required.
    pub fn authenticate(&self, request: &AccessRequest<'_>) -> Result<Option<Email>, AccessError> {
        let email = normalize_email(request.identity, request.session_email);
        match (self.mode, email) {
            (_, Some(email)) => Ok(Some(email)),
            (AuthMode::Disabled, None) => Ok(None),
            (AuthMode::Required, None) => {
                debug!("request carries no resolvable identity");
                Err(AccessError::Unauthenticated)
            }
        }
    }

    /// Runs both gates for `action`.
    ///
    /// The root is the one named by the request; failing that, the
    /// remembered root if it still exists; failing that, the default root.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Unauthenticated`] if the authentication gate
    /// fails, [`AccessError::UnknownRoot`] if an explicitly named root does
    /// not exist, and [`AccessError::Forbidden`] if the capability is
    /// missing or no root is configured.
    #[instrument(skip(self, request), fields(root_id = request.root_id))]
    pub fn authorize(&self, request: &AccessRequest<'_>, action: Action) -> Result<Grant, AccessError> {
        let email = self.authenticate(request)?;
        let config = self.resolver.store().snapshot();

        let Some(root) = select_root(&config, request)? else {
            warn!(%action, "no storage root is configured");
            return Err(AccessError::Forbidden {
                email,
                action,
                root_id: None,
            });
        };

        let permissions = match (&email, self.mode) {
            (_, AuthMode::Disabled) => ResolvedPermissions {
                level: LevelName::from_static(UNRESTRICTED),
                capabilities: Capabilities::all(),
                root_id: Some(root.id.clone()),
            },
            (Some(email), AuthMode::Required) => config.permissions(email, Some(&root.id)),
            (None, AuthMode::Required) => return Err(AccessError::Unauthenticated),
        };

        let grant = Grant {
            email,
            root: root.clone(),
            permissions,
        };
        grant.require(action).inspect_err(|_| {
            debug!(
                email = ?grant.email,
                %action,
                level = %grant.permissions.level,
                "access denied"
            );
        })?;
        Ok(grant)
    }

    /// Returns the roots the caller may see.
    ///
    /// With authentication disabled every configured root is visible with
    /// full capabilities.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Unauthenticated`] if the authentication gate
    /// fails.
    pub fn visible_roots(&self, request: &AccessRequest<'_>) -> Result<Vec<AccessibleRoot>, AccessError> {
        let email = self.authenticate(request)?;
        match (self.mode, email) {
            (AuthMode::Disabled, _) => Ok(self
                .resolver
                .store()
                .list_roots()
                .into_iter()
                .map(|root| AccessibleRoot {
                    root,
                    level: LevelName::from_static(UNRESTRICTED),
                    capabilities: Capabilities::all(),
                })
                .collect()),
            (AuthMode::Required, Some(email)) => Ok(self.resolver.accessible_roots(&email)),
            (AuthMode::Required, None) => Err(AccessError::Unauthenticated),
        }
    }
}

fn select_root<'c>(
    config: &'c AuthorizationConfig,
    request: &AccessRequest<'_>,
) -> Result<Option<&'c Root>, AccessError> {
    if let Some(root_id) = request.root_id {
        return config
            .root_by_id(root_id)
            .map(Some)
            .ok_or_else(|| AccessError::UnknownRoot {
                root_id: root_id.to_string(),
            });
    }

    let remembered = request.remembered_root_id.and_then(|root_id| {
        let root = config.root_by_id(root_id);
        if root.is_none() {
            debug!(root_id, "remembered root no longer exists");
        }
        root
    });

    Ok(remembered.or_else(|| config.default_root()))
}
