//! Request extractors for the caller's identity.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use axum_extra::extract::CookieJar;
use filegate_core::Email;
use filegate_platform_access::{AccessError, AccessRequest, Identity};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::warn;

/// Cookie remembering the last selected storage root.
pub const ROOT_COOKIE: &str = "filegate_root";

/// Everything the request says about who is calling.
///
/// Extraction never fails; the gate decides what is enough.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    identity: Option<Identity>,
    session_email: Option<String>,
    remembered_root: Option<String>,
}

impl Caller {
    /// Builds an access request for `root_id`, or for the remembered or
    /// default root when `None`.
    #[must_use]
    pub fn request<'a>(&'a self, root_id: Option<&'a str>) -> AccessRequest<'a> {
        AccessRequest::new(self.identity.as_ref())
            .with_session_email(self.session_email.as_deref())
            .with_root(root_id)
            .with_remembered_root(self.remembered_root.as_deref())
    }
}

fn header<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

impl<S> FromRequestParts<S> for Caller
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);
        let names = &app_state.config.identity;
        let headers = &parts.headers;

        let email = header(headers, &names.email_header);
        let user = header(headers, &names.user_header);

        // A provider identity object takes precedence; the plain email header
        // then only serves as the session-level fallback.
        let profile = header(headers, &names.profile_header).and_then(|raw| {
            serde_json::from_str::<serde_json::Value>(raw)
                .inspect_err(|e| warn!(error = %e, "ignoring malformed identity header"))
                .ok()
        });

        let (identity, session_email) = match (profile, email, user) {
            (Some(profile), email, _) => (Some(Identity::from_value(profile)), email),
            (None, Some(email), username) => (
                Some(Identity::Direct {
                    email: email.to_string(),
                    username: username.map(str::to_string),
                }),
                None,
            ),
            (None, None, Some(username)) => (Some(Identity::login(username)), None),
            (None, None, None) => (None, None),
        };

        let remembered_root = CookieJar::from_headers(headers)
            .get(ROOT_COOKIE)
            .map(|cookie| cookie.value().to_string());

        Ok(Self {
            identity,
            session_email: session_email.map(str::to_string),
            remembered_root,
        })
    }
}

/// Extractor for requiring an authenticated administrator.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub Email);

impl<S> FromRequestParts<S> for RequireAdmin
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);
        let Ok(caller) = Caller::from_request_parts(parts, state).await;

        let email = app_state
            .gate
            .authenticate(&caller.request(None))?
            .ok_or(AccessError::Unauthenticated)?;

        if !app_state.is_admin(&email) {
            warn!(%email, "administrative request refused");
            return Err(ApiError::AdminRequired);
        }
        Ok(Self(email))
    }
}
