//! Caller and root selection routes.

use crate::auth::{Caller, ROOT_COOKIE};
use crate::error::ApiError;
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use filegate_authz::{Action, Capabilities, ResolvedPermissions, Root};
use filegate_core::{Email, LevelName, RootId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::Duration as TimeDuration;

/// Public view of a storage root. The physical path is never exposed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootSummary {
    id: RootId,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    is_default: bool,
}

impl From<&Root> for RootSummary {
    fn from(root: &Root) -> Self {
        Self {
            id: root.id.clone(),
            name: root.name.clone(),
            description: root.description.clone(),
            is_default: root.is_default,
        }
    }
}

/// Response of `GET /api/me`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Me {
    email: Option<Email>,
    is_admin: bool,
    auth_required: bool,
    root: Option<RootSummary>,
    permissions: Option<ResolvedPermissions>,
}

/// One entry of `GET /api/roots`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootListing {
    #[serde(flatten)]
    root: RootSummary,
    level: LevelName,
    #[serde(flatten)]
    capabilities: Capabilities,
}

/// Response of `GET /api/roots`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Roots {
    roots: Vec<RootListing>,
    default_root_id: Option<RootId>,
}

/// Body of `POST /api/session/root`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectRoot {
    /// The root to remember.
    pub root_id: String,
}

/// `GET /api/me`: who the caller is and what they hold on the current root.
pub async fn me(State(state): State<Arc<AppState>>, caller: Caller) -> Result<Json<Me>, ApiError> {
    let request = caller.request(None);
    let email = state.gate.authenticate(&request)?;
    let current = state.gate.authorize(&request, Action::View).ok();

    Ok(Json(Me {
        is_admin: email.as_ref().is_some_and(|email| state.is_admin(email)),
        email,
        auth_required: !state.config.no_auth_required,
        root: current.as_ref().map(|grant| RootSummary::from(grant.root())),
        permissions: current.map(|grant| grant.permissions().clone()),
    }))
}

/// `GET /api/roots`: the roots the caller may use.
pub async fn roots(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Roots>, ApiError> {
    let visible = state.gate.visible_roots(&caller.request(None))?;

    let default_root_id = state
        .store
        .default_root()
        .map(|root| root.id)
        .filter(|id| visible.iter().any(|entry| &entry.root.id == id))
        .or_else(|| visible.first().map(|entry| entry.root.id.clone()));

    let roots = visible
        .iter()
        .map(|entry| RootListing {
            root: RootSummary::from(&entry.root),
            level: entry.level.clone(),
            capabilities: entry.capabilities,
        })
        .collect();

    Ok(Json(Roots {
        roots,
        default_root_id,
    }))
}

/// `POST /api/session/root`: remembers the selected root in a cookie.
pub async fn select_root(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    jar: CookieJar,
    Json(body): Json<SelectRoot>,
) -> Result<(CookieJar, StatusCode), ApiError> {
    let grant = state
        .gate
        .authorize(&caller.request(Some(&body.root_id)), Action::View)?;

    let cookie = Cookie::build((ROOT_COOKIE, grant.root().id.to_string()))
        .path("/")
        .http_only(true)
        .secure(state.config.session.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::hours(
            state.config.session.root_cookie_max_age_hours,
        ));

    Ok((jar.add(cookie), StatusCode::NO_CONTENT))
}
