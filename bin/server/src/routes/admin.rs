//! Administrative routes for the authorization rules.

use crate::auth::RequireAdmin;
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use filegate_authz::{Persistence, Rule};
use filegate_core::{Email, LevelName, RootId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Body of a grant request.
#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    /// Level name to grant.
    pub level: String,
    /// Replaces the rule description when present.
    #[serde(default)]
    pub description: Option<String>,
}

/// Outcome of a rule mutation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Mutation {
    persisted: bool,
}

impl From<Persistence> for Mutation {
    fn from(persistence: Persistence) -> Self {
        Self {
            persisted: persistence.is_written(),
        }
    }
}

/// Summary returned after a reload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reloaded {
    roots: usize,
    rules: usize,
}

fn parse_email(raw: &str) -> Result<Email, ApiError> {
    Email::parse(raw).ok_or_else(|| ApiError::BadRequest {
        details: "email must not be blank".to_string(),
    })
}

/// `GET /api/admin/rules`
pub async fn list_rules(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
) -> Json<Vec<Rule>> {
    Json(state.store.all_rules())
}

/// `PUT /api/admin/rules/{email}/roots/{root_id}`: grants a level on one
/// root, creating the rule if needed.
pub async fn grant(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Path((email, root_id)): Path<(String, String)>,
    Json(body): Json<GrantRequest>,
) -> Result<Json<Mutation>, ApiError> {
    let email = parse_email(&email)?;
    let bad_request = |details: String| ApiError::BadRequest { details };
    let root_id = RootId::new(root_id).map_err(|e| bad_request(e.to_string()))?;
    let level = LevelName::new(body.level).map_err(|e| bad_request(e.to_string()))?;

    let persistence = state
        .with_store_blocking({
            let (email, root_id, level) = (email.clone(), root_id.clone(), level.clone());
            move |store| store.upsert_root_permission(&email, &root_id, &level, body.description)
        })
        .await??;

    info!(%admin, %email, %root_id, %level, "permission granted");
    Ok(Json(persistence.into()))
}

/// `DELETE /api/admin/rules/{email}/roots/{root_id}`: removes one root
/// entry from a rule.
pub async fn revoke(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Path((email, root_id)): Path<(String, String)>,
) -> Result<Json<Mutation>, ApiError> {
    let email = parse_email(&email)?;
    let root_id = RootId::new(root_id).map_err(|e| ApiError::BadRequest {
        details: e.to_string(),
    })?;

    let persistence = state
        .with_store_blocking({
            let (email, root_id) = (email.clone(), root_id.clone());
            move |store| store.remove_root_permission(&email, &root_id)
        })
        .await?
        .ok_or_else(|| ApiError::NotFound {
            what: format!("permission of {email} on '{root_id}'"),
        })?;

    info!(%admin, %email, %root_id, "permission revoked");
    Ok(Json(persistence.into()))
}

/// `DELETE /api/admin/rules/{email}`: removes a whole rule.
pub async fn remove_rule(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Path(email): Path<String>,
) -> Result<Json<Mutation>, ApiError> {
    let email = parse_email(&email)?;

    let persistence = state
        .with_store_blocking({
            let email = email.clone();
            move |store| store.remove_rule(&email)
        })
        .await?
        .ok_or_else(|| ApiError::NotFound {
            what: format!("rule for {email}"),
        })?;

    info!(%admin, %email, "rule removed");
    Ok(Json(persistence.into()))
}

/// `POST /api/admin/reload`: re-reads the configuration file.
pub async fn reload(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<Reloaded>, ApiError> {
    let config = state
        .with_store_blocking(|store| store.reload().ok())
        .await?
        .ok_or(ApiError::ReloadFailed)?;
    info!(%admin, "authorization config reloaded");
    Ok(Json(Reloaded {
        roots: config.roots.len(),
        rules: config.rules.len(),
    }))
}
