//! HTTP routes.
//!
//! Each file route names the action it needs and passes the gate before
//! resolving any path:
//! - listing needs `view`, download needs `download`
//! - upload and directory creation need `upload`
//! - deletion needs `delete`, rename needs both `upload` and `delete`

pub mod admin;
pub mod files;
pub mod session;

use crate::state::AppState;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/api/me", get(session::me))
        .route("/api/roots", get(session::roots))
        .route("/api/session/root", post(session::select_root))
        .route(
            "/api/files",
            get(files::list).put(files::upload).delete(files::remove),
        )
        .route("/api/download", get(files::download))
        .route("/api/mkdir", post(files::mkdir))
        .route("/api/rename", post(files::rename))
        .route("/api/admin/rules", get(admin::list_rules))
        .route("/api/admin/rules/{email}", delete(admin::remove_rule))
        .route(
            "/api/admin/rules/{email}/roots/{root_id}",
            put(admin::grant).delete(admin::revoke),
        )
        .route("/api/admin/reload", post(admin::reload))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
