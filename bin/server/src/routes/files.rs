//! File routes.

use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    Json,
    body::{Body, Bytes},
    extract::{Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use filegate_authz::{Action, ResolvedPermissions};
use filegate_fs::{self as fs, EntryInfo, FsError};
use filegate_platform_access::Grant;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::info;

/// Root and path of a file request.
#[derive(Debug, Deserialize)]
pub struct FileQuery {
    /// Storage root id; the remembered or default root when absent.
    pub root: Option<String>,
    /// Path relative to the root; the root itself when absent.
    #[serde(default)]
    pub path: String,
}

/// A directory listing with the caller's permissions on its root.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    root_id: String,
    path: String,
    entries: Vec<EntryInfo>,
    permissions: ResolvedPermissions,
}

/// Outcome of an upload or directory creation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Created {
    root_id: String,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes: Option<u64>,
}

/// Body of a rename request.
#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    /// Storage root id.
    pub root: Option<String>,
    /// Current path.
    pub from: String,
    /// New path.
    pub to: String,
}

async fn confine(grant: &Grant, path: &str) -> Result<fs::ConfinedPath, ApiError> {
    Ok(fs::resolve_async(&grant.root().physical_path, path).await?)
}

/// `GET /api/files`: lists a directory.
pub async fn list(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(query): Query<FileQuery>,
) -> Result<Json<Listing>, ApiError> {
    let grant = state
        .gate
        .authorize(&caller.request(query.root.as_deref()), Action::View)?;
    let dir = confine(&grant, &query.path).await?;
    let entries = fs::list_dir(&dir).await?;

    Ok(Json(Listing {
        root_id: grant.root().id.to_string(),
        path: dir.relative().to_string(),
        entries,
        permissions: grant.permissions().clone(),
    }))
}

/// `GET /api/download`: streams a file as an attachment.
pub async fn download(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(query): Query<FileQuery>,
    request: Request,
) -> Result<Response, ApiError> {
    let grant = state
        .gate
        .authorize(&caller.request(query.root.as_deref()), Action::Download)?;
    let target = confine(&grant, &query.path).await?;

    let entry = fs::describe(&target).await?;
    if entry.is_dir {
        return Err(FsError::WrongKind {
            path: entry.path,
            expected: "file",
        }
        .into());
    }

    let Ok(response) = ServeFile::new(target.as_path()).oneshot(request).await;
    let mut response = response.map(Body::new);
    if let Ok(disposition) = HeaderValue::from_str(&attachment(&entry.name)) {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, disposition);
    }
    info!(root_id = %grant.root().id, path = target.relative(), "download started");
    Ok(response)
}

/// Builds a `Content-Disposition` value, replacing characters that cannot
/// appear in a quoted header parameter.
fn attachment(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}

/// `PUT /api/files`: stores the request body at the path.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(query): Query<FileQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let grant = state
        .gate
        .authorize(&caller.request(query.root.as_deref()), Action::Upload)?;
    let target = confine(&grant, &query.path).await?;
    let bytes = fs::write_file(&target, &body).await?;

    Ok((
        StatusCode::CREATED,
        Json(Created {
            root_id: grant.root().id.to_string(),
            path: target.relative().to_string(),
            bytes: Some(bytes),
        }),
    ))
}

/// `POST /api/mkdir`: creates a directory.
pub async fn mkdir(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(query): Query<FileQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let grant = state
        .gate
        .authorize(&caller.request(query.root.as_deref()), Action::Upload)?;
    let target = confine(&grant, &query.path).await?;
    fs::create_dir(&target).await?;

    Ok((
        StatusCode::CREATED,
        Json(Created {
            root_id: grant.root().id.to_string(),
            path: target.relative().to_string(),
            bytes: None,
        }),
    ))
}

/// `DELETE /api/files`: removes a file or directory tree.
pub async fn remove(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(query): Query<FileQuery>,
) -> Result<StatusCode, ApiError> {
    let grant = state
        .gate
        .authorize(&caller.request(query.root.as_deref()), Action::Delete)?;
    let target = confine(&grant, &query.path).await?;
    fs::remove(&target).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/rename`: moves an entry within one root.
pub async fn rename(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(body): Json<RenameRequest>,
) -> Result<StatusCode, ApiError> {
    let grant = state
        .gate
        .authorize(&caller.request(body.root.as_deref()), Action::Upload)?;
    grant.require(Action::Delete)?;

    let from = confine(&grant, &body.from).await?;
    let to = confine(&grant, &body.to).await?;
    fs::rename(&from, &to).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestApp, request};
    use axum::http::Method;

    #[tokio::test]
    async fn listing_includes_permissions() {
        let app = TestApp::new();

        let (status, json) = app
            .send(request(Method::GET, "/api/files", Some("reader@example.com")))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["rootId"], "main");
        assert_eq!(json["permissions"]["level"], "readonly");
        assert_eq!(json["permissions"]["canDelete"], false);
        let names: Vec<_> = json["entries"]
            .as_array()
            .expect("entries")
            .iter()
            .map(|e| e["name"].as_str().expect("name").to_string())
            .collect();
        assert_eq!(names, ["docs", "hello.txt"]);
    }

    #[tokio::test]
    async fn anonymous_listing_is_unauthorized() {
        let app = TestApp::new();
        let (status, _) = app.send(request(Method::GET, "/api/files", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn stranger_is_forbidden() {
        let app = TestApp::new();
        let (status, json) = app
            .send(request(Method::GET, "/api/files", Some("stranger@example.com")))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(
            json["error"]
                .as_str()
                .expect("message")
                .contains("stranger@example.com")
        );
    }

    #[tokio::test]
    async fn traversal_is_a_bad_request() {
        let app = TestApp::new();
        for path in ["../../etc/passwd", "..%5C..%5Csecrets"] {
            let uri = format!("/api/files?path={path}");
            let (status, _) = app
                .send(request(Method::GET, &uri, Some("admin@example.com")))
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
        }
    }

    #[tokio::test]
    async fn unknown_root_is_forbidden() {
        let app = TestApp::new();
        let (status, _) = app
            .send(request(
                Method::GET,
                "/api/files?root=vault",
                Some("admin@example.com"),
            ))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn download_streams_file_as_attachment() {
        let app = TestApp::new();

        let response = app
            .raw(request(
                Method::GET,
                "/api/download?path=hello.txt",
                Some("reader@example.com"),
            ))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"hello.txt\""
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert_eq!(&bytes[..], b"hello world");
    }

    #[tokio::test]
    async fn download_of_directory_is_rejected() {
        let app = TestApp::new();
        let (status, _) = app
            .send(request(
                Method::GET,
                "/api/download?path=docs",
                Some("admin@example.com"),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upload_then_reader_cannot_delete() {
        let app = TestApp::new();

        let upload = request(
            Method::PUT,
            "/api/files?path=incoming/new.txt",
            Some("reader@example.com"),
        );
        let (status, json) = app.send(upload.body_bytes("fresh")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["bytes"], 5);
        assert_eq!(
            std::fs::read_to_string(app.main_dir().join("incoming/new.txt")).expect("read"),
            "fresh"
        );

        let (status, _) = app
            .send(request(
                Method::DELETE,
                "/api/files?path=incoming/new.txt",
                Some("reader@example.com"),
            ))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(app.main_dir().join("incoming/new.txt").exists());
    }

    #[tokio::test]
    async fn admin_can_mkdir_and_delete() {
        let app = TestApp::new();

        let (status, _) = app
            .send(request(
                Method::POST,
                "/api/mkdir?path=projects/2024",
                Some("admin@example.com"),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(app.main_dir().join("projects/2024").is_dir());

        let (status, _) = app
            .send(request(
                Method::DELETE,
                "/api/files?path=projects",
                Some("admin@example.com"),
            ))
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(!app.main_dir().join("projects").exists());

        let (status, _) = app
            .send(request(Method::DELETE, "/api/files", Some("admin@example.com")))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rename_requires_upload_and_delete() {
        let app = TestApp::new();
        let rename = |email| {
            request(Method::POST, "/api/rename", Some(email))
                .json(&serde_json::json!({ "from": "hello.txt", "to": "docs/moved.txt" }))
        };

        let (status, _) = app.send(rename("reader@example.com")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app.send(rename("admin@example.com")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(app.main_dir().join("docs/moved.txt").is_file());
        assert!(!app.main_dir().join("hello.txt").exists());
    }

    #[tokio::test]
    async fn rename_refuses_escape() {
        let app = TestApp::new();
        let request = request(Method::POST, "/api/rename", Some("admin@example.com"))
            .json(&serde_json::json!({ "from": "hello.txt", "to": "../stolen.txt" }));

        let (status, json) = app.send(request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
        assert!(app.main_dir().join("hello.txt").exists());
    }

    #[tokio::test]
    async fn explicit_root_is_honored() {
        let app = TestApp::new();

        let (status, json) = app
            .send(request(
                Method::GET,
                "/api/files?root=archive",
                Some("admin@example.com"),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["rootId"], "archive");

        let (status, _) = app
            .send(request(
                Method::GET,
                "/api/files?root=archive",
                Some("reader@example.com"),
            ))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn deleting_link_to_root_removes_only_the_link() {
        let app = TestApp::new();
        std::os::unix::fs::symlink(".", app.main_dir().join("self")).expect("symlink");
        std::os::unix::fs::symlink(app.main_dir().join("docs"), app.main_dir().join("shortcut"))
            .expect("symlink");

        for path in ["self", "shortcut"] {
            let uri = format!("/api/files?path={path}");
            let (status, _) = app
                .send(request(Method::DELETE, &uri, Some("admin@example.com")))
                .await;
            assert_eq!(status, StatusCode::NO_CONTENT, "{path}");
        }

        assert!(app.main_dir().join("hello.txt").is_file());
        assert!(app.main_dir().join("docs/readme.txt").is_file());
        assert!(std::fs::symlink_metadata(app.main_dir().join("self")).is_err());
        assert!(std::fs::symlink_metadata(app.main_dir().join("shortcut")).is_err());
    }
}
