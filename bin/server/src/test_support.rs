//! Router harness shared by the route tests.

use crate::config::ServerConfig;
use crate::routes::router;
use crate::state::AppState;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
    response::Response,
};
use filegate_authz::{AuthorizationConfig, AuthorizationStore, ConfigFile, Root, Rule};
use filegate_core::{Email, LevelName, RootId};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// A router over two temporary roots:
/// - `main` (default), containing `hello.txt` and `docs/readme.txt`
/// - `archive`, empty
///
/// `admin@example.com` holds `full` on both and is an administrator;
/// `reader@example.com` holds `readonly` on `main`.
pub(crate) struct TestApp {
    router: Router,
    pub(crate) state: Arc<AppState>,
    main: TempDir,
    _archive: TempDir,
    config_dir: TempDir,
}

fn root(id: &'static str, path: &Path, is_default: bool) -> Root {
    Root {
        id: RootId::from_static(id),
        name: id.to_string(),
        physical_path: path.to_path_buf(),
        description: None,
        is_default,
    }
}

fn rule(email: &'static str, grants: &[(&'static str, &'static str)]) -> Rule {
    let mut rule = Rule::new(Email::from_static(email));
    for (root_id, level) in grants {
        rule.root_permissions
            .insert(RootId::from_static(root_id), LevelName::from_static(level));
    }
    rule
}

impl TestApp {
    pub(crate) fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub(crate) fn with_config(customize: impl FnOnce(&mut ServerConfig)) -> Self {
        let main = tempfile::tempdir().expect("main root");
        let archive = tempfile::tempdir().expect("archive root");
        let config_dir = tempfile::tempdir().expect("config dir");

        std::fs::create_dir_all(main.path().join("docs")).expect("mkdir");
        std::fs::write(main.path().join("docs/readme.txt"), "docs").expect("write");
        std::fs::write(main.path().join("hello.txt"), "hello world").expect("write");

        let authorization = AuthorizationConfig {
            roots: vec![
                root("main", main.path(), true),
                root("archive", archive.path(), false),
            ],
            rules: vec![
                rule("admin@example.com", &[("main", "full"), ("archive", "full")]),
                rule("reader@example.com", &[("main", "readonly")]),
            ],
            ..AuthorizationConfig::safe_default()
        };
        let config_path = config_dir.path().join("authorization.json");
        let json = serde_json::to_string_pretty(&ConfigFile::from(&authorization))
            .expect("serialize config");
        std::fs::write(&config_path, json).expect("write config");

        let mut config = ServerConfig {
            authorization_config_path: config_path,
            admin_emails: vec!["admin@example.com".to_string()],
            ..ServerConfig::default()
        };
        config.session.secure_cookies = false;
        customize(&mut config);

        let store = Arc::new(AuthorizationStore::new(&config.authorization_config_path));
        let state = Arc::new(AppState::with_store(config, store));

        Self {
            router: router(Arc::clone(&state)),
            state,
            main,
            _archive: archive,
            config_dir,
        }
    }

    pub(crate) fn main_dir(&self) -> &Path {
        self.main.path()
    }

    pub(crate) fn config_path(&self) -> PathBuf {
        self.config_dir.path().join("authorization.json")
    }

    pub(crate) async fn raw(&self, request: TestRequest) -> Response {
        let Ok(response) = self.router.clone().oneshot(request.build()).await;
        response
    }

    /// Sends a request and decodes the body as JSON; empty bodies become
    /// `null`.
    pub(crate) async fn send(&self, request: TestRequest) -> (StatusCode, serde_json::Value) {
        let response = self.raw(request).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, json)
    }
}

/// A request under construction.
pub(crate) struct TestRequest {
    method: Method,
    uri: String,
    headers: Vec<(String, String)>,
    body: Body,
}

/// Starts a request, optionally authenticated through the email header.
pub(crate) fn request(method: Method, uri: &str, email: Option<&str>) -> TestRequest {
    let headers = email
        .map(|email| vec![("x-forwarded-email".to_string(), email.to_string())])
        .unwrap_or_default();
    TestRequest {
        method,
        uri: uri.to_string(),
        headers,
        body: Body::empty(),
    }
}

impl TestRequest {
    pub(crate) fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub(crate) fn json(self, value: &serde_json::Value) -> Self {
        let mut request = self.header("content-type", "application/json");
        request.body = Body::from(value.to_string());
        request
    }

    pub(crate) fn body_bytes(mut self, body: &'static str) -> Self {
        self.body = Body::from(body);
        self
    }

    fn build(self) -> Request<Body> {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }
        builder.body(self.body).expect("valid request")
    }
}
