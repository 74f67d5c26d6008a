//! Mapping of domain failures onto HTTP responses.
//!
//! Client-caused failures echo their message. Server-side failures are
//! logged with details and answered with a generic body.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use filegate_authz::AuthzError;
use filegate_fs::{ConfineError, FsError};
use filegate_platform_access::AccessError;
use serde_json::json;
use std::fmt;
use tracing::error;

/// Errors returned by route handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The access gate refused the request.
    Access(AccessError),
    /// The requested path was refused.
    Confine(ConfineError),
    /// A file operation failed.
    Fs(FsError),
    /// A rule change named an unconfigured root or level.
    Rule(AuthzError),
    /// The caller is authenticated but not an administrator.
    AdminRequired,
    /// The request is malformed.
    BadRequest { details: String },
    /// A non-file resource does not exist.
    NotFound { what: String },
    /// The authorization configuration could not be reloaded.
    ReloadFailed,
    /// Background work did not complete.
    Internal { details: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access(err) => write!(f, "{err}"),
            Self::Confine(err) => write!(f, "{err}"),
            Self::Fs(err) => write!(f, "{err}"),
            Self::Rule(err) => write!(f, "{err}"),
            Self::AdminRequired => write!(f, "admin access required"),
            Self::BadRequest { details } => write!(f, "bad request: {details}"),
            Self::NotFound { what } => write!(f, "{what} not found"),
            Self::ReloadFailed => write!(f, "authorization config reload failed"),
            Self::Internal { details } => write!(f, "internal error: {details}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Access(AccessError::Unauthenticated) => StatusCode::UNAUTHORIZED,
            Self::Access(AccessError::Forbidden { .. } | AccessError::UnknownRoot { .. }) => {
                StatusCode::FORBIDDEN
            }
            Self::Confine(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Confine(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Fs(FsError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Fs(FsError::AlreadyExists { .. }) => StatusCode::CONFLICT,
            Self::Fs(FsError::WrongKind { .. } | FsError::RootProtected) => StatusCode::BAD_REQUEST,
            Self::Fs(FsError::Io { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Rule(_) => StatusCode::BAD_REQUEST,
            Self::AdminRequired => StatusCode::FORBIDDEN,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::ReloadFailed | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        Self::Access(err)
    }
}

impl From<ConfineError> for ApiError {
    fn from(err: ConfineError) -> Self {
        Self::Confine(err)
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        Self::Rule(err)
    }
}

impl From<FsError> for ApiError {
    fn from(err: FsError) -> Self {
        Self::Fs(err)
    }
}
