//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables, with `__`
//! separating nested keys (`IDENTITY__EMAIL_HEADER`, `SESSION__SECURE_COOKIES`).

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// Backing file of the authorization configuration.
    #[serde(default = "default_authorization_config_path")]
    pub authorization_config_path: PathBuf,

    /// Skips both access gates and grants full access on every root.
    #[serde(default)]
    pub no_auth_required: bool,

    /// Emails allowed to use the administrative endpoints.
    #[serde(default)]
    pub admin_emails: Vec<String>,

    /// Largest accepted upload body, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Trusted proxy headers carrying the caller's identity.
    #[serde(default)]
    pub identity: IdentityHeaders,

    /// Cookie configuration.
    #[serde(default)]
    pub session: SessionConfig,
}

/// Names of the headers set by the authenticating proxy.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityHeaders {
    /// Header carrying the user's email.
    #[serde(default = "default_email_header")]
    pub email_header: String,

    /// Header carrying the user's login name.
    #[serde(default = "default_user_header")]
    pub user_header: String,

    /// Header carrying the provider's identity object as JSON.
    #[serde(default = "default_profile_header")]
    pub profile_header: String,
}

/// Cookie-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,

    /// Lifetime of the remembered-root cookie, in hours.
    #[serde(default = "default_root_cookie_max_age_hours")]
    pub root_cookie_max_age_hours: i64,
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

fn default_authorization_config_path() -> PathBuf {
    PathBuf::from("config/authorization.json")
}

fn default_max_upload_bytes() -> usize {
    256 * 1024 * 1024
}

fn default_email_header() -> String {
    "x-forwarded-email".to_string()
}

fn default_user_header() -> String {
    "x-forwarded-user".to_string()
}

fn default_profile_header() -> String {
    "x-forwarded-identity".to_string()
}

fn default_secure_cookies() -> bool {
    true
}

fn default_root_cookie_max_age_hours() -> i64 {
    24
}

impl Default for IdentityHeaders {
    fn default() -> Self {
        Self {
            email_header: default_email_header(),
            user_header: default_user_header(),
            profile_header: default_profile_header(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secure_cookies: default_secure_cookies(),
            root_cookie_max_age_hours: default_root_cookie_max_age_hours(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            authorization_config_path: default_authorization_config_path(),
            no_auth_required: false,
            admin_emails: Vec::new(),
            max_upload_bytes: default_max_upload_bytes(),
            identity: IdentityHeaders::default(),
            session: SessionConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(config::Environment::default())
    }

    fn from_source(env: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                env.separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("admin_emails"),
            )
            .build()?
            .try_deserialize()
    }
}
