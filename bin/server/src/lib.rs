//! filegate web server.
//!
//! Serves the file explorer API over axum. Every file route passes the
//! access gate before any path is resolved, and every path is confined to
//! its storage root before any I/O happens.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

#[cfg(test)]
mod test_support;

pub use config::ServerConfig;
pub use routes::router;
pub use state::AppState;
