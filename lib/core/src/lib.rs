//! Core domain types and utilities for filegate.
//!
//! This crate provides the foundational identifiers and error handling
//! shared by the authorization, access and filesystem crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{Email, LevelName, ParseIdError, RootId};
