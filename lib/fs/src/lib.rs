//! Root-confined filesystem access for filegate.
//!
//! Every path derived from user input goes through [`resolve`], which
//! yields a [`ConfinedPath`] or refuses. The file operations in [`ops`]
//! accept nothing else, so an unconfined path cannot reach the disk.

pub mod confine;
pub mod error;
pub mod ops;

pub use confine::{ConfinedPath, resolve, resolve_async};
pub use error::{ConfineError, FsError};
pub use ops::{EntryInfo, create_dir, describe, list_dir, remove, rename, write_file};
