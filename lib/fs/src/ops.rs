//! File operations on confined paths.

use crate::confine::ConfinedPath;
use crate::error::FsError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::Metadata;
use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{debug, error, info, instrument};

/// One entry of a directory listing, or the description of a single path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryInfo {
    /// File name; empty for the storage root.
    pub name: String,
    /// Path relative to the storage root.
    pub path: String,
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// Size in bytes; zero for directories.
    pub size: u64,
    /// Last modification time, when the platform reports one.
    pub modified: Option<DateTime<Utc>>,
}

impl EntryInfo {
    fn from_metadata(name: String, path: String, metadata: &Metadata) -> Self {
        let is_dir = metadata.is_dir();
        Self {
            name,
            path,
            is_dir,
            size: if is_dir { 0 } else { metadata.len() },
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        }
    }
}

fn io_error(path: &str, err: io::Error) -> FsError {
    match err.kind() {
        io::ErrorKind::NotFound => FsError::NotFound {
            path: path.to_string(),
        },
        io::ErrorKind::AlreadyExists => FsError::AlreadyExists {
            path: path.to_string(),
        },
        _ => {
            error!(path, error = %err, "file operation failed");
            FsError::Io {
                path: path.to_string(),
                details: err.to_string(),
            }
        }
    }
}

/// Describes the entry at `target`.
///
/// # Errors
///
/// Returns [`FsError::NotFound`] if nothing exists there.
pub async fn describe(target: &ConfinedPath) -> Result<EntryInfo, FsError> {
    let metadata = fs::metadata(target.as_path())
        .await
        .map_err(|e| io_error(target.relative(), e))?;
    let name = target
        .relative()
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();
    Ok(EntryInfo::from_metadata(
        name,
        target.relative().to_string(),
        &metadata,
    ))
}

/// Lists a directory, directories first, then by name.
///
/// # Errors
///
/// Returns [`FsError::NotFound`] if the directory does not exist and
/// [`FsError::WrongKind`] if `dir` is a file.
#[instrument(skip(dir), fields(path = dir.relative()))]
pub async fn list_dir(dir: &ConfinedPath) -> Result<Vec<EntryInfo>, FsError> {
    let metadata = fs::metadata(dir.as_path())
        .await
        .map_err(|e| io_error(dir.relative(), e))?;
    if !metadata.is_dir() {
        return Err(FsError::WrongKind {
            path: dir.relative().to_string(),
            expected: "directory",
        });
    }

    let mut reader = fs::read_dir(dir.as_path())
        .await
        .map_err(|e| io_error(dir.relative(), e))?;

    let mut entries = Vec::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .map_err(|e| io_error(dir.relative(), e))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        let path = dir.child_relative(&name);
        match entry.metadata().await {
            Ok(metadata) => entries.push(EntryInfo::from_metadata(name, path, &metadata)),
            Err(err) => debug!(path, error = %err, "skipping unreadable entry"),
        }
    }

    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
    debug!(count = entries.len(), "listed directory");
    Ok(entries)
}

/// Writes `contents` to `target`, replacing any existing file and creating
/// missing parent directories.
///
/// # Errors
///
/// Returns [`FsError::WrongKind`] if `target` is a directory.
#[instrument(skip(target, contents), fields(path = target.relative()))]
pub async fn write_file(target: &ConfinedPath, contents: impl AsRef<[u8]>) -> Result<u64, FsError> {
    if target.is_root() || fs::metadata(target.as_path()).await.is_ok_and(|m| m.is_dir()) {
        return Err(FsError::WrongKind {
            path: target.relative().to_string(),
            expected: "file",
        });
    }

    if let Some(parent) = target.as_path().parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error(target.relative(), e))?;
    }

    let contents = contents.as_ref();
    fs::write(target.as_path(), contents)
        .await
        .map_err(|e| io_error(target.relative(), e))?;

    info!(bytes = contents.len(), "wrote file");
    Ok(contents.len() as u64)
}

/// Creates the directory at `target`, including missing parents.
///
/// # Errors
///
/// Returns [`FsError::AlreadyExists`] if anything exists at `target`.
#[instrument(skip(target), fields(path = target.relative()))]
pub async fn create_dir(target: &ConfinedPath) -> Result<(), FsError> {
    if fs::try_exists(target.as_path()).await.unwrap_or(false) {
        return Err(FsError::AlreadyExists {
            path: target.relative().to_string(),
        });
    }
    fs::create_dir_all(target.as_path())
        .await
        .map_err(|e| io_error(target.relative(), e))?;
    info!("created directory");
    Ok(())
}

/// Removes the file or directory tree at `target`. A symlink is removed
/// as a link; its target is left alone.
///
/// # Errors
///
/// Returns [`FsError::RootProtected`] for the storage root and
/// [`FsError::NotFound`] if nothing exists at `target`.
#[instrument(skip(target), fields(path = target.relative()))]
pub async fn remove(target: &ConfinedPath) -> Result<(), FsError> {
    if target.is_root() {
        return Err(FsError::RootProtected);
    }

    let metadata = fs::symlink_metadata(target.as_path())
        .await
        .map_err(|e| io_error(target.relative(), e))?;

    let result = if metadata.is_dir() {
        fs::remove_dir_all(target.as_path()).await
    } else if metadata.is_symlink() {
        remove_link(target.as_path()).await
    } else {
        fs::remove_file(target.as_path()).await
    };
    result.map_err(|e| io_error(target.relative(), e))?;

    info!(
        is_dir = metadata.is_dir(),
        is_link = metadata.is_symlink(),
        "removed entry"
    );
    Ok(())
}

/// Removes a symlink without touching its target. Directory links on
/// Windows need `remove_dir`.
async fn remove_link(path: &Path) -> io::Result<()> {
    match fs::remove_file(path).await {
        Err(err) if cfg!(windows) => fs::remove_dir(path).await.map_err(|_| err),
        result => result,
    }
}

/// Moves `from` to `to`, creating missing parents of `to`. A symlink is
/// moved as a link.
///
/// # Errors
///
/// Returns [`FsError::RootProtected`] if either endpoint is the storage
/// root, [`FsError::NotFound`] if `from` does not exist and
/// [`FsError::AlreadyExists`] if `to` does.
#[instrument(skip(from, to), fields(from = from.relative(), to = to.relative()))]
pub async fn rename(from: &ConfinedPath, to: &ConfinedPath) -> Result<(), FsError> {
    if from.is_root() || to.is_root() {
        return Err(FsError::RootProtected);
    }

    if fs::symlink_metadata(from.as_path()).await.is_err() {
        return Err(FsError::NotFound {
            path: from.relative().to_string(),
        });
    }
    if fs::symlink_metadata(to.as_path()).await.is_ok() {
        return Err(FsError::AlreadyExists {
            path: to.relative().to_string(),
        });
    }

    if let Some(parent) = to.as_path().parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error(to.relative(), e))?;
    }
    fs::rename(from.as_path(), to.as_path())
        .await
        .map_err(|e| io_error(from.relative(), e))?;

    info!("renamed entry");
    Ok(())
}
