//! Confinement of user-supplied paths to a storage root.

use crate::error::ConfineError;
use soft_canonicalize::soft_canonicalize;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// An absolute path proven to lie inside its storage root.
///
/// Only [`resolve`] constructs one. Every directory above the final
/// component is canonical; the final component itself is kept as named, so
/// removing or renaming a symlink acts on the link rather than its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfinedPath {
    root: PathBuf,
    absolute: PathBuf,
    relative: String,
}

impl ConfinedPath {
    /// The canonical storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The absolute path: canonical parent plus the unresolved final
    /// component.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.absolute
    }

    /// The normalized path relative to the root, `/`-separated, without a
    /// leading slash. Empty for the root itself.
    #[must_use]
    pub fn relative(&self) -> &str {
        &self.relative
    }

    /// Returns true if this is the storage root itself.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.absolute == self.root
    }

    /// The relative path of a child entry named `name`.
    pub(crate) fn child_relative(&self, name: &str) -> String {
        if self.relative.is_empty() {
            name.to_string()
        } else {
            format!("{}/{name}", self.relative)
        }
    }
}

impl AsRef<Path> for ConfinedPath {
    fn as_ref(&self) -> &Path {
        &self.absolute
    }
}

/// Resolves `requested` against the storage root at `root`.
///
/// Both `/` and `\` separate segments. Empty input names the root. A `..`
/// that would climb above the root is refused rather than clamped.
/// Symlinks are followed for the containment check, both on the parent
/// directories and on the final component, so a link pointing out of the
/// root is refused too. Dangling links are refused.
///
/// # Errors
///
/// Returns [`ConfineError::OutOfBounds`] if the path leaves the root,
/// [`ConfineError::Invalid`] for NUL bytes or drive prefixes, and
/// [`ConfineError::RootUnavailable`] if the root cannot be canonicalized.
pub fn resolve(root: &Path, requested: &str) -> Result<ConfinedPath, ConfineError> {
    let segments = normalize(requested).inspect_err(|err| {
        warn!(root = %root.display(), requested, %err, "rejected storage path");
    })?;

    let canonical_root = dunce::canonicalize(root).map_err(|e| ConfineError::RootUnavailable {
        root: root.to_path_buf(),
        details: e.to_string(),
    })?;

    let Some((leaf, parents)) = segments.split_last() else {
        return Ok(ConfinedPath {
            absolute: canonical_root.clone(),
            root: canonical_root,
            relative: String::new(),
        });
    };

    let out_of_bounds = || {
        warn!(root = %canonical_root.display(), requested, "rejected storage path outside root");
        ConfineError::OutOfBounds {
            requested: requested.to_string(),
        }
    };
    let unavailable = |e: io::Error| ConfineError::RootUnavailable {
        root: canonical_root.clone(),
        details: e.to_string(),
    };

    if let Some(link) = dangling_link(&canonical_root, &segments) {
        debug!(link = %link.display(), "dangling symlink on storage path");
        return Err(out_of_bounds());
    }

    let parent = parents
        .iter()
        .fold(canonical_root.clone(), |path, segment| path.join(segment));
    let parent = canonicalize(&parent).map_err(unavailable)?;
    let absolute = parent.join(leaf);
    let target = canonicalize(&absolute).map_err(unavailable)?;

    if !is_within(&parent, &canonical_root) || !is_within(&target, &canonical_root) {
        return Err(out_of_bounds());
    }

    Ok(ConfinedPath {
        root: canonical_root,
        absolute,
        relative: segments.join("/"),
    })
}

/// Runs [`resolve`] on the blocking thread pool.
///
/// # Errors
///
/// As [`resolve`]; a resolution task that fails to complete is reported as
/// [`ConfineError::RootUnavailable`].
pub async fn resolve_async(root: &Path, requested: &str) -> Result<ConfinedPath, ConfineError> {
    let owned_root = root.to_path_buf();
    let owned_requested = requested.to_string();
    tokio::task::spawn_blocking(move || resolve(&owned_root, &owned_requested))
        .await
        .unwrap_or_else(|e| {
            Err(ConfineError::RootUnavailable {
                root: root.to_path_buf(),
                details: e.to_string(),
            })
        })
}

/// Splits `requested` into plain segments, applying `.` and `..` lexically.
fn normalize(requested: &str) -> Result<Vec<String>, ConfineError> {
    let invalid = |reason| ConfineError::Invalid {
        requested: requested.to_string(),
        reason,
    };

    if requested.contains('\0') {
        return Err(invalid("contains a NUL byte"));
    }

    let mut segments: Vec<String> = Vec::new();
    for segment in requested.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(ConfineError::OutOfBounds {
                        requested: requested.to_string(),
                    });
                }
            }
            _ => {
                let mut components = Path::new(segment).components();
                match (components.next(), components.next()) {
                    (Some(Component::Normal(_)), None) => segments.push(segment.to_string()),
                    _ => return Err(invalid("segment is not a plain name")),
                }
            }
        }
    }
    Ok(segments)
}

/// Canonicalizes `path`, tolerating a missing tail. Verbatim prefixes are
/// stripped so results compare equal to the `dunce`-canonicalized root.
fn canonicalize(path: &Path) -> io::Result<PathBuf> {
    soft_canonicalize(path).map(|canonical| dunce::simplified(&canonical).to_path_buf())
}

/// Returns the first symlink along `segments` whose target does not exist.
fn dangling_link(root: &Path, segments: &[String]) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for segment in segments {
        path.push(segment);
        match std::fs::symlink_metadata(&path) {
            Ok(metadata) if metadata.file_type().is_symlink() && !path.exists() => {
                return Some(path);
            }
            Ok(_) => {}
            Err(_) => return None,
        }
    }
    None
}

/// Component-wise prefix check. Case-insensitive where the platform's
/// default filesystem is.
fn is_within(path: &Path, root: &Path) -> bool {
    if cfg!(any(windows, target_os = "macos")) {
        let lower = |p: &Path| PathBuf::from(p.to_string_lossy().to_lowercase());
        lower(path).starts_with(lower(root))
    } else {
        path.starts_with(root)
    }
}
