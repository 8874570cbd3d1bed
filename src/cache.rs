//! Local artifact storage and the size-equality cache check.
//!
//! Artifacts live in one flat directory as `{id}.{extension}`. File length is
//! the only persisted signal: a file is reusable exactly when its length equals
//! the size the resolver declared for it.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::resolver::MediaDescriptor;

/// Result of checking storage for a previously fetched artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// A file of the declared size exists at this path.
    Hit(PathBuf),
    /// No reusable file; a fetch must (re)create it.
    Miss,
}

/// Flat, content-addressed artifact directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Creates a store rooted at `root`. The directory is not touched.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the storage root if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns the IO error when the directory cannot be created.
    pub async fn ensure_root(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Returns the deterministic path `{root}/{id}.{extension}`.
    #[must_use]
    pub fn artifact_path(&self, descriptor: &MediaDescriptor) -> PathBuf {
        self.root.join(descriptor.file_name())
    }

    /// Reports a hit when a regular file of exactly the declared size exists.
    ///
    /// A present file with a different length is a plain miss; the following
    /// fetch replaces it.
    pub async fn lookup(&self, descriptor: &MediaDescriptor) -> CacheLookup {
        let path = self.artifact_path(descriptor);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() && meta.len() == descriptor.declared_size_bytes => {
                debug!(path = %path.display(), bytes = meta.len(), "artifact cache hit");
                CacheLookup::Hit(path)
            }
            Ok(meta) => {
                debug!(
                    path = %path.display(),
                    on_disk = meta.len(),
                    declared = descriptor.declared_size_bytes,
                    "artifact size mismatch, treating as miss"
                );
                CacheLookup::Miss
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => CacheLookup::Miss,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "artifact stat failed, treating as miss");
                CacheLookup::Miss
            }
        }
    }
}
