//! Local cache directory
//!
//! Layout: the last accepted manifest lives at `<root>/meta.yml`, and each
//! downloaded file at `<root>/<segment>/<segment>/...`. Entries are trusted
//! from the moment they are written; nothing is re-hashed on read.

use crate::error::{RepoError, Result};
use crate::trust::META_FILE;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LocalCache {
    root: PathBuf,
}

impl LocalCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the last accepted manifest
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(META_FILE)
    }

    pub fn has_manifest(&self) -> bool {
        self.manifest_path().exists()
    }

    pub fn read_manifest(&self) -> Result<Vec<u8>> {
        let path = self.manifest_path();
        std::fs::read(&path).map_err(|e| RepoError::io(path, e))
    }

    /// Replace the stored manifest. Only called with verified bytes.
    pub fn store_manifest(&self, bytes: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| RepoError::io(&self.root, e))?;
        let path = self.manifest_path();
        std::fs::write(&path, bytes).map_err(|e| RepoError::io(path, e))
    }

    /// Cache location for a repository path
    pub fn entry_path<S: AsRef<str>>(&self, segments: &[S]) -> PathBuf {
        let mut path = self.root.clone();
        for segment in segments {
            path.push(segment.as_ref());
        }
        path
    }

    /// Path of the cached copy, if one exists. Only a regular file counts;
    /// a directory at the entry path is a miss.
    pub fn lookup<S: AsRef<str>>(&self, segments: &[S]) -> Option<PathBuf> {
        let path = self.entry_path(segments);
        path.is_file().then_some(path)
    }

    /// Write verified bytes for a repository path
    pub fn store<S: AsRef<str>>(&self, segments: &[S], bytes: &[u8]) -> Result<PathBuf> {
        let path = self.entry_path(segments);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RepoError::io(parent, e))?;
        }
        std::fs::write(&path, bytes).map_err(|e| RepoError::io(&path, e))?;
        debug!("Cached {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    /// Remove a cached copy. Returns whether there was one.
    ///
    /// Anything at the entry path that cannot be removed as a file, such as a
    /// directory, is a [`RepoError::CacheEviction`].
    pub fn evict<S: AsRef<str>>(&self, segments: &[S]) -> Result<bool> {
        let path = self.entry_path(segments);
        match std::fs::symlink_metadata(&path) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(source) => return Err(RepoError::CacheEviction { path, source }),
        }
        std::fs::remove_file(&path).map_err(|source| RepoError::CacheEviction {
            path: path.clone(),
            source,
        })?;
        debug!("Evicted {}", path.display());
        Ok(true)
    }
}
