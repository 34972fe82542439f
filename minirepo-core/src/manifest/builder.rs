//! Publisher-side manifest construction
//!
//! Walks the repository directory and records a SHA-256 for every regular
//! file. Siblings are visited in file-name order so an unchanged tree always
//! produces the same entries; only the timestamp differs between runs.

use super::{Manifest, ManifestEntry};
use crate::error::{RepoError, Result};
use crate::trust::hasher::hash_file;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Builds a [`Manifest`] from a directory tree
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    root: PathBuf,
    repository_name: String,
}

impl ManifestBuilder {
    pub fn new(root: impl Into<PathBuf>, repository_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            repository_name: repository_name.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the tree and produce a fresh manifest
    pub fn build(&self) -> Result<Manifest> {
        let mut top_level: Vec<ManifestEntry> = Vec::new();
        let mut file_count = 0usize;

        let mut walker = WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.root.clone());
                RepoError::io(path, std::io::Error::from(e))
            })?;

            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!("Skipping non UTF-8 path: {}", entry.path().display());
                if entry.file_type().is_dir() {
                    walker.skip_current_dir();
                }
                continue;
            };

            let file_type = entry.file_type();
            if entry.depth() == 1 && !file_type.is_dir() {
                // Root-level files (meta.yml, meta.asc, ...) are not repository content
                debug!("Skipping root-level file: {}", name);
                continue;
            }

            let new_entry = if file_type.is_dir() {
                ManifestEntry::directory(name, Vec::new())
            } else if file_type.is_file() {
                file_count += 1;
                ManifestEntry::file(name, hash_file(entry.path())?)
            } else {
                warn!("Skipping special file: {}", entry.path().display());
                continue;
            };

            let parents = self.parent_names(entry.path())?;
            children_at(&mut top_level, &parents)
                .ok_or_else(|| {
                    RepoError::io(
                        entry.path(),
                        std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            "parent directory missing from manifest",
                        ),
                    )
                })?
                .push(new_entry);
        }

        debug!(
            "Built manifest for '{}': {} top-level directories, {} files",
            self.repository_name,
            top_level.len(),
            file_count
        );

        Ok(Manifest::new(self.repository_name.clone(), top_level))
    }

    /// Names of the directories between the root and `path`
    fn parent_names(&self, path: &Path) -> Result<Vec<String>> {
        let relative = path.strip_prefix(&self.root).map_err(|_| {
            RepoError::io(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "path escapes the repository root",
                ),
            )
        })?;

        let mut names: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        names.pop();
        Ok(names)
    }
}

/// Child list of the directory reached by following `parents` from the root
fn children_at<'a>(
    top_level: &'a mut Vec<ManifestEntry>,
    parents: &[String],
) -> Option<&'a mut Vec<ManifestEntry>> {
    let mut level = top_level;
    for name in parents {
        let current = level;
        let next = current.iter_mut().rev().find(|e| e.name() == name)?;
        level = match next {
            ManifestEntry::Directory { children, .. } => children,
            ManifestEntry::File { .. } => return None,
        };
    }
    Some(level)
}
