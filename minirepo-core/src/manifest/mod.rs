//! Repository manifest - the signed description of a repository's contents
//!
//! The manifest is a tree of directories and files. Every file carries the
//! lowercase hex SHA-256 of its bytes, which is what a client checks each
//! download against. The on-the-wire form is YAML:
//!
//! ```yaml
//! contents:
//! - name: a_dir
//!   children:
//!   - name: testfile
//!     hash: 9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08
//! name: minirepo
//! timestamp: 2018-06-01T12:00:00Z
//! ```

mod builder;

pub use builder::ManifestBuilder;

use crate::error::{RepoError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One node of the manifest tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEntry", into = "RawEntry")]
pub enum ManifestEntry {
    /// A regular file and the SHA-256 of its contents
    File { name: String, hash: String },

    /// A directory and its entries, in manifest order
    Directory {
        name: String,
        children: Vec<ManifestEntry>,
    },
}

impl ManifestEntry {
    pub fn file(name: impl Into<String>, hash: impl Into<String>) -> Self {
        ManifestEntry::File {
            name: name.into(),
            hash: hash.into(),
        }
    }

    pub fn directory(name: impl Into<String>, children: Vec<ManifestEntry>) -> Self {
        ManifestEntry::Directory {
            name: name.into(),
            children,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ManifestEntry::File { name, .. } | ManifestEntry::Directory { name, .. } => name,
        }
    }

    /// Recorded content hash, if this is a file
    pub fn hash(&self) -> Option<&str> {
        match self {
            ManifestEntry::File { hash, .. } => Some(hash),
            ManifestEntry::Directory { .. } => None,
        }
    }

    /// Child entries; files have none
    pub fn children(&self) -> &[ManifestEntry] {
        match self {
            ManifestEntry::File { .. } => &[],
            ManifestEntry::Directory { children, .. } => children,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, ManifestEntry::Directory { .. })
    }
}

/// Serialized shape of an entry. A file is an entry with a `hash`, a
/// directory is an entry with (possibly no) `children`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hash: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<RawEntry>,
}

impl TryFrom<RawEntry> for ManifestEntry {
    type Error = String;

    fn try_from(raw: RawEntry) -> std::result::Result<Self, Self::Error> {
        validate_entry_name(&raw.name)?;

        match raw.hash {
            Some(_) if !raw.children.is_empty() => Err(format!(
                "entry '{}' has both a hash and children",
                raw.name
            )),
            Some(hash) => Ok(ManifestEntry::File {
                name: raw.name,
                hash,
            }),
            None => {
                let children = raw
                    .children
                    .into_iter()
                    .map(ManifestEntry::try_from)
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(ManifestEntry::Directory {
                    name: raw.name,
                    children,
                })
            }
        }
    }
}

impl From<ManifestEntry> for RawEntry {
    fn from(entry: ManifestEntry) -> Self {
        match entry {
            ManifestEntry::File { name, hash } => RawEntry {
                name,
                hash: Some(hash),
                children: Vec::new(),
            },
            ManifestEntry::Directory { name, children } => RawEntry {
                name,
                hash: None,
                children: children.into_iter().map(RawEntry::from).collect(),
            },
        }
    }
}

/// Entry names become local path components on the client, so each one must
/// be a single plain component.
fn validate_entry_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("entry with an empty name".to_string());
    }
    if name == "." || name == ".." {
        return Err(format!("entry name '{name}' is not allowed"));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(format!("entry name '{name}' contains a path separator"));
    }
    Ok(())
}

/// A file listed by [`Manifest::files`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile<'a> {
    /// Path segments from the repository root
    pub segments: Vec<&'a str>,
    pub hash: &'a str,
}

impl ListedFile<'_> {
    pub fn display_path(&self) -> String {
        self.segments.join("/")
    }
}

/// The complete repository manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawManifest", into = "RawManifest")]
pub struct Manifest {
    /// Entries at the repository root. Decoding accepts directories only,
    /// since root-level names belong to the metadata files.
    pub top_level: Vec<ManifestEntry>,

    /// Display name of the repository
    pub repository_name: String,

    /// When the publisher generated this manifest
    pub generated_at: DateTime<Utc>,
}

/// Serialized shape of a manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawManifest {
    #[serde(rename = "contents", default)]
    top_level: Vec<ManifestEntry>,

    #[serde(rename = "name")]
    repository_name: String,
    #[serde(rename = "timestamp")]
    generated_at: DateTime<Utc>,
}

impl TryFrom<RawManifest> for Manifest {
    type Error = String;

    fn try_from(raw: RawManifest) -> std::result::Result<Self, Self::Error> {
        if let Some(file) = raw.top_level.iter().find(|entry| !entry.is_dir()) {
            return Err(format!(
                "top-level entry '{}' is a file; only directories may appear at the root",
                file.name()
            ));
        }
        Ok(Manifest {
            top_level: raw.top_level,
            repository_name: raw.repository_name,
            generated_at: raw.generated_at,
        })
    }
}

impl From<Manifest> for RawManifest {
    fn from(manifest: Manifest) -> Self {
        RawManifest {
            top_level: manifest.top_level,
            repository_name: manifest.repository_name,
            generated_at: manifest.generated_at,
        }
    }
}

impl Manifest {
    pub fn new(repository_name: impl Into<String>, top_level: Vec<ManifestEntry>) -> Self {
        Manifest {
            top_level,
            repository_name: repository_name.into(),
            generated_at: Utc::now(),
        }
    }

    /// Parse a manifest from YAML
    pub fn from_yaml(content: &[u8]) -> Result<Self> {
        serde_yaml_ng::from_slice(content).map_err(|source| RepoError::Decode { source })
    }

    /// Serialize to the YAML form that gets signed and published
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml_ng::to_string(self).map_err(|source| RepoError::Decode { source })
    }

    /// Resolve a path to its manifest entry.
    ///
    /// Matching is exact and case-sensitive; among siblings sharing a name
    /// the first one wins.
    pub fn find_path<S: AsRef<str>>(&self, path: &[S]) -> Result<&ManifestEntry> {
        if path.is_empty() {
            return Err(RepoError::Config("no path specified".to_string()));
        }
        if path.iter().any(|segment| segment.as_ref().is_empty()) {
            return Err(RepoError::Config(
                "invalid path part: empty string".to_string(),
            ));
        }

        let mut level: &[ManifestEntry] = &self.top_level;
        let mut current = None;
        for segment in path {
            let segment = segment.as_ref();
            let found = level
                .iter()
                .find(|entry| entry.name() == segment)
                .ok_or_else(|| RepoError::NotFound {
                    path: join_path(path),
                })?;
            level = found.children();
            current = Some(found);
        }

        current.ok_or_else(|| RepoError::Config("no path specified".to_string()))
    }

    /// Resolve a path that must name a file, returning its recorded hash
    pub fn find_file<S: AsRef<str>>(&self, path: &[S]) -> Result<&str> {
        match self.find_path(path)? {
            ManifestEntry::File { hash, .. } => Ok(hash),
            ManifestEntry::Directory { .. } => Err(RepoError::NotAFile {
                path: join_path(path),
            }),
        }
    }

    /// All files in the tree, depth-first in manifest order
    pub fn files(&self) -> Vec<ListedFile<'_>> {
        fn visit<'a>(
            entries: &'a [ManifestEntry],
            prefix: &mut Vec<&'a str>,
            out: &mut Vec<ListedFile<'a>>,
        ) {
            for entry in entries {
                prefix.push(entry.name());
                match entry {
                    ManifestEntry::File { hash, .. } => out.push(ListedFile {
                        segments: prefix.clone(),
                        hash,
                    }),
                    ManifestEntry::Directory { children, .. } => visit(children, prefix, out),
                }
                prefix.pop();
            }
        }

        let mut out = Vec::new();
        visit(&self.top_level, &mut Vec::new(), &mut out);
        out
    }
}

pub(crate) fn join_path<S: AsRef<str>>(path: &[S]) -> String {
    path.iter()
        .map(|segment| segment.as_ref())
        .collect::<Vec<_>>()
        .join("/")
}
