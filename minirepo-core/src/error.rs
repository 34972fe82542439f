//! Repository error types
//!
//! Every failure a client or publisher can hit surfaces as a [`RepoError`]
//! variant, so callers can tell tampering apart from a flaky network.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while verifying, fetching or caching repository content
#[derive(Error, Debug)]
pub enum RepoError {
    /// Caller supplied an unusable argument (bad path, bad URL, no metadata yet)
    #[error("{0}")]
    Config(String),

    /// A path segment has no match in the manifest tree
    #[error("file not found: {path}")]
    NotFound { path: String },

    /// The path resolved to a directory, but a file was requested
    #[error("not a file: {path} is a directory in the repository manifest")]
    NotAFile { path: String },

    /// The detached signature over the metadata did not verify
    #[error("signature invalid or check failed: {reason}")]
    Signature { reason: String },

    /// Downloaded bytes do not match the hash recorded in the manifest
    #[error("checksum mismatch for {path}\nExpected hash: {expected}\nActual hash:   {actual}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// Transport failure talking to the repository
    #[error("download of {url} failed")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Local filesystem failure
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stale cache entry could not be removed before a forced refresh
    #[error("deletion of old file {path} failed")]
    CacheEviction {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The metadata verified but could not be decoded
    #[error("metadata decode failed")]
    Decode {
        #[source]
        source: serde_yaml_ng::Error,
    },

    /// Refresh failed and there is no previously accepted metadata to fall back on
    #[error("fetch failed and no local copy")]
    NoUsableManifest {
        #[source]
        source: Box<RepoError>,
    },
}

pub type Result<T> = std::result::Result<T, RepoError>;

impl RepoError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RepoError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn signature(reason: impl Into<String>) -> Self {
        RepoError::Signature {
            reason: reason.into(),
        }
    }

    /// Whether this error means the repository content could not be trusted.
    ///
    /// Integrity violations indicate tampering or a publisher bug; retrying
    /// the same request will not help.
    pub fn is_integrity_violation(&self) -> bool {
        match self {
            RepoError::Signature { .. } | RepoError::ChecksumMismatch { .. } => true,
            RepoError::NoUsableManifest { source } => source.is_integrity_violation(),
            _ => false,
        }
    }

    /// Log security-critical errors to the dedicated `security` target
    pub fn log_if_security_critical(&self) {
        if self.is_integrity_violation() {
            tracing::error!(target: "security", "INTEGRITY VIOLATION: {}", self);
        }
    }
}
