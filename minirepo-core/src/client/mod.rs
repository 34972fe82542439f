//! Repository client - fetch, verify and cache repository content
//!
//! The client keeps the last manifest it accepted both in memory and in the
//! local cache. Metadata is only ever written to disk after its detached
//! signature checks out, and a file is only ever cached after its bytes hash
//! to the value that manifest records.

mod cache;
mod remote;

pub use cache::LocalCache;
pub use remote::{RemoteRepo, DEFAULT_TIMEOUT};

use crate::error::{RepoError, Result};
use crate::manifest::{join_path, Manifest};
use crate::trust::{hasher, MetadataVerifier, META_FILE, SIGNATURE_FILE};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tunables for [`RepoClient`]
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request HTTP timeout
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Client for one remote repository and one local cache directory
#[derive(Debug)]
pub struct RepoClient {
    cache: LocalCache,
    remote: RemoteRepo,
    verifier: MetadataVerifier,
    manifest: Option<Manifest>,
}

impl RepoClient {
    /// Create a client. No I/O happens until [`RepoClient::try_update`].
    pub fn new(
        cache_dir: impl Into<PathBuf>,
        base_url: &str,
        trusted_key_armored: impl Into<String>,
    ) -> Result<Self> {
        Self::with_options(
            cache_dir,
            base_url,
            trusted_key_armored,
            ClientOptions::default(),
        )
    }

    pub fn with_options(
        cache_dir: impl Into<PathBuf>,
        base_url: &str,
        trusted_key_armored: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self> {
        Ok(Self {
            cache: LocalCache::new(cache_dir),
            remote: RemoteRepo::new(base_url, options.timeout)?,
            verifier: MetadataVerifier::new(trusted_key_armored),
            manifest: None,
        })
    }

    /// The manifest currently in use, if any has been decoded
    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    pub fn cache_dir(&self) -> &Path {
        self.cache.root()
    }

    /// Refresh the metadata from the remote.
    ///
    /// Returns `Ok(true)` when fresh, verified metadata was fetched and
    /// stored, and `Ok(false)` when the refresh failed but a previously
    /// accepted copy is in the cache and is used instead. Without such a copy
    /// a failed refresh is [`RepoError::NoUsableManifest`]. A stored copy that
    /// cannot be decoded is always an error.
    pub async fn try_update(&mut self) -> Result<bool> {
        let have_local = self.cache.has_manifest();

        let refreshed = match self.fetch_meta().await {
            Ok(()) => true,
            Err(err) => {
                err.log_if_security_critical();
                if !have_local {
                    return Err(RepoError::NoUsableManifest {
                        source: Box::new(err),
                    });
                }
                warn!("Metadata refresh failed, using local copy: {}", err);
                false
            }
        };

        self.decode_meta()?;
        Ok(refreshed)
    }

    /// Download, verify and persist `meta.yml`. Nothing is stored unless the
    /// signature verifies.
    async fn fetch_meta(&self) -> Result<()> {
        let data = self.remote.fetch(&[META_FILE]).await?;
        let signature = self.remote.fetch(&[SIGNATURE_FILE]).await?;

        self.verifier.verify(&data, &signature)?;
        self.cache.store_manifest(&data)?;

        info!(
            "Fetched verified metadata from {} ({} bytes)",
            self.remote.base(),
            data.len()
        );
        Ok(())
    }

    fn decode_meta(&mut self) -> Result<()> {
        let bytes = self.cache.read_manifest()?;
        let manifest = Manifest::from_yaml(&bytes)?;
        debug!(
            "Loaded manifest '{}' generated at {}",
            manifest.repository_name, manifest.generated_at
        );
        self.manifest = Some(manifest);
        Ok(())
    }

    /// Local path of a repository file, downloading it on a cache miss.
    ///
    /// A cached copy is returned as-is. Downloaded bytes are written only if
    /// their SHA-256 equals the hash in the manifest.
    pub async fn get_file<S: AsRef<str>>(&self, path: &[S]) -> Result<PathBuf> {
        let manifest = self
            .manifest
            .as_ref()
            .ok_or_else(|| RepoError::Config("no metadata available".to_string()))?;
        let expected = manifest.find_file(path)?;

        if let Some(cached) = self.cache.lookup(path) {
            debug!("Cache hit for {}", join_path(path));
            return Ok(cached);
        }

        let bytes = self.remote.fetch(path).await?;
        let actual = hasher::hash_bytes(&bytes);
        if !hasher::hashes_match(&actual, expected) {
            let err = RepoError::ChecksumMismatch {
                path: join_path(path),
                expected: expected.to_string(),
                actual,
            };
            err.log_if_security_critical();
            return Err(err);
        }

        let stored = self.cache.store(path, &bytes)?;
        info!("Downloaded {} ({} bytes)", join_path(path), bytes.len());
        Ok(stored)
    }

    /// Like [`RepoClient::get_file`], but drops any cached copy first so the
    /// file is always downloaded again. Returns whether a cached copy existed.
    pub async fn get_file_latest<S: AsRef<str>>(&self, path: &[S]) -> Result<(bool, PathBuf)> {
        let manifest = self
            .manifest
            .as_ref()
            .ok_or_else(|| RepoError::Config("no metadata available".to_string()))?;
        manifest.find_file(path)?;

        let was_cached = self.cache.evict(path)?;
        let local = self.get_file(path).await?;
        Ok((was_cached, local))
    }
}
