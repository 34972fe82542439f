//! Publisher side: keypair management, signed metadata and the static server
//!
//! A publisher owns a root directory holding its keypair (`pub.asc`,
//! `priv.asc`) and a repository directory whose subdirectories are published.
//! `update_metadata` walks the repository, writes `meta.yml` and signs it
//! into `meta.asc` next to it.

mod server;

pub use server::{RepoServer, ServerHandle};

use crate::manifest::{Manifest, ManifestBuilder};
use crate::trust::{PublicKey, SecretKey, Signer, SigningConfig};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Armored public key file in the publisher root
pub const PUBLIC_KEY_FILE: &str = "pub.asc";

/// Armored private key file in the publisher root
pub const PRIVATE_KEY_FILE: &str = "priv.asc";

#[derive(Debug, Clone)]
pub struct Publisher {
    root: PathBuf,
    repo: PathBuf,
    name: String,
    signing: SigningConfig,
}

impl Publisher {
    pub fn new(root: impl Into<PathBuf>, repo: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            repo: repo.into(),
            name: name.into(),
            signing: SigningConfig::default(),
        }
    }

    /// Override the signing parameters
    pub fn with_signing_config(mut self, signing: SigningConfig) -> Self {
        self.signing = signing;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    pub fn public_key_path(&self) -> PathBuf {
        self.root.join(PUBLIC_KEY_FILE)
    }

    pub fn private_key_path(&self) -> PathBuf {
        self.root.join(PRIVATE_KEY_FILE)
    }

    /// Generate a fresh keypair, overwriting any existing key files
    pub fn generate_keypair(&self) -> Result<PublicKey> {
        std::fs::create_dir_all(&self.root).with_context(|| {
            format!("Failed to create publisher root: {}", self.root.display())
        })?;

        let secret = SecretKey::generate();
        let public = secret.public_key();

        let priv_path = self.private_key_path();
        std::fs::write(&priv_path, secret.to_armored())
            .with_context(|| format!("Failed to write private key: {}", priv_path.display()))?;
        restrict_permissions(&priv_path)?;

        let pub_path = self.public_key_path();
        std::fs::write(&pub_path, public.to_armored())
            .with_context(|| format!("Failed to write public key: {}", pub_path.display()))?;

        info!(
            "Generated keypair {} in {}",
            public.key_id(),
            self.root.display()
        );
        Ok(public)
    }

    /// Read the private key from the publisher root
    pub fn load_keypair(&self) -> Result<SecretKey> {
        let priv_path = self.private_key_path();
        let text = std::fs::read_to_string(&priv_path)
            .with_context(|| format!("Failed to read private key: {}", priv_path.display()))?;
        let secret = SecretKey::from_armored(&text)
            .with_context(|| format!("Failed to parse private key: {}", priv_path.display()))?;
        debug!("Loaded signing key {}", secret.public_key().key_id());
        Ok(secret)
    }

    /// Load the keypair, generating one first if no public key exists yet
    pub fn ensure_keypair(&self) -> Result<SecretKey> {
        if !self.public_key_path().exists() {
            info!("No keypair found in {}, generating", self.root.display());
            self.generate_keypair()?;
        }
        self.load_keypair()
    }

    /// Rebuild the manifest of the repository directory and publish it signed
    pub fn update_metadata(&self) -> Result<Manifest> {
        let secret = self.ensure_keypair()?;

        std::fs::create_dir_all(&self.repo).with_context(|| {
            format!("Failed to create repository dir: {}", self.repo.display())
        })?;

        let manifest = ManifestBuilder::new(&self.repo, &self.name)
            .build()
            .with_context(|| format!("Failed to index {}", self.repo.display()))?;
        let yaml = manifest
            .to_yaml()
            .context("Failed to serialize manifest")?;

        Signer::new(secret, self.signing)
            .sign_and_write(&self.repo, yaml.as_bytes())
            .context("Failed to publish signed metadata")?;

        info!(
            "Published '{}' with {} files",
            manifest.repository_name,
            manifest.files().len()
        );
        Ok(manifest)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to restrict permissions: {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
