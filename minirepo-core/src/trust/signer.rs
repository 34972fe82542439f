//! Detached metadata signatures (publisher side)
//!
//! The signed message is `SIGNATURE_CONTEXT || hash-id || 0x00 || H(data)`
//! where `H` is the digest named by [`SigningConfig::hash`]. Binding the
//! hash identifier into the message means the algorithm recorded in the
//! armor header cannot be swapped without breaking the signature.

use super::armor::{self, ArmorKind};
use super::hasher::SignatureHash;
use super::keys::SecretKey;
use crate::error::{RepoError, Result};
use ed25519_dalek::Signer as _;
use std::path::Path;
use tracing::{debug, info};

/// Domain separator for metadata signatures
pub const SIGNATURE_CONTEXT: &[u8] = b"minirepo-detached-v1\0";

/// Digest used when no explicit configuration is given
pub const DEFAULT_SIGNATURE_HASH: SignatureHash = SignatureHash::Sha256;

/// File name of the published manifest
pub const META_FILE: &str = "meta.yml";

/// File name of the published detached signature
pub const SIGNATURE_FILE: &str = "meta.asc";

/// Signing parameters. The digest is always set explicitly; nothing is
/// negotiated from the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningConfig {
    pub hash: SignatureHash,
}

impl Default for SigningConfig {
    fn default() -> Self {
        SigningConfig {
            hash: DEFAULT_SIGNATURE_HASH,
        }
    }
}

pub(crate) fn signed_message(hash: SignatureHash, data: &[u8]) -> Vec<u8> {
    let digest = hash.digest(data);
    let mut msg = Vec::with_capacity(SIGNATURE_CONTEXT.len() + 8 + digest.len());
    msg.extend_from_slice(SIGNATURE_CONTEXT);
    msg.extend_from_slice(hash.id().as_bytes());
    msg.push(0);
    msg.extend_from_slice(&digest);
    msg
}

/// Produces armored detached signatures with a fixed key and digest
#[derive(Debug)]
pub struct Signer {
    key: SecretKey,
    config: SigningConfig,
}

impl Signer {
    pub fn new(key: SecretKey, config: SigningConfig) -> Self {
        Self { key, config }
    }

    pub fn config(&self) -> SigningConfig {
        self.config
    }

    pub fn public_key(&self) -> super::keys::PublicKey {
        self.key.public_key()
    }

    /// Sign exactly `data`, returning the armored signature
    pub fn sign_detached(&self, data: &[u8]) -> String {
        let msg = signed_message(self.config.hash, data);
        let signature = self.key.signing_key().sign(&msg);
        let key_id = self.key.public_key().key_id();

        armor::encode(
            ArmorKind::Signature,
            &[("Hash", self.config.hash.id()), ("Key-Id", &key_id)],
            &signature.to_bytes(),
        )
    }

    /// Sign `manifest_bytes` and publish both files into `repo_dir`.
    ///
    /// Each file is written to a temporary name and renamed into place.
    pub fn sign_and_write(&self, repo_dir: &Path, manifest_bytes: &[u8]) -> Result<()> {
        let signature = self.sign_detached(manifest_bytes);

        write_replace(&repo_dir.join(META_FILE), manifest_bytes)?;
        write_replace(&repo_dir.join(SIGNATURE_FILE), signature.as_bytes())?;

        info!(
            "Published signed metadata to {} (hash: {}, key: {})",
            repo_dir.display(),
            self.config.hash,
            self.key.public_key().key_id()
        );
        Ok(())
    }
}

fn write_replace(path: &Path, contents: &[u8]) -> Result<()> {
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    std::fs::write(tmp_path, contents).map_err(|e| RepoError::io(tmp_path, e))?;
    std::fs::rename(tmp_path, path).map_err(|e| RepoError::io(path, e))?;
    debug!("Wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}
