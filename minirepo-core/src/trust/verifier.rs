//! Metadata verification - the client-side gate in front of every manifest
//!
//! The verifier checks the detached signature against the trusted public
//! key before the metadata is parsed or stored. Every failure (bad key,
//! malformed armor, unknown digest, wrong signer, bad signature) is reported
//! as the same [`RepoError::Signature`] kind.

use super::armor::{self, ArmorKind};
use super::hasher::SignatureHash;
use super::keys::PublicKey;
use super::signer::signed_message;
use crate::error::{RepoError, Result};
use ed25519_dalek::Signature;
use std::str::FromStr;
use tracing::debug;

/// Holds the trusted publisher key and verifies metadata against it
#[derive(Debug, Clone)]
pub struct MetadataVerifier {
    /// Armored key exactly as configured; parsed on each verification
    trusted_key: String,
}

impl MetadataVerifier {
    pub fn new(trusted_key_armored: impl Into<String>) -> Self {
        Self {
            trusted_key: trusted_key_armored.into(),
        }
    }

    /// Verify `signature` (armored) over exactly `data`
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> Result<()> {
        let key = PublicKey::from_armored(&self.trusted_key)
            .map_err(|e| RepoError::signature(format!("keyring decode failed: {e}")))?;

        let text = std::str::from_utf8(signature)
            .map_err(|_| RepoError::signature("signature is not ASCII armored"))?;
        let armored = armor::decode_kind(text, ArmorKind::Signature)
            .map_err(|e| RepoError::signature(format!("malformed signature: {e}")))?;

        let hash = armored
            .header("Hash")
            .ok_or_else(|| RepoError::signature("signature does not name its hash"))
            .and_then(|id| SignatureHash::from_str(id).map_err(RepoError::signature))?;

        let key_id = key.key_id();
        match armored.header("Key-Id") {
            Some(id) if id == key_id => {}
            Some(id) => {
                return Err(RepoError::signature(format!(
                    "signed by unknown key {id} (trusted key is {key_id})"
                )))
            }
            None => return Err(RepoError::signature("signature does not name its key")),
        }

        let sig_bytes: [u8; 64] = armored.body.as_slice().try_into().map_err(|_| {
            RepoError::signature(format!(
                "signature has wrong length: {} bytes",
                armored.body.len()
            ))
        })?;
        let signature = Signature::from_bytes(&sig_bytes);

        key.verifying_key()
            .verify_strict(&signed_message(hash, data), &signature)
            .map_err(|e| RepoError::signature(e.to_string()))?;

        debug!("Metadata signature verified (hash: {}, key: {})", hash, key_id);
        Ok(())
    }
}
