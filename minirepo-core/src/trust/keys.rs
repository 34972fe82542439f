//! Ed25519 publisher keys in armored form

use super::armor::{self, ArmorError, ArmorKind};
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

const ALGORITHM: &str = "ed25519";

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("key armor invalid: {0}")]
    Armor(#[from] ArmorError),

    #[error("unsupported key algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    #[error("key material has wrong length: expected 32 bytes, got {0}")]
    BadLength(usize),

    #[error("key material rejected: {0}")]
    Invalid(#[from] ed25519_dalek::SignatureError),
}

fn check_algorithm(armored: &armor::Armored) -> Result<(), KeyError> {
    match armored.header("Algorithm") {
        None => Ok(()),
        Some(alg) if alg.eq_ignore_ascii_case(ALGORITHM) => Ok(()),
        Some(other) => Err(KeyError::UnsupportedAlgorithm(other.to_string())),
    }
}

fn key_bytes(body: &[u8]) -> Result<[u8; 32], KeyError> {
    body.try_into().map_err(|_| KeyError::BadLength(body.len()))
}

/// Public half of a publisher keypair
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    pub fn from_armored(text: &str) -> Result<Self, KeyError> {
        let armored = armor::decode_kind(text, ArmorKind::PublicKey)?;
        check_algorithm(&armored)?;
        let key = VerifyingKey::from_bytes(&key_bytes(&armored.body)?)?;
        Ok(PublicKey(key))
    }

    pub fn to_armored(&self) -> String {
        let key_id = self.key_id();
        armor::encode(
            ArmorKind::PublicKey,
            &[("Algorithm", ALGORITHM), ("Key-Id", &key_id)],
            self.0.as_bytes(),
        )
    }

    /// Short fingerprint: first 8 bytes of the SHA-256 of the key, hex
    pub fn key_id(&self) -> String {
        hex::encode(&Sha256::digest(self.0.as_bytes())[..8])
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.key_id())
    }
}

/// Private half of a publisher keypair
pub struct SecretKey(SigningKey);

impl SecretKey {
    /// Generate a fresh key from the OS random source
    pub fn generate() -> Self {
        SecretKey(SigningKey::generate(&mut OsRng))
    }

    pub fn from_armored(text: &str) -> Result<Self, KeyError> {
        let armored = armor::decode_kind(text, ArmorKind::PrivateKey)?;
        check_algorithm(&armored)?;
        Ok(SecretKey(SigningKey::from_bytes(&key_bytes(&armored.body)?)))
    }

    pub fn to_armored(&self) -> String {
        let key_id = self.public_key().key_id();
        armor::encode(
            ArmorKind::PrivateKey,
            &[("Algorithm", ALGORITHM), ("Key-Id", &key_id)],
            &self.0.to_bytes(),
        )
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey({})", self.public_key().key_id())
    }
}
