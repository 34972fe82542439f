//! minirepo trust system - signed metadata and content hashes
//!
//! The publisher signs the serialized manifest with an Ed25519 key; clients
//! hold the matching public key and refuse any metadata that does not verify.
//! Individual files are then trusted through the SHA-256 recorded for them in
//! the verified manifest.
//!
//! Design Principles:
//! - Verify before anything else touches the metadata bytes
//! - Pinned digests - the signature's hash algorithm is configuration, never negotiated
//! - Fail closed - every verification problem is a rejection

pub mod armor;
pub mod hasher;
pub mod keys;
pub mod signer;
pub mod verifier;

pub use hasher::SignatureHash;
pub use keys::{KeyError, PublicKey, SecretKey};
pub use signer::{Signer, SigningConfig, META_FILE, SIGNATURE_FILE};
pub use verifier::MetadataVerifier;
