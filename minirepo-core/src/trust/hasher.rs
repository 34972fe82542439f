//! Cryptographic hashing utilities for the trust system
//!
//! Uses SHA-256 for file content hashing. Signature digests use whichever
//! [`SignatureHash`] the signing configuration pins.

use crate::error::{RepoError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// Hash a byte slice using SHA-256, lowercase hex
pub fn hash_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Hash a file's contents using SHA-256, streaming it in 8 KB reads
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path).map_err(|e| RepoError::io(path, e))?;

    let mut hasher = Sha256::new();
    let mut buffer = [0; 8192]; // 8KB buffer for streaming

    loop {
        let bytes_read = file.read(&mut buffer).map_err(|e| RepoError::io(path, e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compare a computed hash against the one recorded in the manifest.
///
/// An empty hash on either side never matches.
pub fn hashes_match(actual: &str, expected: &str) -> bool {
    !actual.is_empty() && !expected.is_empty() && actual == expected
}

/// Digest algorithm applied to the manifest before it is signed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureHash {
    Sha256,
    Sha384,
    Sha512,
}

impl SignatureHash {
    /// Identifier written into signature headers and the signed message
    pub fn id(&self) -> &'static str {
        match self {
            SignatureHash::Sha256 => "sha256",
            SignatureHash::Sha384 => "sha384",
            SignatureHash::Sha512 => "sha512",
        }
    }

    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            SignatureHash::Sha256 => Sha256::digest(data).to_vec(),
            SignatureHash::Sha384 => Sha384::digest(data).to_vec(),
            SignatureHash::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

impl fmt::Display for SignatureHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for SignatureHash {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(SignatureHash::Sha256),
            "sha384" => Ok(SignatureHash::Sha384),
            "sha512" => Ok(SignatureHash::Sha512),
            other => Err(format!("unsupported signature hash: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_hash_bytes_known_vector() {
        assert_eq!(
            hash_bytes(b"test"),
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_hash_is_lowercase_hex() {
        let hash = hash_bytes(b"hello world");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_hash_file_matches_bytes() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let content = vec![7u8; 20_000]; // spans several read buffers
        temp_file.write_all(&content).unwrap();

        assert_eq!(hash_file(temp_file.path()).unwrap(), hash_bytes(&content));
    }

    #[test]
    fn test_hash_missing_file_is_io_error() {
        let result = hash_file(Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(RepoError::Io { .. })));
    }

    #[test]
    fn test_hashes_match_rejects_empty() {
        assert!(hashes_match("abc", "abc"));
        assert!(!hashes_match("abc", "abd"));
        assert!(!hashes_match("", ""));
        assert!(!hashes_match("abc", ""));
    }

    #[test]
    fn test_signature_hash_parse() {
        assert_eq!("sha384".parse::<SignatureHash>().unwrap(), SignatureHash::Sha384);
        assert_eq!("SHA256".parse::<SignatureHash>().unwrap(), SignatureHash::Sha256);
        assert!("md5".parse::<SignatureHash>().is_err());
        assert_eq!(SignatureHash::Sha512.digest(b"x").len(), 64);
    }
}
