//! Integration tests for signed metadata as published on disk

mod common;

use anyhow::Result;
use minirepo_core::trust::{
    MetadataVerifier, PublicKey, SignatureHash, SigningConfig, META_FILE, SIGNATURE_FILE,
};
use minirepo_core::{Publisher, RepoError};
use std::fs;
use tempfile::TempDir;

fn publish(temp_dir: &TempDir, name: &str, hash: SignatureHash) -> Result<Publisher> {
    let root = temp_dir.path().join(name);
    let publisher = Publisher::new(&root, root.join("repo"), name)
        .with_signing_config(SigningConfig { hash });
    fs::create_dir_all(publisher.repo().join("docs"))?;
    fs::write(publisher.repo().join("docs/guide.txt"), name.as_bytes())?;
    publisher.update_metadata()?;
    Ok(publisher)
}

fn published(publisher: &Publisher) -> Result<(Vec<u8>, Vec<u8>, String)> {
    Ok((
        fs::read(publisher.repo().join(META_FILE))?,
        fs::read(publisher.repo().join(SIGNATURE_FILE))?,
        fs::read_to_string(publisher.public_key_path())?,
    ))
}

#[test]
fn test_published_metadata_verifies_with_published_key() -> Result<()> {
    common::init_test_logging();
    let temp_dir = TempDir::new()?;

    for hash in [
        SignatureHash::Sha256,
        SignatureHash::Sha384,
        SignatureHash::Sha512,
    ] {
        let publisher = publish(&temp_dir, hash.id(), hash)?;
        let (data, sig, key) = published(&publisher)?;
        MetadataVerifier::new(key).verify(&data, &sig)?;
    }
    Ok(())
}

#[test]
fn test_signature_from_other_repository_rejected() -> Result<()> {
    common::init_test_logging();
    let temp_dir = TempDir::new()?;
    let alpha = publish(&temp_dir, "alpha", SignatureHash::Sha256)?;
    let beta = publish(&temp_dir, "beta", SignatureHash::Sha256)?;

    let (alpha_data, _, alpha_key) = published(&alpha)?;
    let (_, beta_sig, _) = published(&beta)?;

    let err = MetadataVerifier::new(alpha_key)
        .verify(&alpha_data, &beta_sig)
        .unwrap_err();
    assert!(matches!(err, RepoError::Signature { .. }));
    Ok(())
}

#[test]
fn test_republish_keeps_key_and_refreshes_signature() -> Result<()> {
    common::init_test_logging();
    let temp_dir = TempDir::new()?;
    let publisher = publish(&temp_dir, "alpha", SignatureHash::Sha256)?;
    let (_, first_sig, first_key) = published(&publisher)?;

    fs::write(publisher.repo().join("docs/guide.txt"), b"second edition")?;
    publisher.update_metadata()?;
    let (data, sig, key) = published(&publisher)?;

    assert_eq!(key, first_key);
    assert_ne!(sig, first_sig);
    MetadataVerifier::new(&key).verify(&data, &sig)?;

    // The old signature does not cover the new manifest
    assert!(MetadataVerifier::new(key).verify(&data, &first_sig).is_err());
    Ok(())
}

#[test]
fn test_public_key_file_is_armored() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let publisher = publish(&temp_dir, "alpha", SignatureHash::Sha256)?;
    let text = fs::read_to_string(publisher.public_key_path())?;

    assert!(text.starts_with("-----BEGIN MINIREPO PUBLIC KEY-----"));
    let key = PublicKey::from_armored(&text)?;
    assert_eq!(
        key.key_id(),
        publisher.load_keypair()?.public_key().key_id()
    );
    Ok(())
}
