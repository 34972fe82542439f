//! minirepo - signed, content-addressed file distribution over plain HTTP
//!
//! A publisher builds a manifest of a directory tree, signs it, and serves
//! both alongside the files. Clients verify the manifest against a pinned
//! public key and accept a file only if it hashes to the manifest's value.

pub mod client;
pub mod config;
pub mod error;
pub mod manifest;
pub mod publish;
pub mod trust;

pub use client::{ClientOptions, RepoClient};
pub use error::{RepoError, Result};
pub use manifest::{Manifest, ManifestBuilder, ManifestEntry};
pub use publish::{Publisher, RepoServer};
