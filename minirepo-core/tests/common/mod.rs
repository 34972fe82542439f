//! Shared fixture for the integration tests
//!
//! Each [`TestRepo`] owns a temp directory holding a publisher root, its
//! repository directory and a client cache, plus a running [`RepoServer`]
//! on an ephemeral loopback port.

#![allow(dead_code)]

use anyhow::Result;
use minirepo_core::publish::ServerHandle;
use minirepo_core::{Publisher, RepoClient, RepoServer};
use rand::RngCore;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;

static INIT: Once = Once::new();

/// Initialize logging for tests (only once per test run)
pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

pub struct TestRepo {
    pub temp_dir: TempDir,
    pub publisher: Publisher,
    pub server: ServerHandle,
    /// Bytes published at `a_dir/testfile`
    pub payload: Vec<u8>,
}

impl TestRepo {
    /// Publish 256 random bytes at `a_dir/testfile` and start serving
    pub async fn start() -> Result<Self> {
        init_test_logging();

        let temp_dir = TempDir::new()?;
        let publisher = Publisher::new(
            temp_dir.path().join("publisher"),
            temp_dir.path().join("publisher/repo"),
            "unittest",
        );

        let mut payload = vec![0u8; 256];
        rand::thread_rng().fill_bytes(&mut payload);
        let file_dir = publisher.repo().join("a_dir");
        std::fs::create_dir_all(&file_dir)?;
        std::fs::write(file_dir.join("testfile"), &payload)?;

        publisher.update_metadata()?;
        let server = RepoServer::new(publisher.repo())
            .bind("127.0.0.1:0".parse()?)
            .await?;

        Ok(Self {
            temp_dir,
            publisher,
            server,
            payload,
        })
    }

    pub fn public_key(&self) -> Result<String> {
        Ok(std::fs::read_to_string(self.publisher.public_key_path())?)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.temp_dir.path().join("cache")
    }

    /// A client trusting this repository's key
    pub fn client(&self) -> Result<RepoClient> {
        Ok(RepoClient::new(
            self.cache_dir(),
            &self.server.url(),
            self.public_key()?,
        )?)
    }

    /// Path of a published file on the server side
    pub fn served(&self, relative: &str) -> PathBuf {
        self.publisher.repo().join(relative)
    }

    pub fn repo_dir(&self) -> &Path {
        self.publisher.repo()
    }
}
