//! minirepo configuration file
//!
//! One YAML file with a section per role. A missing file means defaults;
//! unknown keys are rejected so typos do not silently fall back.

use crate::trust::SignatureHash;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file name inside the platform config directory
pub const CONFIG_FILE: &str = "config.yaml";

/// Default address for `minirepo serve`
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MinirepoConfig {
    pub publisher: PublisherConfig,
    pub server: ServerConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublisherConfig {
    /// Holds the keypair
    pub root: PathBuf,
    /// Directory that gets published
    pub repo: PathBuf,
    /// Repository display name recorded in the manifest
    pub name: String,
    pub signature_hash: SignatureHash,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("~/.minirepo"),
            repo: PathBuf::from("~/.minirepo/repo"),
            name: "minirepo".to_string(),
            signature_hash: SignatureHash::Sha256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub cache_dir: Option<PathBuf>,
    pub remote: Option<String>,
    /// Path to the publisher's armored public key
    pub public_key: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            remote: None,
            public_key: None,
            timeout_secs: 30,
        }
    }
}

impl MinirepoConfig {
    /// Load from the default location
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::default_config_path()?)
    }

    /// Load from a specific path; a missing file yields defaults
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            tracing::debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config: {}", config_path.display()))?;
        let config: Self = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", config_path.display()))?;
        tracing::debug!("Loaded config from {}", config_path.display());
        Ok(config)
    }

    /// `<platform config dir>/minirepo/config.yaml`
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = directories::ProjectDirs::from("", "", "minirepo")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .or_else(|| dirs::config_dir().map(|d| d.join("minirepo")))
            .context("Could not determine config directory")?;
        Ok(config_dir.join(CONFIG_FILE))
    }

    /// Default client cache when none is configured
    pub fn default_cache_dir() -> Result<PathBuf> {
        directories::ProjectDirs::from("", "", "minirepo")
            .map(|dirs| dirs.cache_dir().to_path_buf())
            .or_else(|| dirs::cache_dir().map(|d| d.join("minirepo")))
            .context("Could not determine cache directory")
    }
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = MinirepoConfig::load_from_path(&temp_dir.path().join("none.yaml")).unwrap();
        assert_eq!(config, MinirepoConfig::default());
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.client.timeout_secs, 30);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "publisher:\n  name: docs\n  signature_hash: sha512\nclient:\n  remote: http://mirror:8080\n",
        )
        .unwrap();

        let config = MinirepoConfig::load_from_path(&path).unwrap();
        assert_eq!(config.publisher.name, "docs");
        assert_eq!(config.publisher.signature_hash, SignatureHash::Sha512);
        assert_eq!(config.publisher.root, PathBuf::from("~/.minirepo"));
        assert_eq!(config.client.remote.as_deref(), Some("http://mirror:8080"));
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(&path, "server:\n  bnid: 0.0.0.0:80\n").unwrap();

        let err = MinirepoConfig::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_expand_home() {
        let absolute = Path::new("/srv/repo");
        assert_eq!(expand_home(absolute), absolute);
        assert_eq!(expand_home(Path::new("~tilde")), PathBuf::from("~tilde"));

        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/.minirepo")), home.join(".minirepo"));
            assert_eq!(expand_home(Path::new("~")), home);
        }
    }
}
