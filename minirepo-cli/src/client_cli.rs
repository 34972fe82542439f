//! Client commands: update, fetch, list
//!
//! Every command refreshes the metadata first. A failed refresh falls back
//! to the cached copy when there is one.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

use minirepo_core::config::{expand_home, MinirepoConfig};
use minirepo_core::{ClientOptions, RepoClient};

#[derive(Args, Debug)]
pub struct ClientArgs {
    /// Local cache directory
    #[clap(long)]
    cache_dir: Option<PathBuf>,

    /// Base URL of the repository (e.g., http://127.0.0.1:8080)
    #[clap(long)]
    remote: Option<String>,

    /// Publisher's armored public key (pub.asc)
    #[clap(long)]
    public_key: Option<PathBuf>,
}

async fn connect(config: &MinirepoConfig, args: ClientArgs) -> Result<(RepoClient, bool)> {
    let client_config = &config.client;

    let cache_dir = match args.cache_dir.or_else(|| client_config.cache_dir.clone()) {
        Some(dir) => expand_home(&dir),
        None => MinirepoConfig::default_cache_dir()?,
    };
    let remote = args
        .remote
        .or_else(|| client_config.remote.clone())
        .context("No repository configured. Pass --remote or set client.remote in the config")?;
    let key_path = args
        .public_key
        .or_else(|| client_config.public_key.clone())
        .map(|p| expand_home(&p))
        .context(
            "No public key configured. Pass --public-key or set client.public_key in the config",
        )?;

    let trusted_key = std::fs::read_to_string(&key_path)
        .with_context(|| format!("Failed to read public key: {}", key_path.display()))?;

    let mut client = RepoClient::with_options(
        cache_dir,
        &remote,
        trusted_key,
        ClientOptions {
            timeout: Duration::from_secs(client_config.timeout_secs),
        },
    )?;
    let refreshed = client.try_update().await?;
    Ok((client, refreshed))
}

pub async fn update_command(config: &MinirepoConfig, args: ClientArgs) -> Result<()> {
    let (client, refreshed) = connect(config, args).await?;

    if refreshed {
        println!("Metadata updated");
    } else {
        println!("Remote unavailable, using cached metadata");
    }
    if let Some(manifest) = client.manifest() {
        println!(
            "Repository '{}' generated at {}",
            manifest.repository_name, manifest.generated_at
        );
    }
    Ok(())
}

pub async fn fetch_command(
    config: &MinirepoConfig,
    args: ClientArgs,
    segments: Vec<String>,
    latest: bool,
) -> Result<()> {
    let (client, _) = connect(config, args).await?;

    let path = if latest {
        client.get_file_latest(&segments).await?.1
    } else {
        client.get_file(&segments).await?
    };
    println!("{}", path.display());
    Ok(())
}

#[derive(Tabled)]
struct FileRow {
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "SHA-256")]
    hash: String,
}

pub async fn list_command(config: &MinirepoConfig, args: ClientArgs, json: bool) -> Result<()> {
    let (client, _) = connect(config, args).await?;
    let manifest = client
        .manifest()
        .context("No metadata available after update")?;

    if json {
        println!("{}", serde_json::to_string_pretty(manifest)?);
        return Ok(());
    }

    let rows: Vec<FileRow> = manifest
        .files()
        .into_iter()
        .map(|file| FileRow {
            path: file.display_path(),
            hash: file.hash.to_string(),
        })
        .collect();

    if rows.is_empty() {
        println!("Repository '{}' has no files", manifest.repository_name);
        return Ok(());
    }

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();
    println!("{table}");
    Ok(())
}
