//! Publisher commands: keygen, publish, serve

use anyhow::{bail, Context, Result};
use clap::Args;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

use minirepo_core::config::{expand_home, MinirepoConfig};
use minirepo_core::trust::{SignatureHash, SigningConfig};
use minirepo_core::{Publisher, RepoServer};

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Directory holding pub.asc and priv.asc
    #[clap(long)]
    root: Option<PathBuf>,

    /// Repository directory to index and sign
    #[clap(long)]
    repo: Option<PathBuf>,

    /// Repository display name
    #[clap(long)]
    name: Option<String>,

    /// Digest used for the metadata signature (sha256, sha384, sha512)
    #[clap(long)]
    hash: Option<SignatureHash>,
}

fn publisher_from(
    config: &MinirepoConfig,
    root: Option<PathBuf>,
    repo: Option<PathBuf>,
    name: Option<String>,
) -> Publisher {
    let publisher = &config.publisher;
    Publisher::new(
        expand_home(&root.unwrap_or_else(|| publisher.root.clone())),
        expand_home(&repo.unwrap_or_else(|| publisher.repo.clone())),
        name.unwrap_or_else(|| publisher.name.clone()),
    )
}

pub fn publish_command(config: &MinirepoConfig, args: PublishArgs) -> Result<()> {
    let hash = args.hash.unwrap_or(config.publisher.signature_hash);
    let publisher = publisher_from(config, args.root, args.repo, args.name)
        .with_signing_config(SigningConfig { hash });

    let manifest = publisher.update_metadata()?;

    println!(
        "Published '{}' ({} files) from {}",
        manifest.repository_name,
        manifest.files().len(),
        publisher.repo().display()
    );
    println!("Public key: {}", publisher.public_key_path().display());
    Ok(())
}

pub fn keygen_command(config: &MinirepoConfig, root: Option<PathBuf>, force: bool) -> Result<()> {
    let publisher = publisher_from(config, root, None, None);
    let pub_path = publisher.public_key_path();

    if pub_path.exists() && !force {
        bail!(
            "Keypair already exists at {}. Use --force to replace it.",
            pub_path.display()
        );
    }

    let public = publisher.generate_keypair()?;
    println!("Generated key {}", public.key_id());
    println!("Public key: {}", pub_path.display());
    Ok(())
}

pub async fn serve_command(
    config: &MinirepoConfig,
    repo: Option<PathBuf>,
    bind: Option<String>,
) -> Result<()> {
    let repo = expand_home(&repo.unwrap_or_else(|| config.publisher.repo.clone()));
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("Invalid bind address: {bind}"))?;

    if !repo.is_dir() {
        bail!("Repository directory not found: {}", repo.display());
    }

    let handle = RepoServer::new(&repo).bind(addr).await?;
    println!("Serving {} on {}", repo.display(), handle.url());
    println!("Press Ctrl+C to stop the server.");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    info!("Shutting down");
    handle.shutdown().await
}
