//! minirepo - publish, serve and fetch signed file repositories
//!
//! The publisher commands (`keygen`, `publish`, `serve`) manage a repository
//! directory and its signing key. The client commands (`update`, `fetch`,
//! `list`) talk to a served repository through a local cache.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use minirepo_core::config::MinirepoConfig;
use minirepo_core::RepoError;

mod client_cli;
mod publish_cli;

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "minirepo",
    about = "Signed, content-addressed file distribution over plain HTTP",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Set log level
    #[clap(long, default_value = "info", global = true)]
    log_level: LogLevel,

    /// Override configuration file path
    #[clap(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
enum Command {
    /// Rebuild and sign the repository metadata
    Publish(publish_cli::PublishArgs),

    /// Generate the publisher keypair
    Keygen {
        /// Directory holding pub.asc and priv.asc
        #[clap(long)]
        root: Option<PathBuf>,

        /// Replace an existing keypair
        #[clap(long)]
        force: bool,
    },

    /// Serve the repository directory over HTTP until interrupted
    Serve {
        /// Repository directory to serve
        #[clap(long)]
        repo: Option<PathBuf>,

        /// Address to listen on (e.g., 127.0.0.1:8080)
        #[clap(long)]
        bind: Option<String>,
    },

    /// Refresh the repository metadata
    Update {
        #[clap(flatten)]
        client: client_cli::ClientArgs,
    },

    /// Fetch a file and print its local path
    Fetch {
        /// Path segments of the file (e.g., `docs guide.txt`)
        #[clap(required = true)]
        segments: Vec<String>,

        /// Discard any cached copy and download again
        #[clap(long)]
        latest: bool,

        #[clap(flatten)]
        client: client_cli::ClientArgs,
    },

    /// List the files in the repository
    List {
        /// Output the manifest as JSON
        #[clap(long)]
        json: bool,

        #[clap(flatten)]
        client: client_cli::ClientArgs,
    },
}

/// Initialize tracing with CLI flags
fn initialize_tracing(log_level: &LogLevel) {
    let filter = EnvFilter::new(log_level.to_filter_directive());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // logs to stderr, stdout carries command output
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(&cli.log_level);

    let config = match &cli.config {
        Some(path) => MinirepoConfig::load_from_path(path)?,
        None => MinirepoConfig::load()?,
    };

    let result = match cli.command {
        Command::Publish(args) => publish_cli::publish_command(&config, args),
        Command::Keygen { root, force } => publish_cli::keygen_command(&config, root, force),
        Command::Serve { repo, bind } => publish_cli::serve_command(&config, repo, bind).await,
        Command::Update { client } => client_cli::update_command(&config, client).await,
        Command::Fetch {
            segments,
            latest,
            client,
        } => client_cli::fetch_command(&config, client, segments, latest).await,
        Command::List { json, client } => client_cli::list_command(&config, client, json).await,
    };

    if let Err(err) = &result {
        if err
            .downcast_ref::<RepoError>()
            .is_some_and(RepoError::is_integrity_violation)
        {
            eprintln!("SECURITY: repository content failed verification and was rejected");
        }
    }
    result
}
