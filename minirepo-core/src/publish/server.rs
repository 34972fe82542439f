//! Static HTTP server for a repository directory
//!
//! Serves the directory verbatim: `meta.yml`, `meta.asc` and every published
//! file. Integrity comes from the signed metadata, so the server does no
//! checking beyond keeping requests inside the directory.

use anyhow::{Context, Result};
use axum::extract::{Path as UrlPath, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(Clone)]
struct ServerState {
    repo: Arc<PathBuf>,
}

/// A file server rooted at one repository directory
#[derive(Debug, Clone)]
pub struct RepoServer {
    repo: PathBuf,
}

impl RepoServer {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self { repo: repo.into() }
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    /// Build the axum router. GET and HEAD on any path below the root.
    pub fn router(&self) -> Router {
        let state = ServerState {
            repo: Arc::new(self.repo.clone()),
        };
        Router::new()
            .route("/*path", get(serve_file))
            .with_state(state)
    }

    /// Bind `addr` and serve in a background task until the returned handle
    /// is shut down or dropped
    pub async fn bind(&self, addr: SocketAddr) -> Result<ServerHandle> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        let local_addr = listener
            .local_addr()
            .context("Failed to read bound address")?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = self.router();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        info!(
            "Serving {} on http://{}",
            self.repo.display(),
            local_addr
        );
        Ok(ServerHandle {
            local_addr,
            shutdown_tx: Some(shutdown_tx),
            task,
        })
    }
}

/// A running [`RepoServer`]
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<std::io::Result<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Base URL clients use to reach this server
    pub fn url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    /// Stop accepting connections and wait for in-flight requests
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        (&mut self.task)
            .await
            .context("Server task panicked")?
            .context("Server error")?;
        debug!("Server on {} stopped", self.local_addr);
        Ok(())
    }
}

/// Map a decoded request path onto the repository, rejecting anything that
/// could step outside it
fn resolve(repo: &Path, request_path: &str) -> Option<PathBuf> {
    let mut resolved = repo.to_path_buf();
    for segment in request_path.split('/') {
        if segment.is_empty() || segment.contains('\\') || segment.contains('\0') {
            return None;
        }
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => resolved.push(part),
            _ => return None,
        }
    }
    Some(resolved)
}

async fn serve_file(
    UrlPath(path): UrlPath<String>,
    State(state): State<ServerState>,
) -> Response {
    let Some(file_path) = resolve(&state.repo, path.trim_start_matches('/')) else {
        debug!("Rejected request path {:?}", path);
        return StatusCode::NOT_FOUND.into_response();
    };

    match tokio::fs::metadata(&file_path).await {
        Ok(meta) if meta.is_file() => {}
        _ => return StatusCode::NOT_FOUND.into_response(),
    }

    match tokio::fs::read(&file_path).await {
        Ok(contents) => {
            debug!("Served {} ({} bytes)", path, contents.len());
            (
                [(header::CONTENT_TYPE, "application/octet-stream")],
                contents,
            )
                .into_response()
        }
        Err(e) => {
            debug!("Failed to read {}: {}", file_path.display(), e);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}
