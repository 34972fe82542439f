//! Integration tests driving the `minirepo` binary
//!
//! Each test runs against its own temp directory and passes `--config` at a
//! file that does not exist, so the user's configuration never leaks in.

use anyhow::{bail, Result};
use std::fs;
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn minirepo(temp: &Path, args: &[&str]) -> Result<Output> {
    let config = temp.join("no-config.yaml");
    Ok(Command::new(env!("CARGO_BIN_EXE_minirepo"))
        .arg("--config")
        .arg(&config)
        .args(args)
        .output()?)
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

/// Kills the server process when dropped
struct ServerProcess {
    child: Child,
    url: String,
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn spawn_server(temp: &Path, repo: &Path) -> Result<ServerProcess> {
    let port = TcpListener::bind("127.0.0.1:0")?.local_addr()?.port();
    let bind = format!("127.0.0.1:{port}");
    let child = Command::new(env!("CARGO_BIN_EXE_minirepo"))
        .arg("--config")
        .arg(temp.join("no-config.yaml"))
        .args(["serve", "--repo", path_arg(repo), "--bind", bind.as_str()])
        .spawn()?;
    let server = ServerProcess {
        child,
        url: format!("http://{bind}"),
    };

    let deadline = Instant::now() + Duration::from_secs(10);
    while TcpStream::connect(&bind).is_err() {
        if Instant::now() > deadline {
            bail!("server did not start on {bind}");
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    Ok(server)
}

struct Published {
    temp_dir: TempDir,
    root: PathBuf,
    repo: PathBuf,
}

fn publish_fixture() -> Result<Published> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().join("publisher");
    let repo = root.join("repo");
    fs::create_dir_all(repo.join("docs"))?;
    fs::write(repo.join("docs/guide.txt"), b"read me first")?;

    let output = minirepo(
        temp_dir.path(),
        &[
            "publish",
            "--root",
            path_arg(&root),
            "--repo",
            path_arg(&repo),
            "--name",
            "docs",
        ],
    )?;
    assert!(
        output.status.success(),
        "publish failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(Published {
        temp_dir,
        root,
        repo,
    })
}

#[test]
fn test_publish_writes_keys_and_metadata() -> Result<()> {
    let published = publish_fixture()?;

    assert!(published.root.join("pub.asc").exists());
    assert!(published.root.join("priv.asc").exists());
    assert!(published.repo.join("meta.yml").exists());
    assert!(published.repo.join("meta.asc").exists());

    let meta = fs::read_to_string(published.repo.join("meta.yml"))?;
    assert!(meta.contains("name: docs"));
    assert!(meta.contains("guide.txt"));
    Ok(())
}

#[test]
fn test_keygen_refuses_to_overwrite() -> Result<()> {
    let published = publish_fixture()?;
    let temp = published.temp_dir.path();
    let root = path_arg(&published.root);
    let before = fs::read_to_string(published.root.join("pub.asc"))?;

    let output = minirepo(temp, &["keygen", "--root", root])?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--force"));
    assert_eq!(fs::read_to_string(published.root.join("pub.asc"))?, before);

    let output = minirepo(temp, &["keygen", "--root", root, "--force"])?;
    assert!(output.status.success());
    assert_ne!(fs::read_to_string(published.root.join("pub.asc"))?, before);
    Ok(())
}

#[test]
fn test_fetch_and_list_through_server() -> Result<()> {
    let published = publish_fixture()?;
    let temp = published.temp_dir.path();
    let server = spawn_server(temp, &published.repo)?;

    let cache = temp.join("cache");
    let key = published.root.join("pub.asc");
    let client_args: [&str; 6] = [
        "--cache-dir",
        path_arg(&cache),
        "--remote",
        server.url.as_str(),
        "--public-key",
        path_arg(&key),
    ];

    let mut args = vec!["fetch", "docs", "guide.txt"];
    args.extend(client_args);
    let output = minirepo(temp, &args)?;
    assert!(
        output.status.success(),
        "fetch failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let local = PathBuf::from(String::from_utf8(output.stdout)?.trim());
    assert_eq!(local, cache.join("docs").join("guide.txt"));
    assert_eq!(fs::read(&local)?, b"read me first");

    let mut args = vec!["list", "--json"];
    args.extend(client_args);
    let output = minirepo(temp, &args)?;
    assert!(output.status.success());
    let manifest: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(manifest["name"], "docs");
    assert_eq!(manifest["contents"][0]["name"], "docs");
    Ok(())
}

#[test]
fn test_fetch_with_wrong_key_fails_closed() -> Result<()> {
    let published = publish_fixture()?;
    let temp = published.temp_dir.path();
    let server = spawn_server(temp, &published.repo)?;

    // A second publisher's key is not trusted for this repository
    let other_root = temp.join("other");
    let output = minirepo(temp, &["keygen", "--root", path_arg(&other_root)])?;
    assert!(output.status.success());

    let cache = temp.join("cache");
    let other_key = other_root.join("pub.asc");
    let output = minirepo(
        temp,
        &[
            "fetch",
            "docs",
            "guide.txt",
            "--cache-dir",
            path_arg(&cache),
            "--remote",
            server.url.as_str(),
            "--public-key",
            path_arg(&other_key),
        ],
    )?;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("SECURITY"), "stderr was: {stderr}");
    assert!(!cache.join("meta.yml").exists());
    assert!(!cache.join("docs/guide.txt").exists());
    Ok(())
}

#[test]
fn test_client_requires_remote() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output = minirepo(temp_dir.path(), &["update", "--public-key", "/nonexistent"])?;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--remote"));
    Ok(())
}
