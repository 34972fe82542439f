//! HTTP access to a published repository

use crate::error::{RepoError, Result};
use reqwest::Url;
use std::time::Duration;
use tracing::debug;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A repository base URL plus the HTTP client used to reach it
#[derive(Debug, Clone)]
pub struct RemoteRepo {
    base: Url,
    http: reqwest::Client,
}

impl RemoteRepo {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| RepoError::Config(format!("invalid repository URL '{base_url}': {e}")))?;

        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(RepoError::Config(
                "Repository URL must start with http:// or https://".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("minirepo/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|source| RepoError::Network {
                url: base_url.to_string(),
                source,
            })?;

        Ok(Self { base, http })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Base URL followed by each segment, percent-escaped on its own
    pub fn url_for<S: AsRef<str>>(&self, segments: &[S]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| RepoError::Config(format!("'{}' cannot be a base URL", self.base)))?
            .pop_if_empty()
            .extend(segments.iter().map(|s| s.as_ref()));
        Ok(url)
    }

    /// GET the full body at a repository path. Non-2xx responses are errors.
    pub async fn fetch<S: AsRef<str>>(&self, segments: &[S]) -> Result<Vec<u8>> {
        let url = self.url_for(segments)?;
        let network_err = |source| RepoError::Network {
            url: url.to_string(),
            source,
        };

        debug!("GET {}", url);
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(network_err)?;

        let bytes = response.bytes().await.map_err(network_err)?;
        debug!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(base: &str) -> RemoteRepo {
        RemoteRepo::new(base, DEFAULT_TIMEOUT).unwrap()
    }

    #[test]
    fn test_url_for_joins_segments() {
        let repo = remote("http://localhost:8080");
        assert_eq!(
            repo.url_for(&["a_dir", "testfile"]).unwrap().as_str(),
            "http://localhost:8080/a_dir/testfile"
        );
    }

    #[test]
    fn test_url_for_keeps_base_path() {
        let with_slash = remote("http://example.com/repos/main/");
        let without_slash = remote("http://example.com/repos/main");
        assert_eq!(
            with_slash.url_for(&["meta.yml"]).unwrap(),
            without_slash.url_for(&["meta.yml"]).unwrap()
        );
        assert_eq!(
            with_slash.url_for(&["meta.yml"]).unwrap().as_str(),
            "http://example.com/repos/main/meta.yml"
        );
    }

    #[test]
    fn test_url_for_escapes_each_segment() {
        let repo = remote("http://localhost");
        let url = repo.url_for(&["a dir", "x/y", "50%"]).unwrap();
        assert_eq!(url.path(), "/a%20dir/x%2Fy/50%25");
    }

    #[test]
    fn test_rejects_non_http_urls() {
        assert!(matches!(
            RemoteRepo::new("ftp://example.com", DEFAULT_TIMEOUT),
            Err(RepoError::Config(_))
        ));
        assert!(matches!(
            RemoteRepo::new("not a url", DEFAULT_TIMEOUT),
            Err(RepoError::Config(_))
        ));
    }
}
