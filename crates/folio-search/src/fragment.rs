//! Page fragment sources.
//!
//! A fragment is the per-page HTML resource holding extracted text and an
//! optional commentary section. Sources distinguish "no content" (`Ok(None)`,
//! e.g. a non-OK status or a missing file) from transport failure (`Err`).

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use folio_core::Config;

use crate::{Result, SearchError};

/// Something that can fetch page fragments by relative path.
#[async_trait]
pub trait FragmentSource: Send + Sync {
    /// Fetch the fragment at `path`.
    async fn fetch(&self, path: &str) -> Result<Option<String>>;
}

/// Fetches fragments over HTTP relative to a base URL.
#[derive(Debug, Clone)]
pub struct HttpFragmentSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFragmentSource {
    /// Create a source with a client using `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("folio/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(base_url, client))
    }

    /// Create a source reusing an existing client.
    pub fn with_client(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl FragmentSource for HttpFragmentSource {
    async fn fetch(&self, path: &str) -> Result<Option<String>> {
        let response = self.client.get(self.url_for(path)).send().await?;

        if !response.status().is_success() {
            tracing::debug!(path, status = %response.status(), "Fragment not available");
            return Ok(None);
        }

        Ok(Some(response.text().await?))
    }
}

/// Reads fragments from a local directory.
#[derive(Debug, Clone)]
pub struct DirFragmentSource {
    root: PathBuf,
}

impl DirFragmentSource {
    /// Create a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory fragments are read from.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl FragmentSource for DirFragmentSource {
    async fn fetch(&self, path: &str) -> Result<Option<String>> {
        let full_path = self.root.join(path.trim_start_matches('/'));

        match tokio::fs::read_to_string(&full_path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SearchError::Io(format!("{}: {e}", full_path.display()))),
        }
    }
}

/// Pick the fragment source described by the configuration.
pub fn source_from_config(config: &Config) -> Result<Arc<dyn FragmentSource>> {
    if config.book.is_remote() {
        let timeout = Duration::from_secs(config.reader.fetch_timeout_secs);
        Ok(Arc::new(HttpFragmentSource::new(
            &config.book.source,
            timeout,
        )?))
    } else {
        Ok(Arc::new(DirFragmentSource::new(
            config.resolve(&config.book.source),
        )))
    }
}
