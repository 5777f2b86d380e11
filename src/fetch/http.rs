// src/fetch/http.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};
use url::Url;

use super::DocumentStore;

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 250;

/// Documents served over HTTP. Locations are joined onto `base`, so either a
/// relative path or an absolute URL works.
#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    client: Client,
    base: Url,
    max_retries: u32,
    initial_backoff_ms: u64,
}

impl HttpDocumentStore {
    pub fn new(base_url: &str) -> Result<Self> {
        // a base without a trailing slash would drop its last segment on join
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base = Url::parse(&normalized)
            .with_context(|| format!("parsing document base URL {}", base_url))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .gzip(true)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            base,
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
        })
    }

    pub fn with_retries(mut self, max_retries: u32, initial_backoff_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.initial_backoff_ms = initial_backoff_ms;
        self
    }

    /// Join `location` onto the base; the result must keep the base origin
    /// and stay under its path.
    fn resolve(&self, location: &str) -> Result<Url> {
        let url = self
            .base
            .join(location)
            .with_context(|| format!("joining {} onto {}", location, self.base))?;
        if url.origin() != self.base.origin() || !url.path().starts_with(self.base.path()) {
            anyhow::bail!("location `{}` escapes the document base URL {}", location, self.base);
        }
        Ok(url)
    }

    async fn get_text_core(&self, url: &Url) -> Result<String> {
        debug!("Fetching document from {}", url);
        self.client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?
            .error_for_status()
            .with_context(|| format!("Non-success status {}", url))?
            .text()
            .await
            .with_context(|| format!("Reading text from {}", url))
    }

    async fn get_text_with_retry(&self, url: &Url) -> Result<String> {
        let mut attempts = 0;
        loop {
            match self.get_text_core(url).await {
                Ok(t) => return Ok(t),
                Err(e) if attempts < self.max_retries => {
                    attempts += 1;
                    let backoff = self.initial_backoff_ms * 2u64.pow(attempts - 1);
                    warn!(%url, attempt = attempts, delay_ms = backoff, error = %e, "Retrying");
                    sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => {
                    error!(%url, error = %e, "Exhausted retries");
                    return Err(e);
                }
            }
        }
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn fetch_text(&self, location: &str) -> Result<String> {
        let url = self.resolve(location)?;
        self.get_text_with_retry(&url).await
    }
}
