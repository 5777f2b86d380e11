use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

use super::CarrierEntry;

/// Read-only carrier directory collaborator.
#[async_trait]
pub trait CarrierSource: Send + Sync {
    async fn fetch_carriers(&self) -> Result<Vec<CarrierEntry>>;
}

/// Carriers kept in memory, e.g. handed over by a caller that already has them.
#[derive(Debug, Clone, Default)]
pub struct StaticCarrierSource {
    entries: Vec<CarrierEntry>,
}

impl StaticCarrierSource {
    pub fn new(entries: Vec<CarrierEntry>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl CarrierSource for StaticCarrierSource {
    async fn fetch_carriers(&self) -> Result<Vec<CarrierEntry>> {
        Ok(self.entries.clone())
    }
}

/// Carriers stored as a JSON array of `{"code": .., "name": ..}` objects.
#[derive(Debug, Clone)]
pub struct JsonFileCarrierSource {
    path: PathBuf,
}

impl JsonFileCarrierSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CarrierSource for JsonFileCarrierSource {
    async fn fetch_carriers(&self) -> Result<Vec<CarrierEntry>> {
        let bytes = fs::read(&self.path)
            .await
            .with_context(|| format!("reading carrier directory {}", self.path.display()))?;
        let entries: Vec<CarrierEntry> = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing carrier directory {}", self.path.display()))?;
        debug!(path = %self.path.display(), carriers = entries.len(), "loaded carrier directory");
        Ok(entries)
    }
}
