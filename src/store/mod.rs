// src/store/mod.rs
//! Persistence of the latest strategy summary per event.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info};

use crate::summary::StrategySummary;

/// Holds exactly one summary per event; `replace` overwrites the previous one
/// as a whole.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    async fn replace(&self, event_id: &str, summary: &StrategySummary) -> Result<()>;

    async fn load(&self, event_id: &str) -> Result<Option<StrategySummary>>;
}

/// Filename-safe, collision-free form of an event id: bytes outside
/// `[A-Za-z0-9_-]` are percent-encoded, so distinct ids never share a file.
/// The empty id becomes a lone `%`, which no encoded id can produce.
pub fn sanitize_event_id(event_id: &str) -> String {
    if event_id.is_empty() {
        return "%".to_string();
    }
    let mut safe = String::with_capacity(event_id.len());
    for b in event_id.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            safe.push(b as char);
        } else {
            safe.push_str(&format!("%{:02X}", b));
        }
    }
    safe
}

/// One pretty-printed `<event_id>.json` per event under `dir`.
#[derive(Debug, Clone)]
pub struct JsonSummaryStore {
    dir: PathBuf,
}

impl JsonSummaryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, event_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", sanitize_event_id(event_id)))
    }
}

#[async_trait]
impl SummaryStore for JsonSummaryStore {
    async fn replace(&self, event_id: &str, summary: &StrategySummary) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating summary dir {}", self.dir.display()))?;

        let final_path = self.path_for(event_id);
        let tmp_path = final_path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(summary).context("serializing strategy summary")?;

        let mut file = fs::File::create(&tmp_path)
            .await
            .with_context(|| format!("creating {}", tmp_path.display()))?;
        file.write_all(&body)
            .await
            .with_context(|| format!("writing {}", tmp_path.display()))?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp_path, &final_path).await.with_context(|| {
            format!(
                "failed to rename `{}` to `{}`",
                tmp_path.display(),
                final_path.display()
            )
        })?;

        info!(event_id, path = %final_path.display(), "strategy summary written");
        Ok(())
    }

    async fn load(&self, event_id: &str) -> Result<Option<StrategySummary>> {
        let path = self.path_for(event_id);
        let bytes = match fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(event_id, "no stored summary");
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", path.display()));
            }
        };
        let summary = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(summary))
    }
}
