// src/fetch/mod.rs
//! Retrieval of an event's source documents for refresh mode.

pub mod http;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::error::EngineError;
use crate::process::{parse_document, RawRow};

pub use http::HttpDocumentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Transactions,
    Opportunities,
}

/// One stored CSV document. `location` is interpreted by the store: a path
/// relative to the data dir, or a URL relative to the document base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub kind: DocumentKind,
    pub location: String,
}

impl DocumentRef {
    pub fn transactions(location: impl Into<String>) -> Self {
        Self {
            kind: DocumentKind::Transactions,
            location: location.into(),
        }
    }

    pub fn opportunities(location: impl Into<String>) -> Self {
        Self {
            kind: DocumentKind::Opportunities,
            location: location.into(),
        }
    }
}

/// Documents attached to one CSP event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDocuments {
    #[serde(default)]
    pub documents: Vec<DocumentRef>,
}

/// Parsed rows of an event, split by kind.
#[derive(Debug, Default)]
pub struct EventRows {
    pub transactions: Vec<RawRow>,
    pub opportunities: Vec<RawRow>,
    pub dropped_lines: usize,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn fetch_text(&self, location: &str) -> Result<String>;
}

/// Fetch every document concurrently and parse it. The first failure aborts
/// the whole load.
#[instrument(level = "debug", skip_all, fields(documents = docs.documents.len()))]
pub async fn load_event_rows(
    store: &dyn DocumentStore,
    docs: &EventDocuments,
) -> Result<EventRows, EngineError> {
    let texts = try_join_all(docs.documents.iter().map(|doc| async move {
        store
            .fetch_text(&doc.location)
            .await
            .map(|text| (doc.kind, text))
            .map_err(|e| EngineError::document(&doc.location, e))
    }))
    .await?;

    let mut rows = EventRows::default();
    for (kind, text) in texts {
        let parsed = parse_document(&text);
        rows.dropped_lines += parsed.dropped;
        let canonical = parsed.into_canonical_rows();
        match kind {
            DocumentKind::Transactions => rows.transactions.extend(canonical),
            DocumentKind::Opportunities => rows.opportunities.extend(canonical),
        }
    }

    info!(
        transactions = rows.transactions.len(),
        opportunities = rows.opportunities.len(),
        dropped_lines = rows.dropped_lines,
        "loaded event documents"
    );
    Ok(rows)
}

/// Documents read from a local directory.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Locations must be relative paths made only of plain segments; the
    /// resolved file must also stay under the root once symlinks are followed.
    async fn resolve(&self, location: &str) -> Result<PathBuf> {
        let path = Path::new(location);
        if location.trim().is_empty()
            || !path
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            anyhow::bail!("location `{}` escapes the data directory", location);
        }

        let root = fs::canonicalize(&self.root)
            .await
            .with_context(|| format!("resolving data directory {}", self.root.display()))?;
        let joined = root.join(path);
        let real = fs::canonicalize(&joined)
            .await
            .with_context(|| format!("reading {}", joined.display()))?;
        if !real.starts_with(&root) {
            anyhow::bail!("location `{}` escapes the data directory", location);
        }
        Ok(real)
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn fetch_text(&self, location: &str) -> Result<String> {
        let path = self.resolve(location).await?;
        debug!(path = %path.display(), "reading document");
        let bytes = fs::read(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_event_rows_concatenates_by_kind() -> Result<()> {
        let tmp = tempdir()?;
        std::fs::write(tmp.path().join("tx1.csv"), "SCAC,Total Cost\nABCD,100\n")?;
        std::fs::write(tmp.path().join("tx2.csv"), "carrier,cost\nEFGH,50\nbad\n")?;
        std::fs::write(
            tmp.path().join("opp.csv"),
            "load_id,selected_carrier,selected_cost,opportunity_carrier,opportunity_cost\nL1,ABCD,500,EFGH,400\n",
        )?;

        let store = FsDocumentStore::new(tmp.path());
        let docs = EventDocuments {
            documents: vec![
                DocumentRef::transactions("tx1.csv"),
                DocumentRef::opportunities("opp.csv"),
                DocumentRef::transactions("tx2.csv"),
            ],
        };
        let rows = load_event_rows(&store, &docs).await?;

        assert_eq!(rows.transactions.len(), 2);
        assert_eq!(rows.transactions[0]["carrier"], "ABCD");
        assert_eq!(rows.transactions[0]["cost"], "100");
        assert_eq!(rows.transactions[1]["carrier"], "EFGH");
        assert_eq!(rows.opportunities.len(), 1);
        assert_eq!(rows.dropped_lines, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_document_is_fatal() -> Result<()> {
        let tmp = tempdir()?;
        std::fs::write(tmp.path().join("tx.csv"), "carrier,cost\nABCD,1\n")?;
        let store = FsDocumentStore::new(tmp.path());
        let docs = EventDocuments {
            documents: vec![
                DocumentRef::transactions("tx.csv"),
                DocumentRef::opportunities("missing.csv"),
            ],
        };

        let err = load_event_rows(&store, &docs).await.unwrap_err();
        match &err {
            EngineError::Document { location, .. } => assert_eq!(location, "missing.csv"),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(err.status_code(), 502);
        Ok(())
    }

    #[tokio::test]
    async fn test_parent_dir_locations_are_rejected() {
        let store = FsDocumentStore::new("/tmp/csp-data");
        let err = store.fetch_text("../etc/passwd").await.unwrap_err();
        assert!(err.to_string().contains("escapes"));
    }

    #[tokio::test]
    async fn test_absolute_locations_outside_root_are_rejected() -> Result<()> {
        let data = tempdir()?;
        let other = tempdir()?;
        let secret = other.path().join("secret.csv");
        std::fs::write(&secret, "carrier,cost\nSECRET,1\n")?;

        let store = FsDocumentStore::new(data.path());
        let err = store
            .fetch_text(&secret.to_string_lossy())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("escapes"));
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_out_of_root_is_rejected() -> Result<()> {
        let data = tempdir()?;
        let other = tempdir()?;
        let secret = other.path().join("secret.csv");
        std::fs::write(&secret, "carrier,cost\nSECRET,1\n")?;
        std::os::unix::fs::symlink(&secret, data.path().join("link.csv"))?;

        let store = FsDocumentStore::new(data.path());
        let err = store.fetch_text("link.csv").await.unwrap_err();
        assert!(err.to_string().contains("escapes"));
        Ok(())
    }

    #[tokio::test]
    async fn test_nested_relative_location_is_read() -> Result<()> {
        let data = tempdir()?;
        std::fs::create_dir(data.path().join("evt"))?;
        std::fs::write(data.path().join("evt").join("tx.csv"), "carrier,cost\n")?;

        let store = FsDocumentStore::new(data.path());
        assert_eq!(store.fetch_text("./evt/tx.csv").await?, "carrier,cost\n");
        Ok(())
    }

    #[test]
    fn test_event_documents_json() {
        let docs: EventDocuments = serde_json::from_str(
            r#"{"documents":[{"kind":"transactions","location":"a.csv"},{"kind":"opportunities","location":"b.csv"}]}"#,
        )
        .unwrap();
        assert_eq!(docs.documents[0], DocumentRef::transactions("a.csv"));
        assert_eq!(docs.documents[1].kind, DocumentKind::Opportunities);
    }
}
