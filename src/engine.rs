// src/engine.rs
//! The two pipeline entry points, wired to their collaborators.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::aggregate::analyze;
use crate::carrier::{CarrierDirectory, CarrierSource, JsonFileCarrierSource, StaticCarrierSource};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::fetch::{load_event_rows, DocumentStore, EventDocuments, FsDocumentStore, HttpDocumentStore};
use crate::narrative::{NarrativeOptions, NarrativeService};
use crate::ownership::OwnershipVocabulary;
use crate::process::RawRow;
use crate::store::{JsonSummaryStore, SummaryStore};
use crate::summary::StrategySummary;

/// Request-scoped pipeline over shared, read-only collaborators. Cloning is
/// cheap; no aggregate state survives a call.
#[derive(Clone)]
pub struct StrategyEngine {
    carriers: Arc<dyn CarrierSource>,
    documents: Arc<dyn DocumentStore>,
    narrative: NarrativeService,
    store: Arc<dyn SummaryStore>,
    vocab: OwnershipVocabulary,
}

impl StrategyEngine {
    pub fn new(
        carriers: Arc<dyn CarrierSource>,
        documents: Arc<dyn DocumentStore>,
        narrative: NarrativeService,
        store: Arc<dyn SummaryStore>,
    ) -> Self {
        Self {
            carriers,
            documents,
            narrative,
            store,
            vocab: OwnershipVocabulary::default(),
        }
    }

    pub fn with_vocabulary(mut self, vocab: OwnershipVocabulary) -> Self {
        self.vocab = vocab;
        self
    }

    pub fn with_documents(mut self, documents: Arc<dyn DocumentStore>) -> Self {
        self.documents = documents;
        self
    }

    pub fn from_config(cfg: &EngineConfig) -> Result<Self> {
        let carriers: Arc<dyn CarrierSource> = match &cfg.carriers_path {
            Some(path) => Arc::new(JsonFileCarrierSource::new(path)),
            None => Arc::new(StaticCarrierSource::default()),
        };
        let documents: Arc<dyn DocumentStore> = match &cfg.document_base_url {
            Some(url) => Arc::new(HttpDocumentStore::new(url)?),
            None => Arc::new(FsDocumentStore::new(&cfg.data_dir)),
        };
        let store = Arc::new(JsonSummaryStore::new(&cfg.summary_dir));
        info!(
            summary_dir = %cfg.summary_dir.display(),
            documents = if cfg.document_base_url.is_some() { "http" } else { "fs" },
            "engine configured"
        );
        Ok(Self::new(
            carriers,
            documents,
            NarrativeService::from_config(&cfg.narrative),
            store,
        ))
    }

    /// Provided-data mode: rows were already parsed by the caller.
    #[instrument(skip(self, transactions, opportunities, options), fields(
        transactions = transactions.len(),
        opportunities = opportunities.len(),
    ))]
    pub async fn run_with_rows(
        &self,
        event_id: &str,
        transactions: &[RawRow],
        opportunities: &[RawRow],
        options: &NarrativeOptions,
    ) -> Result<StrategySummary, EngineError> {
        self.summarize(event_id, transactions, opportunities, options)
            .await
    }

    /// Refresh mode: re-fetch and re-parse the event's documents first.
    #[instrument(skip(self, docs, options), fields(documents = docs.documents.len()))]
    pub async fn refresh(
        &self,
        event_id: &str,
        docs: &EventDocuments,
        options: &NarrativeOptions,
    ) -> Result<StrategySummary, EngineError> {
        let rows = load_event_rows(self.documents.as_ref(), docs).await?;
        self.summarize(event_id, &rows.transactions, &rows.opportunities, options)
            .await
    }

    /// Last persisted summary of an event.
    pub async fn load(&self, event_id: &str) -> Result<Option<StrategySummary>, EngineError> {
        self.store
            .load(event_id)
            .await
            .map_err(|e| EngineError::persistence(event_id, e))
    }

    async fn directory(&self) -> CarrierDirectory {
        match self.carriers.fetch_carriers().await {
            Ok(entries) => CarrierDirectory::new(&entries),
            Err(e) => {
                warn!(error = %format!("{:#}", e), "carrier directory unavailable; using raw carrier labels");
                CarrierDirectory::default()
            }
        }
    }

    async fn summarize(
        &self,
        event_id: &str,
        transactions: &[RawRow],
        opportunities: &[RawRow],
        options: &NarrativeOptions,
    ) -> Result<StrategySummary, EngineError> {
        let directory = self.directory().await;
        let analysis = analyze(transactions, opportunities, &directory, &self.vocab)?;
        let text = self.narrative.narrate(&analysis, options).await;
        let summary = StrategySummary::assemble(&analysis, text, Utc::now());

        if let Err(e) = self.store.replace(event_id, &summary).await {
            error!(event_id, error = %format!("{:#}", e), "persisting strategy summary failed");
            return Err(EngineError::persistence(event_id, e));
        }

        info!(
            event_id,
            shipments = summary.shipment_count,
            total_spend = summary.total_spend,
            lost_opportunity_total = summary.lost_opportunity_total,
            "strategy summary persisted"
        );
        Ok(summary)
    }
}
