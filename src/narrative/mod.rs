// src/narrative/mod.rs
//! Human-readable summary text: an external text-completion service when one
//! is configured, the deterministic template otherwise or when it fails.

pub mod completion;
pub mod template;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::aggregate::Analysis;
use crate::config::NarrativeConfig;

pub use completion::CompletionNarrative;
pub use template::TemplateNarrative;

#[derive(Error, Debug)]
pub enum NarrativeError {
    #[error("narrative service not configured: {0}")]
    NotConfigured(String),

    #[error("narrative request failed: {0}")]
    Request(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("narrative service returned empty text")]
    Empty,
}

/// Per-invocation narrative inputs supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeOptions {
    /// Replaces the configured system instructions when present.
    pub instructions: Option<String>,
    /// Knowledge-base snippets appended to the prompt.
    pub knowledge: Vec<String>,
}

#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(
        &self,
        analysis: &Analysis,
        options: &NarrativeOptions,
    ) -> Result<String, NarrativeError>;
}

/// Picks the narrative for an analysis: the primary generator when present
/// and healthy, the template otherwise. Never fails.
#[derive(Clone)]
pub struct NarrativeService {
    primary: Option<Arc<dyn NarrativeGenerator>>,
    fallback: TemplateNarrative,
    timeout: Duration,
}

impl NarrativeService {
    pub fn new(primary: Option<Arc<dyn NarrativeGenerator>>, timeout: Duration) -> Self {
        Self {
            primary,
            fallback: TemplateNarrative,
            timeout,
        }
    }

    /// Template only.
    pub fn template_only() -> Self {
        Self::new(None, Duration::from_secs(0))
    }

    /// External completion when enabled and an API key is available.
    pub fn from_config(cfg: &NarrativeConfig) -> Self {
        let timeout = Duration::from_secs(cfg.timeout_secs);
        if !cfg.enabled {
            info!("external narrative disabled; using template");
            return Self::template_only();
        }
        match CompletionNarrative::from_config(cfg) {
            Ok(narrator) => {
                info!(model = %cfg.model, base_url = %cfg.base_url, "external narrative enabled");
                Self::new(Some(Arc::new(narrator)), timeout)
            }
            Err(e) => {
                info!(reason = %e, "external narrative unavailable; using template");
                Self::template_only()
            }
        }
    }

    pub fn primary_name(&self) -> &str {
        self.primary
            .as_ref()
            .map(|p| p.name())
            .unwrap_or_else(|| self.fallback.name())
    }

    pub async fn narrate(&self, analysis: &Analysis, options: &NarrativeOptions) -> String {
        if let Some(primary) = &self.primary {
            let result = match timeout(self.timeout, primary.generate(analysis, options)).await {
                Ok(r) => r,
                Err(_) => Err(NarrativeError::Timeout(self.timeout)),
            };
            match result {
                Ok(text) if !text.trim().is_empty() => {
                    debug!(generator = primary.name(), chars = text.len(), "narrative generated");
                    return text.trim().to_string();
                }
                Ok(_) => warn!(
                    generator = primary.name(),
                    error = %NarrativeError::Empty,
                    "falling back to template narrative"
                ),
                Err(e) => warn!(
                    generator = primary.name(),
                    error = %e,
                    "falling back to template narrative"
                ),
            }
        }
        self.fallback.render(analysis)
    }
}
