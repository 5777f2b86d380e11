// src/config.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{env, fs, path::Path, path::PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_INSTRUCTIONS: &str = "You are a freight procurement analyst. Write a concise \
strategy summary for a carrier sourcing event: call out carrier concentration, the split between \
brokerage and customer-direct pricing, the busiest lanes and where lower-cost carrier options were \
missed. Use plain prose, no more than three short paragraphs.";

/// External text-completion settings. The external narrative is only used
/// when `enabled` is set and the API key variable resolves.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct NarrativeConfig {
    pub enabled: bool,
    /// OpenAI-compatible API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub model: String,
    /// Name of the env var holding the API key; the key itself never lives in config.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub instructions: String,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 30,
            temperature: 0.3,
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
        }
    }
}

impl NarrativeConfig {
    pub fn api_key(&self) -> Option<String> {
        env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Root for filesystem-backed source documents in refresh mode.
    pub data_dir: PathBuf,
    /// Where `<event_id>.json` summaries are written.
    pub summary_dir: PathBuf,
    /// JSON array of `{code, name}` carrier entries.
    pub carriers_path: Option<PathBuf>,
    /// When set, refresh-mode documents are fetched over HTTP relative to this URL.
    pub document_base_url: Option<String>,
    pub port: u16,
    pub narrative: NarrativeConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            summary_dir: PathBuf::from("summaries"),
            carriers_path: None,
            document_base_url: None,
            port: 8080,
            narrative: NarrativeConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// `CSP_CONFIG` YAML file (if set) overlaid with `CSP_*` / `PORT` env vars.
    pub fn load() -> Result<Self> {
        let mut cfg = match env::var("CSP_CONFIG") {
            Ok(path) => {
                debug!(path = %path, "loading config file");
                Self::from_yaml_file(&path)?
            }
            Err(_) => Self::default(),
        };
        cfg.apply_env(|key| env::var(key).ok());
        Ok(cfg)
    }

    /// Apply overrides from a variable lookup (`std::env::var` in `load`).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CSP_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("CSP_SUMMARY_DIR") {
            self.summary_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("CSP_CARRIERS") {
            self.carriers_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("CSP_DOCUMENT_URL") {
            self.document_base_url = Some(v);
        }
        if let Some(v) = lookup("PORT") {
            match v.parse() {
                Ok(port) => self.port = port,
                Err(_) => warn!(value = %v, "ignoring invalid PORT"),
            }
        }
        if let Some(v) = lookup("CSP_NARRATIVE_ENABLED") {
            self.narrative.enabled = !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off");
        }
        if let Some(v) = lookup("CSP_LLM_BASE_URL") {
            self.narrative.base_url = v;
        }
        if let Some(v) = lookup("CSP_LLM_MODEL") {
            self.narrative.model = v;
        }
        if let Some(v) = lookup("CSP_LLM_API_KEY_ENV") {
            self.narrative.api_key_env = v;
        }
        if let Some(v) = lookup("CSP_LLM_TIMEOUT_SECS") {
            match v.parse() {
                Ok(secs) => self.narrative.timeout_secs = secs,
                Err(_) => warn!(value = %v, "ignoring invalid CSP_LLM_TIMEOUT_SECS"),
            }
        }
    }
}
