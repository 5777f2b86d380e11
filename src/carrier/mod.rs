// src/carrier/mod.rs
//! Carrier code → display name resolution.

pub mod source;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use source::{CarrierSource, JsonFileCarrierSource, StaticCarrierSource};

/// A single `{code, name}` pair from the carrier directory collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierEntry {
    pub code: String,
    pub name: String,
}

impl CarrierEntry {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// Immutable, case-insensitive map of carrier code (SCAC) → canonical name.
/// Built once per invocation and dropped with it.
#[derive(Debug, Clone, Default)]
pub struct CarrierDirectory {
    names: HashMap<String, String>,
}

impl CarrierDirectory {
    /// Build from directory entries. Blank codes or names are ignored; on a
    /// duplicate code the first entry wins.
    pub fn new(entries: &[CarrierEntry]) -> Self {
        let mut names = HashMap::with_capacity(entries.len());
        for entry in entries {
            let code = entry.code.trim().to_uppercase();
            let name = entry.name.trim();
            if code.is_empty() || name.is_empty() {
                continue;
            }
            names.entry(code).or_insert_with(|| name.to_string());
        }
        Self { names }
    }

    /// Canonical name for `raw`, or `raw` itself when the code is unknown.
    pub fn resolve<'a>(&'a self, raw: &'a str) -> &'a str {
        let key = raw.trim();
        self.names
            .get(&key.to_uppercase())
            .map(String::as_str)
            .unwrap_or(key)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
