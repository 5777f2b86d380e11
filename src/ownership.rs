// src/ownership.rs
//! Classifying free-text pricing ownership into a fixed vocabulary.

use serde::{Deserialize, Serialize};

/// Who owns the pricing on a shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipType {
    /// Seller-operated pricing.
    Brokerage,
    /// Buyer-negotiated pricing.
    CustomerDirect,
}

impl OwnershipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnershipType::Brokerage => "brokerage",
            OwnershipType::CustomerDirect => "customer_direct",
        }
    }
}

/// Immutable token lists driving `classify`. Matching is a case-insensitive
/// substring test; brokerage tokens are checked before customer tokens.
#[derive(Debug, Clone)]
pub struct OwnershipVocabulary {
    unspecified: Vec<String>,
    brokerage: Vec<String>,
    customer_direct: Vec<String>,
}

impl Default for OwnershipVocabulary {
    fn default() -> Self {
        Self::new(
            &["not specified", "unspecified", "n/a", "unknown", "none"],
            &["brokerage", "broker", "operator", "3pl"],
            &["customer", "direct", "shipper", "client"],
        )
    }
}

impl OwnershipVocabulary {
    pub fn new(unspecified: &[&str], brokerage: &[&str], customer_direct: &[&str]) -> Self {
        let lower =
            |tokens: &[&str]| -> Vec<String> { tokens.iter().map(|t| t.to_lowercase()).collect() };
        Self {
            unspecified: lower(unspecified),
            brokerage: lower(brokerage),
            customer_direct: lower(customer_direct),
        }
    }

    /// Classify one row's ownership cell. `None` covers empty text, explicit
    /// "not specified" markers and text matching neither vocabulary.
    pub fn classify(&self, text: &str) -> Option<OwnershipType> {
        let t = text.trim().to_lowercase();
        if t.is_empty() || self.unspecified.iter().any(|m| is_marker(&t, m)) {
            return None;
        }
        if self.brokerage.iter().any(|tok| t.contains(tok.as_str())) {
            return Some(OwnershipType::Brokerage);
        }
        if self.customer_direct.iter().any(|tok| t.contains(tok.as_str())) {
            return Some(OwnershipType::CustomerDirect);
        }
        None
    }
}

/// `text` is the marker itself, or starts with it followed by a non-word
/// character (`"unknown - pending"`, but not `"nonexempt"`).
fn is_marker(text: &str, marker: &str) -> bool {
    match text.strip_prefix(marker) {
        Some(rest) => rest
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric()),
        None => false,
    }
}

/// Per-category tally of row classifications for one carrier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipBreakdown {
    pub brokerage: u64,
    pub customer_direct: u64,
    pub unspecified: u64,
}

impl OwnershipBreakdown {
    pub fn record(&mut self, class: Option<OwnershipType>) {
        match class {
            Some(OwnershipType::Brokerage) => self.brokerage += 1,
            Some(OwnershipType::CustomerDirect) => self.customer_direct += 1,
            None => self.unspecified += 1,
        }
    }

    /// Strict majority of the non-null classifications; ties (including
    /// zero observations) yield `None`.
    pub fn majority(&self) -> Option<OwnershipType> {
        use std::cmp::Ordering;
        match self.brokerage.cmp(&self.customer_direct) {
            Ordering::Greater => Some(OwnershipType::Brokerage),
            Ordering::Less => Some(OwnershipType::CustomerDirect),
            Ordering::Equal => None,
        }
    }
}
