// src/lib.rs
//! Carrier sourcing (CSP) strategy analytics: parse shipment and low-cost
//! opportunity exports, aggregate them, narrate, and persist one summary per
//! event.

pub mod aggregate;
pub mod carrier;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod narrative;
pub mod ownership;
pub mod process;
pub mod store;
pub mod summary;

pub use engine::StrategyEngine;
pub use error::EngineError;
pub use fetch::{DocumentKind, DocumentRef, EventDocuments};
pub use narrative::NarrativeOptions;
pub use summary::StrategySummary;

use tracing_subscriber::{fmt, EnvFilter};

/// Default subscriber for the binaries: `RUST_LOG` when set, else `LOG_LEVEL`
/// applied to this crate, else info.
pub fn init_logging() {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("info,cspstrategy={}", level)));
    let _ = fmt()
        .with_env_filter(filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .try_init();
}
