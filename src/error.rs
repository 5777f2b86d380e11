// src/error.rs
use thiserror::Error;

/// Failures that halt the strategy pipeline. Everything else (malformed
/// rows, unknown carrier codes, narrative service trouble) degrades
/// gracefully and never surfaces here.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Neither input contained a single usable row.
    #[error(
        "no usable input rows ({transaction_rows} transaction rows, {opportunity_rows} opportunity rows)"
    )]
    NoInput {
        transaction_rows: usize,
        opportunity_rows: usize,
    },

    /// A source document could not be retrieved in refresh mode.
    #[error("failed to fetch document `{location}`: {reason}")]
    Document { location: String, reason: String },

    /// The summary could not be written for the event.
    #[error("failed to persist strategy summary for event `{event_id}`: {reason}")]
    Persistence { event_id: String, reason: String },
}

impl EngineError {
    /// HTTP status a wrapping service should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            EngineError::NoInput { .. } => 400,
            EngineError::Document { .. } => 502,
            EngineError::Persistence { .. } => 500,
        }
    }

    pub fn persistence(event_id: &str, err: anyhow::Error) -> Self {
        EngineError::Persistence {
            event_id: event_id.to_string(),
            reason: format!("{:#}", err),
        }
    }

    pub fn document(location: &str, err: anyhow::Error) -> Self {
        EngineError::Document {
            location: location.to_string(),
            reason: format!("{:#}", err),
        }
    }
}
