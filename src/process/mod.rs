// src/process/mod.rs
//! Turning raw CSV exports into header-keyed rows.

pub mod columns;
pub mod csv_parser;
pub mod date_parser;
pub mod utils;

use std::collections::BTreeMap;

/// One CSV data line keyed by (cleaned) header name.
pub type RawRow = BTreeMap<String, String>;

pub use columns::{canonicalize_headers, match_header, Column, RowView};
pub use csv_parser::{parse_document, parse_rows, ParsedDocument};
