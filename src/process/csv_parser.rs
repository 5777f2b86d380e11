use std::collections::HashMap;
use tracing::{debug, trace};

use super::columns::canonicalize_headers;
use super::utils::clean_str;
use super::RawRow;

/// Result of tokenizing one CSV document.
#[derive(Debug, Default)]
pub struct ParsedDocument {
    /// Cleaned header names, in file order.
    pub headers: Vec<String>,
    /// One map per accepted data line.
    pub rows: Vec<RawRow>,
    /// Data lines rejected because their field count differed from the header.
    pub dropped: usize,
}

impl ParsedDocument {
    /// Rows re-keyed so that every header matching the alias table carries
    /// its canonical key. A renamed column overrides an unrenamed column that
    /// already used the same name.
    pub fn into_canonical_rows(self) -> Vec<RawRow> {
        let canonical = canonicalize_headers(&self.headers);
        let renames: HashMap<&str, &str> = self
            .headers
            .iter()
            .zip(canonical.iter())
            .filter(|(old, new)| old != new)
            .map(|(old, new)| (old.as_str(), new.as_str()))
            .collect();
        if renames.is_empty() {
            return self.rows;
        }

        self.rows
            .into_iter()
            .map(|row| {
                let mut out = RawRow::new();
                let mut renamed = Vec::new();
                for (key, value) in row {
                    match renames.get(key.as_str()) {
                        Some(new) => renamed.push((new.to_string(), value)),
                        None => {
                            out.insert(key, value);
                        }
                    }
                }
                out.extend(renamed);
                out
            })
            .collect()
    }
}

/// Split a single line on commas that sit outside double quotes.
/// Every `"` toggles the in-quotes state; the quotes themselves stay in the
/// field and are removed later by `clean_str`.
pub fn split_line(line: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (idx, ch) in line.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(&line[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    fields.push(&line[start..]);
    fields
}

/// Tokenize `text` into header-keyed rows. Malformed lines never raise:
/// they are counted in `dropped` and left out.
pub fn parse_document(text: &str) -> ParsedDocument {
    let mut lines = text
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty());

    let headers: Vec<String> = match lines.next() {
        Some(header_line) => split_line(header_line)
            .into_iter()
            .map(clean_str)
            .collect(),
        None => return ParsedDocument::default(),
    };

    let mut rows = Vec::new();
    let mut dropped = 0;
    for (idx, line) in lines.enumerate() {
        let fields = split_line(line);
        if fields.len() != headers.len() {
            trace!(
                line = idx + 2,
                expected = headers.len(),
                found = fields.len(),
                "dropping malformed line"
            );
            dropped += 1;
            continue;
        }
        let row: RawRow = headers
            .iter()
            .cloned()
            .zip(fields.into_iter().map(clean_str))
            .collect();
        rows.push(row);
    }

    if dropped > 0 {
        debug!(accepted = rows.len(), dropped, "parsed csv document");
    }

    ParsedDocument {
        headers,
        rows,
        dropped,
    }
}

/// Header-keyed rows of `text`; the rows of `parse_document` without the
/// bookkeeping.
pub fn parse_rows(text: &str) -> Vec<RawRow> {
    parse_document(text).rows
}
