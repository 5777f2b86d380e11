use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::RawRow;

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Canonical keys the engine reads from transaction and opportunity rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Carrier,
    Cost,
    Ownership,
    OriginCity,
    DestCity,
    ShipDate,
    LoadId,
    SelectedCarrier,
    SelectedCost,
    OpportunityCarrier,
    OpportunityCost,
}

/// Accepted header aliases per canonical key, in priority order.
/// The canonical key itself always matches first.
const ALIASES: &[(Column, &[&str])] = &[
    (
        Column::Carrier,
        &["scac", "carrier_scac", "carrier_code", "carrier_name"],
    ),
    (
        Column::Cost,
        &["total_cost", "total_spend", "spend", "total_charge", "charge", "amount"],
    ),
    (
        Column::Ownership,
        &["ownership_type", "pricing_ownership", "pricing_owner", "rate_owner"],
    ),
    (
        Column::OriginCity,
        &["origin", "orig_city", "shipper_city", "pickup_city"],
    ),
    (
        Column::DestCity,
        &["destination_city", "destination", "dest", "consignee_city", "delivery_city"],
    ),
    (
        Column::ShipDate,
        &["pickup_date", "shipped_date", "ship_dt", "date"],
    ),
    (
        Column::LoadId,
        &["load", "load_number", "shipment_id", "shipment_number"],
    ),
    (
        Column::SelectedCarrier,
        &["selected_scac", "actual_carrier", "actual_scac", "carrier"],
    ),
    (
        Column::SelectedCost,
        &["selected_total", "actual_cost", "selected_charge"],
    ),
    (
        Column::OpportunityCarrier,
        &["low_cost_carrier", "lcc_scac", "alternate_carrier", "opportunity_scac"],
    ),
    (
        Column::OpportunityCost,
        &["low_cost_total", "lcc_cost", "alternate_cost", "opportunity_total"],
    ),
];

impl Column {
    pub const ALL: [Column; 11] = [
        Column::Carrier,
        Column::Cost,
        Column::Ownership,
        Column::OriginCity,
        Column::DestCity,
        Column::ShipDate,
        Column::LoadId,
        Column::SelectedCarrier,
        Column::SelectedCost,
        Column::OpportunityCarrier,
        Column::OpportunityCost,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Column::Carrier => "carrier",
            Column::Cost => "cost",
            Column::Ownership => "ownership",
            Column::OriginCity => "origin_city",
            Column::DestCity => "dest_city",
            Column::ShipDate => "ship_date",
            Column::LoadId => "load_id",
            Column::SelectedCarrier => "selected_carrier",
            Column::SelectedCost => "selected_cost",
            Column::OpportunityCarrier => "opportunity_carrier",
            Column::OpportunityCost => "opportunity_cost",
        }
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        ALIASES
            .iter()
            .find(|(col, _)| col == self)
            .map(|(_, aliases)| *aliases)
            .unwrap_or(&[])
    }
}

/// `"Origin City "` → `"origin_city"`, `"Total Cost ($)"` → `"total_cost"`.
pub fn normalize_header(header: &str) -> String {
    let lower = header.trim().to_lowercase();
    NON_ALNUM
        .replace_all(&lower, "_")
        .trim_matches('_')
        .to_string()
}

/// Match one header against the alias table. Canonical keys win over
/// aliases, so a `carrier` header is always `Column::Carrier` even though
/// `carrier` is also an alias of `selected_carrier`.
pub fn match_header(header: &str) -> Option<Column> {
    let norm = normalize_header(header);
    if norm.is_empty() {
        return None;
    }
    Column::ALL
        .iter()
        .find(|col| col.key() == norm)
        .or_else(|| {
            Column::ALL
                .iter()
                .find(|col| col.aliases().iter().any(|a| *a == norm))
        })
        .copied()
}

/// Rename matched headers to their canonical key. The first header that
/// claims a key keeps it; later duplicates and unmatched headers are left
/// as they were.
pub fn canonicalize_headers(headers: &[String]) -> Vec<String> {
    let mut claimed: HashMap<Column, usize> = HashMap::new();
    headers
        .iter()
        .enumerate()
        .map(|(idx, h)| match match_header(h) {
            Some(col) if *claimed.entry(col).or_insert(idx) == idx => col.key().to_string(),
            _ => h.clone(),
        })
        .collect()
}

/// Borrowed view over a raw row that resolves canonical keys, falling back
/// to the alias list when an upstream mapper did not rename the column.
pub struct RowView<'a> {
    row: &'a RawRow,
}

impl<'a> RowView<'a> {
    pub fn new(row: &'a RawRow) -> Self {
        Self { row }
    }

    /// Trimmed value for `col`, or `""` when no matching column exists.
    pub fn get(&self, col: Column) -> &'a str {
        if let Some(v) = self.row.get(col.key()) {
            return v.trim();
        }
        for alias in std::iter::once(col.key()).chain(col.aliases().iter().copied()) {
            if let Some(v) = self
                .row
                .iter()
                .find(|(k, _)| normalize_header(k) == alias)
                .map(|(_, v)| v)
            {
                return v.trim();
            }
        }
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("Origin City "), "origin_city");
        assert_eq!(normalize_header("Total Cost ($)"), "total_cost");
        assert_eq!(normalize_header("  SCAC"), "scac");
        assert_eq!(normalize_header("--"), "");
    }

    #[test]
    fn test_match_header_aliases() {
        assert_eq!(match_header("SCAC"), Some(Column::Carrier));
        assert_eq!(match_header("Carrier"), Some(Column::Carrier));
        assert_eq!(match_header("Destination"), Some(Column::DestCity));
        assert_eq!(match_header("Low Cost Carrier"), Some(Column::OpportunityCarrier));
        assert_eq!(match_header("Selected Cost"), Some(Column::SelectedCost));
        assert_eq!(match_header("Weight"), None);
    }

    #[test]
    fn test_every_column_has_aliases() {
        for col in Column::ALL {
            assert!(!col.aliases().is_empty(), "{:?} has no aliases", col);
        }
    }

    #[test]
    fn test_canonicalize_headers_keeps_first_claim() {
        let headers: Vec<String> = ["SCAC", "Carrier Name", "Total Cost", "Weight"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            canonicalize_headers(&headers),
            vec!["carrier", "Carrier Name", "cost", "Weight"]
        );
    }

    #[test]
    fn test_row_view_prefers_canonical_key() {
        let r = row(&[("carrier", " ABCD "), ("SCAC", "WXYZ")]);
        assert_eq!(RowView::new(&r).get(Column::Carrier), "ABCD");
    }

    #[test]
    fn test_row_view_matches_unnormalized_canonical_header() {
        let r = row(&[("Load ID", "L7")]);
        assert_eq!(RowView::new(&r).get(Column::LoadId), "L7");
    }

    #[test]
    fn test_row_view_falls_back_to_alias() {
        let r = row(&[("SCAC", "WXYZ"), ("Total Charge", "$10")]);
        let view = RowView::new(&r);
        assert_eq!(view.get(Column::Carrier), "WXYZ");
        assert_eq!(view.get(Column::Cost), "$10");
        assert_eq!(view.get(Column::Ownership), "");
    }
}
