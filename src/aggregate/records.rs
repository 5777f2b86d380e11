use chrono::NaiveDate;

use crate::carrier::CarrierDirectory;
use crate::process::{date_parser::parse_ship_date, utils::parse_money, Column, RawRow, RowView};

/// A shipment from the transaction-detail export that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    /// Resolved carrier name (or the raw label on a directory miss).
    pub carrier: String,
    pub cost: f64,
    /// Raw ownership text; may be empty.
    pub ownership: String,
    pub origin_city: String,
    pub dest_city: String,
    pub ship_date: Option<NaiveDate>,
}

impl TransactionRecord {
    /// Derive a record from a raw row. Rows without a carrier token or with
    /// a cost that does not parse as money are not valid and yield None.
    pub fn from_row(row: &RawRow, directory: &CarrierDirectory) -> Option<Self> {
        let view = RowView::new(row);
        let raw_carrier = view.get(Column::Carrier);
        if raw_carrier.is_empty() {
            return None;
        }
        let cost = parse_money(view.get(Column::Cost))?;

        Some(Self {
            carrier: directory.resolve(raw_carrier).to_string(),
            cost,
            ownership: view.get(Column::Ownership).to_string(),
            origin_city: view.get(Column::OriginCity).to_string(),
            dest_city: view.get(Column::DestCity).to_string(),
            ship_date: parse_ship_date(view.get(Column::ShipDate)),
        })
    }
}

/// A low-cost-opportunity quote: what was paid vs. the cheaper alternative.
#[derive(Debug, Clone, PartialEq)]
pub struct OpportunityRecord {
    pub load_id: String,
    pub selected_carrier: String,
    pub selected_cost: f64,
    pub opportunity_carrier: String,
    pub opportunity_cost: f64,
}

impl OpportunityRecord {
    /// Both costs must parse; carriers are resolved through the directory
    /// and a missing selected carrier is labelled `"Unknown"`.
    pub fn from_row(row: &RawRow, directory: &CarrierDirectory) -> Option<Self> {
        let view = RowView::new(row);
        let selected_cost = parse_money(view.get(Column::SelectedCost))?;
        let opportunity_cost = parse_money(view.get(Column::OpportunityCost))?;

        let label = |col: Column| {
            let raw = view.get(col);
            if raw.is_empty() {
                "Unknown".to_string()
            } else {
                directory.resolve(raw).to_string()
            }
        };

        Some(Self {
            load_id: view.get(Column::LoadId).to_string(),
            selected_carrier: label(Column::SelectedCarrier),
            selected_cost,
            opportunity_carrier: label(Column::OpportunityCarrier),
            opportunity_cost,
        })
    }

    /// Positive when the alternative quote was cheaper than what was paid.
    pub fn missed_savings(&self) -> f64 {
        self.selected_cost - self.opportunity_cost
    }
}
