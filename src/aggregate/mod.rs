// src/aggregate/mod.rs
//! Pure, IO-free aggregation over parsed rows.

pub mod opportunity;
pub mod records;
pub mod shipments;

use serde::Serialize;
use tracing::{debug, info};

use crate::carrier::CarrierDirectory;
use crate::error::EngineError;
use crate::ownership::OwnershipVocabulary;
use crate::process::RawRow;
use crate::summary::{CarrierBreakdown, LaneSummary, MissedSavings, TopCarrier};

pub use opportunity::{OpportunityCalculator, OpportunityStats};
pub use records::{OpportunityRecord, TransactionRecord};
pub use shipments::{lane_key, OwnershipSpend, ShipmentAggregator, ShipmentStats};

/// Both folds over one event's rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub shipments: ShipmentStats,
    pub opportunities: OpportunityStats,
}

/// Compact, serializable view of an analysis handed to narrative generators.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisDigest<'a> {
    pub shipment_count: u64,
    pub lane_count: u64,
    pub total_spend: f64,
    pub brokerage_spend: f64,
    pub brokerage_percentage: f64,
    pub customer_direct_spend: f64,
    pub customer_direct_percentage: f64,
    pub date_range_start: Option<String>,
    pub date_range_end: Option<String>,
    pub top_carriers: &'a [TopCarrier],
    pub carrier_breakdown: &'a [CarrierBreakdown],
    pub top_lanes: &'a [LaneSummary],
    pub missed_savings_by_carrier: &'a [MissedSavings],
    pub lost_opportunity_count: u64,
    pub lost_opportunity_total: f64,
}

impl Analysis {
    pub fn digest(&self) -> AnalysisDigest<'_> {
        let s = &self.shipments;
        let o = &self.opportunities;
        AnalysisDigest {
            shipment_count: s.shipment_count,
            lane_count: s.lane_count,
            total_spend: s.total_spend,
            brokerage_spend: s.brokerage.spend,
            brokerage_percentage: s.brokerage.percentage,
            customer_direct_spend: s.customer_direct.spend,
            customer_direct_percentage: s.customer_direct.percentage,
            date_range_start: s.date_range_start.map(|d| d.to_string()),
            date_range_end: s.date_range_end.map(|d| d.to_string()),
            top_carriers: &s.top_carriers,
            carrier_breakdown: &s.carrier_breakdown,
            top_lanes: &s.top_lanes,
            missed_savings_by_carrier: &o.missed_savings_by_carrier,
            lost_opportunity_count: o.lost_opportunity_count,
            lost_opportunity_total: o.lost_opportunity_total,
        }
    }
}

/// Run both folds. Invalid rows are skipped silently; the only failure is
/// having nothing usable in either input.
pub fn analyze(
    transactions: &[RawRow],
    opportunities: &[RawRow],
    directory: &CarrierDirectory,
    vocab: &OwnershipVocabulary,
) -> Result<Analysis, EngineError> {
    let mut shipments = ShipmentAggregator::new(vocab);
    for row in transactions {
        match TransactionRecord::from_row(row, directory) {
            Some(rec) => shipments.add(&rec),
            None => debug!("skipping transaction row without carrier or numeric cost"),
        }
    }

    let mut calc = OpportunityCalculator::new();
    for row in opportunities {
        match OpportunityRecord::from_row(row, directory) {
            Some(rec) => calc.add(&rec),
            None => debug!("skipping opportunity row without numeric costs"),
        }
    }

    if shipments.shipment_count() == 0 && calc.usable_rows() == 0 {
        return Err(EngineError::NoInput {
            transaction_rows: transactions.len(),
            opportunity_rows: opportunities.len(),
        });
    }

    info!(
        valid_transactions = shipments.shipment_count(),
        skipped_transactions = transactions.len() as u64 - shipments.shipment_count(),
        usable_opportunities = calc.usable_rows(),
        skipped_opportunities = opportunities.len() as u64 - calc.usable_rows(),
        "aggregated event rows"
    );

    Ok(Analysis {
        shipments: shipments.finish(),
        opportunities: calc.finish(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carrier::CarrierEntry;
    use crate::process::parse_rows;

    fn vocab() -> OwnershipVocabulary {
        OwnershipVocabulary::default()
    }

    #[test]
    fn test_acme_trucking_breakdown() {
        let tx = parse_rows("carrier,cost\nABCD,100\nABCD,200\n");
        let dir = CarrierDirectory::new(&[CarrierEntry::new("ABCD", "Acme Trucking")]);
        let analysis = analyze(&tx, &[], &dir, &vocab()).unwrap();

        let breakdown = &analysis.shipments.carrier_breakdown;
        assert_eq!(breakdown.len(), 1);
        assert_eq!(breakdown[0].carrier, "Acme Trucking");
        assert_eq!(breakdown[0].shipments, 2);
        assert_eq!(breakdown[0].spend, 300.0);
        assert_eq!(breakdown[0].percentage, 100.0);
    }

    #[test]
    fn test_missed_savings_scenario() {
        let opp = parse_rows(
            "selected_carrier,selected_cost,opportunity_carrier,opportunity_cost,load_id\n\
             XYZ,500,ABCD,400,L1\n",
        );
        let analysis = analyze(&[], &opp, &CarrierDirectory::default(), &vocab()).unwrap();

        let o = &analysis.opportunities;
        assert_eq!(o.missed_savings_by_carrier.len(), 1);
        assert_eq!(o.missed_savings_by_carrier[0].carrier, "XYZ");
        assert_eq!(o.missed_savings_by_carrier[0].opportunities, 1);
        assert_eq!(o.missed_savings_by_carrier[0].savings, 100.0);
        assert_eq!(o.lost_opportunity_total, 100.0);
        assert_eq!(analysis.shipments.shipment_count, 0);
    }

    #[test]
    fn test_no_rows_is_input_error() {
        let err = analyze(&[], &[], &CarrierDirectory::default(), &vocab()).unwrap_err();
        assert!(matches!(err, EngineError::NoInput { .. }));
    }

    #[test]
    fn test_only_invalid_rows_is_input_error() {
        let tx = parse_rows("carrier,cost\n,100\nABCD,abc\n");
        let opp = parse_rows("selected_cost,opportunity_cost\nx,y\n");
        let err = analyze(&tx, &opp, &CarrierDirectory::default(), &vocab()).unwrap_err();
        match err {
            EngineError::NoInput {
                transaction_rows,
                opportunity_rows,
            } => {
                assert_eq!(transaction_rows, 2);
                assert_eq!(opportunity_rows, 1);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_invalid_rows_are_not_counted() {
        let tx = parse_rows("carrier,cost\nABCD,100\n,50\nEFGH,n/a\nEFGH,$1,000\n");
        // "$1,000" unquoted splits into an extra field and is dropped by the parser
        assert_eq!(tx.len(), 3);
        let analysis = analyze(&tx, &[], &CarrierDirectory::default(), &vocab()).unwrap();
        assert_eq!(analysis.shipments.shipment_count, 1);
        assert_eq!(analysis.shipments.total_spend, 100.0);
    }

    #[test]
    fn test_rerun_is_identical() {
        let tx = parse_rows(
            "carrier,cost,ownership,origin_city,dest_city,ship_date\n\
             ABCD,100.10,Brokerage,Dallas,Houston,2024-01-02\n\
             EFGH,200.20,Customer,Austin,Houston,2024-01-03\n\
             ABCD,300.30,,Dallas,Houston,2024-01-04\n\
             IJKL,0.01,Operator,,Houston,\n",
        );
        let opp = parse_rows(
            "load_id,selected_carrier,selected_cost,opportunity_carrier,opportunity_cost\n\
             L1,ABCD,500,EFGH,400\n\
             L2,EFGH,350.5,ABCD,300.25\n",
        );
        let dir = CarrierDirectory::new(&[CarrierEntry::new("ABCD", "Acme Trucking")]);

        let first = analyze(&tx, &opp, &dir, &vocab()).unwrap();
        let second = analyze(&tx, &opp, &dir, &vocab()).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first.digest()).unwrap(),
            serde_json::to_string(&second.digest()).unwrap()
        );
    }
}
