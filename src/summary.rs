// src/summary.rs
//! The strategy summary written back for an event, and its building blocks.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::Analysis;
use crate::ownership::{OwnershipBreakdown, OwnershipType};

/// One carrier's share of the valid shipments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierBreakdown {
    pub carrier: String,
    pub shipments: u64,
    pub spend: f64,
    pub percentage: f64,
    pub ownership_type: Option<OwnershipType>,
    pub ownership_breakdown: OwnershipBreakdown,
}

/// Headline entry for the top carriers; no spend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopCarrier {
    pub carrier: String,
    pub shipments: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneSummary {
    /// `"Origin → Destination"`.
    pub lane: String,
    pub shipments: u64,
    pub spend: f64,
}

/// Savings left on the table while `carrier` was the selected carrier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissedSavings {
    pub carrier: String,
    pub opportunities: u64,
    pub savings: f64,
}

/// Complete analytical summary of one CSP event. Always recomputed from
/// scratch and written as a whole; never merged with a previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySummary {
    pub generated_at: DateTime<Utc>,
    pub shipment_count: u64,
    pub lane_count: u64,
    pub total_spend: f64,
    pub brokerage_spend: f64,
    pub brokerage_count: u64,
    pub brokerage_percentage: f64,
    pub customer_direct_spend: f64,
    pub customer_direct_count: u64,
    pub customer_direct_percentage: f64,
    pub date_range_start: Option<NaiveDate>,
    pub date_range_end: Option<NaiveDate>,
    pub top_carriers: Vec<TopCarrier>,
    pub carrier_breakdown: Vec<CarrierBreakdown>,
    pub top_lanes: Vec<LaneSummary>,
    pub missed_savings_by_carrier: Vec<MissedSavings>,
    pub lost_opportunity_count: u64,
    pub lost_opportunity_total: f64,
    pub summary_text: String,
}

impl StrategySummary {
    pub fn assemble(
        analysis: &Analysis,
        summary_text: String,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let s = &analysis.shipments;
        let o = &analysis.opportunities;
        Self {
            generated_at,
            shipment_count: s.shipment_count,
            lane_count: s.lane_count,
            total_spend: s.total_spend,
            brokerage_spend: s.brokerage.spend,
            brokerage_count: s.brokerage.count,
            brokerage_percentage: s.brokerage.percentage,
            customer_direct_spend: s.customer_direct.spend,
            customer_direct_count: s.customer_direct.count,
            customer_direct_percentage: s.customer_direct.percentage,
            date_range_start: s.date_range_start,
            date_range_end: s.date_range_end,
            top_carriers: s.top_carriers.clone(),
            carrier_breakdown: s.carrier_breakdown.clone(),
            top_lanes: s.top_lanes.clone(),
            missed_savings_by_carrier: o.missed_savings_by_carrier.clone(),
            lost_opportunity_count: o.lost_opportunity_count,
            lost_opportunity_total: o.lost_opportunity_total,
            summary_text,
        }
    }
}
