use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::debug;

use super::records::TransactionRecord;
use crate::ownership::{OwnershipBreakdown, OwnershipType, OwnershipVocabulary};
use crate::process::utils::round_to;
use crate::summary::{CarrierBreakdown, LaneSummary, TopCarrier};

pub const TOP_CARRIERS: usize = 3;
pub const TOP_LANES: usize = 5;
pub const UNKNOWN_LANE: &str = "Unknown";

/// Spend and shipment count restricted to one ownership class.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OwnershipSpend {
    pub spend: f64,
    pub count: u64,
    /// Share of all valid shipments.
    pub percentage: f64,
}

/// Everything the transaction-detail fold produces.
#[derive(Debug, Clone, PartialEq)]
pub struct ShipmentStats {
    pub shipment_count: u64,
    /// Distinct lanes with both an origin and a destination.
    pub lane_count: u64,
    pub total_spend: f64,
    pub brokerage: OwnershipSpend,
    pub customer_direct: OwnershipSpend,
    pub date_range_start: Option<NaiveDate>,
    pub date_range_end: Option<NaiveDate>,
    pub top_carriers: Vec<TopCarrier>,
    pub carrier_breakdown: Vec<CarrierBreakdown>,
    pub top_lanes: Vec<LaneSummary>,
}

#[derive(Debug)]
struct CarrierTally {
    name: String,
    shipments: u64,
    spend: f64,
    ownership: OwnershipBreakdown,
}

#[derive(Debug)]
struct LaneTally {
    key: String,
    shipments: u64,
    spend: f64,
}

/// Folds valid transaction records into per-carrier and per-lane tallies.
/// Tallies are kept in first-seen order so that ranking ties stay stable.
pub struct ShipmentAggregator<'a> {
    vocab: &'a OwnershipVocabulary,
    carriers: Vec<CarrierTally>,
    carrier_index: HashMap<String, usize>,
    lanes: Vec<LaneTally>,
    lane_index: HashMap<String, usize>,
    shipments: u64,
    total_spend: f64,
    brokerage: (f64, u64),
    customer_direct: (f64, u64),
    first_date: Option<NaiveDate>,
    last_date: Option<NaiveDate>,
}

/// `"Dallas → Houston"`, or `"Unknown"` when either side is blank.
pub fn lane_key(origin: &str, dest: &str) -> String {
    let (origin, dest) = (origin.trim(), dest.trim());
    if origin.is_empty() || dest.is_empty() {
        UNKNOWN_LANE.to_string()
    } else {
        format!("{} → {}", origin, dest)
    }
}

fn share(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round_to(part as f64 / whole as f64 * 100.0, 1)
    }
}

/// Percent shares to one decimal that add up to exactly 100.0 across the
/// whole list (largest remainder; ties go to the earlier entry).
fn apportion(counts: &[u64], total: u64) -> Vec<f64> {
    if total == 0 {
        return vec![0.0; counts.len()];
    }
    let mut tenths: Vec<u64> = counts.iter().map(|c| c * 1000 / total).collect();
    let assigned: u64 = tenths.iter().sum();

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| (counts[b] * 1000 % total).cmp(&(counts[a] * 1000 % total)));
    for &i in order.iter().take(1000u64.saturating_sub(assigned) as usize) {
        tenths[i] += 1;
    }
    tenths.into_iter().map(|t| t as f64 / 10.0).collect()
}

impl<'a> ShipmentAggregator<'a> {
    pub fn new(vocab: &'a OwnershipVocabulary) -> Self {
        Self {
            vocab,
            carriers: Vec::new(),
            carrier_index: HashMap::new(),
            lanes: Vec::new(),
            lane_index: HashMap::new(),
            shipments: 0,
            total_spend: 0.0,
            brokerage: (0.0, 0),
            customer_direct: (0.0, 0),
            first_date: None,
            last_date: None,
        }
    }

    pub fn add(&mut self, rec: &TransactionRecord) {
        self.shipments += 1;
        self.total_spend += rec.cost;

        let class = self.vocab.classify(&rec.ownership);
        match class {
            Some(OwnershipType::Brokerage) => {
                self.brokerage.0 += rec.cost;
                self.brokerage.1 += 1;
            }
            Some(OwnershipType::CustomerDirect) => {
                self.customer_direct.0 += rec.cost;
                self.customer_direct.1 += 1;
            }
            None => {}
        }

        let idx = match self.carrier_index.get(&rec.carrier) {
            Some(&i) => i,
            None => {
                self.carriers.push(CarrierTally {
                    name: rec.carrier.clone(),
                    shipments: 0,
                    spend: 0.0,
                    ownership: OwnershipBreakdown::default(),
                });
                self.carrier_index
                    .insert(rec.carrier.clone(), self.carriers.len() - 1);
                self.carriers.len() - 1
            }
        };
        let carrier = &mut self.carriers[idx];
        carrier.shipments += 1;
        carrier.spend += rec.cost;
        carrier.ownership.record(class);

        let key = lane_key(&rec.origin_city, &rec.dest_city);
        let idx = match self.lane_index.get(&key) {
            Some(&i) => i,
            None => {
                self.lanes.push(LaneTally {
                    key: key.clone(),
                    shipments: 0,
                    spend: 0.0,
                });
                self.lane_index.insert(key, self.lanes.len() - 1);
                self.lanes.len() - 1
            }
        };
        let lane = &mut self.lanes[idx];
        lane.shipments += 1;
        lane.spend += rec.cost;

        if let Some(d) = rec.ship_date {
            self.first_date = Some(self.first_date.map_or(d, |cur| cur.min(d)));
            self.last_date = Some(self.last_date.map_or(d, |cur| cur.max(d)));
        }
    }

    pub fn shipment_count(&self) -> u64 {
        self.shipments
    }

    pub fn finish(self) -> ShipmentStats {
        let total = self.shipments;

        let mut carriers = self.carriers;
        // stable: equal counts keep first-seen order
        carriers.sort_by(|a, b| b.shipments.cmp(&a.shipments));
        let counts: Vec<u64> = carriers.iter().map(|c| c.shipments).collect();
        let carrier_breakdown: Vec<CarrierBreakdown> = carriers
            .into_iter()
            .zip(apportion(&counts, total))
            .map(|(c, percentage)| CarrierBreakdown {
                percentage,
                ownership_type: c.ownership.majority(),
                carrier: c.name,
                shipments: c.shipments,
                spend: round_to(c.spend, 2),
                ownership_breakdown: c.ownership,
            })
            .collect();

        let top_carriers = carrier_breakdown
            .iter()
            .take(TOP_CARRIERS)
            .map(|c| TopCarrier {
                carrier: c.carrier.clone(),
                shipments: c.shipments,
                percentage: c.percentage,
            })
            .collect();

        let mut lanes: Vec<LaneTally> = self
            .lanes
            .into_iter()
            .filter(|l| l.key != UNKNOWN_LANE)
            .collect();
        let lane_count = lanes.len() as u64;
        lanes.sort_by(|a, b| b.shipments.cmp(&a.shipments));
        let top_lanes = lanes
            .into_iter()
            .take(TOP_LANES)
            .map(|l| LaneSummary {
                lane: l.key,
                shipments: l.shipments,
                spend: round_to(l.spend, 2),
            })
            .collect();

        debug!(
            shipments = total,
            carriers = carrier_breakdown.len(),
            lanes = lane_count,
            "shipment aggregation finished"
        );

        ShipmentStats {
            shipment_count: total,
            lane_count,
            total_spend: round_to(self.total_spend, 2),
            brokerage: OwnershipSpend {
                spend: round_to(self.brokerage.0, 2),
                count: self.brokerage.1,
                percentage: share(self.brokerage.1, total),
            },
            customer_direct: OwnershipSpend {
                spend: round_to(self.customer_direct.0, 2),
                count: self.customer_direct.1,
                percentage: share(self.customer_direct.1, total),
            },
            date_range_start: self.first_date,
            date_range_end: self.last_date,
            top_carriers,
            carrier_breakdown,
            top_lanes,
        }
    }
}
