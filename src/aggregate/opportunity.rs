use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::records::OpportunityRecord;
use crate::process::utils::round_to;
use crate::summary::MissedSavings;

pub const TOP_MISSED_SAVINGS: usize = 5;

/// Everything the low-cost-opportunity fold produces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpportunityStats {
    /// Rows whose costs parsed, whether or not they were a missed saving.
    pub usable_rows: u64,
    pub missed_savings_by_carrier: Vec<MissedSavings>,
    /// Distinct loads with at least one cheaper alternative.
    pub lost_opportunity_count: u64,
    pub lost_opportunity_total: f64,
}

/// Folds opportunity records into per-selected-carrier missed savings.
/// Independent of the transaction fold; no join key is enforced.
#[derive(Debug, Default)]
pub struct OpportunityCalculator {
    tallies: Vec<MissedSavings>,
    index: HashMap<String, usize>,
    loads: HashSet<String>,
    /// Missed-saving rows without a load id; each counts as its own load.
    blank_loads: u64,
    usable_rows: u64,
    total: f64,
}

impl OpportunityCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rec: &OpportunityRecord) {
        self.usable_rows += 1;
        let diff = rec.missed_savings();
        if diff <= 0.0 {
            return;
        }

        self.total += diff;
        if rec.load_id.is_empty() {
            self.blank_loads += 1;
        } else {
            self.loads.insert(rec.load_id.clone());
        }

        let idx = match self.index.get(&rec.selected_carrier) {
            Some(&i) => i,
            None => {
                self.tallies.push(MissedSavings {
                    carrier: rec.selected_carrier.clone(),
                    opportunities: 0,
                    savings: 0.0,
                });
                self.index
                    .insert(rec.selected_carrier.clone(), self.tallies.len() - 1);
                self.tallies.len() - 1
            }
        };
        let tally = &mut self.tallies[idx];
        tally.opportunities += 1;
        tally.savings += diff;
    }

    pub fn usable_rows(&self) -> u64 {
        self.usable_rows
    }

    pub fn finish(self) -> OpportunityStats {
        let mut tallies = self.tallies;
        tallies.sort_by(|a, b| b.savings.total_cmp(&a.savings));
        tallies.truncate(TOP_MISSED_SAVINGS);
        for t in tallies.iter_mut() {
            t.savings = round_to(t.savings, 2);
        }

        let lost_opportunity_count = self.loads.len() as u64 + self.blank_loads;
        debug!(
            rows = self.usable_rows,
            loads = lost_opportunity_count,
            total = self.total,
            "opportunity aggregation finished"
        );

        OpportunityStats {
            usable_rows: self.usable_rows,
            missed_savings_by_carrier: tallies,
            lost_opportunity_count,
            lost_opportunity_total: round_to(self.total, 2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(load: &str, selected: &str, sel_cost: f64, opp: &str, opp_cost: f64) -> OpportunityRecord {
        OpportunityRecord {
            load_id: load.to_string(),
            selected_carrier: selected.to_string(),
            selected_cost: sel_cost,
            opportunity_carrier: opp.to_string(),
            opportunity_cost: opp_cost,
        }
    }

    fn fold(records: &[OpportunityRecord]) -> OpportunityStats {
        let mut calc = OpportunityCalculator::new();
        for r in records {
            calc.add(r);
        }
        calc.finish()
    }

    #[test]
    fn test_single_missed_saving() {
        let stats = fold(&[rec("L1", "XYZ", 500.0, "ABCD", 400.0)]);
        assert_eq!(
            stats.missed_savings_by_carrier,
            vec![MissedSavings {
                carrier: "XYZ".into(),
                opportunities: 1,
                savings: 100.0,
            }]
        );
        assert_eq!(stats.lost_opportunity_total, 100.0);
        assert_eq!(stats.lost_opportunity_count, 1);
    }

    #[test]
    fn test_non_positive_diffs_do_not_count() {
        let stats = fold(&[
            rec("L1", "XYZ", 400.0, "ABCD", 400.0),
            rec("L2", "XYZ", 300.0, "ABCD", 350.0),
        ]);
        assert!(stats.missed_savings_by_carrier.is_empty());
        assert_eq!(stats.lost_opportunity_total, 0.0);
        assert_eq!(stats.lost_opportunity_count, 0);
        assert_eq!(stats.usable_rows, 2);
    }

    #[test]
    fn test_savings_sum_per_selected_carrier() {
        let stats = fold(&[
            rec("L1", "XYZ", 500.0, "ABCD", 400.0),
            rec("L1", "XYZ", 500.0, "EFGH", 450.0),
            rec("L2", "QRS", 900.0, "ABCD", 600.0),
            rec("L3", "XYZ", 100.0, "ABCD", 120.0),
        ]);
        assert_eq!(stats.missed_savings_by_carrier.len(), 2);
        assert_eq!(stats.missed_savings_by_carrier[0].carrier, "QRS");
        assert_eq!(stats.missed_savings_by_carrier[0].savings, 300.0);
        assert_eq!(stats.missed_savings_by_carrier[1].carrier, "XYZ");
        assert_eq!(stats.missed_savings_by_carrier[1].opportunities, 2);
        assert_eq!(stats.missed_savings_by_carrier[1].savings, 150.0);
        assert_eq!(stats.lost_opportunity_total, 450.0);
        // L1 appears twice but is one load
        assert_eq!(stats.lost_opportunity_count, 2);
    }

    #[test]
    fn test_top_five_only_but_total_covers_all() {
        let records: Vec<OpportunityRecord> = (1..=7)
            .map(|i| rec(&format!("L{}", i), &format!("C{}", i), 100.0 + i as f64, "Z", 100.0))
            .collect();
        let stats = fold(&records);
        let carriers: Vec<&str> = stats
            .missed_savings_by_carrier
            .iter()
            .map(|m| m.carrier.as_str())
            .collect();
        assert_eq!(carriers, vec!["C7", "C6", "C5", "C4", "C3"]);
        assert_eq!(stats.lost_opportunity_total, 28.0);
        assert_eq!(stats.lost_opportunity_count, 7);
    }

    #[test]
    fn test_blank_load_ids_count_individually() {
        let stats = fold(&[
            rec("", "XYZ", 10.0, "A", 5.0),
            rec("", "XYZ", 10.0, "A", 5.0),
        ]);
        assert_eq!(stats.lost_opportunity_count, 2);
    }

    #[test]
    fn test_blank_load_ids_do_not_merge_with_real_ids() {
        let stats = fold(&[
            rec("", "XYZ", 10.0, "A", 5.0),
            rec("#row-1", "XYZ", 10.0, "A", 5.0),
            rec("#row-1", "QRS", 20.0, "A", 5.0),
        ]);
        assert_eq!(stats.lost_opportunity_count, 2);
    }
}
