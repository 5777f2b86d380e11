use async_trait::async_trait;

use super::{NarrativeError, NarrativeGenerator, NarrativeOptions};
use crate::aggregate::Analysis;
use crate::process::utils::format_currency;

/// Deterministic fixed-layout narrative. Never fails and never looks at
/// caller instructions or knowledge snippets.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateNarrative;

impl TemplateNarrative {
    pub fn render(&self, analysis: &Analysis) -> String {
        let s = &analysis.shipments;
        let top = if s.top_carriers.is_empty() {
            "none".to_string()
        } else {
            s.top_carriers
                .iter()
                .map(|c| format!("{} ({:.1}%)", c.carrier, c.percentage))
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!(
            "Analyzed {} shipments with total spend of {}.\n\
             Top carriers: {}.\n\
             Missed savings from lower-cost carrier options: {}.",
            s.shipment_count,
            format_currency(s.total_spend),
            top,
            format_currency(analysis.opportunities.lost_opportunity_total),
        )
    }
}

#[async_trait]
impl NarrativeGenerator for TemplateNarrative {
    fn name(&self) -> &str {
        "template"
    }

    async fn generate(
        &self,
        analysis: &Analysis,
        _options: &NarrativeOptions,
    ) -> Result<String, NarrativeError> {
        Ok(self.render(analysis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::analyze;
    use crate::carrier::{CarrierDirectory, CarrierEntry};
    use crate::ownership::OwnershipVocabulary;
    use crate::process::parse_rows;

    #[test]
    fn test_render_layout() {
        let tx = parse_rows(
            "carrier,cost\nABCD,1000\nABCD,500.5\nEFGH,250\nIJKL,10\nMNOP,1\nMNOP,1\n",
        );
        let opp = parse_rows("selected_carrier,selected_cost,opportunity_cost\nABCD,1500,1200\n");
        let dir = CarrierDirectory::new(&[CarrierEntry::new("ABCD", "Acme Trucking")]);
        let analysis = analyze(&tx, &opp, &dir, &OwnershipVocabulary::default()).unwrap();

        assert_eq!(
            TemplateNarrative.render(&analysis),
            "Analyzed 6 shipments with total spend of $1,762.50.\n\
             Top carriers: Acme Trucking (33.3%), MNOP (33.3%), EFGH (16.7%).\n\
             Missed savings from lower-cost carrier options: $300.00."
        );
    }

    #[test]
    fn test_render_without_shipments() {
        let opp = parse_rows("selected_carrier,selected_cost,opportunity_cost\nX,10,5\n");
        let analysis = analyze(
            &[],
            &opp,
            &CarrierDirectory::default(),
            &OwnershipVocabulary::default(),
        )
        .unwrap();
        let text = TemplateNarrative.render(&analysis);
        assert!(text.starts_with("Analyzed 0 shipments with total spend of $0.00."));
        assert!(text.contains("Top carriers: none."));
        assert!(text.ends_with("$5.00."));
    }
}
