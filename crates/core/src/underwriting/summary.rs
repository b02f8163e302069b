use serde::{Deserialize, Serialize};

use crate::domain::decision::Classification;

/// Tally of one underwriting run across a batch of policies. Accumulated by
/// the pipeline, rendered for operators once the run completes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_processed: u64,
    pub safe_count: u64,
    pub not_safe_count: u64,
    pub errors: Vec<String>,
}

impl RunSummary {
    pub fn record(&mut self, classification: Classification) {
        self.total_processed += 1;
        match classification {
            Classification::Safe => self.safe_count += 1,
            Classification::NotSafe => self.not_safe_count += 1,
        }
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn safe_share_pct(&self) -> f64 {
        share_pct(self.safe_count, self.total_processed)
    }

    pub fn not_safe_share_pct(&self) -> f64 {
        share_pct(self.not_safe_count, self.total_processed)
    }

    pub fn render(&self) -> String {
        let mut lines = vec![
            "UNDERWRITING RUN COMPLETED".to_string(),
            "==========================".to_string(),
            format!("Total policies processed: {}", self.total_processed),
            format!("SAFE: {} ({:.1}%)", self.safe_count, self.safe_share_pct()),
            format!("NOT SAFE: {} ({:.1}%)", self.not_safe_count, self.not_safe_share_pct()),
            format!("Errors: {}", self.errors.len()),
        ];

        if !self.errors.is_empty() {
            lines.push("Errors encountered:".to_string());
            for error in self.errors.iter().take(3) {
                lines.push(format!("- {error}"));
            }
            if self.errors.len() > 3 {
                lines.push(format!("- ... and {} more", self.errors.len() - 3));
            }
        }

        lines.join("\n")
    }
}

fn share_pct(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (count as f64 / total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::decision::Classification;

    use super::RunSummary;

    #[test]
    fn tallies_classifications_and_percentages() {
        let mut summary = RunSummary::default();
        summary.record(Classification::Safe);
        summary.record(Classification::Safe);
        summary.record(Classification::Safe);
        summary.record(Classification::NotSafe);

        assert_eq!(summary.total_processed, 4);
        assert_eq!(summary.safe_count, 3);
        assert_eq!(summary.not_safe_count, 1);
        assert_eq!(summary.safe_share_pct(), 75.0);
        assert_eq!(summary.not_safe_share_pct(), 25.0);
    }

    #[test]
    fn empty_run_renders_without_dividing_by_zero() {
        let rendered = RunSummary::default().render();
        assert!(rendered.contains("Total policies processed: 0"));
        assert!(rendered.contains("SAFE: 0 (0.0%)"));
    }

    #[test]
    fn render_caps_error_listing_at_three() {
        let mut summary = RunSummary::default();
        for index in 0..5 {
            summary.record_error(format!("policy_{index} failed"));
        }

        let rendered = summary.render();
        assert!(rendered.contains("Errors: 5"));
        assert!(rendered.contains("policy_0 failed"));
        assert!(rendered.contains("policy_2 failed"));
        assert!(!rendered.contains("policy_3 failed"));
        assert!(rendered.contains("... and 2 more"));
    }
}
