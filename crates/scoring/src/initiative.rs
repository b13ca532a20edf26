//! Quality-initiative sub-score.

use quxat_model::OrganizationQuery;

/// Produces the quality-initiative sub-score of an organization.
///
/// The engine caps the returned value and treats negative or non-finite
/// results as zero.
pub trait InitiativeScorer: Send + Sync {
    fn score(&self, query: &OrganizationQuery) -> f64;

    /// Scorer name for logging.
    fn name(&self) -> &'static str;
}

/// Sums the query's quality signals, ignoring negative and non-finite points.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalSum;

impl InitiativeScorer for SignalSum {
    fn score(&self, query: &OrganizationQuery) -> f64 {
        query
            .quality_signals
            .iter()
            .map(|signal| signal.points)
            .filter(|points| points.is_finite() && *points > 0.0)
            .sum()
    }

    fn name(&self) -> &'static str {
        "signal-sum"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quxat_model::QualitySignal;

    #[test]
    fn test_signal_sum_ignores_bad_points() {
        let query = OrganizationQuery::new("Clinic")
            .with_signal(QualitySignal::new("patient safety", 10.0))
            .with_signal(QualitySignal::new("research", 5.5))
            .with_signal(QualitySignal::new("complaints", -8.0))
            .with_signal(QualitySignal::new("broken", f64::NAN));
        assert_eq!(SignalSum.score(&query), 15.5);
    }
}
