use tracing::debug;

use crate::analyzers::institutions::Institutions;
use crate::analyzers::utility::{percentile_ranks, quantile};

/// Earnings-derived columns shared by several analyses.
#[derive(Debug, Clone, PartialEq)]
pub struct EarningsProfile {
    /// Dataset-wide earnings at the configured quantile.
    pub cutoff: Option<f64>,
    /// Percentile rank of each institution's earnings.
    pub percentile: Vec<Option<f64>>,
    /// Earnings strictly below `cutoff`; `None` when earnings are missing.
    pub low_earnings: Vec<Option<bool>>,
}

impl EarningsProfile {
    pub fn compute(institutions: &Institutions, cutoff_quantile: f64) -> Self {
        let Some(earnings) = institutions.earnings.as_ref() else {
            return Self {
                cutoff: None,
                percentile: vec![None; institutions.len()],
                low_earnings: vec![None; institutions.len()],
            };
        };

        let present: Vec<f64> = earnings.values.iter().flatten().copied().collect();
        let cutoff = quantile(&present, cutoff_quantile);

        let low_earnings = earnings
            .values
            .iter()
            .map(|v| match (v, cutoff) {
                (Some(v), Some(c)) => Some(*v < c),
                _ => None,
            })
            .collect();

        debug!(?cutoff, with_earnings = present.len(), "Computed earnings profile");

        Self {
            cutoff,
            percentile: percentile_ranks(&earnings.values),
            low_earnings,
        }
    }

    pub fn is_available(&self) -> bool {
        self.cutoff.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::institutions::test_support::institutions;

    #[test]
    fn test_low_earnings_below_quartile() {
        let inst = institutions(
            &["MD_EARN_WNE_P10"],
            &[&["10000"], &["20000"], &["30000"], &["40000"], &["50000"], &[""]],
        );
        let profile = EarningsProfile::compute(&inst, 0.25);

        assert_eq!(profile.cutoff, Some(20000.0));
        assert_eq!(
            profile.low_earnings,
            vec![Some(true), Some(false), Some(false), Some(false), Some(false), None]
        );
        assert_eq!(profile.percentile[4], Some(1.0));
        assert_eq!(profile.percentile[5], None);
    }

    #[test]
    fn test_unavailable_earnings() {
        let inst = institutions(&["PCTPELL"], &[&["0.5"]]);
        let profile = EarningsProfile::compute(&inst, 0.25);

        assert!(!profile.is_available());
        assert_eq!(profile.low_earnings, vec![None]);
    }
}
