//! High-risk ("scarring") classification of institutions.
//!
//! An institution is flagged when any of three outcome conditions holds:
//! low completion, low earnings or low repayment. Only the inputs present for
//! a row are evaluated; a row with none of them is excluded entirely.

use serde::Serialize;
use tracing::{info, warn};

use crate::analyzers::institutions::Institutions;
use crate::analyzers::types::{Annotation, Component, RiskGroupProfile, ScarringSummary, Stat};
use crate::analyzers::utility::{mean, median, stat};
use crate::config::ScarringThresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScarringCondition {
    LowCompletion,
    LowEarnings,
    LowRepayment,
}

/// Which conditions fired for one institution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Triggers {
    pub completion: bool,
    pub earnings: bool,
    pub repayment: bool,
}

impl Triggers {
    pub fn any(&self) -> bool {
        self.completion || self.earnings || self.repayment
    }

    pub fn conditions(&self) -> Vec<ScarringCondition> {
        let mut out = Vec::new();
        if self.completion {
            out.push(ScarringCondition::LowCompletion);
        }
        if self.earnings {
            out.push(ScarringCondition::LowEarnings);
        }
        if self.repayment {
            out.push(ScarringCondition::LowRepayment);
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskAssessment {
    /// No input present; counted neither as flagged nor clean.
    Excluded,
    Clean,
    Flagged(Triggers),
}

impl RiskAssessment {
    pub fn evaluate(
        completion: Option<f64>,
        earnings: Option<f64>,
        repayment: Option<f64>,
        thresholds: &ScarringThresholds,
    ) -> Self {
        if completion.is_none() && earnings.is_none() && repayment.is_none() {
            return RiskAssessment::Excluded;
        }

        let triggers = Triggers {
            completion: completion.is_some_and(|c| c < thresholds.completion_below),
            earnings: earnings.is_some_and(|e| e < thresholds.earnings_below),
            repayment: repayment.is_some_and(|r| r < thresholds.repayment_below),
        };

        if triggers.any() {
            RiskAssessment::Flagged(triggers)
        } else {
            RiskAssessment::Clean
        }
    }

    /// `Some(true)` flagged, `Some(false)` clean, `None` excluded.
    pub fn flag(&self) -> Option<bool> {
        match self {
            RiskAssessment::Excluded => None,
            RiskAssessment::Clean => Some(false),
            RiskAssessment::Flagged(_) => Some(true),
        }
    }

    pub fn is_flagged(&self) -> bool {
        matches!(self, RiskAssessment::Flagged(_))
    }

    pub fn triggers(&self) -> Triggers {
        match self {
            RiskAssessment::Flagged(t) => *t,
            _ => Triggers::default(),
        }
    }
}

/// Assesses every institution.
pub fn assess_institutions(
    institutions: &Institutions,
    thresholds: &ScarringThresholds,
) -> Vec<RiskAssessment> {
    (0..institutions.len())
        .map(|row| {
            RiskAssessment::evaluate(
                institutions.completion_at(row),
                institutions.earnings_at(row),
                institutions.repayment_at(row),
                thresholds,
            )
        })
        .collect()
}

/// Conditions whose input column resolved, in rule order.
pub fn available_conditions(institutions: &Institutions) -> Vec<ScarringCondition> {
    let mut out = Vec::new();
    if institutions.completion.is_some() {
        out.push(ScarringCondition::LowCompletion);
    }
    if institutions.earnings.is_some() {
        out.push(ScarringCondition::LowEarnings);
    }
    if institutions.repayment.is_some() {
        out.push(ScarringCondition::LowRepayment);
    }
    out
}

fn profile(institutions: &Institutions, rows: &[usize]) -> RiskGroupProfile {
    RiskGroupProfile {
        n_institutions: rows.len(),
        median_earnings: stat(institutions.earnings.as_ref(), rows, median),
        mean_completion: stat(institutions.completion.as_ref(), rows, mean),
        mean_repayment: stat(institutions.repayment.as_ref(), rows, mean),
        mean_pell: stat(institutions.pell.as_ref(), rows, mean),
    }
}

/// Prevalence of the high-risk flag and a flagged-versus-clean comparison.
#[tracing::instrument(skip_all)]
pub fn summarize_scarring(
    institutions: &Institutions,
    assessments: &[RiskAssessment],
    notes: &mut Vec<Annotation>,
) -> ScarringSummary {
    let conditions = available_conditions(institutions);
    match conditions.len() {
        0 => {
            warn!("No scarring inputs resolved");
            notes.push(Annotation::ComponentSkipped {
                component: Component::Scarring,
                reason: "completion, earnings and repayment columns are all unavailable".to_string(),
            });
        }
        3 => {}
        _ => notes.push(Annotation::ComponentDegraded {
            component: Component::Scarring,
            reason: format!(
                "rule evaluated over {} of 3 conditions",
                conditions.len()
            ),
        }),
    }

    let mut flagged_rows = Vec::new();
    let mut clean_rows = Vec::new();
    let mut excluded = 0;
    let mut counts = [0usize; 3];

    for (row, assessment) in assessments.iter().enumerate() {
        match assessment {
            RiskAssessment::Excluded => excluded += 1,
            RiskAssessment::Clean => clean_rows.push(row),
            RiskAssessment::Flagged(t) => {
                flagged_rows.push(row);
                counts[0] += t.completion as usize;
                counts[1] += t.earnings as usize;
                counts[2] += t.repayment as usize;
            }
        }
    }

    let evaluated = flagged_rows.len() + clean_rows.len();
    let flagged_rate = if evaluated == 0 {
        Stat::NoData
    } else {
        Stat::Value(flagged_rows.len() as f64 / evaluated as f64)
    };

    info!(
        evaluated,
        flagged = flagged_rows.len(),
        excluded,
        "Scarring analysis complete"
    );

    ScarringSummary {
        conditions,
        evaluated,
        flagged: flagged_rows.len(),
        clean: clean_rows.len(),
        excluded,
        flagged_rate,
        completion_triggered: counts[0],
        earnings_triggered: counts[1],
        repayment_triggered: counts[2],
        flagged_profile: profile(institutions, &flagged_rows),
        clean_profile: profile(institutions, &clean_rows),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::institutions::test_support::institutions;

    fn thresholds() -> ScarringThresholds {
        ScarringThresholds::default()
    }

    #[test]
    fn test_low_completion_alone_flags() {
        let a = RiskAssessment::evaluate(Some(0.20), Some(50_000.0), Some(0.90), &thresholds());
        assert!(a.is_flagged());
        assert_eq!(a.triggers().conditions(), vec![ScarringCondition::LowCompletion]);
    }

    #[test]
    fn test_healthy_institution_is_clean() {
        let a = RiskAssessment::evaluate(Some(0.80), Some(50_000.0), Some(0.90), &thresholds());
        assert_eq!(a, RiskAssessment::Clean);
        assert_eq!(a.flag(), Some(false));
    }

    #[test]
    fn test_all_inputs_missing_is_excluded() {
        let a = RiskAssessment::evaluate(None, None, None, &thresholds());
        assert_eq!(a, RiskAssessment::Excluded);
        assert_eq!(a.flag(), None);
    }

    #[test]
    fn test_partial_inputs_use_present_conditions() {
        let flagged = RiskAssessment::evaluate(None, Some(25_000.0), None, &thresholds());
        assert_eq!(flagged.triggers().conditions(), vec![ScarringCondition::LowEarnings]);

        let clean = RiskAssessment::evaluate(None, None, Some(0.55), &thresholds());
        assert_eq!(clean, RiskAssessment::Clean);
    }

    #[test]
    fn test_thresholds_are_strict() {
        let a = RiskAssessment::evaluate(Some(0.30), Some(30_000.0), Some(0.40), &thresholds());
        assert_eq!(a, RiskAssessment::Clean);
    }

    #[test]
    fn test_excluded_rows_leave_the_denominator() {
        let inst = institutions(
            &["C150_4_POOLED_SUPP", "MD_EARN_WNE_P10", "RPY_3YR_RT_SUPP"],
            &[
                &["0.20", "50000", "0.90"],
                &["0.80", "50000", "0.90"],
                &["", "", ""],
            ],
        );
        let assessments = assess_institutions(&inst, &thresholds());
        let mut notes = Vec::new();
        let summary = summarize_scarring(&inst, &assessments, &mut notes);

        assert_eq!(summary.flagged, 1);
        assert_eq!(summary.clean, 1);
        assert_eq!(summary.excluded, 1);
        assert_eq!(summary.evaluated, 2);
        assert_eq!(summary.flagged_rate, Stat::Value(0.5));
        assert_eq!(summary.completion_triggered, 1);
        assert_eq!(summary.flagged_profile.median_earnings, Stat::Value(50_000.0));
        assert!(notes.is_empty());
    }

    #[test]
    fn test_missing_repayment_column_degrades() {
        let inst = institutions(
            &["C150_4_POOLED_SUPP", "MD_EARN_WNE_P10"],
            &[&["0.50", "20000"], &["0.60", "60000"]],
        );
        let assessments = assess_institutions(&inst, &thresholds());
        let mut notes = Vec::new();
        let summary = summarize_scarring(&inst, &assessments, &mut notes);

        assert_eq!(summary.conditions.len(), 2);
        assert_eq!(summary.flagged, 1);
        assert_eq!(summary.clean_profile.mean_repayment, Stat::Unavailable);
        assert!(matches!(
            notes[0],
            Annotation::ComponentDegraded { component: Component::Scarring, .. }
        ));
    }
}
