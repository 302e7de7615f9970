//! Outcome comparison across public, nonprofit and for-profit institutions.

use tracing::{info, warn};

use crate::analyzers::earnings::EarningsProfile;
use crate::analyzers::institutions::{ControlType, Institutions};
use crate::analyzers::scarring::RiskAssessment;
use crate::analyzers::types::{Annotation, Component, InstitutionTypeRow, Stat};
use crate::analyzers::utility::{flag_rate, mean, median, stat, std_dev};

/// Row indices per control group, in [`ControlType::ALL`] order.
pub fn group_by_control(institutions: &Institutions) -> Vec<(ControlType, Vec<usize>)> {
    ControlType::ALL
        .iter()
        .map(|&control| {
            let rows = institutions
                .control_types()
                .iter()
                .enumerate()
                .filter(|(_, c)| **c == control)
                .map(|(row, _)| row)
                .collect();
            (control, rows)
        })
        .collect()
}

/// One row per control group; all four groups are always present.
#[tracing::instrument(skip_all)]
pub fn compare_institution_types(
    institutions: &Institutions,
    assessments: &[RiskAssessment],
    earnings: &EarningsProfile,
    notes: &mut Vec<Annotation>,
) -> Vec<InstitutionTypeRow> {
    if institutions.control.is_none() {
        warn!("Control column unavailable, every institution grouped as unknown");
        notes.push(Annotation::ComponentDegraded {
            component: Component::InstitutionType,
            reason: "control column unavailable; all institutions grouped as Unknown".to_string(),
        });
    }

    let flags: Vec<Option<bool>> = assessments.iter().map(RiskAssessment::flag).collect();
    let scarring_inputs = institutions.completion.is_some()
        || institutions.earnings.is_some()
        || institutions.repayment.is_some();

    let rows: Vec<InstitutionTypeRow> = group_by_control(institutions)
        .into_iter()
        .map(|(control, rows)| InstitutionTypeRow {
            control_type: control,
            label: control.label().to_string(),
            n_institutions: rows.len(),
            median_earnings: stat(institutions.earnings.as_ref(), &rows, median),
            mean_earnings: stat(institutions.earnings.as_ref(), &rows, mean),
            earnings_stddev: stat(institutions.earnings.as_ref(), &rows, std_dev),
            mean_completion: stat(institutions.completion.as_ref(), &rows, mean),
            mean_pell: stat(institutions.pell.as_ref(), &rows, mean),
            mean_repayment: stat(institutions.repayment.as_ref(), &rows, mean),
            median_repayment: stat(institutions.repayment.as_ref(), &rows, median),
            low_earnings_rate: if earnings.is_available() {
                Stat::from_option(flag_rate(&earnings.low_earnings, &rows))
            } else {
                Stat::Unavailable
            },
            high_risk_rate: if scarring_inputs {
                Stat::from_option(flag_rate(&flags, &rows))
            } else {
                Stat::Unavailable
            },
        })
        .collect();

    info!(groups = rows.len(), "Institution types compared");
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::institutions::test_support::institutions;
    use crate::analyzers::scarring::assess_institutions;
    use crate::config::ScarringThresholds;

    fn run(inst: &Institutions) -> (Vec<InstitutionTypeRow>, Vec<Annotation>) {
        let assessments = assess_institutions(inst, &ScarringThresholds::default());
        let earnings = EarningsProfile::compute(inst, 0.25);
        let mut notes = Vec::new();
        let rows = compare_institution_types(inst, &assessments, &earnings, &mut notes);
        (rows, notes)
    }

    #[test]
    fn test_groups_cover_whole_population() {
        let inst = institutions(
            &["CONTROL", "MD_EARN_WNE_P10", "C150_4"],
            &[
                &["1", "50000", "0.6"],
                &["1", "40000", "0.5"],
                &["2", "60000", "0.8"],
                &["3", "22000", "0.2"],
                &["", "35000", "0.4"],
                &["9", "", ""],
            ],
        );
        let (rows, notes) = run(&inst);

        assert_eq!(rows.len(), 4);
        assert_eq!(rows.iter().map(|r| r.n_institutions).sum::<usize>(), 6);
        assert_eq!(rows[0].control_type, ControlType::Public);
        assert_eq!(rows[0].median_earnings, Stat::Value(45000.0));
        assert_eq!(rows[0].earnings_stddev, Stat::Value(5000.0));
        assert_eq!(rows[2].high_risk_rate, Stat::Value(1.0));
        assert_eq!(rows[3].n_institutions, 2);
        assert!(notes.is_empty());
    }

    #[test]
    fn test_missing_repayment_is_unavailable_only_for_repayment() {
        let inst = institutions(
            &["CONTROL", "MD_EARN_WNE_P10"],
            &[&["1", "50000"], &["2", "60000"]],
        );
        let (rows, _) = run(&inst);

        assert_eq!(rows[0].mean_repayment, Stat::Unavailable);
        assert_eq!(rows[0].median_repayment, Stat::Unavailable);
        assert_eq!(rows[0].mean_earnings, Stat::Value(50000.0));
        assert_eq!(rows[2].mean_earnings, Stat::NoData);
    }

    #[test]
    fn test_missing_control_groups_everything_as_unknown() {
        let inst = institutions(&["MD_EARN_WNE_P10"], &[&["50000"], &["20000"]]);
        let (rows, notes) = run(&inst);

        assert_eq!(rows[3].control_type, ControlType::Unknown);
        assert_eq!(rows[3].n_institutions, 2);
        assert_eq!(rows[0].n_institutions, 0);
        assert!(matches!(
            notes[0],
            Annotation::ComponentDegraded { component: Component::InstitutionType, .. }
        ));
    }
}
