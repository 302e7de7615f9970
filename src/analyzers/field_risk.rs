//! Field-of-study underemployment risk ranking.

use std::cmp::Ordering;

use tracing::{info, warn};

use crate::analyzers::earnings::EarningsProfile;
use crate::analyzers::institutions::Institutions;
use crate::analyzers::scarring::RiskAssessment;
use crate::analyzers::types::{Annotation, Component, FieldRiskRow, FieldRiskTable, Stat};
use crate::analyzers::utility::{flag_rate, median, stat};
use crate::config::{FieldRiskConfig, ProxySource};

/// Picks the proxy actually used for `requested`, recording any fallback.
///
/// Returns `None` when neither the risk flag nor earnings are available.
pub fn choose_proxy(
    requested: ProxySource,
    institutions: &Institutions,
    earnings: &EarningsProfile,
    notes: &mut Vec<Annotation>,
) -> Option<ProxySource> {
    let inputs = [
        institutions.completion.is_some(),
        institutions.earnings.is_some(),
        institutions.repayment.is_some(),
    ];
    let flag_complete = inputs.iter().all(|&a| a);
    let flag_any = inputs.iter().any(|&a| a);

    let (preferred, usable, reason) = match requested {
        ProxySource::Auto => (
            ProxySource::RiskFlag,
            flag_complete,
            "risk flag inputs are not all resolvable",
        ),
        ProxySource::RiskFlag => (ProxySource::RiskFlag, flag_any, "no risk flag input is resolvable"),
        ProxySource::EarningsPercentile => (
            ProxySource::EarningsPercentile,
            earnings.is_available(),
            "earnings are unavailable",
        ),
    };

    if usable {
        return Some(preferred);
    }

    // a partial risk flag is only reachable from `auto` when earnings are gone
    let fallback = match preferred {
        ProxySource::RiskFlag if earnings.is_available() => Some(ProxySource::EarningsPercentile),
        ProxySource::RiskFlag | ProxySource::EarningsPercentile if flag_any => {
            Some(ProxySource::RiskFlag)
        }
        _ => None,
    };

    match fallback {
        Some(used) => notes.push(Annotation::ProxyFallback {
            requested,
            used,
            reason: reason.to_string(),
        }),
        None => {
            warn!("No underemployment proxy can be computed");
            notes.push(Annotation::ComponentDegraded {
                component: Component::FieldRisk,
                reason: "underemployment proxy unavailable: no earnings or risk flag inputs"
                    .to_string(),
            });
        }
    }

    fallback
}

/// Orders rows by descending proxy rate; rows without a value sort last and
/// ties keep catalog order.
fn by_risk_descending(a: &FieldRiskRow, b: &FieldRiskRow) -> Ordering {
    match (a.underemployment_proxy.value(), b.underemployment_proxy.value()) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Computes earnings and proxy rate per catalog field, highest risk first.
#[tracing::instrument(skip_all, fields(fields = institutions.fields.len()))]
pub fn analyze_field_risk(
    institutions: &Institutions,
    assessments: &[RiskAssessment],
    earnings: &EarningsProfile,
    config: &FieldRiskConfig,
    notes: &mut Vec<Annotation>,
) -> FieldRiskTable {
    if institutions.fields.is_empty() {
        notes.push(Annotation::ComponentSkipped {
            component: Component::FieldRisk,
            reason: "no field-of-study columns present".to_string(),
        });
        return FieldRiskTable {
            proxy_source: None,
            rows: Vec::new(),
        };
    }

    let proxy_source = choose_proxy(config.proxy, institutions, earnings, notes);
    let proxy: Option<Vec<Option<bool>>> = match proxy_source {
        Some(ProxySource::RiskFlag) => Some(assessments.iter().map(RiskAssessment::flag).collect()),
        Some(_) => Some(earnings.low_earnings.clone()),
        None => None,
    };

    let mut rows = Vec::with_capacity(institutions.fields.len());

    for field in &institutions.fields {
        let members: Vec<usize> = field
            .column
            .values
            .iter()
            .enumerate()
            .filter(|(_, share)| share.is_some_and(|s| s > config.presence_threshold))
            .map(|(row, _)| row)
            .collect();

        let n_with_earnings = members
            .iter()
            .filter(|&&row| institutions.earnings_at(row).is_some())
            .count();

        let underemployment_proxy = match &proxy {
            Some(flags) => Stat::from_option(flag_rate(flags, &members)),
            None => Stat::Unavailable,
        };

        let low_confidence = members.len() < config.min_institutions;
        if low_confidence {
            notes.push(Annotation::LowConfidence {
                field: field.name.clone(),
                institutions: members.len(),
                minimum: config.min_institutions,
            });
        }

        rows.push(FieldRiskRow {
            field_code: field.code.clone(),
            field_name: field.name.clone(),
            n_institutions: members.len(),
            n_with_earnings,
            median_earnings: stat(institutions.earnings.as_ref(), &members, median),
            underemployment_proxy,
            low_confidence,
        });
    }

    rows.sort_by(by_risk_descending);

    info!(fields = rows.len(), proxy = ?proxy_source, "Analyzed fields of study");

    FieldRiskTable { proxy_source, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::institutions::test_support::institutions;
    use crate::analyzers::scarring::assess_institutions;
    use crate::config::ScarringThresholds;

    const HEADERS: &[&str] = &[
        "C150_4_POOLED_SUPP",
        "MD_EARN_WNE_P10",
        "RPY_3YR_RT_SUPP",
        "PCIP11",
        "PCIP24",
        "PCIP52",
    ];

    fn sample() -> Institutions {
        institutions(
            HEADERS,
            &[
                &["0.85", "80000", "0.90", "0.40", "0.00", "0.20"],
                &["0.70", "65000", "0.80", "0.30", "0.05", "0.30"],
                &["0.25", "28000", "0.35", "0.00", "0.50", "0.20"],
                &["0.40", "31000", "0.45", "0.00", "0.60", "0.05"],
                &["0.20", "26000", "0.30", "0.15", "0.40", "0.40"],
            ],
        )
    }

    fn run(inst: &Institutions, config: &FieldRiskConfig) -> (FieldRiskTable, Vec<Annotation>) {
        let assessments = assess_institutions(inst, &ScarringThresholds::default());
        let earnings = EarningsProfile::compute(inst, config.percentile_cutoff);
        let mut notes = Vec::new();
        let table = analyze_field_risk(inst, &assessments, &earnings, config, &mut notes);
        (table, notes)
    }

    #[test]
    fn test_rows_rank_highest_risk_first() {
        let config = FieldRiskConfig {
            min_institutions: 1,
            ..FieldRiskConfig::default()
        };
        let (table, notes) = run(&sample(), &config);

        assert_eq!(table.proxy_source, Some(ProxySource::RiskFlag));
        let codes: Vec<&str> = table.rows.iter().map(|r| r.field_code.as_str()).collect();
        // liberal arts: rows 2,3,4 -> 2 of 3 flagged; business: rows 0,1,2,4 -> 2 of 4;
        // computer science: rows 0,1,4 -> 1 of 3
        assert_eq!(codes, vec!["PCIP24", "PCIP52", "PCIP11"]);
        assert_eq!(table.rows[0].n_institutions, 3);
        assert_eq!(table.rows[0].median_earnings, Stat::Value(28000.0));
        assert!(notes.is_empty());
    }

    #[test]
    fn test_ranking_is_stable_across_runs() {
        let inst = sample();
        let config = FieldRiskConfig::default();
        let (first, _) = run(&inst, &config);
        let (second, _) = run(&inst, &config);

        let a: Vec<&str> = first.rows.iter().map(|r| r.field_code.as_str()).collect();
        let b: Vec<&str> = second.rows.iter().map(|r| r.field_code.as_str()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_small_fields_are_kept_but_low_confidence() {
        let (table, notes) = run(&sample(), &FieldRiskConfig::default());

        assert_eq!(table.rows.len(), 3);
        assert!(table.rows.iter().all(|r| r.low_confidence));
        assert_eq!(
            notes
                .iter()
                .filter(|n| matches!(n, Annotation::LowConfidence { .. }))
                .count(),
            3
        );
    }

    #[test]
    fn test_auto_falls_back_to_earnings_percentile() {
        let inst = institutions(
            &["MD_EARN_WNE_P10", "PCIP24"],
            &[
                &["20000", "0.5"],
                &["40000", "0.5"],
                &["60000", "0.5"],
                &["80000", "0.0"],
            ],
        );
        let (table, notes) = run(&inst, &FieldRiskConfig::default());

        assert_eq!(table.proxy_source, Some(ProxySource::EarningsPercentile));
        // cutoff is 35000; one of the three liberal arts institutions is below it
        let proxy = table.rows[0].underemployment_proxy.value().unwrap();
        assert!((proxy - 1.0 / 3.0).abs() < 1e-9);
        assert!(notes.iter().any(|n| matches!(n, Annotation::ProxyFallback { .. })));
    }

    #[test]
    fn test_no_proxy_inputs_is_unavailable() {
        let inst = institutions(&["PCTPELL", "PCIP24"], &[&["0.5", "0.5"]]);
        let (table, _) = run(&inst, &FieldRiskConfig::default());

        assert_eq!(table.proxy_source, None);
        assert_eq!(table.rows[0].underemployment_proxy, Stat::Unavailable);
        assert_eq!(table.rows[0].median_earnings, Stat::Unavailable);
    }

    #[test]
    fn test_no_field_columns_skips_component() {
        let inst = institutions(&["MD_EARN_WNE_P10"], &[&["50000"]]);
        let (table, notes) = run(&inst, &FieldRiskConfig::default());

        assert!(table.rows.is_empty());
        assert!(matches!(
            notes[0],
            Annotation::ComponentSkipped { component: Component::FieldRisk, .. }
        ));
    }
}
