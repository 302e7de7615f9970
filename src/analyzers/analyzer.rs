use chrono::Utc;
use tracing::info;

use crate::analyzers::causal_export::{ExportTable, export_for_causal_analysis};
use crate::analyzers::completion::analyze_completion_gradient;
use crate::analyzers::earnings::EarningsProfile;
use crate::analyzers::field_risk::analyze_field_risk;
use crate::analyzers::institution_type::compare_institution_types;
use crate::analyzers::institutions::Institutions;
use crate::analyzers::resolver::{ColumnResolution, resolve_columns};
use crate::analyzers::scarring::{RiskAssessment, assess_institutions, summarize_scarring};
use crate::analyzers::socioeconomic::stratify_by_pell;
use crate::analyzers::types::{Annotation, ResultBundle, ScarringSummary, SummaryStats};
use crate::analyzers::utility::{median, stat};
use crate::config::AnalysisConfig;
use crate::table::RawTable;

pub const SCHEMA_VERSION: u8 = 1;

/// Runs every analysis over one loaded table.
///
/// Column resolution and the per-row derived values (earnings percentiles,
/// risk assessments) are computed once and shared by all components.
pub struct Analyzer<'a> {
    table: &'a RawTable,
    config: &'a AnalysisConfig,
    resolution: ColumnResolution,
    institutions: Institutions,
    earnings: EarningsProfile,
    assessments: Vec<RiskAssessment>,
}

impl<'a> Analyzer<'a> {
    #[tracing::instrument(skip_all, fields(rows = table.len()))]
    pub fn new(table: &'a RawTable, config: &'a AnalysisConfig) -> Self {
        let resolution = resolve_columns(table, config);
        let institutions = Institutions::from_table(table, &resolution);
        let earnings = EarningsProfile::compute(&institutions, config.field_risk.percentile_cutoff);
        let assessments = assess_institutions(&institutions, &config.scarring);

        Self {
            table,
            config,
            resolution,
            institutions,
            earnings,
            assessments,
        }
    }

    pub fn resolution(&self) -> &ColumnResolution {
        &self.resolution
    }

    /// Runs all six analyses and collects their annotations.
    #[tracing::instrument(skip_all)]
    pub fn run(&self) -> ResultBundle {
        let mut annotations = self.resolution.annotations(self.config);

        let field_risk = analyze_field_risk(
            &self.institutions,
            &self.assessments,
            &self.earnings,
            &self.config.field_risk,
            &mut annotations,
        );
        let completion_gradient = analyze_completion_gradient(
            &self.institutions,
            &self.config.completion,
            &mut annotations,
        );
        let institution_types = compare_institution_types(
            &self.institutions,
            &self.assessments,
            &self.earnings,
            &mut annotations,
        );
        let socioeconomic = stratify_by_pell(
            &self.institutions,
            &self.earnings,
            &self.config.pell,
            &mut annotations,
        );
        let scarring = summarize_scarring(&self.institutions, &self.assessments, &mut annotations);

        info!(
            institutions = self.institutions.len(),
            annotations = annotations.len(),
            "Analysis complete"
        );

        ResultBundle {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            source: None,
            summary: self.summary(&scarring),
            resolution: self.resolution.clone(),
            field_risk,
            completion_gradient,
            institution_types,
            socioeconomic,
            scarring,
            annotations,
        }
    }

    pub fn summary(&self, scarring: &ScarringSummary) -> SummaryStats {
        let rows = self.institutions.all_rows();
        let inst = &self.institutions;

        SummaryStats {
            total_institutions: inst.len(),
            institutions_with_earnings: (0..inst.len())
                .filter(|&row| inst.earnings_at(row).is_some())
                .count(),
            median_earnings: stat(inst.earnings.as_ref(), &rows, median),
            median_completion_rate: stat(inst.completion.as_ref(), &rows, median),
            median_pell_share: stat(inst.pell.as_ref(), &rows, median),
            flagged_institutions: scarring.flagged,
            flagged_rate: scarring.flagged_rate,
        }
    }

    /// The row-preserving export with its own annotations.
    pub fn causal_export(&self) -> (ExportTable, Vec<Annotation>) {
        let mut notes = Vec::new();
        let export = export_for_causal_analysis(
            self.table,
            &self.resolution,
            &self.institutions,
            &self.assessments,
            &self.earnings,
            &self.config.export,
            &mut notes,
        );
        (export, notes)
    }
}

/// Resolves, analyzes and bundles `table` in one call.
pub fn analyze(table: &RawTable, config: &AnalysisConfig) -> ResultBundle {
    Analyzer::new(table, config).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::institutions::test_support::raw_table;
    use crate::analyzers::types::{Component, Stat};

    fn table() -> RawTable {
        raw_table(
            &["UNITID", "CONTROL", "MD_EARN_WNE_P10", "C150_4", "PCTPELL", "PCIP24"],
            &[
                &["1", "1", "52000", "0.70", "0.20", "0.30"],
                &["2", "2", "61000", "0.85", "0.10", "0.00"],
                &["3", "3", "24000", "0.25", "0.80", "0.50"],
                &["4", "1", "39000", "0.45", "0.55", "0.20"],
            ],
        )
    }

    #[test]
    fn test_run_fills_every_component() {
        let t = table();
        let config = AnalysisConfig::default();
        let bundle = analyze(&t, &config);

        assert_eq!(bundle.schema_version, SCHEMA_VERSION);
        assert_eq!(bundle.summary.total_institutions, 4);
        assert_eq!(bundle.summary.median_earnings, Stat::Value(45500.0));
        assert_eq!(bundle.field_risk.rows.len(), 1);
        assert_eq!(bundle.completion_gradient.len(), 4);
        assert_eq!(bundle.institution_types.len(), 4);
        assert_eq!(bundle.socioeconomic.bands.len(), 4);
        assert_eq!(bundle.scarring.flagged, 1);
        assert_eq!(bundle.summary.flagged_institutions, 1);
    }

    #[test]
    fn test_missing_repayment_is_annotated_and_unavailable() {
        let t = table();
        let config = AnalysisConfig::default();
        let bundle = analyze(&t, &config);

        assert!(bundle.annotations.iter().any(|a| matches!(
            a,
            Annotation::ComponentDegraded { component: Component::Scarring, .. }
        )));
        assert!(bundle
            .institution_types
            .iter()
            .all(|r| r.mean_repayment == Stat::Unavailable));
        assert_eq!(bundle.institution_types[0].mean_earnings, Stat::Value(45500.0));
    }

    #[test]
    fn test_causal_export_keeps_row_count() {
        let t = table();
        let config = AnalysisConfig::default();
        let (export, _) = Analyzer::new(&t, &config).causal_export();
        assert_eq!(export.len(), t.len());
    }
}
