//! Outcomes stratified by the share of Pell grant recipients.

use serde::Serialize;
use tracing::{info, warn};

use crate::analyzers::earnings::EarningsProfile;
use crate::analyzers::institutions::{ControlType, Institutions};
use crate::analyzers::types::{
    Annotation, Component, PellBandRow, PellControlRow, SocioeconomicTables, Stat,
};
use crate::analyzers::utility::{flag_rate, mean, median, stat};
use crate::config::{PellConfig, ShareScale};

/// Pell-share band, closed on the lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PellBand {
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl PellBand {
    pub const ALL: [PellBand; 4] = [
        PellBand::Low,
        PellBand::Moderate,
        PellBand::High,
        PellBand::VeryHigh,
    ];

    /// Band of a Pell share, `None` outside 0..=100%.
    pub fn classify(share: f64, scale: ShareScale) -> Option<PellBand> {
        let fraction = match scale {
            ShareScale::Fraction => share,
            ShareScale::Percent => share / 100.0,
        };

        if !(0.0..=1.0).contains(&fraction) {
            return None;
        }

        Some(if fraction < 0.25 {
            PellBand::Low
        } else if fraction < 0.50 {
            PellBand::Moderate
        } else if fraction < 0.75 {
            PellBand::High
        } else {
            PellBand::VeryHigh
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            PellBand::Low => "Low (<25%)",
            PellBand::Moderate => "Moderate (25-50%)",
            PellBand::High => "High (50-75%)",
            PellBand::VeryHigh => "Very High (75-100%)",
        }
    }
}

fn low_earnings_rate(earnings: &EarningsProfile, rows: &[usize]) -> Stat {
    if earnings.is_available() {
        Stat::from_option(flag_rate(&earnings.low_earnings, rows))
    } else {
        Stat::Unavailable
    }
}

/// Per-band outcomes and, when enabled, the band by control cross-tab.
#[tracing::instrument(skip_all)]
pub fn stratify_by_pell(
    institutions: &Institutions,
    earnings: &EarningsProfile,
    config: &PellConfig,
    notes: &mut Vec<Annotation>,
) -> SocioeconomicTables {
    let Some(pell) = institutions.pell.as_ref() else {
        warn!("Pell share unavailable, skipping socioeconomic analysis");
        notes.push(Annotation::ComponentSkipped {
            component: Component::Socioeconomic,
            reason: "Pell share column unavailable".to_string(),
        });
        return SocioeconomicTables::default();
    };

    let mut out_of_range = 0;
    let bands: Vec<Option<PellBand>> = pell
        .values
        .iter()
        .map(|value| {
            let share = (*value)?;
            let band = PellBand::classify(share, config.scale);
            if band.is_none() {
                out_of_range += 1;
            }
            band
        })
        .collect();

    if out_of_range > 0 {
        warn!(out_of_range, column = %pell.name, "Pell shares outside 0-100%");
        notes.push(Annotation::OutOfRange {
            component: Component::Socioeconomic,
            column: pell.name.clone(),
            count: out_of_range,
        });
    }

    let rows_in = |band: PellBand, control: Option<ControlType>| -> Vec<usize> {
        bands
            .iter()
            .enumerate()
            .filter(|(row, b)| {
                **b == Some(band)
                    && control.is_none_or(|c| institutions.control_type(*row) == c)
            })
            .map(|(row, _)| row)
            .collect()
    };

    let band_rows: Vec<PellBandRow> = PellBand::ALL
        .iter()
        .map(|&band| {
            let rows = rows_in(band, None);
            PellBandRow {
                band,
                label: band.label().to_string(),
                n_institutions: rows.len(),
                median_earnings: stat(institutions.earnings.as_ref(), &rows, median),
                mean_completion: stat(institutions.completion.as_ref(), &rows, mean),
                mean_repayment: stat(institutions.repayment.as_ref(), &rows, mean),
                low_earnings_rate: low_earnings_rate(earnings, &rows),
            }
        })
        .collect();

    let mut by_control = Vec::new();
    if config.by_control {
        for band in PellBand::ALL {
            for control in ControlType::ALL {
                let rows = rows_in(band, Some(control));
                by_control.push(PellControlRow {
                    band,
                    band_label: band.label().to_string(),
                    control_type: control,
                    control_label: control.label().to_string(),
                    n_institutions: rows.len(),
                    median_earnings: stat(institutions.earnings.as_ref(), &rows, median),
                    mean_completion: stat(institutions.completion.as_ref(), &rows, mean),
                });
            }
        }
    }

    info!(
        banded = band_rows.iter().map(|r| r.n_institutions).sum::<usize>(),
        out_of_range,
        "Socioeconomic stratification complete"
    );

    SocioeconomicTables {
        bands: band_rows,
        by_control,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::institutions::test_support::institutions;

    fn run(inst: &Institutions, config: &PellConfig) -> (SocioeconomicTables, Vec<Annotation>) {
        let earnings = EarningsProfile::compute(inst, 0.25);
        let mut notes = Vec::new();
        let tables = stratify_by_pell(inst, &earnings, config, &mut notes);
        (tables, notes)
    }

    #[test]
    fn test_boundaries_go_to_higher_band() {
        let s = ShareScale::Fraction;
        assert_eq!(PellBand::classify(0.0, s), Some(PellBand::Low));
        assert_eq!(PellBand::classify(0.2499, s), Some(PellBand::Low));
        assert_eq!(PellBand::classify(0.25, s), Some(PellBand::Moderate));
        assert_eq!(PellBand::classify(0.50, s), Some(PellBand::High));
        assert_eq!(PellBand::classify(0.75, s), Some(PellBand::VeryHigh));
        assert_eq!(PellBand::classify(1.0, s), Some(PellBand::VeryHigh));
        assert_eq!(PellBand::classify(1.01, s), None);
        assert_eq!(PellBand::classify(-0.1, s), None);
    }

    #[test]
    fn test_percent_scale() {
        assert_eq!(PellBand::classify(25.0, ShareScale::Percent), Some(PellBand::Moderate));
        assert_eq!(PellBand::classify(100.0, ShareScale::Percent), Some(PellBand::VeryHigh));
    }

    #[test]
    fn test_band_counts_sum_to_in_range_population() {
        let inst = institutions(
            &["PCTPELL", "CONTROL", "MD_EARN_WNE_P10", "C150_4"],
            &[
                &["0.10", "1", "60000", "0.8"],
                &["0.25", "1", "50000", "0.6"],
                &["0.50", "2", "40000", "0.5"],
                &["0.75", "3", "25000", "0.3"],
                &["0.90", "3", "20000", "0.2"],
                &["", "1", "45000", "0.5"],
                &["1.50", "1", "45000", "0.5"],
            ],
        );
        let (tables, notes) = run(&inst, &PellConfig::default());

        let counts: Vec<usize> = tables.bands.iter().map(|r| r.n_institutions).collect();
        assert_eq!(counts, vec![1, 1, 1, 2]);
        assert_eq!(tables.bands[3].median_earnings, Stat::Value(22500.0));
        assert_eq!(tables.bands[0].mean_repayment, Stat::Unavailable);
        assert!(matches!(
            notes[0],
            Annotation::OutOfRange { component: Component::Socioeconomic, count: 1, .. }
        ));

        assert_eq!(tables.by_control.len(), 16);
        let very_high_for_profit = tables
            .by_control
            .iter()
            .find(|r| r.band == PellBand::VeryHigh && r.control_type == ControlType::PrivateForProfit)
            .unwrap();
        assert_eq!(very_high_for_profit.n_institutions, 2);
        assert_eq!(
            tables.by_control.iter().map(|r| r.n_institutions).sum::<usize>(),
            5
        );
    }

    #[test]
    fn test_cross_tab_can_be_disabled() {
        let inst = institutions(&["PCTPELL"], &[&["0.4"]]);
        let config = PellConfig {
            by_control: false,
            ..PellConfig::default()
        };
        let (tables, _) = run(&inst, &config);
        assert!(tables.by_control.is_empty());
        assert_eq!(tables.bands[1].low_earnings_rate, Stat::Unavailable);
    }

    #[test]
    fn test_missing_pell_skips() {
        let inst = institutions(&["MD_EARN_WNE_P10"], &[&["40000"]]);
        let (tables, notes) = run(&inst, &PellConfig::default());

        assert!(tables.bands.is_empty());
        assert!(matches!(
            notes[0],
            Annotation::ComponentSkipped { component: Component::Socioeconomic, .. }
        ));
    }
}
