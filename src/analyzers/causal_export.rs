//! Row-preserving projection of the source table for downstream causal work.
//!
//! No estimation happens here: the export carries the source columns the
//! analyses use, copied verbatim, plus a few derived indicator columns.

use tracing::{info, warn};

use crate::analyzers::earnings::EarningsProfile;
use crate::analyzers::institutions::Institutions;
use crate::analyzers::resolver::{ColumnResolution, SemanticField};
use crate::analyzers::scarring::RiskAssessment;
use crate::analyzers::types::{Annotation, Component};
use crate::config::ExportConfig;
use crate::table::RawTable;

/// Source fields in export order, before the derived columns.
const LEADING: [SemanticField; 4] = [
    SemanticField::UnitId,
    SemanticField::Name,
    SemanticField::State,
    SemanticField::Control,
];

const OUTCOMES: [SemanticField; 7] = [
    SemanticField::Earnings,
    SemanticField::Completion,
    SemanticField::Repayment,
    SemanticField::PellShare,
    SemanticField::LoanShare,
    SemanticField::Enrollment,
    SemanticField::PredominantDegree,
];

/// A rectangular string table ready to be written as CSV.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ExportTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }
}

enum Source {
    Column(usize),
    ControlLabel,
    LowEarnings,
    HighRisk,
    EarningsPercentile,
}

/// Export layout under construction.
struct Layout {
    rename: bool,
    headers: Vec<String>,
    sources: Vec<Source>,
    omitted: Vec<String>,
}

impl Layout {
    fn source_field(&mut self, resolution: &ColumnResolution, field: SemanticField) {
        match resolution.get(field) {
            Some(resolved) => {
                let header = if self.rename {
                    field.export_name().to_string()
                } else {
                    resolved.column.clone()
                };
                self.headers.push(header);
                self.sources.push(Source::Column(resolved.index));
            }
            None => self.omitted.push(field.as_str().to_string()),
        }
    }

    fn derived(&mut self, name: &str, source: Source, available: bool) {
        if !available {
            self.omitted.push(name.to_string());
            return;
        }
        let header = if self.rename {
            name.to_lowercase()
        } else {
            name.to_string()
        };
        self.headers.push(header);
        self.sources.push(source);
    }
}

fn indicator(flag: Option<bool>) -> String {
    match flag {
        Some(true) => "1".to_string(),
        Some(false) => "0".to_string(),
        None => String::new(),
    }
}

/// Builds the export. Row count and order always equal the source table's.
#[tracing::instrument(skip_all, fields(rows = table.len(), rename = config.rename))]
pub fn export_for_causal_analysis(
    table: &RawTable,
    resolution: &ColumnResolution,
    institutions: &Institutions,
    assessments: &[RiskAssessment],
    earnings: &EarningsProfile,
    config: &ExportConfig,
    notes: &mut Vec<Annotation>,
) -> ExportTable {
    let mut layout = Layout {
        rename: config.rename,
        headers: Vec::new(),
        sources: Vec::new(),
        omitted: Vec::new(),
    };

    for field in LEADING {
        layout.source_field(resolution, field);
    }
    layout.derived("CONTROL_LABEL", Source::ControlLabel, institutions.control.is_some());
    for field in OUTCOMES {
        layout.source_field(resolution, field);
    }

    let scarring_inputs = institutions.completion.is_some()
        || institutions.earnings.is_some()
        || institutions.repayment.is_some();
    layout.derived("LOW_EARNINGS", Source::LowEarnings, earnings.is_available());
    layout.derived("HIGH_RISK", Source::HighRisk, scarring_inputs);
    layout.derived(
        "EARNINGS_PERCENTILE",
        Source::EarningsPercentile,
        earnings.is_available(),
    );

    for code in &config.field_codes {
        match table.find_column(code) {
            Some(index) => {
                let header = if config.rename {
                    code.to_lowercase()
                } else {
                    table.headers()[index].clone()
                };
                layout.headers.push(header);
                layout.sources.push(Source::Column(index));
            }
            None => layout.omitted.push(code.clone()),
        }
    }

    let Layout {
        headers,
        sources,
        omitted,
        ..
    } = layout;

    if !omitted.is_empty() {
        warn!(omitted = ?omitted, "Causal export omits unavailable columns");
        notes.push(Annotation::ComponentDegraded {
            component: Component::CausalExport,
            reason: format!("columns omitted: {}", omitted.join(", ")),
        });
    }

    let rows: Vec<Vec<String>> = (0..table.len())
        .map(|row| {
            sources
                .iter()
                .map(|source| match source {
                    Source::Column(index) => table.cell(row, *index).unwrap_or("").to_string(),
                    Source::ControlLabel => institutions.control_type(row).label().to_string(),
                    Source::LowEarnings => indicator(earnings.low_earnings[row]),
                    Source::HighRisk => indicator(assessments[row].flag()),
                    Source::EarningsPercentile => earnings.percentile[row]
                        .map(|p| p.to_string())
                        .unwrap_or_default(),
                })
                .collect()
        })
        .collect();

    info!(rows = rows.len(), columns = headers.len(), "Causal export prepared");

    ExportTable { headers, rows }
}
