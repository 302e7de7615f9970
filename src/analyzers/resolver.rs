//! Maps semantic fields onto the columns actually present in a table.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::analyzers::types::{Annotation, Component};
use crate::config::AnalysisConfig;
use crate::table::RawTable;

/// How a field's cells are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Parsed as a number; suppression markers become missing.
    Numeric,
    /// Copied as-is.
    Text,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Numeric => "numeric",
            FieldKind::Text => "text",
        }
    }
}

/// A logical input the analyses need, independent of its column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticField {
    UnitId,
    Name,
    State,
    Control,
    Earnings,
    Completion,
    Repayment,
    PellShare,
    LoanShare,
    Enrollment,
    PredominantDegree,
}

impl SemanticField {
    pub const ALL: [SemanticField; 11] = [
        SemanticField::UnitId,
        SemanticField::Name,
        SemanticField::State,
        SemanticField::Control,
        SemanticField::Earnings,
        SemanticField::Completion,
        SemanticField::Repayment,
        SemanticField::PellShare,
        SemanticField::LoanShare,
        SemanticField::Enrollment,
        SemanticField::PredominantDegree,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticField::UnitId => "unit_id",
            SemanticField::Name => "name",
            SemanticField::State => "state",
            SemanticField::Control => "control",
            SemanticField::Earnings => "earnings",
            SemanticField::Completion => "completion",
            SemanticField::Repayment => "repayment",
            SemanticField::PellShare => "pell_share",
            SemanticField::LoanShare => "loan_share",
            SemanticField::Enrollment => "enrollment",
            SemanticField::PredominantDegree => "predominant_degree",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            SemanticField::UnitId | SemanticField::Name | SemanticField::State => FieldKind::Text,
            SemanticField::Control
            | SemanticField::Earnings
            | SemanticField::Completion
            | SemanticField::Repayment
            | SemanticField::PellShare
            | SemanticField::LoanShare
            | SemanticField::Enrollment
            | SemanticField::PredominantDegree => FieldKind::Numeric,
        }
    }

    /// Column name used when the causal export is renamed.
    pub fn export_name(&self) -> &'static str {
        match self {
            SemanticField::UnitId => "unit_id",
            SemanticField::Name => "institution_name",
            SemanticField::State => "state",
            SemanticField::Control => "control",
            SemanticField::Earnings => "median_earnings",
            SemanticField::Completion => "completion_rate",
            SemanticField::Repayment => "repayment_rate",
            SemanticField::PellShare => "pell_share",
            SemanticField::LoanShare => "federal_loan_share",
            SemanticField::Enrollment => "undergrad_enrollment",
            SemanticField::PredominantDegree => "predominant_degree",
        }
    }

    /// Components that skip or degrade when this field is unavailable.
    pub fn dependents(&self) -> &'static [Component] {
        match self {
            SemanticField::Earnings => &[
                Component::FieldRisk,
                Component::CompletionGradient,
                Component::InstitutionType,
                Component::Socioeconomic,
                Component::Scarring,
                Component::CausalExport,
            ],
            SemanticField::Completion => &[
                Component::CompletionGradient,
                Component::InstitutionType,
                Component::Socioeconomic,
                Component::Scarring,
                Component::CausalExport,
            ],
            SemanticField::Repayment => &[
                Component::CompletionGradient,
                Component::InstitutionType,
                Component::Socioeconomic,
                Component::Scarring,
                Component::CausalExport,
            ],
            SemanticField::PellShare => &[
                Component::CompletionGradient,
                Component::InstitutionType,
                Component::Socioeconomic,
                Component::CausalExport,
            ],
            SemanticField::Control => &[
                Component::InstitutionType,
                Component::Socioeconomic,
                Component::CausalExport,
            ],
            SemanticField::UnitId
            | SemanticField::Name
            | SemanticField::State
            | SemanticField::LoanShare
            | SemanticField::Enrollment
            | SemanticField::PredominantDegree => &[Component::CausalExport],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedColumn {
    pub field: SemanticField,
    pub kind: FieldKind,
    pub column: String,
    #[serde(skip)]
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedFieldShare {
    pub code: String,
    pub name: String,
    pub column: String,
    #[serde(skip)]
    pub index: usize,
}

/// Which semantic fields and catalog fields a table provides.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnResolution {
    pub resolved: Vec<ResolvedColumn>,
    pub unavailable: Vec<SemanticField>,
    pub field_shares: Vec<ResolvedFieldShare>,
    pub missing_field_codes: Vec<String>,
}

impl ColumnResolution {
    pub fn get(&self, field: SemanticField) -> Option<&ResolvedColumn> {
        self.resolved.iter().find(|r| r.field == field)
    }

    pub fn is_available(&self, field: SemanticField) -> bool {
        self.get(field).is_some()
    }

    /// One annotation per unavailable semantic field and missing catalog field.
    pub fn annotations(&self, config: &AnalysisConfig) -> Vec<Annotation> {
        let mut notes: Vec<Annotation> = self
            .unavailable
            .iter()
            .map(|&field| Annotation::ColumnUnavailable {
                field,
                aliases: config.aliases.for_field(field).to_vec(),
                affects: field.dependents().to_vec(),
            })
            .collect();

        notes.extend(self.missing_field_codes.iter().map(|code| {
            Annotation::FieldColumnMissing {
                code: code.clone(),
                field: config.field_name(code).unwrap_or(code.as_str()).to_string(),
            }
        }));

        notes
    }
}

/// Resolves every semantic field and catalog entry against `table`'s header.
///
/// Never fails: anything not found is listed as unavailable.
#[tracing::instrument(skip_all, fields(columns = table.headers().len()))]
pub fn resolve_columns(table: &RawTable, config: &AnalysisConfig) -> ColumnResolution {
    let mut resolution = ColumnResolution::default();

    for field in SemanticField::ALL {
        let found = config
            .aliases
            .for_field(field)
            .iter()
            .find_map(|alias| table.find_column(alias));

        match found {
            Some(index) => {
                debug!(field = field.as_str(), column = %table.headers()[index], "Resolved column");
                resolution.resolved.push(ResolvedColumn {
                    field,
                    kind: field.kind(),
                    column: table.headers()[index].clone(),
                    index,
                });
            }
            None => {
                warn!(field = field.as_str(), "No column found for field");
                resolution.unavailable.push(field);
            }
        }
    }

    for entry in &config.field_catalog {
        match table.find_column(&entry.code) {
            Some(index) => resolution.field_shares.push(ResolvedFieldShare {
                code: entry.code.clone(),
                name: entry.name.clone(),
                column: table.headers()[index].clone(),
                index,
            }),
            None => resolution.missing_field_codes.push(entry.code.clone()),
        }
    }

    debug!(
        resolved = resolution.resolved.len(),
        unavailable = resolution.unavailable.len(),
        field_shares = resolution.field_shares.len(),
        "Column resolution complete"
    );

    resolution
}
