//! Data types produced by the analysis pipeline.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::analyzers::institutions::ControlType;
use crate::analyzers::resolver::{ColumnResolution, SemanticField};
use crate::analyzers::scarring::ScarringCondition;
use crate::analyzers::socioeconomic::PellBand;
use crate::config::ProxySource;

/// An aggregated metric value.
///
/// Serialized as a number, as null/empty for [`Stat::NoData`] and as the
/// string `"unavailable"` for [`Stat::Unavailable`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stat {
    Value(f64),
    /// Group empty or every input missing.
    NoData,
    /// Source column not present in the table.
    Unavailable,
}

impl Stat {
    pub fn from_option(value: Option<f64>) -> Self {
        match value {
            Some(v) => Stat::Value(v),
            None => Stat::NoData,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Stat::Value(v) => Some(*v),
            _ => None,
        }
    }
}

impl Serialize for Stat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Stat::Value(v) => serializer.serialize_f64(*v),
            Stat::NoData => serializer.serialize_none(),
            Stat::Unavailable => serializer.serialize_str("unavailable"),
        }
    }
}

/// Analysis component, used to attribute annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    FieldRisk,
    CompletionGradient,
    InstitutionType,
    Socioeconomic,
    Scarring,
    CausalExport,
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Component::FieldRisk => "field risk",
            Component::CompletionGradient => "completion gradient",
            Component::InstitutionType => "institution type",
            Component::Socioeconomic => "socioeconomic",
            Component::Scarring => "scarring",
            Component::CausalExport => "causal export",
        };
        f.write_str(s)
    }
}

/// A non-fatal issue recorded during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    ColumnUnavailable {
        field: SemanticField,
        aliases: Vec<String>,
        affects: Vec<Component>,
    },
    FieldColumnMissing {
        code: String,
        field: String,
    },
    ComponentSkipped {
        component: Component,
        reason: String,
    },
    ComponentDegraded {
        component: Component,
        reason: String,
    },
    ProxyFallback {
        requested: ProxySource,
        used: ProxySource,
        reason: String,
    },
    LowConfidence {
        field: String,
        institutions: usize,
        minimum: usize,
    },
    OutOfRange {
        component: Component,
        column: String,
        count: usize,
    },
}

impl std::fmt::Display for Annotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Annotation::ColumnUnavailable { field, aliases, .. } => write!(
                f,
                "{} unavailable (looked for {})",
                field.as_str(),
                aliases.join(", ")
            ),
            Annotation::FieldColumnMissing { code, field } => {
                write!(f, "field {field} skipped: column {code} not present")
            }
            Annotation::ComponentSkipped { component, reason } => {
                write!(f, "{component} skipped: {reason}")
            }
            Annotation::ComponentDegraded { component, reason } => {
                write!(f, "{component} degraded: {reason}")
            }
            Annotation::ProxyFallback {
                requested,
                used,
                reason,
            } => write!(f, "underemployment proxy {requested} fell back to {used}: {reason}"),
            Annotation::LowConfidence {
                field,
                institutions,
                minimum,
            } => write!(
                f,
                "{field}: only {institutions} institutions (minimum {minimum}), low confidence"
            ),
            Annotation::OutOfRange {
                component,
                column,
                count,
            } => write!(f, "{component}: {count} values of {column} out of range, not grouped"),
        }
    }
}

/// Field-level underemployment metrics, one row per catalog field present.
#[derive(Debug, Clone, Serialize)]
pub struct FieldRiskRow {
    pub field_code: String,
    pub field_name: String,
    pub n_institutions: usize,
    pub n_with_earnings: usize,
    pub median_earnings: Stat,
    pub underemployment_proxy: Stat,
    pub low_confidence: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldRiskTable {
    /// Proxy actually used; `None` when no proxy could be computed.
    pub proxy_source: Option<ProxySource>,
    pub rows: Vec<FieldRiskRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionQuartileRow {
    pub quartile: usize,
    pub label: String,
    pub n_institutions: usize,
    pub completion_min: Stat,
    pub completion_max: Stat,
    pub mean_completion: Stat,
    pub median_earnings: Stat,
    pub mean_earnings: Stat,
    pub mean_repayment: Stat,
    pub mean_pell: Stat,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstitutionTypeRow {
    pub control_type: ControlType,
    pub label: String,
    pub n_institutions: usize,
    pub median_earnings: Stat,
    pub mean_earnings: Stat,
    pub earnings_stddev: Stat,
    pub mean_completion: Stat,
    pub mean_pell: Stat,
    pub mean_repayment: Stat,
    pub median_repayment: Stat,
    pub low_earnings_rate: Stat,
    pub high_risk_rate: Stat,
}

#[derive(Debug, Clone, Serialize)]
pub struct PellBandRow {
    pub band: PellBand,
    pub label: String,
    pub n_institutions: usize,
    pub median_earnings: Stat,
    pub mean_completion: Stat,
    pub mean_repayment: Stat,
    pub low_earnings_rate: Stat,
}

#[derive(Debug, Clone, Serialize)]
pub struct PellControlRow {
    pub band: PellBand,
    pub band_label: String,
    pub control_type: ControlType,
    pub control_label: String,
    pub n_institutions: usize,
    pub median_earnings: Stat,
    pub mean_completion: Stat,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SocioeconomicTables {
    pub bands: Vec<PellBandRow>,
    pub by_control: Vec<PellControlRow>,
}

/// Outcome profile of either the flagged or the clean institutions.
#[derive(Debug, Clone, Serialize)]
pub struct RiskGroupProfile {
    pub n_institutions: usize,
    pub median_earnings: Stat,
    pub mean_completion: Stat,
    pub mean_repayment: Stat,
    pub mean_pell: Stat,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScarringSummary {
    /// Conditions whose input column resolved.
    pub conditions: Vec<ScarringCondition>,
    pub evaluated: usize,
    pub flagged: usize,
    pub clean: usize,
    pub excluded: usize,
    pub flagged_rate: Stat,
    pub completion_triggered: usize,
    pub earnings_triggered: usize,
    pub repayment_triggered: usize,
    pub flagged_profile: RiskGroupProfile,
    pub clean_profile: RiskGroupProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryStats {
    pub total_institutions: usize,
    pub institutions_with_earnings: usize,
    pub median_earnings: Stat,
    pub median_completion_rate: Stat,
    pub median_pell_share: Stat,
    pub flagged_institutions: usize,
    pub flagged_rate: Stat,
}

/// Everything one run produces.
#[derive(Debug, Clone, Serialize)]
pub struct ResultBundle {
    pub schema_version: u8,
    pub generated_at: DateTime<Utc>,
    pub source: Option<String>,
    pub summary: SummaryStats,
    pub resolution: ColumnResolution,
    pub field_risk: FieldRiskTable,
    pub completion_gradient: Vec<CompletionQuartileRow>,
    pub institution_types: Vec<InstitutionTypeRow>,
    pub socioeconomic: SocioeconomicTables,
    pub scarring: ScarringSummary,
    pub annotations: Vec<Annotation>,
}

impl ResultBundle {
    /// Records where the input table came from.
    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_serializes_three_states() {
        assert_eq!(serde_json::to_string(&Stat::Value(1.5)).unwrap(), "1.5");
        assert_eq!(serde_json::to_string(&Stat::NoData).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Stat::Unavailable).unwrap(), "\"unavailable\"");
    }

    #[test]
    fn test_annotation_is_tagged() {
        let a = Annotation::ComponentSkipped {
            component: Component::CompletionGradient,
            reason: "completion unavailable".to_string(),
        };
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["kind"], "component_skipped");
        assert_eq!(json["component"], "completion_gradient");
        assert_eq!(a.to_string(), "completion gradient skipped: completion unavailable");
    }
}
