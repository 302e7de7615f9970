//! Immutable analysis configuration.
//!
//! Every lookup table and threshold the pipeline uses lives here and is passed
//! by reference into each component. Defaults reproduce the College Scorecard
//! analysis; a JSON file can override any subset of them:
//!
//! ```json
//! {
//!   "scarring": { "earnings_below": 28000 },
//!   "field_risk": { "proxy": "earnings_percentile", "percentile_cutoff": 0.2 }
//! }
//! ```

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::analyzers::resolver::SemanticField;

/// CIP two-digit field codes and their display names.
static FIELD_CATALOG: &[(&str, &str)] = &[
    ("PCIP01", "Agriculture"),
    ("PCIP03", "Natural Resources"),
    ("PCIP04", "Architecture"),
    ("PCIP09", "Communication"),
    ("PCIP10", "Communications Technologies"),
    ("PCIP11", "Computer Science"),
    ("PCIP13", "Education"),
    ("PCIP14", "Engineering"),
    ("PCIP15", "Engineering Technologies"),
    ("PCIP16", "Foreign Languages"),
    ("PCIP19", "Family/Consumer Sciences"),
    ("PCIP22", "Legal Professions"),
    ("PCIP23", "English"),
    ("PCIP24", "Liberal Arts"),
    ("PCIP26", "Biological Sciences"),
    ("PCIP27", "Mathematics"),
    ("PCIP38", "Philosophy/Religion"),
    ("PCIP39", "Theology"),
    ("PCIP40", "Physical Sciences"),
    ("PCIP42", "Psychology"),
    ("PCIP43", "Security/Protective Services"),
    ("PCIP44", "Public Administration"),
    ("PCIP45", "Social Sciences"),
    ("PCIP50", "Visual/Performing Arts"),
    ("PCIP51", "Health Professions"),
    ("PCIP52", "Business/Management"),
];

/// Field columns carried into the causal export by default.
static EXPORT_FIELD_CODES: &[&str] = &["PCIP11", "PCIP14", "PCIP24", "PCIP42", "PCIP51", "PCIP52"];

/// One entry of the field-of-study catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEntry {
    pub code: String,
    pub name: String,
}

/// Accepted column names per semantic field, tried in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnAliases {
    pub unit_id: Vec<String>,
    pub name: Vec<String>,
    pub state: Vec<String>,
    pub control: Vec<String>,
    pub earnings: Vec<String>,
    pub completion: Vec<String>,
    pub repayment: Vec<String>,
    pub pell_share: Vec<String>,
    pub loan_share: Vec<String>,
    pub enrollment: Vec<String>,
    pub predominant_degree: Vec<String>,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for ColumnAliases {
    fn default() -> Self {
        Self {
            unit_id: names(&["UNITID"]),
            name: names(&["INSTNM"]),
            state: names(&["STABBR"]),
            control: names(&["CONTROL"]),
            earnings: names(&["MD_EARN_WNE_P10", "MD_EARN_WNE_P8", "MD_EARN_WNE_P6"]),
            completion: names(&[
                "C150_4_POOLED_SUPP",
                "C150_4_POOLED",
                "C150_4",
                "C150_L4_POOLED_SUPP",
            ]),
            repayment: names(&["RPY_3YR_RT_SUPP", "RPY_3YR_RT"]),
            pell_share: names(&["PCTPELL"]),
            loan_share: names(&["PCTFLOAN"]),
            enrollment: names(&["UGDS"]),
            predominant_degree: names(&["PREDDEG"]),
        }
    }
}

impl ColumnAliases {
    pub fn for_field(&self, field: SemanticField) -> &[String] {
        match field {
            SemanticField::UnitId => &self.unit_id,
            SemanticField::Name => &self.name,
            SemanticField::State => &self.state,
            SemanticField::Control => &self.control,
            SemanticField::Earnings => &self.earnings,
            SemanticField::Completion => &self.completion,
            SemanticField::Repayment => &self.repayment,
            SemanticField::PellShare => &self.pell_share,
            SemanticField::LoanShare => &self.loan_share,
            SemanticField::Enrollment => &self.enrollment,
            SemanticField::PredominantDegree => &self.predominant_degree,
        }
    }
}

/// Thresholds of the disjunctive high-risk rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScarringThresholds {
    pub completion_below: f64,
    pub earnings_below: f64,
    pub repayment_below: f64,
}

impl Default for ScarringThresholds {
    fn default() -> Self {
        Self {
            completion_below: 0.30,
            earnings_below: 30_000.0,
            repayment_below: 0.40,
        }
    }
}

/// Where the field-level underemployment proxy comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxySource {
    /// Risk flag when all three scarring inputs resolve, earnings percentile otherwise.
    Auto,
    RiskFlag,
    EarningsPercentile,
}

impl std::fmt::Display for ProxySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProxySource::Auto => "auto",
            ProxySource::RiskFlag => "risk_flag",
            ProxySource::EarningsPercentile => "earnings_percentile",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldRiskConfig {
    /// A field counts as offered when its degree share is strictly above this.
    pub presence_threshold: f64,
    /// Fields with fewer institutions are reported as low-confidence.
    pub min_institutions: usize,
    pub proxy: ProxySource,
    /// Dataset-wide earnings quantile below which an institution is low-earning.
    pub percentile_cutoff: f64,
}

impl Default for FieldRiskConfig {
    fn default() -> Self {
        Self {
            presence_threshold: 0.10,
            min_institutions: 10,
            proxy: ProxySource::Auto,
            percentile_cutoff: 0.25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub buckets: usize,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self { buckets: 4 }
    }
}

/// Scale the Pell-share column is recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareScale {
    /// 0.0 to 1.0, as published by the Scorecard.
    #[default]
    Fraction,
    /// 0 to 100.
    Percent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PellConfig {
    pub scale: ShareScale,
    pub by_control: bool,
}

impl Default for PellConfig {
    fn default() -> Self {
        Self {
            scale: ShareScale::Fraction,
            by_control: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub field_codes: Vec<String>,
    /// Rename columns to snake_case semantic names.
    pub rename: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            field_codes: names(EXPORT_FIELD_CODES),
            rename: false,
        }
    }
}

/// Complete configuration for one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub field_catalog: Vec<FieldEntry>,
    pub aliases: ColumnAliases,
    pub scarring: ScarringThresholds,
    pub field_risk: FieldRiskConfig,
    pub completion: CompletionConfig,
    pub pell: PellConfig,
    pub export: ExportConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            field_catalog: FIELD_CATALOG
                .iter()
                .map(|(code, name)| FieldEntry {
                    code: code.to_string(),
                    name: name.to_string(),
                })
                .collect(),
            aliases: ColumnAliases::default(),
            scarring: ScarringThresholds::default(),
            field_risk: FieldRiskConfig::default(),
            completion: CompletionConfig::default(),
            pell: PellConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Loads overrides from a JSON file at `path` and validates the result.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: AnalysisConfig = serde_json::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when given, the built-in defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let s = &self.scarring;
        for (name, value) in [
            ("scarring.completion_below", s.completion_below),
            ("scarring.earnings_below", s.earnings_below),
            ("scarring.repayment_below", s.repayment_below),
            ("field_risk.presence_threshold", self.field_risk.presence_threshold),
        ] {
            if !value.is_finite() {
                bail!("{name} must be a finite number, got {value}");
            }
        }

        let cutoff = self.field_risk.percentile_cutoff;
        if !(cutoff > 0.0 && cutoff < 1.0) {
            bail!("field_risk.percentile_cutoff must lie strictly between 0 and 1, got {cutoff}");
        }

        if self.completion.buckets == 0 {
            bail!("completion.buckets must be at least 1");
        }

        let mut seen = HashSet::new();
        for entry in &self.field_catalog {
            if entry.code.trim().is_empty() {
                bail!("field_catalog contains an entry with an empty code");
            }
            if !seen.insert(entry.code.as_str()) {
                bail!("field_catalog lists {} more than once", entry.code);
            }
        }

        for field in SemanticField::ALL {
            if self.aliases.for_field(field).is_empty() {
                bail!("aliases.{} must list at least one column name", field.as_str());
            }
        }

        Ok(())
    }

    /// Display name for a catalog code.
    pub fn field_name(&self, code: &str) -> Option<&str> {
        self.field_catalog
            .iter()
            .find(|entry| entry.code == code)
            .map(|entry| entry.name.as_str())
    }
}
