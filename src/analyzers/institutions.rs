//! Typed, column-oriented view of the institutions in a [`RawTable`].

use serde::Serialize;

use crate::analyzers::resolver::{ColumnResolution, FieldKind, SemanticField};
use crate::table::RawTable;

/// Numeric values of one source column, `None` where missing.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Degree share of one catalog field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldShare {
    pub code: String,
    pub name: String,
    pub column: NumericColumn,
}

/// Institutional control as coded in the Scorecard `CONTROL` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlType {
    Public,
    PrivateNonprofit,
    PrivateForProfit,
    /// Missing or unrecognized code.
    Unknown,
}

impl ControlType {
    pub const ALL: [ControlType; 4] = [
        ControlType::Public,
        ControlType::PrivateNonprofit,
        ControlType::PrivateForProfit,
        ControlType::Unknown,
    ];

    pub fn from_code(code: Option<f64>) -> Self {
        match code {
            Some(c) if c == 1.0 => ControlType::Public,
            Some(c) if c == 2.0 => ControlType::PrivateNonprofit,
            Some(c) if c == 3.0 => ControlType::PrivateForProfit,
            _ => ControlType::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ControlType::Public => "Public",
            ControlType::PrivateNonprofit => "Private Nonprofit",
            ControlType::PrivateForProfit => "Private For-Profit",
            ControlType::Unknown => "Unknown",
        }
    }
}

/// The resolved inputs of every analysis, one entry per table row.
///
/// Unresolved semantic fields are `None`; missing cells inside a resolved
/// column are `None` entries of its `values`.
#[derive(Debug, Clone)]
pub struct Institutions {
    len: usize,
    pub control: Option<NumericColumn>,
    pub earnings: Option<NumericColumn>,
    pub completion: Option<NumericColumn>,
    pub repayment: Option<NumericColumn>,
    pub pell: Option<NumericColumn>,
    pub fields: Vec<FieldShare>,
    control_types: Vec<ControlType>,
}

impl Institutions {
    pub fn from_table(table: &RawTable, resolution: &ColumnResolution) -> Self {
        let numeric = |field: SemanticField| {
            resolution
                .get(field)
                .filter(|r| r.kind == FieldKind::Numeric)
                .map(|r| NumericColumn {
                    name: r.column.clone(),
                    values: table.numeric_column(r.index),
                })
        };

        let control = numeric(SemanticField::Control);
        let control_types = match &control {
            Some(column) => column.values.iter().map(|&c| ControlType::from_code(c)).collect(),
            None => vec![ControlType::Unknown; table.len()],
        };

        let fields = resolution
            .field_shares
            .iter()
            .map(|share| FieldShare {
                code: share.code.clone(),
                name: share.name.clone(),
                column: NumericColumn {
                    name: share.column.clone(),
                    values: table.numeric_column(share.index),
                },
            })
            .collect();

        Self {
            len: table.len(),
            earnings: numeric(SemanticField::Earnings),
            completion: numeric(SemanticField::Completion),
            repayment: numeric(SemanticField::Repayment),
            pell: numeric(SemanticField::PellShare),
            control,
            fields,
            control_types,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn control_type(&self, row: usize) -> ControlType {
        self.control_types[row]
    }

    pub fn control_types(&self) -> &[ControlType] {
        &self.control_types
    }

    /// Value of `column` at `row`, `None` if the column is unresolved or the cell missing.
    pub fn value(column: Option<&NumericColumn>, row: usize) -> Option<f64> {
        column.and_then(|c| c.values[row])
    }

    pub fn earnings_at(&self, row: usize) -> Option<f64> {
        Self::value(self.earnings.as_ref(), row)
    }

    pub fn completion_at(&self, row: usize) -> Option<f64> {
        Self::value(self.completion.as_ref(), row)
    }

    pub fn repayment_at(&self, row: usize) -> Option<f64> {
        Self::value(self.repayment.as_ref(), row)
    }

    pub fn pell_at(&self, row: usize) -> Option<f64> {
        Self::value(self.pell.as_ref(), row)
    }

    /// Every row index, for whole-population aggregates.
    pub fn all_rows(&self) -> Vec<usize> {
        (0..self.len).collect()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::analyzers::resolver::resolve_columns;
    use csv::StringRecord;

    /// Builds institutions from a header list and string rows.
    pub fn institutions(headers: &[&str], rows: &[&[&str]]) -> Institutions {
        let table = raw_table(headers, rows);
        let resolution = resolve_columns(&table, &AnalysisConfig::default());
        Institutions::from_table(&table, &resolution)
    }

    pub fn raw_table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter().map(|r| StringRecord::from(r.to_vec())).collect(),
        )
    }
}
