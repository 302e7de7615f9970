//! In-memory representation of the loaded Scorecard CSV.

use csv::StringRecord;

/// The raw input table: one header row plus one record per institution.
///
/// Never mutated after loading; every analysis derives new data from it.
#[derive(Debug, Clone)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<StringRecord>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<StringRecord>) -> Self {
        let headers = headers
            .into_iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the column named exactly `name`, falling back to a
    /// case-insensitive match.
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .or_else(|| self.headers.iter().position(|h| h.eq_ignore_ascii_case(name)))
    }

    /// Trimmed cell content, `None` when empty or past the end of the record.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|record| record.get(column))
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn numeric_column(&self, column: usize) -> Vec<Option<f64>> {
        (0..self.len())
            .map(|row| self.cell(row, column).and_then(parse_numeric))
            .collect()
    }
}

/// Parses a numeric cell. Suppression markers such as `PrivacySuppressed`
/// or `NULL` and non-finite values are treated as missing.
pub fn parse_numeric(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RawTable {
        RawTable::new(
            vec!["\u{feff}UNITID".to_string(), "md_earn_wne_p10".to_string()],
            vec![
                StringRecord::from(vec!["100654", "36000"]),
                StringRecord::from(vec!["100663", "PrivacySuppressed"]),
                StringRecord::from(vec!["100690", " "]),
            ],
        )
    }

    #[test]
    fn test_bom_is_stripped_from_headers() {
        let t = table();
        assert_eq!(t.headers()[0], "UNITID");
        assert_eq!(t.find_column("UNITID"), Some(0));
    }

    #[test]
    fn test_find_column_falls_back_to_case_insensitive() {
        let t = table();
        assert_eq!(t.find_column("MD_EARN_WNE_P10"), Some(1));
        assert_eq!(t.find_column("PCTPELL"), None);
    }

    #[test]
    fn test_numeric_column_treats_suppressed_as_missing() {
        let t = table();
        assert_eq!(t.numeric_column(1), vec![Some(36000.0), None, None]);
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric("0.25"), Some(0.25));
        assert_eq!(parse_numeric(" 42 "), Some(42.0));
        assert_eq!(parse_numeric("NULL"), None);
        assert_eq!(parse_numeric("NaN"), None);
        assert_eq!(parse_numeric("inf"), None);
    }
}
