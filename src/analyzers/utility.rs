use crate::analyzers::institutions::NumericColumn;
use crate::analyzers::types::Stat;

/// Arithmetic mean. `None` for empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation given a pre-computed mean.
/// Returns 0.0 for empty input.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    variance.sqrt()
}

pub fn std_dev(values: &[f64]) -> Option<f64> {
    mean(values).map(|m| stddev(values, m))
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Quantile with linear interpolation between closest ranks.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;

    Some(sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo]))
}

/// Percentile rank of every present value, ties sharing their average rank,
/// expressed as rank / count.
pub fn percentile_ranks(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut present: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .collect();
    present.sort_by(|a, b| a.1.total_cmp(&b.1));

    let n = present.len() as f64;
    let mut ranks = vec![None; values.len()];

    let mut start = 0;
    while start < present.len() {
        let mut end = start;
        while end + 1 < present.len() && present[end + 1].1 == present[start].1 {
            end += 1;
        }
        // 1-based ranks start+1..=end+1 share their average
        let avg_rank = (start + end + 2) as f64 / 2.0;
        for &(row, _) in &present[start..=end] {
            ranks[row] = Some(avg_rank / n);
        }
        start = end + 1;
    }

    ranks
}

/// Share of `true` values. `None` for empty input.
pub fn rate<I: IntoIterator<Item = bool>>(flags: I) -> Option<f64> {
    let (hits, total) = flags
        .into_iter()
        .fold((0usize, 0usize), |(h, t), flag| (h + flag as usize, t + 1));

    if total == 0 {
        None
    } else {
        Some(hits as f64 / total as f64)
    }
}

/// Non-missing values of `column` at `rows`.
pub fn present(column: &NumericColumn, rows: &[usize]) -> Vec<f64> {
    rows.iter().filter_map(|&row| column.values[row]).collect()
}

/// Applies `agg` to the present values of `column` at `rows`.
///
/// An unresolved column gives [`Stat::Unavailable`]; no present values gives
/// [`Stat::NoData`].
pub fn stat(column: Option<&NumericColumn>, rows: &[usize], agg: fn(&[f64]) -> Option<f64>) -> Stat {
    match column {
        None => Stat::Unavailable,
        Some(column) => Stat::from_option(agg(&present(column, rows))),
    }
}

/// Rate of a per-row optional flag over `rows`, skipping undefined rows.
pub fn flag_rate(flags: &[Option<bool>], rows: &[usize]) -> Option<f64> {
    rate(rows.iter().filter_map(|&row| flags[row]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_mean_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
    }

    #[test]
    fn test_stddev_population() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!(close(stddev(&values, 5.0), 2.0));
        assert_eq!(std_dev(&[]), None);
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_quantile_interpolates() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(quantile(&values, 0.25), Some(20.0));
        assert!(close(quantile(&[1.0, 2.0, 3.0, 4.0], 0.25).unwrap(), 1.75));
        assert_eq!(quantile(&values, 1.5), None);
    }

    #[test]
    fn test_percentile_ranks_average_ties() {
        let values = [Some(10.0), None, Some(20.0), Some(20.0), Some(40.0)];
        let ranks = percentile_ranks(&values);
        assert_eq!(ranks[0], Some(0.25));
        assert_eq!(ranks[1], None);
        assert_eq!(ranks[2], Some(0.625));
        assert_eq!(ranks[3], Some(0.625));
        assert_eq!(ranks[4], Some(1.0));
    }

    #[test]
    fn test_rate() {
        assert_eq!(rate(Vec::<bool>::new()), None);
        assert_eq!(rate([true, false, false, true]), Some(0.5));
    }

    #[test]
    fn test_stat_availability() {
        let column = NumericColumn {
            name: "X".to_string(),
            values: vec![Some(1.0), None, Some(3.0)],
        };

        assert_eq!(stat(None, &[0, 1], mean), Stat::Unavailable);
        assert_eq!(stat(Some(&column), &[1], mean), Stat::NoData);
        assert_eq!(stat(Some(&column), &[0, 1, 2], mean), Stat::Value(2.0));
    }

    #[test]
    fn test_flag_rate_skips_undefined() {
        let flags = [Some(true), None, Some(false), Some(true)];
        assert_eq!(flag_rate(&flags, &[0, 1, 2]), Some(0.5));
        assert_eq!(flag_rate(&flags, &[1]), None);
    }
}
