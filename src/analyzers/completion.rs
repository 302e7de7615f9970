//! Earnings, repayment and Pell share across completion-rate quartiles.

use tracing::{info, warn};

use crate::analyzers::institutions::Institutions;
use crate::analyzers::types::{Annotation, Component, CompletionQuartileRow, Stat};
use crate::analyzers::utility::{mean, median, stat};
use crate::config::CompletionConfig;

/// Assigns every present value to one of `buckets` equal-frequency groups.
///
/// Values are ordered by (value, row index). Group edges sit at the linearly
/// interpolated positions `h_k = (n - 1) * k / buckets`; position `i` goes to
/// the first group whose upper edge is at or above it, so uneven remainders
/// land in the outer groups. Missing values get `None`, as does everything
/// when `buckets` is zero.
pub fn quartile_assignments(values: &[Option<f64>], buckets: usize) -> Vec<Option<usize>> {
    let mut groups = vec![None; values.len()];
    if buckets == 0 {
        return groups;
    }

    let mut present: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(row, v)| v.map(|v| (row, v)))
        .collect();
    present.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

    let last = present.len().saturating_sub(1);
    for (i, &(row, _)) in present.iter().enumerate() {
        // smallest g with i * buckets <= last * (g + 1)
        let group = if i == 0 {
            0
        } else {
            (i * buckets).div_ceil(last) - 1
        };
        groups[row] = Some(group);
    }
    groups
}

pub fn quartile_label(quartile: usize, buckets: usize) -> String {
    if buckets == 4 {
        let name = ["Lowest", "Low-Mid", "Mid-High", "Highest"][quartile];
        format!("Q{}: {}", quartile + 1, name)
    } else {
        format!("Q{}", quartile + 1)
    }
}

fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// Summarizes outcomes per completion group, lowest completion first.
#[tracing::instrument(skip_all, fields(buckets = config.buckets))]
pub fn analyze_completion_gradient(
    institutions: &Institutions,
    config: &CompletionConfig,
    notes: &mut Vec<Annotation>,
) -> Vec<CompletionQuartileRow> {
    let Some(completion) = institutions.completion.as_ref() else {
        warn!("Completion rate unavailable, skipping gradient");
        notes.push(Annotation::ComponentSkipped {
            component: Component::CompletionGradient,
            reason: "completion rate column unavailable".to_string(),
        });
        return Vec::new();
    };

    if config.buckets == 0 {
        warn!("Completion gradient configured with zero buckets");
        notes.push(Annotation::ComponentSkipped {
            component: Component::CompletionGradient,
            reason: "completion.buckets is zero".to_string(),
        });
        return Vec::new();
    }

    let assignments = quartile_assignments(&completion.values, config.buckets);
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); config.buckets];
    for (row, group) in assignments.iter().enumerate() {
        if let Some(g) = group {
            members[*g].push(row);
        }
    }

    let rows: Vec<CompletionQuartileRow> = members
        .iter()
        .enumerate()
        .map(|(quartile, rows)| CompletionQuartileRow {
            quartile: quartile + 1,
            label: quartile_label(quartile, config.buckets),
            n_institutions: rows.len(),
            completion_min: stat(Some(completion), rows, min),
            completion_max: stat(Some(completion), rows, max),
            mean_completion: stat(Some(completion), rows, mean),
            median_earnings: stat(institutions.earnings.as_ref(), rows, median),
            mean_earnings: stat(institutions.earnings.as_ref(), rows, mean),
            mean_repayment: stat(institutions.repayment.as_ref(), rows, mean),
            mean_pell: stat(institutions.pell.as_ref(), rows, mean),
        })
        .collect();

    info!(
        grouped = rows.iter().map(|r| r.n_institutions).sum::<usize>(),
        "Completion gradient computed"
    );

    rows
}

/// Whether median earnings never decrease from one group to the next.
///
/// `None` when fewer than two groups have earnings.
pub fn monotonic_earnings(rows: &[CompletionQuartileRow]) -> Option<bool> {
    let medians: Vec<f64> = rows
        .iter()
        .filter_map(|r| match r.median_earnings {
            Stat::Value(v) => Some(v),
            _ => None,
        })
        .collect();

    if medians.len() < 2 {
        return None;
    }
    Some(medians.windows(2).all(|w| w[0] <= w[1]))
}
