//! Plain-text rendering of a [`ResultBundle`].

use std::fmt::Write;

use crate::analyzers::completion::monotonic_earnings;
use crate::analyzers::institutions::ControlType;
use crate::analyzers::socioeconomic::PellBand;
use crate::analyzers::types::{ResultBundle, Stat};
use crate::config::ProxySource;

const RULE: &str = "--------------------------------------------------------------------------------";
const DOUBLE_RULE: &str =
    "================================================================================";

fn thousands(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if rounded < 0 {
        format!("-{out}")
    } else {
        out
    }
}

pub fn money(stat: Stat) -> String {
    match stat {
        Stat::Value(v) => format!("${}", thousands(v)),
        Stat::NoData => "n/a".to_string(),
        Stat::Unavailable => "unavailable".to_string(),
    }
}

pub fn pct(stat: Stat) -> String {
    match stat {
        Stat::Value(v) => format!("{:.1}%", v * 100.0),
        Stat::NoData => "n/a".to_string(),
        Stat::Unavailable => "unavailable".to_string(),
    }
}

fn ratio(high: Stat, low: Stat) -> Option<f64> {
    match (high.value(), low.value()) {
        (Some(h), Some(l)) if l > 0.0 => Some(h / l),
        _ => None,
    }
}

/// Findings derived from the numbers of this run.
pub fn key_findings(bundle: &ResultBundle) -> Vec<String> {
    let mut findings = Vec::new();

    let ranked: Vec<_> = bundle
        .field_risk
        .rows
        .iter()
        .filter(|r| r.underemployment_proxy.value().is_some())
        .collect();
    if let (Some(top), Some(bottom)) = (ranked.first(), ranked.last())
        && ranked.len() > 1
    {
        let mut line = format!(
            "{} shows the highest underemployment risk ({}), {} the lowest ({})",
            top.field_name,
            pct(top.underemployment_proxy),
            bottom.field_name,
            pct(bottom.underemployment_proxy)
        );
        if let Some(r) = ratio(bottom.median_earnings, top.median_earnings) {
            let _ = write!(line, "; earnings differ {r:.1}x");
        }
        findings.push(line);
    }

    let gradient = &bundle.completion_gradient;
    if let Some(monotonic) = monotonic_earnings(gradient) {
        let spread = match (gradient.first(), gradient.last()) {
            (Some(q1), Some(q4)) => ratio(q4.median_earnings, q1.median_earnings),
            _ => None,
        };
        let shape = if monotonic {
            "rise steadily"
        } else {
            "do not rise steadily"
        };
        let mut line = format!("Median earnings {shape} with completion rate");
        if let Some(r) = spread {
            let _ = write!(line, " (top quartile earns {r:.1}x the bottom)");
        }
        findings.push(line);
    }

    let weakest = bundle
        .institution_types
        .iter()
        .filter(|r| r.control_type != ControlType::Unknown)
        .filter_map(|r| r.median_earnings.value().map(|v| (r, v)))
        .min_by(|a, b| a.1.total_cmp(&b.1));
    if let Some((row, _)) = weakest {
        findings.push(format!(
            "{} institutions have the lowest median earnings ({}) and a high-risk rate of {}",
            row.label,
            money(row.median_earnings),
            pct(row.high_risk_rate)
        ));
    }

    let band = |b: PellBand| bundle.socioeconomic.bands.iter().find(|r| r.band == b);
    if let (Some(low), Some(high)) = (band(PellBand::Low), band(PellBand::VeryHigh))
        && let Some(r) = ratio(low.median_earnings, high.median_earnings)
    {
        findings.push(format!(
            "Low-Pell institutions earn {r:.1}x the median of very-high-Pell institutions ({} vs {})",
            money(low.median_earnings),
            money(high.median_earnings)
        ));
    }

    if let Stat::Value(rate) = bundle.scarring.flagged_rate {
        findings.push(format!(
            "{:.1}% of evaluated institutions show scarring patterns",
            rate * 100.0
        ));
    }

    findings
}

/// Renders the bundle as the human-readable analysis report.
pub fn build_report(bundle: &ResultBundle, top: usize) -> String {
    let mut output = String::new();
    let summary = &bundle.summary;

    let _ = writeln!(output, "{DOUBLE_RULE}");
    let _ = writeln!(output, "COLLEGE SCORECARD UNDEREMPLOYMENT ANALYSIS");
    let _ = writeln!(output, "{DOUBLE_RULE}");
    let _ = writeln!(output, "Generated: {}", bundle.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if let Some(source) = &bundle.source {
        let _ = writeln!(output, "Source: {source}");
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "SUMMARY STATISTICS");
    let _ = writeln!(output, "{RULE}");
    let _ = writeln!(output, "Total Institutions: {}", thousands(summary.total_institutions as f64));
    let _ = writeln!(
        output,
        "Institutions with Earnings Data: {}",
        thousands(summary.institutions_with_earnings as f64)
    );
    let _ = writeln!(output, "Median Earnings: {}", money(summary.median_earnings));
    let _ = writeln!(output, "Median Completion Rate: {}", pct(summary.median_completion_rate));
    let _ = writeln!(output, "Median Pell Share: {}", pct(summary.median_pell_share));
    let _ = writeln!(output);

    let proxy = match bundle.field_risk.proxy_source {
        Some(ProxySource::EarningsPercentile) => "low-earnings rate",
        Some(_) => "high-risk rate",
        None => "unavailable",
    };
    let _ = writeln!(output, "FIELD-LEVEL UNDEREMPLOYMENT RISK (Top {top}, proxy: {proxy})");
    let _ = writeln!(output, "{RULE}");
    if bundle.field_risk.rows.is_empty() {
        let _ = writeln!(output, "No field-of-study columns present.");
    } else {
        let _ = writeln!(
            output,
            "{:<36} | {:>15} | {:>10} | {:>6}",
            "Field", "Median Earnings", "Risk", "N"
        );
        for row in bundle.field_risk.rows.iter().take(top) {
            let marker = if row.low_confidence { " *" } else { "" };
            let _ = writeln!(
                output,
                "{:<36} | {:>15} | {:>10} | {:>6}{}",
                row.field_name,
                money(row.median_earnings),
                pct(row.underemployment_proxy),
                row.n_institutions,
                marker
            );
        }
        if bundle.field_risk.rows.iter().take(top).any(|r| r.low_confidence) {
            let _ = writeln!(output, "* fewer institutions than the confidence minimum");
        }
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "EARNINGS BY COMPLETION RATE QUARTILE");
    let _ = writeln!(output, "{RULE}");
    if bundle.completion_gradient.is_empty() {
        let _ = writeln!(output, "Completion rate unavailable.");
    } else {
        for row in &bundle.completion_gradient {
            let _ = writeln!(
                output,
                "{:<14} n={:<6} completion {}-{}  median earnings {}  repayment {}",
                row.label,
                row.n_institutions,
                pct(row.completion_min),
                pct(row.completion_max),
                money(row.median_earnings),
                pct(row.mean_repayment)
            );
        }
        if let Some(monotonic) = monotonic_earnings(&bundle.completion_gradient) {
            let _ = writeln!(output, "Monotonic earnings gradient: {monotonic}");
        }
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "INSTITUTION TYPE EFFECTS");
    let _ = writeln!(output, "{RULE}");
    for row in &bundle.institution_types {
        let _ = writeln!(
            output,
            "{:<20} n={:<6} median earnings {}  completion {}  Pell {}  high-risk {}",
            row.label,
            row.n_institutions,
            money(row.median_earnings),
            pct(row.mean_completion),
            pct(row.mean_pell),
            pct(row.high_risk_rate)
        );
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "SOCIOECONOMIC STRATIFICATION (by Pell share)");
    let _ = writeln!(output, "{RULE}");
    if bundle.socioeconomic.bands.is_empty() {
        let _ = writeln!(output, "Pell share unavailable.");
    } else {
        for row in &bundle.socioeconomic.bands {
            let _ = writeln!(
                output,
                "{:<20} n={:<6} median earnings {}  completion {}  low earnings {}",
                row.label,
                row.n_institutions,
                money(row.median_earnings),
                pct(row.mean_completion),
                pct(row.low_earnings_rate)
            );
        }
    }
    let _ = writeln!(output);

    let scarring = &bundle.scarring;
    let _ = writeln!(output, "CAREER TRAJECTORY SCARRING PATTERNS");
    let _ = writeln!(output, "{RULE}");
    let _ = writeln!(
        output,
        "High-Risk Institutions: {} of {} evaluated ({}), {} excluded",
        scarring.flagged,
        scarring.evaluated,
        pct(scarring.flagged_rate),
        scarring.excluded
    );
    let _ = writeln!(
        output,
        "Triggered by completion: {}, earnings: {}, repayment: {}",
        scarring.completion_triggered, scarring.earnings_triggered, scarring.repayment_triggered
    );
    for (label, profile) in [
        ("High-risk", &scarring.flagged_profile),
        ("Other", &scarring.clean_profile),
    ] {
        let _ = writeln!(
            output,
            "{:<10} n={:<6} median earnings {}  completion {}  repayment {}  Pell {}",
            label,
            profile.n_institutions,
            money(profile.median_earnings),
            pct(profile.mean_completion),
            pct(profile.mean_repayment),
            pct(profile.mean_pell)
        );
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "KEY FINDINGS");
    let _ = writeln!(output, "{RULE}");
    let findings = key_findings(bundle);
    if findings.is_empty() {
        let _ = writeln!(output, "Not enough data for findings.");
    }
    for (i, finding) in findings.iter().enumerate() {
        let _ = writeln!(output, "{}. {}", i + 1, finding);
    }

    if !bundle.annotations.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "NOTES");
        let _ = writeln!(output, "{RULE}");
        for note in &bundle.annotations {
            let _ = writeln!(output, "- {note}");
        }
    }

    output
}
