//! Formatted terminal output for a built chart.
//!
//! We keep formatting code in one place so:
//! - the pipeline code stays clean and testable
//! - output changes are localized (snapshot tests live here)

use crate::app::pipeline::{ChartConfig, ChartData};
use crate::domain::{BucketPolicy, ChartPoint, Unit};
use crate::report::compute_stats;

/// Format the run summary (source, policy, counts, headline numbers).
pub fn format_summary(data: &ChartData, config: &ChartConfig, source: &str) -> String {
    let stats = compute_stats(&data.points);
    let mut out = String::new();

    out.push_str("=== nowcast - GDP nowcast chart ===\n");
    out.push_str(&format!("Source: {source}\n"));
    out.push_str(&format!("Reference date: {}\n", data.reference_date));
    out.push_str(&format!(
        "Units: {:?} -> {:?}\n",
        config.source_unit, config.target_unit
    ));
    let policy = match config.bucket_policy {
        BucketPolicy::Observations(n) => format!("{n} observations per bucket"),
        BucketPolicy::CalendarQuarter => "calendar quarters".to_string(),
    };
    out.push_str(&format!(
        "Buckets: {} ({policy}) | shown={}\n",
        data.bucket_count, stats.historical
    ));
    out.push_str(&format!(
        "Replay: {} of {} buckets\n",
        stats.with_replay, stats.historical
    ));
    if let Some(mae) = stats.replay_mae {
        out.push_str(&format!("Replay MAE: {}\n", fmt_value(Some(mae), data.unit)));
    }

    let horizons: Vec<String> = data.horizons.iter().map(|h| format!("h{h}")).collect();
    out.push_str(&format!(
        "Horizons: [{}] of 0..={}\n",
        horizons.join(", "),
        config.max_horizon
    ));

    if let Some(change) = stats.nowcast_change_pct() {
        out.push_str(&format!(
            "Nowcast: {} ({change:+.2}% vs last actual)\n",
            fmt_value(stats.nowcast, data.unit)
        ));
    }
    out
}

/// Format the chart sequence as a fixed-width table. Absent values print as `-`.
pub fn format_points(points: &[ChartPoint], unit: Unit) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<10} {:<16} {:>12} {:>12} {:>12} {:>12} {:>12}\n",
            "date", "label", "actual", "replay", "forecast", "lower", "upper"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<10} {:-<16} {:-<12} {:-<12} {:-<12} {:-<12} {:-<12}\n",
            "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for p in points {
        out.push_str(
            format!(
                "{:<10} {:<16} {:>12} {:>12} {:>12} {:>12} {:>12}\n",
                p.date,
                truncate(&p.display_label, 16),
                fmt_value(p.actual, unit),
                fmt_value(p.model_replay, unit),
                fmt_value(p.forecast, unit),
                fmt_value(p.lower, unit),
                fmt_value(p.upper, unit),
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Two decimals plus the unit suffix, or `-` when absent.
pub fn fmt_value(v: Option<f64>, unit: Unit) -> String {
    match v {
        Some(v) => format!("{v:.2}{}", unit.suffix()),
        None => "-".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
