//! Short human-readable labels for chart points.

use chrono::{Datelike, NaiveDate};

use crate::domain::Granularity;

/// Produce the display label for a point at `date`.
///
/// - `Daily` -> `Jan '24`
/// - `Quarterly` -> `2024 Q1`
/// - `Horizon(0)` -> `Nowcast`, `Horizon(h)` -> `Forecast (h{h})`
/// - `Today` -> `Today`
pub fn format_label(date: NaiveDate, granularity: Granularity) -> String {
    match granularity {
        Granularity::Daily => date.format("%b '%y").to_string(),
        Granularity::Quarterly => format!("{} Q{}", date.year(), quarter_of(date)),
        Granularity::Horizon(h) if h.is_nowcast() => "Nowcast".to_string(),
        Granularity::Horizon(h) => format!("Forecast (h{})", h.index()),
        Granularity::Today => "Today".to_string(),
    }
}

/// Calendar quarter (1..=4) containing `date`.
pub fn quarter_of(date: NaiveDate) -> u32 {
    date.month0() / 3 + 1
}
