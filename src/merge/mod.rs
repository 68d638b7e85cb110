//! Series merging: historical buckets, model replay and forward projections.
//!
//! The output is built segment by segment rather than globally sorted:
//!
//! 1. one historical point per aggregated bucket (ascending by period end)
//! 2. the optional synthetic "today" marker
//! 3. forecasts in ascending horizon order
//!
//! Renderers rely on these segments being contiguous, so a forecast whose
//! projected date falls before the marker (client/upstream clock skew) is still
//! appended after it.
//!
//! Replay buckets are aligned to historical buckets by *position*, not by date.
//! This is a known limitation carried over on purpose: date matching would
//! change what users see. Trailing unmatched buckets are dropped. The replay
//! band, when present, rides along on the same positions as `lower`/`upper`.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::domain::{AggregatedBand, AggregatedPoint, ChartPoint, Granularity, Marker};
use crate::error::ChartError;
use crate::normalize::format_label;

/// Bucket-count gap between replay and history tolerated by default.
pub const DEFAULT_REPLAY_TOLERANCE: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOptions {
    /// Date separating history from forecasts; never read from a clock here.
    pub reference_date: NaiveDate,
    /// Append the synthetic "today" boundary point.
    pub today_marker: bool,
    /// Largest allowed difference in bucket counts before alignment fails.
    pub replay_tolerance: usize,
    /// Keep only the newest N historical buckets (after replay alignment).
    pub keep_last: Option<usize>,
}

impl MergeOptions {
    pub fn new(reference_date: NaiveDate) -> Self {
        Self {
            reference_date,
            today_marker: true,
            replay_tolerance: DEFAULT_REPLAY_TOLERANCE,
            keep_last: None,
        }
    }
}

/// Aggregated model replay plus its optional band.
#[derive(Debug, Clone, Copy)]
pub struct Replay<'a> {
    pub values: &'a [AggregatedPoint],
    pub band: Option<&'a [AggregatedBand]>,
}

impl<'a> Replay<'a> {
    pub fn new(values: &'a [AggregatedPoint]) -> Self {
        Self { values, band: None }
    }

    pub fn with_band(mut self, band: &'a [AggregatedBand]) -> Self {
        self.band = Some(band);
        self
    }
}

/// Combine the three segments into one chart-ready sequence.
pub fn merge(
    aggregated: &[AggregatedPoint],
    replay: Option<Replay<'_>>,
    forecasts: &[ChartPoint],
    options: &MergeOptions,
) -> Result<Vec<ChartPoint>, ChartError> {
    if aggregated.is_empty() {
        return Err(ChartError::EmptySeries { what: "aggregated history" });
    }

    let mut history: Vec<ChartPoint> = aggregated
        .iter()
        .map(|b| {
            ChartPoint::historical(
                b.period_end_date,
                format_label(b.period_end_date, Granularity::Quarterly),
                b.mean_value,
            )
        })
        .collect();

    if let Some(replay) = replay {
        align_replay(&mut history, replay.values, options.replay_tolerance)?;
        if let Some(band) = replay.band {
            align_band(&mut history, band);
        }
    }

    if let Some(n) = options.keep_last {
        let n = n.max(1);
        if history.len() > n {
            history.drain(..history.len() - n);
        }
    }

    let mut out = Vec::with_capacity(history.len() + forecasts.len() + 1);
    out.extend(history);

    if options.today_marker {
        if let Some(marker) = today_marker(&out, options.reference_date) {
            out.push(marker);
        }
    }

    let mut forward: Vec<&ChartPoint> = forecasts.iter().collect();
    // Stable: equal horizons keep their input order.
    forward.sort_by_key(|p| p.horizon_index.unwrap_or(u32::MAX));
    for p in forward {
        if p.date < options.reference_date {
            warn!(
                date = %p.date,
                reference = %options.reference_date,
                "forecast projected before the reference date; kept in horizon order"
            );
        }
        out.push(p.clone());
    }

    debug!(points = out.len(), forecasts = forecasts.len(), "merged chart series");
    Ok(out)
}

/// Attach replay values by position. Returns how many replay buckets were
/// discarded for lack of a historical partner.
fn align_replay(
    history: &mut [ChartPoint],
    replay: &[AggregatedPoint],
    tolerance: usize,
) -> Result<usize, ChartError> {
    let gap = history.len().abs_diff(replay.len());
    if gap > tolerance {
        return Err(ChartError::Alignment {
            historical: history.len(),
            replay: replay.len(),
            tolerance,
        });
    }

    let discarded = replay.len().saturating_sub(history.len());
    if gap > 0 {
        warn!(
            historical = history.len(),
            replay = replay.len(),
            discarded,
            "replay length differs; aligning the common prefix"
        );
    }

    for (point, bucket) in history.iter_mut().zip(replay) {
        point.model_replay = Some(bucket.mean_value);
    }
    Ok(discarded)
}

/// Attach band buckets by position, like replay values. Returns the discarded count.
fn align_band(history: &mut [ChartPoint], band: &[AggregatedBand]) -> usize {
    let discarded = band.len().saturating_sub(history.len());
    if discarded > 0 {
        warn!(historical = history.len(), band = band.len(), discarded, "trailing replay band buckets dropped");
    }
    for (point, bucket) in history.iter_mut().zip(band) {
        point.lower = Some(bucket.lower);
        point.upper = Some(bucket.upper);
    }
    discarded
}

/// Duplicate the last historical value as the boundary point.
fn today_marker(history: &[ChartPoint], reference_date: NaiveDate) -> Option<ChartPoint> {
    let last = history.last()?;
    // Never step backwards inside the historical segment.
    let date = reference_date.max(last.date);
    let mut marker = ChartPoint::historical(date, format_label(date, Granularity::Today), last.actual?);
    marker.marker = Some(Marker::Today);
    Some(marker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Horizon;
    use chrono::Duration;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn buckets(start: NaiveDate, values: &[f64]) -> Vec<AggregatedPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| AggregatedPoint {
                period_end_date: start + Duration::days(90 * i as i64),
                mean_value: v,
                bucket_size: 90,
                is_historical: true,
            })
            .collect()
    }

    fn forecast(date: NaiveDate, h: u32, v: f64) -> ChartPoint {
        ChartPoint::forecast(date, format!("h{h}"), Horizon(h), v)
    }

    #[test]
    fn segments_are_history_marker_forecasts() {
        let hist = buckets(ymd(2023, 1, 1), &[1.0, 2.0, 3.0]);
        let reference = ymd(2023, 9, 1);
        let fc = vec![
            forecast(reference + Duration::days(90), 1, 5.0),
            forecast(reference, 0, 4.0),
        ];
        let out = merge(&hist, None, &fc, &MergeOptions::new(reference)).unwrap();

        assert_eq!(out.len(), 6);
        assert!(out[..3].iter().all(|p| p.is_historical && p.marker.is_none()));
        assert!(out[3].is_today_marker());
        assert_eq!(out[3].display_label, "Today");
        assert_eq!(out[3].actual, Some(3.0));
        assert_eq!(out[4].horizon_index, Some(0));
        assert_eq!(out[5].horizon_index, Some(1));
        assert!(out.windows(2).all(|w| w[0].date <= w[1].date));
    }

    #[test]
    fn exactly_one_today_marker() {
        let hist = buckets(ymd(2023, 1, 1), &[1.0, 2.0]);
        let out = merge(&hist, None, &[], &MergeOptions::new(ymd(2023, 6, 1))).unwrap();
        let markers: Vec<&ChartPoint> = out.iter().filter(|p| p.is_today_marker()).collect();
        assert_eq!(markers.len(), 1);
        assert!(markers[0].is_historical);
        assert_eq!(markers[0].model_replay, None);
    }

    #[test]
    fn marker_can_be_disabled() {
        let hist = buckets(ymd(2023, 1, 1), &[1.0, 2.0]);
        let mut opts = MergeOptions::new(ymd(2023, 6, 1));
        opts.today_marker = false;
        let out = merge(&hist, None, &[], &opts).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|p| !p.is_today_marker()));
    }

    #[test]
    fn marker_never_precedes_last_history_point() {
        let hist = buckets(ymd(2023, 1, 1), &[1.0, 2.0]);
        let out = merge(&hist, None, &[], &MergeOptions::new(ymd(2022, 1, 1))).unwrap();
        assert_eq!(out[2].date, out[1].date);
    }

    #[test]
    fn replay_is_aligned_by_position() {
        let hist = buckets(ymd(2023, 1, 1), &[10.0, 20.0, 30.0]);
        // Replay dates are deliberately off; only the bucket index matters.
        let replay = buckets(ymd(2019, 5, 5), &[11.0, 19.0, 32.0]);
        let out = merge(&hist, Some(Replay::new(&replay)), &[], &MergeOptions::new(ymd(2023, 9, 1))).unwrap();
        let replayed: Vec<Option<f64>> = out[..3].iter().map(|p| p.model_replay).collect();
        assert_eq!(replayed, vec![Some(11.0), Some(19.0), Some(32.0)]);
    }

    #[test]
    fn shorter_replay_aligns_common_prefix_without_error() {
        let hist = buckets(ymd(2023, 1, 1), &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let replay = buckets(ymd(2023, 1, 1), &[1.5, 2.5, 3.5]);
        let out = merge(&hist, Some(Replay::new(&replay)), &[], &MergeOptions::new(ymd(2024, 6, 1))).unwrap();
        let replayed: Vec<Option<f64>> = out[..5].iter().map(|p| p.model_replay).collect();
        assert_eq!(replayed, vec![Some(1.5), Some(2.5), Some(3.5), None, None]);
    }

    #[test]
    fn longer_replay_drops_trailing_buckets() {
        let hist = buckets(ymd(2023, 1, 1), &[1.0, 2.0]);
        let replay = buckets(ymd(2023, 1, 1), &[1.5, 2.5, 3.5]);
        let mut opts = MergeOptions::new(ymd(2023, 6, 1));
        opts.today_marker = false;
        let out = merge(&hist, Some(Replay::new(&replay)), &[], &opts).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].model_replay, Some(2.5));
    }

    #[test]
    fn discarded_replay_buckets_are_counted() {
        let mut hist: Vec<ChartPoint> = buckets(ymd(2023, 1, 1), &[1.0, 2.0])
            .iter()
            .map(|b| ChartPoint::historical(b.period_end_date, String::new(), b.mean_value))
            .collect();
        let longer = buckets(ymd(2023, 1, 1), &[1.5, 2.5, 3.5, 4.5]);
        assert_eq!(align_replay(&mut hist, &longer, 4).unwrap(), 2);

        let shorter = buckets(ymd(2023, 1, 1), &[1.5]);
        assert_eq!(align_replay(&mut hist, &shorter, 4).unwrap(), 0);
        assert_eq!(align_replay(&mut hist, &longer[..2], 4).unwrap(), 0);
    }

    #[test]
    fn replay_band_lands_on_historical_points() {
        let hist = buckets(ymd(2023, 1, 1), &[10.0, 20.0, 30.0]);
        let replay = buckets(ymd(2023, 1, 1), &[11.0, 19.0, 32.0]);
        // One band bucket short: the last point carries no bounds.
        let band: Vec<AggregatedBand> = replay[..2]
            .iter()
            .map(|b| AggregatedBand {
                period_end_date: b.period_end_date,
                lower: b.mean_value - 1.0,
                upper: b.mean_value + 1.0,
            })
            .collect();
        let out = merge(
            &hist,
            Some(Replay::new(&replay).with_band(&band)),
            &[],
            &MergeOptions::new(ymd(2023, 9, 1)),
        )
        .unwrap();
        assert_eq!((out[0].lower, out[0].upper), (Some(10.0), Some(12.0)));
        assert_eq!((out[1].lower, out[1].upper), (Some(18.0), Some(20.0)));
        assert_eq!((out[2].lower, out[2].upper), (None, None));
        assert!(out[0].forecast.is_none());
        // The marker copies only the actual value.
        assert!(out[3].is_today_marker());
        assert_eq!(out[3].lower, None);
    }

    #[test]
    fn replay_gap_beyond_tolerance_fails() {
        let hist = buckets(ymd(2023, 1, 1), &[1.0; 8]);
        let replay = buckets(ymd(2023, 1, 1), &[1.0; 2]);
        let mut opts = MergeOptions::new(ymd(2025, 1, 1));
        opts.replay_tolerance = 3;
        let err = merge(&hist, Some(Replay::new(&replay)), &[], &opts).unwrap_err();
        assert_eq!(
            err,
            ChartError::Alignment {
                historical: 8,
                replay: 2,
                tolerance: 3
            }
        );
    }

    #[test]
    fn keep_last_trims_oldest_after_alignment() {
        let hist = buckets(ymd(2023, 1, 1), &[1.0, 2.0, 3.0, 4.0]);
        let replay = buckets(ymd(2023, 1, 1), &[1.5, 2.5, 3.5, 4.5]);
        let mut opts = MergeOptions::new(ymd(2024, 6, 1));
        opts.keep_last = Some(2);
        let out = merge(&hist, Some(Replay::new(&replay)), &[], &opts).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].actual, Some(3.0));
        assert_eq!(out[0].model_replay, Some(3.5));
        assert!(out[2].is_today_marker());
    }

    #[test]
    fn skewed_forecast_stays_after_marker() {
        let hist = buckets(ymd(2023, 1, 1), &[1.0, 2.0]);
        let reference = ymd(2023, 6, 1);
        let fc = vec![forecast(ymd(2023, 2, 1), 0, 9.0)];
        let out = merge(&hist, None, &fc, &MergeOptions::new(reference)).unwrap();
        assert!(out[2].is_today_marker());
        assert_eq!(out[3].forecast, Some(9.0));
        assert!(out[3].date < out[2].date);
    }

    #[test]
    fn missing_field_contract() {
        let hist = buckets(ymd(2023, 1, 1), &[1.0, 2.0]);
        let reference = ymd(2023, 6, 1);
        let fc = vec![forecast(reference, 0, 3.0)];
        let out = merge(&hist, None, &fc, &MergeOptions::new(reference)).unwrap();
        for p in &out {
            if p.is_historical {
                assert!(p.forecast.is_none());
                assert!(p.horizon_index.is_none());
            } else {
                assert!(p.actual.is_none());
                assert!(p.model_replay.is_none());
            }
        }
    }

    #[test]
    fn empty_history_fails() {
        let err = merge(&[], None, &[], &MergeOptions::new(ymd(2023, 6, 1))).unwrap_err();
        assert!(matches!(err, ChartError::EmptySeries { .. }));
    }
}
