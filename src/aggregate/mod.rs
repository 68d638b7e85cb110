//! Bucketing of the historical series.
//!
//! The default policy groups a fixed number of consecutive observations per
//! bucket (90 daily observations ~ one quarter). A bucket's period end is the
//! date of its last observation, not a calendar boundary. The trailing bucket
//! is emitted even when it is short, so recent data is never discarded.
//!
//! Calendar-aligned quarters are available as a separate, explicitly selected
//! policy (`BucketPolicy::CalendarQuarter`).

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::domain::{AggregatedBand, AggregatedPoint, BandObservation, BucketPolicy, RawObservation};
use crate::error::ChartError;
use crate::normalize::quarter_of;

/// Observations per bucket for the default policy.
pub const DEFAULT_WINDOW: usize = 90;

/// Aggregate `series` with the configured policy.
pub fn aggregate(series: &[RawObservation], policy: BucketPolicy) -> Result<Vec<AggregatedPoint>, ChartError> {
    match policy {
        BucketPolicy::Observations(window) => aggregate_to_quarters(series, window),
        BucketPolicy::CalendarQuarter => aggregate_calendar_quarters(series),
    }
}

/// Aggregate a replay band with the same policy as its series.
///
/// Each bound is bucketed on its own; both share dates, so buckets line up.
pub fn aggregate_band(band: &[BandObservation], policy: BucketPolicy) -> Result<Vec<AggregatedBand>, ChartError> {
    let lower: Vec<RawObservation> = band.iter().map(|b| RawObservation::new(b.date, b.lower)).collect();
    let upper: Vec<RawObservation> = band.iter().map(|b| RawObservation::new(b.date, b.upper)).collect();
    let lower = aggregate(&lower, policy)?;
    let upper = aggregate(&upper, policy)?;

    Ok(lower
        .into_iter()
        .zip(upper)
        .map(|(lo, hi)| AggregatedBand {
            period_end_date: lo.period_end_date,
            lower: lo.mean_value,
            upper: hi.mean_value,
        })
        .collect())
}

/// Bucket `series` into groups of `window_size` observations and average each.
///
/// Produces `ceil(len / window_size)` buckets whose sizes sum to `len`.
pub fn aggregate_to_quarters(
    series: &[RawObservation],
    window_size: usize,
) -> Result<Vec<AggregatedPoint>, ChartError> {
    if window_size == 0 {
        return Err(ChartError::InvalidWindow(window_size));
    }
    if series.is_empty() {
        return Err(ChartError::EmptySeries { what: "historical series" });
    }

    let sorted = sorted_by_date(series);
    let mut out = Vec::with_capacity(sorted.len().div_ceil(window_size));
    let mut bucket = Bucket::default();

    for obs in &sorted {
        bucket.push(obs);
        if bucket.len == window_size {
            out.push(bucket.close());
        }
    }
    if bucket.len > 0 {
        out.push(bucket.close());
    }

    debug!(
        observations = sorted.len(),
        window = window_size,
        buckets = out.len(),
        "aggregated by observation count"
    );
    Ok(out)
}

/// Bucket `series` by calendar quarter; the period end is the quarter's last day.
pub fn aggregate_calendar_quarters(series: &[RawObservation]) -> Result<Vec<AggregatedPoint>, ChartError> {
    if series.is_empty() {
        return Err(ChartError::EmptySeries { what: "historical series" });
    }

    let sorted = sorted_by_date(series);
    let mut out = Vec::new();
    let mut bucket = Bucket::default();
    let mut current: Option<(i32, u32)> = None;

    for obs in &sorted {
        let key = (obs.date.year(), quarter_of(obs.date));
        if current.is_some_and(|k| k != key) && bucket.len > 0 {
            let mut point = bucket.close();
            point.period_end_date = quarter_end(point.period_end_date)?;
            out.push(point);
        }
        current = Some(key);
        bucket.push(obs);
    }
    if bucket.len > 0 {
        let mut point = bucket.close();
        point.period_end_date = quarter_end(point.period_end_date)?;
        out.push(point);
    }

    debug!(observations = sorted.len(), buckets = out.len(), "aggregated by calendar quarter");
    Ok(out)
}

#[derive(Default)]
struct Bucket {
    sum: f64,
    len: usize,
    last_date: Option<NaiveDate>,
}

impl Bucket {
    fn push(&mut self, obs: &RawObservation) {
        self.sum += obs.value;
        self.len += 1;
        self.last_date = Some(obs.date);
    }

    /// Emit the bucket and reset. Only called with `len > 0`.
    fn close(&mut self) -> AggregatedPoint {
        let taken = std::mem::take(self);
        AggregatedPoint {
            period_end_date: taken.last_date.unwrap_or_default(),
            mean_value: taken.sum / taken.len as f64,
            bucket_size: taken.len,
            is_historical: true,
        }
    }
}

/// Stable sort so same-day observations keep their upstream order.
fn sorted_by_date(series: &[RawObservation]) -> Vec<RawObservation> {
    let mut sorted = series.to_vec();
    sorted.sort_by_key(|o| o.date);
    sorted
}

fn quarter_end(date: NaiveDate) -> Result<NaiveDate, ChartError> {
    let q = quarter_of(date);
    let (year, month) = if q == 4 { (date.year() + 1, 1) } else { (date.year(), q * 3 + 1) };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .ok_or_else(|| ChartError::parse(format!("no quarter end for {date}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn daily(start: NaiveDate, values: &[f64]) -> Vec<RawObservation> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| RawObservation::new(start + Duration::days(i as i64), v))
            .collect()
    }

    #[test]
    fn one_eighty_five_observations_make_three_buckets() {
        let values: Vec<f64> = (1..=185).map(|i| i as f64).collect();
        let series = daily(ymd(2023, 1, 1), &values);

        let buckets = aggregate_to_quarters(&series, 90).unwrap();
        let sizes: Vec<usize> = buckets.iter().map(|b| b.bucket_size).collect();
        assert_eq!(sizes, vec![90, 90, 5]);

        // Mean of 1..=90 is 45.5, of 91..=180 is 135.5, of 181..=185 is 183.
        assert!((buckets[0].mean_value - 45.5).abs() < 1e-9);
        assert!((buckets[1].mean_value - 135.5).abs() < 1e-9);
        assert!((buckets[2].mean_value - 183.0).abs() < 1e-9);
    }

    #[test]
    fn period_end_is_last_observation_not_quarter_boundary() {
        let series = daily(ymd(2023, 1, 10), &vec![1.0; 95]);
        let buckets = aggregate_to_quarters(&series, 90).unwrap();
        assert_eq!(buckets[0].period_end_date, ymd(2023, 1, 10) + Duration::days(89));
        assert_eq!(buckets[1].period_end_date, ymd(2023, 1, 10) + Duration::days(94));
        assert!(buckets.iter().all(|b| b.is_historical));
    }

    #[test]
    fn unsorted_input_is_scanned_in_date_order() {
        let series = vec![
            RawObservation::new(ymd(2024, 1, 3), 3.0),
            RawObservation::new(ymd(2024, 1, 1), 1.0),
            RawObservation::new(ymd(2024, 1, 2), 2.0),
        ];
        let buckets = aggregate_to_quarters(&series, 2).unwrap();
        assert_eq!(buckets.len(), 2);
        assert!((buckets[0].mean_value - 1.5).abs() < 1e-12);
        assert_eq!(buckets[0].period_end_date, ymd(2024, 1, 2));
        assert_eq!(buckets[1].bucket_size, 1);
    }

    #[test]
    fn band_buckets_follow_the_series_policy() {
        let band: Vec<BandObservation> = (0..5)
            .map(|i| BandObservation::new(ymd(2024, 1, 1) + Duration::days(i), i as f64, i as f64 + 2.0))
            .collect();
        let buckets = aggregate_band(&band, BucketPolicy::Observations(2)).unwrap();
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].period_end_date, ymd(2024, 1, 2));
        assert!((buckets[0].lower - 0.5).abs() < 1e-12);
        assert!((buckets[0].upper - 2.5).abs() < 1e-12);
        assert!((buckets[2].lower - 4.0).abs() < 1e-12);
        assert!(buckets.iter().all(|b| b.lower <= b.upper));
    }

    #[test]
    fn empty_series_is_an_error() {
        assert_eq!(
            aggregate_to_quarters(&[], 90).unwrap_err(),
            ChartError::EmptySeries { what: "historical series" }
        );
        assert!(aggregate_calendar_quarters(&[]).is_err());
    }

    #[test]
    fn zero_window_is_rejected() {
        let series = daily(ymd(2024, 1, 1), &[1.0]);
        assert_eq!(aggregate_to_quarters(&series, 0).unwrap_err(), ChartError::InvalidWindow(0));
    }

    #[test]
    fn calendar_policy_uses_quarter_ends() {
        // 2024-03-30 .. 2024-04-02 spans Q1 and Q2.
        let series = daily(ymd(2024, 3, 30), &[1.0, 3.0, 10.0, 20.0]);
        let buckets = aggregate(&series, BucketPolicy::CalendarQuarter).unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].period_end_date, ymd(2024, 3, 31));
        assert_eq!(buckets[0].bucket_size, 2);
        assert!((buckets[0].mean_value - 2.0).abs() < 1e-12);
        assert_eq!(buckets[1].period_end_date, ymd(2024, 6, 30));
        assert!((buckets[1].mean_value - 15.0).abs() < 1e-12);
    }

    #[test]
    fn calendar_policy_q4_rolls_year() {
        let series = daily(ymd(2023, 12, 30), &[2.0, 4.0]);
        let buckets = aggregate(&series, BucketPolicy::CalendarQuarter).unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].period_end_date, ymd(2023, 12, 31));
    }

    #[test]
    fn policies_differ_for_the_same_input() {
        let series = daily(ymd(2024, 2, 1), &vec![1.0; 100]);
        let by_count = aggregate(&series, BucketPolicy::Observations(90)).unwrap();
        let by_quarter = aggregate(&series, BucketPolicy::CalendarQuarter).unwrap();
        assert_eq!(by_count[0].bucket_size, 90);
        // Feb + Mar 2024 = 29 + 31 days in Q1.
        assert_eq!(by_quarter[0].bucket_size, 60);
    }

    proptest! {
        #[test]
        fn bucket_count_and_sizes(len in 1usize..600, window in 1usize..120) {
            let values: Vec<f64> = (0..len).map(|i| (i % 17) as f64).collect();
            let series = daily(ymd(2000, 1, 1), &values);
            let buckets = aggregate_to_quarters(&series, window).unwrap();

            prop_assert_eq!(buckets.len(), len.div_ceil(window));
            prop_assert_eq!(buckets.iter().map(|b| b.bucket_size).sum::<usize>(), len);
            prop_assert!(buckets.iter().all(|b| b.bucket_size > 0 && b.bucket_size <= window));
            prop_assert!(buckets.windows(2).all(|w| w[0].period_end_date < w[1].period_end_date));
        }
    }
}
