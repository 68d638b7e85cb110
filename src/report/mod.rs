//! Reporting utilities: chart statistics and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::ChartPoint;

/// Counts and headline numbers derived from a chart sequence.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChartStats {
    pub historical: usize,
    pub with_replay: usize,
    pub forecasts: usize,
    pub last_actual: Option<f64>,
    pub nowcast: Option<f64>,
    /// Mean absolute gap between actual and replay where both exist.
    pub replay_mae: Option<f64>,
}

impl ChartStats {
    /// Relative change from the last actual to the nowcast, in percent.
    pub fn nowcast_change_pct(&self) -> Option<f64> {
        match (self.last_actual, self.nowcast) {
            (Some(last), Some(now)) if last != 0.0 => Some((now / last - 1.0) * 100.0),
            _ => None,
        }
    }
}

pub fn compute_stats(points: &[ChartPoint]) -> ChartStats {
    let mut stats = ChartStats::default();
    let mut abs_gap_sum = 0.0;

    for p in points {
        if p.is_historical && !p.is_today_marker() {
            stats.historical += 1;
            if p.actual.is_some() {
                stats.last_actual = p.actual;
            }
        }
        if let (Some(actual), Some(replay)) = (p.actual, p.model_replay) {
            stats.with_replay += 1;
            abs_gap_sum += (actual - replay).abs();
        }
        if let Some(h) = p.horizon_index {
            stats.forecasts += 1;
            if h == 0 {
                stats.nowcast = p.forecast;
            }
        }
    }

    if stats.with_replay > 0 {
        stats.replay_mae = Some(abs_gap_sum / stats.with_replay as f64);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::domain::{Horizon, Marker};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    #[test]
    fn stats_skip_today_marker_and_find_nowcast() {
        let mut h1 = ChartPoint::historical(d(1, 31), "Jan '24".into(), 100.0);
        h1.model_replay = Some(98.0);
        let h2 = ChartPoint::historical(d(4, 30), "Apr '24".into(), 110.0);
        let mut today = ChartPoint::historical(d(4, 30), "Today".into(), 110.0);
        today.marker = Some(Marker::Today);
        let now = ChartPoint::forecast(d(4, 30), "Nowcast".into(), Horizon(0), 121.0);
        let f1 = ChartPoint::forecast(d(7, 29), "Forecast (h1)".into(), Horizon(1), 125.0);

        let stats = compute_stats(&[h1, h2, today, now, f1]);
        assert_eq!(stats.historical, 2);
        assert_eq!(stats.with_replay, 1);
        assert_eq!(stats.forecasts, 2);
        assert_eq!(stats.last_actual, Some(110.0));
        assert_eq!(stats.nowcast, Some(121.0));
        assert!((stats.replay_mae.unwrap() - 2.0).abs() < 1e-12);
        assert!((stats.nowcast_change_pct().unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn stats_empty() {
        let stats = compute_stats(&[]);
        assert_eq!(stats, ChartStats::default());
        assert!(stats.nowcast_change_pct().is_none());
    }
}
