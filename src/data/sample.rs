//! Synthetic GDP series for offline runs.
//!
//! Produces a seeded daily level series (in millions), a model-replay series
//! with a small systematic bias and its confidence band, and nowcast/forecast records for horizons
//! 0..=3. Horizon 4 is left out on purpose to mirror a model that has not been
//! released yet.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::data::UpstreamData;
use crate::domain::{BandObservation, ConfidenceInterval, Horizon, PredictionRecord, RawObservation};
use crate::error::ChartError;

/// Starting level: roughly US nominal GDP in millions of dollars.
const BASE_LEVEL: f64 = 27_000_000.0;
/// Daily drift of the log level (~2% annualized).
const DAILY_DRIFT: f64 = 0.02 / 365.0;
/// Daily log-volatility of the level.
const DAILY_VOL: f64 = 0.0015;
/// Relative bias of the replayed model (it under-predicts slightly).
const REPLAY_BIAS: f64 = -0.004;
/// Relative noise of the replayed model; also sets its band width.
const REPLAY_NOISE: f64 = 0.002;
/// The replay series starts this many days after the actuals.
const REPLAY_LAG_DAYS: usize = 180;
/// Horizons the sample service "knows"; h4 is not released.
const RELEASED_HORIZONS: u32 = 3;
/// z-score of the reported interval (95%).
const INTERVAL_Z: f64 = 1.96;

#[derive(Debug, Clone)]
pub struct SampleConfig {
    /// Last observed day; predictions are stamped with this date.
    pub end_date: NaiveDate,
    /// Number of daily observations.
    pub days: usize,
    pub seed: u64,
    /// Requested model names; unknown or unreleased horizons are skipped.
    pub models: Vec<String>,
}

pub fn generate_sample(config: &SampleConfig) -> Result<UpstreamData, ChartError> {
    if config.days == 0 {
        return Err(ChartError::EmptySeries { what: "sample history" });
    }

    let mut rng = StdRng::seed_from_u64(sample_seed(config));
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| ChartError::parse(format!("noise distribution error: {e}")))?;

    let start = config
        .end_date
        .checked_sub_signed(Duration::days(config.days as i64 - 1))
        .ok_or_else(|| ChartError::parse("sample start date out of range"))?;

    let mut history = Vec::with_capacity(config.days);
    let mut replay = Vec::with_capacity(config.days.saturating_sub(REPLAY_LAG_DAYS));
    let mut band = Vec::with_capacity(replay.capacity());
    let mut log_level = BASE_LEVEL.ln();

    for i in 0..config.days {
        let date = start + Duration::days(i as i64);
        let z: f64 = normal.sample(&mut rng);
        log_level += DAILY_DRIFT + DAILY_VOL * z;
        let level = log_level.exp();
        history.push(RawObservation::new(date, level));

        if i >= REPLAY_LAG_DAYS {
            let noise: f64 = normal.sample(&mut rng);
            let replayed = level * (1.0 + REPLAY_BIAS + REPLAY_NOISE * noise);
            let half_width = INTERVAL_Z * REPLAY_NOISE * level;
            replay.push(RawObservation::new(date, replayed));
            band.push(BandObservation::new(date, replayed - half_width, replayed + half_width));
        }
    }

    let last_level = log_level.exp();
    let mut predictions = Vec::new();
    for model in &config.models {
        let Ok(horizon) = Horizon::from_model_name(model) else {
            continue;
        };
        if horizon.index() > RELEASED_HORIZONS {
            continue;
        }
        predictions.push(sample_prediction(model, horizon, last_level, config.end_date, &mut rng, &normal));
    }

    Ok(UpstreamData {
        history,
        replay: if replay.is_empty() { None } else { Some(replay) },
        replay_band: if band.is_empty() { None } else { Some(band) },
        predictions,
    })
}

fn sample_prediction(
    model: &str,
    horizon: Horizon,
    last_level: f64,
    end_date: NaiveDate,
    rng: &mut StdRng,
    normal: &Normal<f64>,
) -> PredictionRecord {
    let h = f64::from(horizon.index());
    // One horizon step is ~90 days of drift.
    let steps = 90.0 * h;
    let z: f64 = normal.sample(rng);
    let point = last_level * (DAILY_DRIFT * steps + DAILY_VOL * 3.0 * z).exp();
    let half_width = point * DAILY_VOL * INTERVAL_Z * (90.0 * (h + 1.0)).sqrt();

    PredictionRecord {
        model_name: model.to_string(),
        reference_date: end_date,
        point_value: point,
        confidence_interval: Some(ConfidenceInterval {
            lower: point - half_width,
            upper: point + half_width,
        }),
    }
}

fn sample_seed(config: &SampleConfig) -> u64 {
    let mut hasher = DefaultHasher::new();
    config.end_date.hash(&mut hasher);
    config.days.hash(&mut hasher);
    config.seed.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(days: usize, seed: u64) -> SampleConfig {
        SampleConfig {
            end_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            days,
            seed,
            models: ["nowcasting", "forecasting_h1", "forecasting_h2", "forecasting_h3", "forecasting_h4"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    #[test]
    fn same_seed_same_data() {
        let a = generate_sample(&config(400, 7)).unwrap();
        let b = generate_sample(&config(400, 7)).unwrap();
        assert_eq!(a, b);

        let c = generate_sample(&config(400, 8)).unwrap();
        assert_ne!(a.history, c.history);
    }

    #[test]
    fn history_ends_on_end_date_and_is_daily() {
        let data = generate_sample(&config(365, 1)).unwrap();
        assert_eq!(data.history.len(), 365);
        assert_eq!(data.history.last().unwrap().date, NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
        assert!(data.history.windows(2).all(|w| (w[1].date - w[0].date).num_days() == 1));
    }

    #[test]
    fn replay_is_shorter_than_history() {
        let data = generate_sample(&config(365, 1)).unwrap();
        let replay = data.replay.unwrap();
        assert_eq!(replay.len(), 365 - REPLAY_LAG_DAYS);
        assert_eq!(replay.last().unwrap().date, data.history.last().unwrap().date);
    }

    #[test]
    fn replay_band_brackets_every_replay_value() {
        let data = generate_sample(&config(365, 1)).unwrap();
        let replay = data.replay.unwrap();
        let band = data.replay_band.unwrap();
        assert_eq!(band.len(), replay.len());
        for (r, b) in replay.iter().zip(&band) {
            assert_eq!(r.date, b.date);
            assert!(b.lower < r.value && r.value < b.upper);
        }
    }

    #[test]
    fn unreleased_horizon_is_absent() {
        let data = generate_sample(&config(200, 3)).unwrap();
        let names: Vec<&str> = data.predictions.iter().map(|p| p.model_name.as_str()).collect();
        assert_eq!(names, vec!["nowcasting", "forecasting_h1", "forecasting_h2", "forecasting_h3"]);
        for p in &data.predictions {
            let ci = p.confidence_interval.unwrap();
            assert!(ci.lower < p.point_value && p.point_value < ci.upper);
        }
    }

    #[test]
    fn zero_days_is_empty_series() {
        assert!(matches!(
            generate_sample(&config(0, 1)),
            Err(ChartError::EmptySeries { .. })
        ));
    }
}
