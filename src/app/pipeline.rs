//! Shared chart pipeline used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! units -> aggregation (history + replay) -> horizon projection -> merge
//!
//! The pipeline is pure: no clock, no I/O, no state kept between calls. The
//! CLI and the TUI focus on fetching and presentation.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::aggregate::{DEFAULT_WINDOW, aggregate, aggregate_band};
use crate::data::UpstreamData;
use crate::domain::{
    BandObservation, BucketPolicy, ChartPoint, PredictionRecord, RawObservation, Unit, UnitConversion,
};
use crate::error::ChartError;
use crate::horizon::{DEFAULT_MAX_HORIZON, DEFAULT_STEP_DAYS, project_horizons};
use crate::merge::{DEFAULT_REPLAY_TOLERANCE, MergeOptions, Replay, merge};

/// Inputs of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartInput {
    pub history: Vec<RawObservation>,
    pub replay: Option<Vec<RawObservation>>,
    pub replay_band: Option<Vec<BandObservation>>,
    pub predictions: Vec<PredictionRecord>,
    pub reference_date: NaiveDate,
}

impl ChartInput {
    pub fn from_upstream(data: UpstreamData, reference_date: NaiveDate) -> Self {
        Self {
            history: data.history,
            replay: data.replay,
            replay_band: data.replay_band,
            predictions: data.predictions,
            reference_date,
        }
    }
}

/// Knobs shared by every call site.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfig {
    pub bucket_policy: BucketPolicy,
    pub horizon_step_days: i64,
    pub max_horizon: u32,
    pub source_unit: Unit,
    pub target_unit: Unit,
    /// Attach the model-replay series (and its band) when the input has one.
    pub include_replay: bool,
    pub today_marker: bool,
    pub replay_tolerance: usize,
    pub keep_last: Option<usize>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            bucket_policy: BucketPolicy::Observations(DEFAULT_WINDOW),
            horizon_step_days: DEFAULT_STEP_DAYS,
            max_horizon: DEFAULT_MAX_HORIZON,
            source_unit: Unit::Millions,
            target_unit: Unit::Billions,
            include_replay: true,
            today_marker: true,
            replay_tolerance: DEFAULT_REPLAY_TOLERANCE,
            keep_last: None,
        }
    }
}

impl ChartConfig {
    pub fn units(&self) -> UnitConversion {
        UnitConversion::new(self.source_unit, self.target_unit)
    }
}

/// A successfully built chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub reference_date: NaiveDate,
    pub unit: Unit,
    /// Historical buckets before `keep_last` trimming.
    pub bucket_count: usize,
    /// Horizon indexes that produced a forecast point.
    pub horizons: Vec<u32>,
    pub points: Vec<ChartPoint>,
}

/// What the rendering layer receives: a chart, or an explicit empty state.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartOutcome {
    Ready(ChartData),
    NoData { reason: String },
}

impl ChartOutcome {
    pub fn data(&self) -> Option<&ChartData> {
        match self {
            ChartOutcome::Ready(data) => Some(data),
            ChartOutcome::NoData { .. } => None,
        }
    }
}

/// Build the chart, downgrading any pipeline failure to `NoData`.
pub fn build_chart(input: &ChartInput, config: &ChartConfig) -> ChartOutcome {
    match build_chart_data(input, config) {
        Ok(data) => ChartOutcome::Ready(data),
        Err(err) => {
            warn!(error = %err, "chart pipeline failed; showing no-data state");
            ChartOutcome::NoData {
                reason: err.to_string(),
            }
        }
    }
}

/// Run the full pipeline, failing on the first stage error.
#[instrument(skip_all, fields(reference_date = %input.reference_date, observations = input.history.len()))]
pub fn build_chart_data(input: &ChartInput, config: &ChartConfig) -> Result<ChartData, ChartError> {
    let units = config.units();

    // 1) Units first so aggregation averages display values.
    let history = convert_series(&input.history, units);
    let aggregated = aggregate(&history, config.bucket_policy)?;

    // 2) Replay goes through the same bucket policy before positional alignment.
    let replay = match (&input.replay, config.include_replay) {
        (Some(series), true) if !series.is_empty() => {
            Some(aggregate(&convert_series(series, units), config.bucket_policy)?)
        }
        _ => None,
    };
    let band = match (&input.replay_band, &replay) {
        (Some(series), Some(_)) if !series.is_empty() => {
            Some(aggregate_band(&convert_band(series, units), config.bucket_policy)?)
        }
        _ => None,
    };

    // 3) Forward points.
    let forecasts = project_horizons(
        &input.predictions,
        input.reference_date,
        config.horizon_step_days,
        config.max_horizon,
        units,
    )?;

    // 4) Merge segments.
    let options = MergeOptions {
        reference_date: input.reference_date,
        today_marker: config.today_marker,
        replay_tolerance: config.replay_tolerance,
        keep_last: config.keep_last,
    };
    let replay = replay.as_deref().map(|values| match band.as_deref() {
        Some(band) => Replay::new(values).with_band(band),
        None => Replay::new(values),
    });
    let points = merge(&aggregated, replay, &forecasts, &options)?;

    debug!(
        buckets = aggregated.len(),
        replay_buckets = replay.map_or(0, |r| r.values.len()),
        band_buckets = band.as_ref().map_or(0, Vec::len),
        forecasts = forecasts.len(),
        "pipeline stages complete"
    );
    info!(points = points.len(), "chart built");

    Ok(ChartData {
        reference_date: input.reference_date,
        unit: config.target_unit,
        bucket_count: aggregated.len(),
        horizons: forecasts.iter().filter_map(|p| p.horizon_index).collect(),
        points,
    })
}

/// Pick the reference date: explicit flag, else the upstream's own date, else
/// the caller-supplied fallback (the CLI passes the local calendar date).
pub fn resolve_reference_date(
    explicit: Option<NaiveDate>,
    data: &UpstreamData,
    fallback: NaiveDate,
) -> NaiveDate {
    explicit
        .or_else(|| data.reported_reference_date())
        .unwrap_or(fallback)
}

fn convert_series(series: &[RawObservation], units: UnitConversion) -> Vec<RawObservation> {
    series
        .iter()
        .map(|o| RawObservation::new(o.date, units.apply(o.value)))
        .collect()
}

fn convert_band(band: &[BandObservation], units: UnitConversion) -> Vec<BandObservation> {
    band.iter()
        .map(|b| BandObservation::new(b.date, units.apply(b.lower), units.apply(b.upper)))
        .collect()
}
