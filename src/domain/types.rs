//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed between pipeline stages without conversion
//! - exported to JSON/CSV for the rendering layer
//! - built fresh on every refresh (nothing here is cached)

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One raw value from the historical series (daily or quarterly).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub date: NaiveDate,
    pub value: f64,
}

impl RawObservation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

/// Replay confidence bounds reported for one historical row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandObservation {
    pub date: NaiveDate,
    pub lower: f64,
    pub upper: f64,
}

impl BandObservation {
    pub fn new(date: NaiveDate, lower: f64, upper: f64) -> Self {
        Self { date, lower, upper }
    }
}

/// A single model's prediction as returned by one fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Identifies the horizon, e.g. `nowcast`, `h1`, `forecasting_h2`.
    pub model_name: String,
    pub reference_date: NaiveDate,
    pub point_value: f64,
    pub confidence_interval: Option<ConfidenceInterval>,
}

/// One bucket of the historical series reduced to its mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedPoint {
    pub period_end_date: NaiveDate,
    pub mean_value: f64,
    /// Observations actually averaged; never zero.
    pub bucket_size: usize,
    pub is_historical: bool,
}

/// Bucket means of a replay band; `lower <= upper` holds per bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregatedBand {
    pub period_end_date: NaiveDate,
    pub lower: f64,
    pub upper: f64,
}

/// Boundary flags consumed by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marker {
    /// Synthetic "today" point; renderers draw a vertical divider here.
    Today,
}

/// The unified output record.
///
/// Fields that do not apply are `None` and are omitted from serialized output,
/// so renderers never draw spurious zero-valued points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub display_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_replay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
    pub is_historical: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizon_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
}

impl ChartPoint {
    /// A historical point carrying only an actual value.
    pub fn historical(date: NaiveDate, display_label: String, actual: f64) -> Self {
        Self {
            date,
            display_label,
            actual: Some(actual),
            model_replay: None,
            forecast: None,
            lower: None,
            upper: None,
            is_historical: true,
            horizon_index: None,
            marker: None,
        }
    }

    /// A forward-looking point for a single horizon.
    pub fn forecast(date: NaiveDate, display_label: String, horizon: Horizon, value: f64) -> Self {
        Self {
            date,
            display_label,
            actual: None,
            model_replay: None,
            forecast: Some(value),
            lower: None,
            upper: None,
            is_historical: false,
            horizon_index: Some(horizon.index()),
            marker: None,
        }
    }

    pub fn is_today_marker(&self) -> bool {
        self.marker == Some(Marker::Today)
    }
}

/// Forecast horizon in quarters ahead; `0` is the nowcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Horizon(pub u32);

impl Horizon {
    pub const NOWCAST: Horizon = Horizon(0);

    pub fn index(self) -> u32 {
        self.0
    }

    pub fn is_nowcast(self) -> bool {
        self.0 == 0
    }
}

/// Per-horizon state of a prediction set.
///
/// The upstream model set may legitimately be incomplete (e.g. a model that is
/// not released yet), so every horizon is either present or explicitly absent.
#[derive(Debug, Clone, PartialEq)]
pub enum HorizonSlot {
    Present(PredictionRecord),
    Absent,
}

impl HorizonSlot {
    pub fn record(&self) -> Option<&PredictionRecord> {
        match self {
            HorizonSlot::Present(record) => Some(record),
            HorizonSlot::Absent => None,
        }
    }
}

/// Magnitude units with fixed, documented conversion factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Units,
    Thousands,
    Millions,
    Billions,
    Trillions,
}

impl Unit {
    /// Multiplier from this unit to plain units.
    pub fn factor(self) -> f64 {
        match self {
            Unit::Units => 1.0,
            Unit::Thousands => 1e3,
            Unit::Millions => 1e6,
            Unit::Billions => 1e9,
            Unit::Trillions => 1e12,
        }
    }

    /// Short suffix for axis labels and tables.
    pub fn suffix(self) -> &'static str {
        match self {
            Unit::Units => "",
            Unit::Thousands => "K",
            Unit::Millions => "M",
            Unit::Billions => "B",
            Unit::Trillions => "T",
        }
    }
}

/// Source/target unit pair applied identically to every value of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitConversion {
    pub source: Unit,
    pub target: Unit,
}

impl UnitConversion {
    pub const IDENTITY: UnitConversion = UnitConversion {
        source: Unit::Units,
        target: Unit::Units,
    };

    pub fn new(source: Unit, target: Unit) -> Self {
        Self { source, target }
    }

    pub fn apply(self, raw: f64) -> f64 {
        crate::normalize::normalize_value(raw, self.source, self.target)
    }
}

/// What a display label describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Daily,
    Quarterly,
    Horizon(Horizon),
    Today,
}

/// How the historical series is bucketed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketPolicy {
    /// Fixed number of consecutive observations per bucket.
    Observations(usize),
    /// One bucket per calendar quarter.
    CalendarQuarter,
}

impl Default for BucketPolicy {
    fn default() -> Self {
        BucketPolicy::Observations(crate::aggregate::DEFAULT_WINDOW)
    }
}

/// CLI-facing selector for [`BucketPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Bucketing {
    Observations,
    Calendar,
}

impl Bucketing {
    pub fn policy(self, window: usize) -> BucketPolicy {
        match self {
            Bucketing::Observations => BucketPolicy::Observations(window),
            Bucketing::Calendar => BucketPolicy::CalendarQuarter,
        }
    }
}
