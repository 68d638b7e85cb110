//! JSON shapes returned by the prediction service.
//!
//! These mirror the upstream payloads loosely (aliases for the older field
//! names) and are converted to domain types through the normalizer, so a
//! malformed date or number surfaces as `ChartError::Parse`.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{BandObservation, ConfidenceInterval, PredictionRecord, RawObservation};
use crate::error::ChartError;
use crate::normalize::{ensure_finite, normalize_date};

/// One row of the history endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireObservation {
    pub date: String,
    /// Actual value; `null` when the upstream has no print for that day.
    #[serde(alias = "actual_gdp", alias = "actual")]
    pub value: Option<f64>,
    /// The model's own reproduction of the value, if the endpoint sends one.
    #[serde(default, alias = "gdp", alias = "nowcasting")]
    pub replay: Option<f64>,
    /// Replay confidence bounds; only rows carrying both are kept.
    #[serde(default, alias = "lower")]
    pub lower_bound: Option<f64>,
    #[serde(default, alias = "upper")]
    pub upper_bound: Option<f64>,
}

/// The history endpoint answers either with a bare list or a wrapper object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireHistory {
    Wrapped { historical_data: Vec<WireObservation> },
    Bare(Vec<WireObservation>),
}

impl WireHistory {
    pub fn rows(self) -> Vec<WireObservation> {
        match self {
            WireHistory::Wrapped { historical_data } => historical_data,
            WireHistory::Bare(rows) => rows,
        }
    }
}

/// Historical actuals plus the optional model-replay column and its band.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySeries {
    pub actual: Vec<RawObservation>,
    /// `None` when no row carried a replay value.
    pub replay: Option<Vec<RawObservation>>,
    /// `None` when no row carried both bounds.
    pub replay_band: Option<Vec<BandObservation>>,
}

/// Convert history rows, skipping rows whose value is missing.
pub fn history_from_wire(rows: Vec<WireObservation>) -> Result<HistorySeries, ChartError> {
    let mut actual = Vec::with_capacity(rows.len());
    let mut replay = Vec::new();
    let mut band = Vec::new();
    let mut skipped = 0usize;

    for row in rows {
        let date = normalize_date(&row.date)?;
        match row.value {
            Some(v) => actual.push(RawObservation::new(date, ensure_finite(v, "history value")?)),
            None => skipped += 1,
        }
        if let Some(r) = row.replay {
            replay.push(RawObservation::new(date, ensure_finite(r, "replay value")?));
        }
        if let (Some(lo), Some(hi)) = (row.lower_bound, row.upper_bound) {
            let lower = ensure_finite(lo, "history lower bound")?;
            let upper = ensure_finite(hi, "history upper bound")?;
            if lower > upper {
                return Err(ChartError::parse(format!(
                    "inverted history band on {date}: lower {lower} > upper {upper}"
                )));
            }
            band.push(BandObservation::new(date, lower, upper));
        }
    }

    if skipped > 0 {
        warn!(skipped, "history rows without a value were skipped");
    }

    Ok(HistorySeries {
        actual,
        replay: if replay.is_empty() { None } else { Some(replay) },
        replay_band: if band.is_empty() { None } else { Some(band) },
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireInterval {
    pub lower: f64,
    pub upper: f64,
    #[serde(default)]
    pub std_error: Option<f64>,
}

/// Response body of `POST /predict`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WirePrediction {
    #[serde(default, alias = "model_type")]
    pub model_name: Option<String>,
    pub date: String,
    pub prediction: f64,
    #[serde(default)]
    pub confidence_interval: Option<WireInterval>,
}

impl WirePrediction {
    /// Convert to a domain record; `requested_model` fills in a missing name.
    pub fn into_record(self, requested_model: &str) -> Result<PredictionRecord, ChartError> {
        let model_name = self
            .model_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| requested_model.to_string());
        let reference_date = normalize_date(&self.date)?;
        let point_value = ensure_finite(self.prediction, "prediction")?;

        let confidence_interval = match self.confidence_interval {
            Some(ci) => {
                let lower = ensure_finite(ci.lower, "interval lower bound")?;
                let upper = ensure_finite(ci.upper, "interval upper bound")?;
                if lower > upper {
                    return Err(ChartError::parse(format!(
                        "inverted interval for {model_name}: lower {lower} > upper {upper}"
                    )));
                }
                Some(ConfidenceInterval { lower, upper })
            }
            None => None,
        };

        Ok(PredictionRecord {
            model_name,
            reference_date,
            point_value,
            confidence_interval,
        })
    }
}

/// Response body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireHealth {
    pub status: String,
    #[serde(default)]
    pub models_loaded: Option<serde_json::Value>,
}

impl WireHealth {
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.to_ascii_lowercase().as_str(), "ok" | "healthy" | "up")
    }

    /// Models the service says it has loaded. Accepts a list of names, a
    /// `{name: bool}` map or a bare count.
    pub fn loaded_models(&self) -> Option<String> {
        match self.models_loaded.as_ref()? {
            serde_json::Value::Array(items) => Some(
                items
                    .iter()
                    .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            serde_json::Value::Object(map) => Some(
                map.iter()
                    .filter(|(_, loaded)| loaded.as_bool().unwrap_or(true))
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}
