//! Prediction service client.
//!
//! Blocking `reqwest` calls; the per-model prediction requests are fanned out
//! with `rayon` since each one is an independent round trip.

use std::time::Duration;

use rayon::prelude::*;
use reqwest::blocking::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::data::UpstreamData;
use crate::data::wire::{HistorySeries, WireHealth, WireHistory, WirePrediction, history_from_wire};
use crate::domain::PredictionRecord;
use crate::error::{AppError, ChartError};

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_COUNTRY: &str = "usa";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Connection settings read from `.env` / the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    pub country: String,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ApiConfig {
    /// `NOWCAST_API_URL`, `NOWCAST_COUNTRY`, `NOWCAST_TIMEOUT_SECS`; all optional.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();
        let base_url = lookup("NOWCAST_API_URL")
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or(defaults.base_url);
        let country = lookup("NOWCAST_COUNTRY")
            .map(|c| c.trim().to_ascii_lowercase())
            .filter(|c| !c.is_empty())
            .unwrap_or(defaults.country);
        let timeout = match lookup("NOWCAST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    AppError::new(2, format!("NOWCAST_TIMEOUT_SECS must be a whole number of seconds, got '{raw}'."))
                })?;
                Duration::from_secs(secs.max(1))
            }
            None => defaults.timeout,
        };
        Ok(Self {
            base_url,
            country,
            timeout,
        })
    }
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    country: &'a str,
    model_type: &'a str,
    features: Option<Vec<f64>>,
}

pub struct PredictionClient {
    client: Client,
    base_url: String,
}

impl PredictionClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ChartError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ChartError::UpstreamUnavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /health`; an unhealthy status is reported as unavailable.
    pub fn health(&self) -> Result<WireHealth, ChartError> {
        let resp = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .map_err(|e| ChartError::UpstreamUnavailable(format!("health check failed: {e}")))?;
        let health: WireHealth = read_json(resp, "health check")?;
        if !health.is_healthy() {
            return Err(ChartError::UpstreamUnavailable(format!(
                "health check reported status '{}'",
                health.status
            )));
        }
        Ok(health)
    }

    /// `GET /history/{country}/{model}?quarters=N`.
    #[instrument(skip(self))]
    pub fn fetch_history(&self, country: &str, model: &str, quarters: usize) -> Result<HistorySeries, ChartError> {
        let resp = self
            .client
            .get(format!("{}/history/{country}/{model}", self.base_url))
            .query(&[("quarters", quarters.to_string())])
            .send()
            .map_err(|e| ChartError::UpstreamUnavailable(format!("history request failed: {e}")))?;
        let body: WireHistory = read_json(resp, "history")?;
        let series = history_from_wire(body.rows())?;
        debug!(
            actual = series.actual.len(),
            replay = series.replay.as_ref().map_or(0, Vec::len),
            band = series.replay_band.as_ref().map_or(0, Vec::len),
            "fetched history"
        );
        Ok(series)
    }

    /// `POST /predict` for a single model.
    pub fn fetch_prediction(&self, country: &str, model: &str) -> Result<PredictionRecord, ChartError> {
        let body = PredictRequest {
            country,
            model_type: model,
            features: None,
        };
        let resp = self
            .client
            .post(format!("{}/predict", self.base_url))
            .json(&body)
            .send()
            .map_err(|e| ChartError::UpstreamUnavailable(format!("prediction request for {model} failed: {e}")))?;
        let wire: WirePrediction = read_json(resp, model)?;
        wire.into_record(model)
    }

    /// Fetch every model in parallel; the first failure aborts the batch.
    #[instrument(skip(self))]
    pub fn fetch_predictions(&self, country: &str, models: &[String]) -> Result<Vec<PredictionRecord>, ChartError> {
        let records: Vec<PredictionRecord> = models
            .par_iter()
            .map(|model| self.fetch_prediction(country, model))
            .collect::<Result<_, _>>()?;
        debug!(count = records.len(), "fetched predictions");
        Ok(records)
    }

    /// History for the first model plus predictions for all of them.
    pub fn fetch_all(&self, country: &str, models: &[String], quarters: usize) -> Result<UpstreamData, ChartError> {
        let history_model = models
            .first()
            .ok_or_else(|| ChartError::parse("no models requested"))?;
        let history = self.fetch_history(country, history_model, quarters)?;
        let predictions = self.fetch_predictions(country, models)?;
        Ok(UpstreamData {
            history: history.actual,
            replay: history.replay,
            replay_band: history.replay_band,
            predictions,
        })
    }
}

fn read_json<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T, ChartError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(ChartError::UpstreamUnavailable(format!(
            "{what} request failed with status {status}"
        )));
    }
    resp.json()
        .map_err(|e| ChartError::parse(format!("failed to parse {what} response: {e}")))
}
