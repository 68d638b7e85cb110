//! Upstream data: the prediction service client and the offline sample source.

pub mod api;
pub mod sample;
pub mod wire;

use chrono::NaiveDate;

use crate::domain::{BandObservation, PredictionRecord, RawObservation};
use crate::error::ChartError;

pub use api::{ApiConfig, PredictionClient};
pub use sample::{SampleConfig, generate_sample};

/// Everything one load cycle pulls from a source, already normalized to
/// domain types but not yet aggregated or unit-converted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpstreamData {
    pub history: Vec<RawObservation>,
    pub replay: Option<Vec<RawObservation>>,
    /// Confidence bounds of the replay column, when the source reports them.
    pub replay_band: Option<Vec<BandObservation>>,
    pub predictions: Vec<PredictionRecord>,
}

impl UpstreamData {
    /// Reference date reported by the upstream (latest prediction date).
    pub fn reported_reference_date(&self) -> Option<NaiveDate> {
        self.predictions.iter().map(|p| p.reference_date).max()
    }
}

/// Where a load cycle gets its data.
pub enum DataSource {
    Api {
        client: PredictionClient,
        country: String,
        quarters: usize,
    },
    Sample {
        days: usize,
        seed: u64,
    },
}

impl DataSource {
    /// Pull one snapshot. `reference_hint` anchors the sample source; the API
    /// ignores it and reports its own dates.
    pub fn load(&self, models: &[String], reference_hint: NaiveDate) -> Result<UpstreamData, ChartError> {
        match self {
            DataSource::Api {
                client,
                country,
                quarters,
            } => client.fetch_all(country, models, *quarters),
            DataSource::Sample { days, seed } => generate_sample(&SampleConfig {
                end_date: reference_hint,
                days: *days,
                seed: *seed,
                models: models.to_vec(),
            }),
        }
    }

    /// Short description for headers and status lines.
    pub fn describe(&self) -> String {
        match self {
            DataSource::Api { client, country, .. } => format!("api {} ({country})", client.base_url()),
            DataSource::Sample { seed, .. } => format!("sample (seed {seed})"),
        }
    }

    /// Advance the sample seed; no-op for the API.
    pub fn reseed(&mut self) {
        if let DataSource::Sample { seed, .. } = self {
            *seed = seed.wrapping_add(1);
        }
    }
}
