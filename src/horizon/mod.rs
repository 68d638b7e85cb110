//! Forward projection of model predictions onto the calendar.
//!
//! Each prediction is tagged with a horizon (quarters ahead). Horizon `h` lands
//! on `reference_date + h * step_days`; horizon 0 (the nowcast) is the
//! reference date itself. Steps are fixed day counts, not calendar quarters.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use tracing::{debug, warn};

use crate::domain::{
    ChartPoint, Granularity, Horizon, HorizonSlot, PredictionRecord, UnitConversion,
};
use crate::error::{ChartError, date_overflow};
use crate::normalize::format_label;

/// Calendar days per horizon step.
pub const DEFAULT_STEP_DAYS: i64 = 90;

/// Highest horizon the dashboard knows about (h4 may not be released yet).
pub const DEFAULT_MAX_HORIZON: u32 = 4;

/// Hard cap on horizons, from flags or from model names.
pub const MAX_SUPPORTED_HORIZON: u32 = 16;

impl Horizon {
    /// Resolve a model name from the prediction service to its horizon.
    ///
    /// Accepted forms: `nowcast`, `nowcasting`, `nowcasting_*`, `h0`, `hN`,
    /// `qN`, `forecast_hN`, `forecasting_hN`, `forecasting_qN`.
    pub fn from_model_name(name: &str) -> Result<Horizon, ChartError> {
        let lower = name.trim().to_ascii_lowercase();
        if lower.starts_with("nowcast") {
            return Ok(Horizon::NOWCAST);
        }

        let tail = lower
            .strip_prefix("forecasting_")
            .or_else(|| lower.strip_prefix("forecast_"))
            .unwrap_or(&lower);

        let digits = tail
            .strip_prefix('h')
            .or_else(|| tail.strip_prefix('q'))
            .filter(|d| !d.is_empty() && d.chars().all(|c| c.is_ascii_digit()));

        match digits.and_then(|d| d.parse::<u32>().ok()) {
            Some(h) => Ok(Horizon(h)),
            None => Err(ChartError::parse(format!("unknown model name '{name}'"))),
        }
    }

    /// Projected calendar date for this horizon. `step_days` must be positive.
    pub fn project(self, reference_date: NaiveDate, step_days: i64) -> Result<NaiveDate, ChartError> {
        if step_days <= 0 {
            return Err(ChartError::InvalidStep(step_days));
        }
        let days = step_days
            .checked_mul(i64::from(self.0))
            .ok_or_else(|| ChartError::parse(format!("horizon {} at {step_days} days per step overflows", self.0)))?;
        Duration::try_days(days)
            .and_then(|delta| reference_date.checked_add_signed(delta))
            .ok_or_else(|| date_overflow(reference_date, days))
    }
}

/// Prediction records keyed by horizon, with explicit gaps.
#[derive(Debug, Clone)]
pub struct HorizonSet {
    slots: BTreeMap<Horizon, HorizonSlot>,
}

impl HorizonSet {
    /// Build slots `0..=max_horizon` (plus any higher horizon that is present).
    ///
    /// When the same horizon appears twice the first record wins. Both
    /// `max_horizon` and record horizons are capped at `MAX_SUPPORTED_HORIZON`.
    pub fn from_records(records: &[PredictionRecord], max_horizon: u32) -> Result<Self, ChartError> {
        check_supported(max_horizon)?;
        let mut slots: BTreeMap<Horizon, HorizonSlot> =
            (0..=max_horizon).map(|h| (Horizon(h), HorizonSlot::Absent)).collect();

        for record in records {
            let horizon = Horizon::from_model_name(&record.model_name)?;
            check_supported(horizon.index())?;
            let slot = slots.entry(horizon).or_insert(HorizonSlot::Absent);
            match slot {
                HorizonSlot::Present(existing) => {
                    warn!(
                        horizon = horizon.index(),
                        kept = %existing.model_name,
                        ignored = %record.model_name,
                        "duplicate prediction for horizon"
                    );
                }
                empty => *empty = HorizonSlot::Present(record.clone()),
            }
        }

        Ok(Self { slots })
    }

    /// Present records in ascending horizon order.
    pub fn present(&self) -> impl Iterator<Item = (Horizon, &PredictionRecord)> {
        self.slots
            .iter()
            .filter_map(|(h, slot)| slot.record().map(|r| (*h, r)))
    }

    /// Horizons with no prediction (e.g. models not yet released).
    pub fn absent(&self) -> Vec<Horizon> {
        self.slots
            .iter()
            .filter(|(_, slot)| matches!(slot, HorizonSlot::Absent))
            .map(|(h, _)| *h)
            .collect()
    }
}

fn check_supported(horizon: u32) -> Result<(), ChartError> {
    if horizon > MAX_SUPPORTED_HORIZON {
        return Err(ChartError::HorizonOutOfRange {
            horizon,
            max: MAX_SUPPORTED_HORIZON,
        });
    }
    Ok(())
}

/// Project every present horizon to a forecast `ChartPoint`.
///
/// Absent horizons are skipped. The point value and both interval bounds go
/// through the same unit conversion.
pub fn project_horizons(
    predictions: &[PredictionRecord],
    reference_date: NaiveDate,
    step_days: i64,
    max_horizon: u32,
    units: UnitConversion,
) -> Result<Vec<ChartPoint>, ChartError> {
    if step_days <= 0 {
        return Err(ChartError::InvalidStep(step_days));
    }
    let set = HorizonSet::from_records(predictions, max_horizon)?;
    let mut out = Vec::new();

    for (horizon, record) in set.present() {
        let date = horizon.project(reference_date, step_days)?;
        let label = format_label(date, Granularity::Horizon(horizon));
        let mut point = ChartPoint::forecast(date, label, horizon, units.apply(record.point_value));
        if let Some(ci) = record.confidence_interval {
            point.lower = Some(units.apply(ci.lower));
            point.upper = Some(units.apply(ci.upper));
        }
        out.push(point);
    }

    debug!(
        projected = out.len(),
        absent = ?set.absent().iter().map(|h| h.index()).collect::<Vec<_>>(),
        %reference_date,
        "projected horizons"
    );
    Ok(out)
}
