use chrono::NaiveDate;
use thiserror::Error;

/// Failures raised by the chart pipeline.
///
/// Every stage fails fast with one of these; the orchestrator turns them into
/// an explicit "no chart data" outcome instead of emitting a partial sequence.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    /// Malformed date, number or model name from the upstream service.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The historical input contained zero observations.
    #[error("empty series: {what} has no observations")]
    EmptySeries { what: &'static str },

    /// Replay and historical bucket counts differ by more than the tolerated gap.
    #[error("alignment error: {historical} historical buckets vs {replay} replay buckets (tolerance {tolerance})")]
    Alignment {
        historical: usize,
        replay: usize,
        tolerance: usize,
    },

    /// Bucketing was requested with a zero-sized window.
    #[error("invalid aggregation window: {0}")]
    InvalidWindow(usize),

    /// Horizon projection was requested with a non-positive step.
    #[error("invalid horizon step: {0} days (must be positive)")]
    InvalidStep(i64),

    /// A horizon beyond what the chart can hold.
    #[error("horizon {horizon} out of range (max {max})")]
    HorizonOutOfRange { horizon: u32, max: u32 },

    /// Network or health-check failure, surfaced unchanged from the client.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl ChartError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn bad_date(raw: &str, reason: impl std::fmt::Display) -> Self {
        Self::parse(format!("invalid date '{raw}': {reason}"))
    }

    /// Whether the failure came from the network rather than the data.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable(_))
    }
}

/// Process-level error carrying the exit code for `main`.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ChartError> for AppError {
    fn from(err: ChartError) -> Self {
        AppError::new(4, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Helper used by date arithmetic that can only overflow on absurd inputs.
pub(crate) fn date_overflow(base: NaiveDate, days: i64) -> ChartError {
    ChartError::parse(format!("date overflow adding {days} days to {base}"))
}
