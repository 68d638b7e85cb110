//! Command-line parsing for the nowcast chart tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the pipeline code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::aggregate::DEFAULT_WINDOW;
use crate::domain::{Bucketing, Unit};
use crate::horizon::{DEFAULT_MAX_HORIZON, DEFAULT_STEP_DAYS, MAX_SUPPORTED_HORIZON};
use crate::merge::DEFAULT_REPLAY_TOLERANCE;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "nowcast", version, about = "GDP nowcast/forecast chart builder")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the chart and print a summary, the point table and an ASCII plot.
    Chart(ChartArgs),
    /// Write the chart sequence to JSON or CSV.
    Export(ExportArgs),
    /// Check whether the prediction service is up.
    Health,
    /// Launch the interactive TUI.
    ///
    /// This uses the same pipeline as `nowcast chart`, but renders the result
    /// in a terminal UI using Ratatui.
    Tui(ChartArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// The prediction service (`NOWCAST_API_URL`).
    Api,
    /// Seeded synthetic data, no network.
    Sample,
}

impl SourceKind {
    /// Unit the source reports in when `--source-unit` is not given.
    pub fn default_unit(self) -> Unit {
        match self {
            SourceKind::Api => Unit::Billions,
            SourceKind::Sample => Unit::Millions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

/// Common options for building a chart.
#[derive(Debug, Args, Clone)]
pub struct ChartArgs {
    /// Where to load data from.
    #[arg(long, value_enum, default_value_t = SourceKind::Api)]
    pub source: SourceKind,

    /// Country code for the prediction service (defaults to `NOWCAST_COUNTRY` or `usa`).
    #[arg(short = 'c', long)]
    pub country: Option<String>,

    /// Models to request, comma separated. The first one also supplies the history.
    #[arg(
        short = 'm',
        long,
        value_delimiter = ',',
        default_value = "nowcasting,forecasting_h1,forecasting_h2,forecasting_h3"
    )]
    pub models: Vec<String>,

    /// Date separating history from forecasts (YYYY-MM-DD).
    ///
    /// Defaults to the date reported by the prediction service, then to today.
    #[arg(long, value_parser = parse_date)]
    pub reference_date: Option<NaiveDate>,

    /// Bucketing policy for the historical series.
    #[arg(long, value_enum, default_value_t = Bucketing::Observations)]
    pub bucketing: Bucketing,

    /// Observations per bucket for `--bucketing observations`.
    #[arg(long, default_value_t = DEFAULT_WINDOW)]
    pub window: usize,

    /// Calendar days per forecast horizon.
    #[arg(long, default_value_t = DEFAULT_STEP_DAYS, value_parser = clap::value_parser!(i64).range(1..))]
    pub step_days: i64,

    /// Highest horizon the chart knows about.
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_HORIZON,
        value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_SUPPORTED_HORIZON))
    )]
    pub max_horizon: u32,

    /// Unit of the upstream values (default: billions for the API, millions for the sample).
    #[arg(long, value_enum)]
    pub source_unit: Option<Unit>,

    /// Unit shown on the chart.
    #[arg(long, value_enum, default_value_t = Unit::Billions)]
    pub target_unit: Unit,

    /// Do not attach the model-replay series.
    #[arg(long)]
    pub no_replay: bool,

    /// Do not append the synthetic "today" marker.
    #[arg(long)]
    pub no_today: bool,

    /// Keep only the newest N historical buckets.
    #[arg(long = "last", value_name = "N")]
    pub keep_last: Option<usize>,

    /// Largest tolerated bucket-count gap between replay and history.
    #[arg(long, default_value_t = DEFAULT_REPLAY_TOLERANCE)]
    pub replay_tolerance: usize,

    /// Quarters of history to request from the service.
    #[arg(long, default_value_t = 12)]
    pub quarters: usize,

    /// Random seed for `--source sample`.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Daily observations generated by `--source sample`.
    #[arg(long, default_value_t = 1095)]
    pub days: usize,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Skip the ASCII plot.
    #[arg(long)]
    pub no_plot: bool,
}

/// Options for exporting the chart sequence.
#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub chart: ChartArgs,

    /// Output file.
    #[arg(short = 'o', long, value_name = "PATH")]
    pub out: PathBuf,

    /// Output format (inferred from the file extension when omitted).
    #[arg(long, value_enum)]
    pub format: Option<ExportFormat>,
}

impl ExportArgs {
    pub fn resolved_format(&self) -> ExportFormat {
        if let Some(format) = self.format {
            return format;
        }
        match self.out.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => ExportFormat::Csv,
            _ => ExportFormat::Json,
        }
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    crate::normalize::normalize_date(raw).map_err(|e| e.to_string())
}
