//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads data from the prediction service or the sample source
//! - runs the chart pipeline
//! - prints reports/plots
//! - writes optional exports

use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{ChartArgs, Command, ExportArgs, ExportFormat, SourceKind};
use crate::data::{ApiConfig, DataSource, PredictionClient};
use crate::error::AppError;

pub mod pipeline;

use pipeline::{ChartConfig, ChartData, ChartInput, ChartOutcome};

/// Entry point for the `nowcast` binary.
pub fn run() -> Result<(), AppError> {
    init_tracing();

    // We want `nowcast` and `nowcast --source sample` to behave like
    // `nowcast chart ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Chart(args) => handle_chart(&args),
        Command::Export(args) => handle_export(&args),
        Command::Health => handle_health(),
        Command::Tui(args) => crate::tui::run(args),
    }
}

fn handle_chart(args: &ChartArgs) -> Result<(), AppError> {
    let config = chart_config_from_args(args);
    let source = data_source_from_args(args)?;
    let data = load_chart(&source, args, &config)?;

    println!("{}", crate::report::format_summary(&data, &config, &source.describe()));
    println!("{}", crate::report::format_points(&data.points, data.unit));

    if !args.no_plot {
        println!(
            "{}",
            crate::plot::render_ascii_chart(&data.points, data.unit, args.width, args.height)
        );
    }
    Ok(())
}

fn handle_export(args: &ExportArgs) -> Result<(), AppError> {
    let config = chart_config_from_args(&args.chart);
    let source = data_source_from_args(&args.chart)?;
    let data = load_chart(&source, &args.chart, &config)?;

    match args.resolved_format() {
        ExportFormat::Json => crate::io::write_chart_json(&args.out, &data)?,
        ExportFormat::Csv => crate::io::write_chart_csv(&args.out, &data.points)?,
    }
    info!(path = %args.out.display(), points = data.points.len(), "exported chart");
    println!("Wrote {} points to {}", data.points.len(), args.out.display());
    Ok(())
}

fn handle_health() -> Result<(), AppError> {
    let api = ApiConfig::from_env()?;
    let client = PredictionClient::new(&api)?;
    let health = client.health()?;
    match health.loaded_models() {
        Some(models) => println!("{}: {} (models: {models})", client.base_url(), health.status),
        None => println!("{}: {}", client.base_url(), health.status),
    }
    Ok(())
}

/// Fetch once and build; a pipeline failure is reported as "no chart data".
fn load_chart(source: &DataSource, args: &ChartArgs, config: &ChartConfig) -> Result<ChartData, AppError> {
    let today = edge_today();
    let hint = args.reference_date.unwrap_or(today);
    let upstream = source.load(&args.models, hint)?;
    let reference_date = pipeline::resolve_reference_date(args.reference_date, &upstream, today);
    let input = ChartInput::from_upstream(upstream, reference_date);

    match pipeline::build_chart(&input, config) {
        ChartOutcome::Ready(data) => Ok(data),
        ChartOutcome::NoData { reason } => Err(AppError::new(4, format!("No chart data available: {reason}"))),
    }
}

pub fn chart_config_from_args(args: &ChartArgs) -> ChartConfig {
    ChartConfig {
        bucket_policy: args.bucketing.policy(args.window),
        horizon_step_days: args.step_days,
        max_horizon: args.max_horizon,
        source_unit: args.source_unit.unwrap_or(args.source.default_unit()),
        target_unit: args.target_unit,
        include_replay: !args.no_replay,
        today_marker: !args.no_today,
        replay_tolerance: args.replay_tolerance,
        keep_last: args.keep_last,
    }
}

pub fn data_source_from_args(args: &ChartArgs) -> Result<DataSource, AppError> {
    match args.source {
        SourceKind::Api => {
            let api = ApiConfig::from_env()?;
            let country = args
                .country
                .as_deref()
                .map(str::to_ascii_lowercase)
                .unwrap_or_else(|| api.country.clone());
            Ok(DataSource::Api {
                client: PredictionClient::new(&api)?,
                country,
                quarters: args.quarters,
            })
        }
        SourceKind::Sample => Ok(DataSource::Sample {
            days: args.days,
            seed: args.seed,
        }),
    }
}

/// Structured logs go to stderr so they never mix with report output.
/// `RUST_LOG` overrides the default `warn` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second init (tests, embedding) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// The only place the wall clock is read: the outermost edge of the program.
pub fn edge_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Rewrite argv so `nowcast` defaults to `nowcast chart`.
///
/// Rules:
/// - `nowcast`                      -> `nowcast chart`
/// - `nowcast --source sample ...`  -> `nowcast chart --source sample ...`
/// - `nowcast --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("chart".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "chart" | "export" | "health" | "tui");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "chart flags".
    if arg1.starts_with('-') {
        argv.insert(1, "chart".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}
