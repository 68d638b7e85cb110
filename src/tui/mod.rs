//! Ratatui-based terminal UI.
//!
//! The TUI fetches one upstream snapshot, runs the shared chart pipeline and
//! renders the result with Plotters. Toggles rebuild from the cached snapshot;
//! only `r` goes back to the source. A failed refresh leaves the previous chart
//! on screen and reports the error in the status line.

use std::io;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};
use tracing::{info, warn};

use crate::app::pipeline::{self, ChartConfig, ChartData, ChartInput, ChartOutcome};
use crate::cli::ChartArgs;
use crate::data::{DataSource, UpstreamData};
use crate::domain::{BucketPolicy, ChartPoint, Granularity};
use crate::normalize::format_label;
use crate::error::AppError;

mod plotters_chart;

use plotters_chart::NowcastPlottersChart;

/// Start the TUI.
pub fn run(args: ChartArgs) -> Result<(), AppError> {
    let source = crate::app::data_source_from_args(&args)?;
    let today = crate::app::edge_today();
    let mut app = App::new(source, args, today);

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    source: DataSource,
    args: ChartArgs,
    config: ChartConfig,
    /// Observation window restored when toggling back from calendar quarters.
    window: usize,
    today: NaiveDate,
    snapshot: Option<UpstreamData>,
    reference_date: NaiveDate,
    outcome: Option<ChartOutcome>,
    status: String,
}

impl App {
    fn new(source: DataSource, args: ChartArgs, today: NaiveDate) -> Self {
        let config = crate::app::chart_config_from_args(&args);
        let mut app = Self {
            source,
            window: args.window,
            reference_date: args.reference_date.unwrap_or(today),
            args,
            config,
            today,
            snapshot: None,
            outcome: None,
            status: String::new(),
        };
        app.refresh();
        app
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the app should quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('r') => {
                self.source.reseed();
                self.refresh();
            }
            KeyCode::Char('b') => {
                self.config.bucket_policy = match self.config.bucket_policy {
                    BucketPolicy::Observations(_) => BucketPolicy::CalendarQuarter,
                    BucketPolicy::CalendarQuarter => BucketPolicy::Observations(self.window),
                };
                self.rebuild();
                self.status = format!("bucketing: {}", policy_label(self.config.bucket_policy));
            }
            KeyCode::Char('p') => {
                self.config.include_replay = !self.config.include_replay;
                self.rebuild();
                self.status = format!("replay: {}", on_off(self.config.include_replay));
            }
            KeyCode::Char('t') => {
                self.config.today_marker = !self.config.today_marker;
                self.rebuild();
                self.status = format!("today marker: {}", on_off(self.config.today_marker));
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.config.keep_last = match self.config.keep_last {
                    None => None,
                    Some(n) => Some(n.saturating_add(1)),
                };
                self.rebuild();
                self.status = format!("keep last: {}", keep_label(self.config.keep_last));
            }
            KeyCode::Char('-') => {
                let shown = self.historical_count();
                self.config.keep_last = match self.config.keep_last {
                    Some(n) => Some(n.saturating_sub(1).max(1)),
                    None => Some(shown.saturating_sub(1).max(1)),
                };
                self.rebuild();
                self.status = format!("keep last: {}", keep_label(self.config.keep_last));
            }
            KeyCode::Char('a') => {
                self.config.keep_last = None;
                self.rebuild();
                self.status = "keep last: all".to_string();
            }
            _ => {}
        }
        false
    }

    /// Fetch a fresh snapshot; on failure keep whatever is on screen.
    fn refresh(&mut self) {
        let hint = self.args.reference_date.unwrap_or(self.today);
        match self.source.load(&self.args.models, hint) {
            Ok(snapshot) => {
                self.reference_date = pipeline::resolve_reference_date(self.args.reference_date, &snapshot, self.today);
                self.snapshot = Some(snapshot);
                self.rebuild();
                info!(source = %self.source.describe(), "refreshed snapshot");
                self.status = format!("loaded from {}", self.source.describe());
            }
            Err(err) => {
                warn!(error = %err, "refresh failed; keeping previous chart");
                self.status = if self.outcome.is_some() {
                    format!("refresh failed: {err} (showing previous chart)")
                } else {
                    format!("refresh failed: {err}")
                };
            }
        }
    }

    fn rebuild(&mut self) {
        let Some(snapshot) = &self.snapshot else {
            return;
        };
        let input = ChartInput::from_upstream(snapshot.clone(), self.reference_date);
        self.outcome = Some(pipeline::build_chart(&input, &self.config));
    }

    fn data(&self) -> Option<&ChartData> {
        self.outcome.as_ref().and_then(ChartOutcome::data)
    }

    fn historical_count(&self) -> usize {
        self.data()
            .map(|d| d.points.iter().filter(|p| p.is_historical && !p.is_today_marker()).count())
            .unwrap_or(0)
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("nowcast", Style::default().fg(Color::Cyan)),
            Span::raw(format!(" GDP nowcast chart | {}", self.source.describe())),
        ]));

        let summary = match self.data() {
            Some(data) => {
                let stats = crate::report::compute_stats(&data.points);
                format!(
                    "reference: {} | buckets: {} | horizons: {} | nowcast: {}",
                    data.reference_date,
                    data.bucket_count,
                    data.horizons.len(),
                    crate::report::fmt_value(stats.nowcast, data.unit),
                )
            }
            None => format!("reference: {}", self.reference_date),
        };
        lines.push(Line::from(Span::styled(summary, Style::default().fg(Color::Gray))));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(28)])
            .split(area);

        self.draw_chart(frame, chunks[0]);
        self.draw_settings(frame, chunks[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("GDP").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let data = match &self.outcome {
            None => {
                let msg = Paragraph::new("Waiting for data...").style(Style::default().fg(Color::Yellow));
                frame.render_widget(msg, inner);
                return;
            }
            Some(ChartOutcome::NoData { reason }) => {
                let msg = Paragraph::new(format!("No chart data available.\n{reason}"))
                    .style(Style::default().fg(Color::Yellow));
                frame.render_widget(msg, inner);
                return;
            }
            Some(ChartOutcome::Ready(data)) => data,
        };

        let series = ChartSeries::from_points(&data.points);
        let widget = NowcastPlottersChart {
            actual: &series.actual,
            replay: &series.replay,
            forecast: &series.forecast,
            band: &series.band,
            today_x: series.today_x,
            x_bounds: series.x_bounds,
            y_bounds: series.y_bounds,
            y_label: format!("GDP ({})", data.unit.suffix()),
            fmt_x: fmt_axis_date,
            fmt_y: fmt_axis_y,
        };
        frame.render_widget(widget, inner);
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let items = vec![
            ListItem::new(format!("Bucketing: {}", policy_label(self.config.bucket_policy))),
            ListItem::new(format!("Replay: {}", on_off(self.config.include_replay))),
            ListItem::new(format!("Today: {}", on_off(self.config.today_marker))),
            ListItem::new(format!("Keep last: {}", keep_label(self.config.keep_last))),
            ListItem::new(format!("Units: {:?}", self.config.target_unit)),
            ListItem::new(format!("Step: {}d", self.config.horizon_step_days)),
        ];

        let list = List::new(items).block(
            Block::default()
                .title(Span::styled("Settings", Style::default().add_modifier(Modifier::BOLD)))
                .borders(Borders::ALL),
        );
        frame.render_widget(list, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "r refresh  b bucketing  p replay  t today  +/- last N  a all  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line)
            .alignment(Alignment::Left)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Plot-ready series split out of the chart sequence.
#[derive(Debug, Clone, PartialEq)]
struct ChartSeries {
    actual: Vec<(f64, f64)>,
    replay: Vec<(f64, f64)>,
    forecast: Vec<(f64, f64)>,
    band: Vec<(f64, f64, f64)>,
    today_x: Option<f64>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

impl ChartSeries {
    fn from_points(points: &[ChartPoint]) -> Self {
        let mut series = ChartSeries {
            actual: Vec::new(),
            replay: Vec::new(),
            forecast: Vec::new(),
            band: Vec::new(),
            today_x: None,
            x_bounds: [0.0, 1.0],
            y_bounds: [0.0, 1.0],
        };

        let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);

        for p in points {
            let x = f64::from(p.date.num_days_from_ce());
            x_min = x_min.min(x);
            x_max = x_max.max(x);

            if p.is_today_marker() {
                series.today_x = Some(x);
                continue;
            }
            if let Some(v) = p.actual {
                series.actual.push((x, v));
            }
            if let Some(v) = p.model_replay {
                series.replay.push((x, v));
            }
            if let Some(v) = p.forecast {
                series.forecast.push((x, v));
            }
            if let (Some(lo), Some(hi)) = (p.lower, p.upper) {
                series.band.push((x, lo, hi));
            }
            for v in [p.actual, p.model_replay, p.forecast, p.lower, p.upper].into_iter().flatten() {
                y_min = y_min.min(v);
                y_max = y_max.max(v);
            }
        }

        if x_min.is_finite() && x_max.is_finite() {
            series.x_bounds = if x_max > x_min { [x_min, x_max] } else { [x_min - 1.0, x_max + 1.0] };
        }
        if y_min.is_finite() && y_max.is_finite() && y_max > y_min {
            let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);
            series.y_bounds = [y_min - pad, y_max + pad];
        } else if y_min.is_finite() {
            series.y_bounds = [y_min - 1.0, y_min + 1.0];
        }
        series
    }
}

fn policy_label(policy: BucketPolicy) -> String {
    match policy {
        BucketPolicy::Observations(n) => format!("{n} obs"),
        BucketPolicy::CalendarQuarter => "calendar".to_string(),
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

fn keep_label(keep_last: Option<usize>) -> String {
    keep_last.map(|n| n.to_string()).unwrap_or_else(|| "all".to_string())
}

fn fmt_axis_date(v: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(v.round() as i32)
        .map(|d| format_label(d, Granularity::Daily))
        .unwrap_or_default()
}

fn fmt_axis_y(v: f64) -> String {
    format!("{v:.0}")
}
