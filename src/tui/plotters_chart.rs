//! Plotters-powered nowcast chart widget for Ratatui.
//!
//! Why Plotters instead of Ratatui's built-in `Chart` widget?
//! - nicer axis + mesh rendering
//! - less manual work for ticks/labels
//! - vertical band segments and the divider are plain path elements
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A lightweight, render-only chart description.
///
/// All series and bounds are computed outside the render call; x values are
/// days since the common era.
pub struct NowcastPlottersChart<'a> {
    /// Bucketed actuals, drawn as a line.
    pub actual: &'a [(f64, f64)],
    /// Model replay, drawn as dots.
    pub replay: &'a [(f64, f64)],
    /// Nowcast and forecasts in horizon order, drawn as a line.
    pub forecast: &'a [(f64, f64)],
    /// `(x, lower, upper)` per point that carries an interval (replay band or forecast).
    pub band: &'a [(f64, f64, f64)],
    /// Column of the "today" divider, if shown.
    pub today_x: Option<f64>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub y_label: String,
    /// Formatting of tick labels.
    pub fmt_x: fn(f64) -> String,
    pub fmt_y: fn(f64) -> String,
}

impl<'a> Widget for NowcastPlottersChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // When the available area is too small, Plotters may fail to build a chart.
        // In that case, we render a small hint rather than panicking.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let x0 = self.x_bounds[0];
        let x1 = self.x_bounds[1];
        let y0 = self.y_bounds[0];
        let y1 = self.y_bounds[1];

        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            // Mesh lines are noise at terminal resolution.
            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc("date")
                .y_desc(&self.y_label)
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| (self.fmt_x)(*v))
                .y_label_formatter(&|v| (self.fmt_y)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            let actual_color = WHITE;
            let replay_color = RGBColor(0, 255, 255); // cyan
            let forecast_color = RGBColor(255, 165, 0); // orange
            let band_color = RGBColor(120, 120, 120);
            let today_color = RGBColor(255, 255, 0); // yellow

            // 1) Divider and band underneath the series.
            if let Some(x) = self.today_x {
                chart.draw_series(LineSeries::new([(x, y0), (x, y1)], &today_color))?;
            }
            chart.draw_series(
                self.band
                    .iter()
                    .map(|&(x, lo, hi)| PathElement::new(vec![(x, lo), (x, hi)], band_color)),
            )?;

            // 2) Actuals and forecasts as lines.
            chart.draw_series(LineSeries::new(self.actual.iter().copied(), &actual_color))?;
            chart.draw_series(LineSeries::new(self.forecast.iter().copied(), &forecast_color))?;

            // 3) Replay as dots. `Circle` radii are mis-scaled by the backend, so
            // `Pixel` it is.
            chart.draw_series(
                self.replay
                    .iter()
                    .map(|&(x, y)| Pixel::new((x, y), replay_color)),
            )?;
            chart.draw_series(
                self.forecast
                    .iter()
                    .map(|&(x, y)| Pixel::new((x, y), forecast_color)),
            )?;

            Ok(())
        });

        widget.render(area, buf);
    }
}
