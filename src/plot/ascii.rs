//! ASCII plotting of a chart sequence for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - actual buckets: `o` joined by `-`
//! - model replay: `r`
//! - forecasts: `F` joined by `.`
//! - confidence band: `:`
//! - today divider: `|`

use chrono::{Datelike, NaiveDate};

use crate::domain::{ChartPoint, Unit};

/// Render the chart sequence on a `width` x `height` grid with a one-line header.
pub fn render_ascii_chart(points: &[ChartPoint], unit: Unit, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let Some((x_min, x_max)) = x_range(points) else {
        return "Plot: no data\n".to_string();
    };
    let (y_min, y_max) = y_range(points).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Divider and band first so series glyphs overlay them.
    if let Some(today) = points.iter().find(|p| p.is_today_marker()) {
        let x = map_x(day_index(today.date), x_min, x_max, width);
        for row in grid.iter_mut() {
            row[x] = '|';
        }
    }

    for p in points {
        if let (Some(lo), Some(hi)) = (p.lower, p.upper) {
            let x = map_x(day_index(p.date), x_min, x_max, width);
            let y0 = map_y(hi, y_min, y_max, height);
            let y1 = map_y(lo, y_min, y_max, height);
            for row in grid.iter_mut().take(y1 + 1).skip(y0) {
                row[x] = ':';
            }
        }
    }

    let actual: Vec<(f64, f64)> = points
        .iter()
        .filter(|p| !p.is_today_marker())
        .filter_map(|p| p.actual.map(|v| (day_index(p.date), v)))
        .collect();
    let forecast: Vec<(f64, f64)> = points
        .iter()
        .filter_map(|p| p.forecast.map(|v| (day_index(p.date), v)))
        .collect();
    let replay: Vec<(f64, f64)> = points
        .iter()
        .filter_map(|p| p.model_replay.map(|v| (day_index(p.date), v)))
        .collect();

    let frame = Frame {
        x_min,
        x_max,
        y_min,
        y_max,
    };
    draw_series(&mut grid, &actual, &frame, '-', 'o');
    draw_series(&mut grid, &forecast, &frame, '.', 'F');
    for &(x, y) in &replay {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        // Actual wins where the two coincide.
        if grid[row][col] != 'o' {
            grid[row][col] = 'r';
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: dates=[{}, {}] | y=[{y_min:.2}, {y_max:.2}]{}\n",
        date_from_index(x_min),
        date_from_index(x_max),
        unit.suffix()
    ));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    out
}

struct Frame {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

fn draw_series(grid: &mut [Vec<char>], series: &[(f64, f64)], frame: &Frame, line: char, point: char) {
    let height = grid.len();
    let width = grid[0].len();

    let cells: Vec<(usize, usize)> = series
        .iter()
        .map(|&(x, y)| {
            (
                map_x(x, frame.x_min, frame.x_max, width),
                map_y(y, frame.y_min, frame.y_max, height),
            )
        })
        .collect();

    for pair in cells.windows(2) {
        draw_line(grid, pair[0].0, pair[0].1, pair[1].0, pair[1].1, line);
    }
    for &(x, y) in &cells {
        grid[y][x] = point;
    }
}

/// Days since the common era; the plot's x axis.
fn day_index(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce())
}

fn date_from_index(x: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(x.round() as i32)
        .map(|d| d.to_string())
        .unwrap_or_else(|| "?".to_string())
}

fn x_range(points: &[ChartPoint]) -> Option<(f64, f64)> {
    let min = points.iter().map(|p| p.date).min()?;
    let max = points.iter().map(|p| p.date).max()?;
    let (lo, hi) = (day_index(min), day_index(max));
    // A single date still gets a usable axis.
    if hi > lo { Some((lo, hi)) } else { Some((lo - 1.0, hi + 1.0)) }
}

fn y_range(points: &[ChartPoint]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for p in points {
        for v in [p.actual, p.model_replay, p.forecast, p.lower, p.upper].into_iter().flatten() {
            min_y = min_y.min(v);
            max_y = max_y.max(v);
        }
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else if min_y.is_finite() {
        Some((min_y - 1.0, min_y + 1.0))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish). Only fills blank or divider cells.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0 && (y0 as usize) < grid.len() && x0 >= 0 && (x0 as usize) < grid[0].len() {
            let cell = &mut grid[y0 as usize][x0 as usize];
            if *cell == ' ' || *cell == '|' {
                *cell = ch;
            }
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Horizon, Marker};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn plot_golden_snapshot_small() {
        // x spans 2024-01-01 .. 2024-01-10 so each column is one day.
        let a = ChartPoint::historical(d(2024, 1, 1), "a".into(), 100.0);
        let mut b = ChartPoint::historical(d(2024, 1, 5), "b".into(), 104.0);
        b.model_replay = Some(100.0);
        let mut today = ChartPoint::historical(d(2024, 1, 5), "Today".into(), 104.0);
        today.marker = Some(Marker::Today);
        let mut f = ChartPoint::forecast(d(2024, 1, 10), "Forecast (h1)".into(), Horizon(1), 104.0);
        f.lower = Some(102.0);
        f.upper = Some(106.0);

        let txt = render_ascii_chart(&[a, b, today, f], Unit::Billions, 10, 5);
        let expected = concat!(
            "Plot: dates=[2024-01-01, 2024-01-10] | y=[99.70, 106.30]B\n",
            "    |    :\n",
            "    o    F\n",
            "  --|    :\n",
            " -  |    :\n",
            "o   r\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn empty_points_render_placeholder() {
        assert_eq!(render_ascii_chart(&[], Unit::Billions, 20, 5), "Plot: no data\n");
    }

    #[test]
    fn single_point_is_plotted() {
        let p = ChartPoint::historical(d(2024, 3, 31), "Mar '24".into(), 5.0);
        let txt = render_ascii_chart(&[p], Unit::Units, 11, 5);
        assert!(txt.lines().skip(1).any(|l| l.contains('o')));
    }
}
