//! Export the chart sequence to JSON or CSV.
//!
//! JSON mirrors what a web frontend consumes (camelCase, absent fields
//! omitted). CSV is meant for spreadsheets: absent fields are empty cells.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::app::pipeline::ChartData;
use crate::domain::ChartPoint;
use crate::error::AppError;

/// Write the full chart (metadata + points) as pretty JSON.
pub fn write_chart_json(path: &Path, data: &ChartData) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export JSON '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data)
        .map_err(|e| AppError::new(2, format!("Failed to write export JSON: {e}")))?;
    writeln!(writer).map_err(|e| AppError::new(2, format!("Failed to write export JSON: {e}")))?;
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export JSON: {e}")))
}

/// Write one CSV row per chart point.
pub fn write_chart_csv(path: &Path, points: &[ChartPoint]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);

    writeln!(
        writer,
        "date,display_label,actual,model_replay,forecast,lower,upper,is_historical,horizon_index,marker"
    )
    .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for p in points {
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{},{},{}",
            p.date,
            csv_field(&p.display_label),
            cell(p.actual),
            cell(p.model_replay),
            cell(p.forecast),
            cell(p.lower),
            cell(p.upper),
            p.is_historical,
            p.horizon_index.map(|h| h.to_string()).unwrap_or_default(),
            if p.is_today_marker() { "today" } else { "" },
        )
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))
}

fn cell(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.6}")).unwrap_or_default()
}

/// Quote a field when it contains a delimiter, quote or newline.
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::domain::{Horizon, Marker, Unit};

    fn points() -> Vec<ChartPoint> {
        let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
        let mut hist = ChartPoint::historical(d(1, 31), "Jan '24".into(), 27044.5);
        hist.model_replay = Some(27000.0);
        let mut today = ChartPoint::historical(d(1, 31), "Today".into(), 27044.5);
        today.marker = Some(Marker::Today);
        let mut now = ChartPoint::forecast(d(1, 31), "Nowcast".into(), Horizon(0), 27100.0);
        now.lower = Some(27000.0);
        now.upper = Some(27200.0);
        vec![hist, today, now]
    }

    #[test]
    fn csv_has_empty_cells_for_absent_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.csv");
        write_chart_csv(&path, &points()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[1],
            "2024-01-31,Jan '24,27044.500000,27000.000000,,,,true,,"
        );
        assert_eq!(lines[2], "2024-01-31,Today,27044.500000,,,,,true,,today");
        assert_eq!(
            lines[3],
            "2024-01-31,Nowcast,,,27100.000000,27000.000000,27200.000000,false,0,"
        );
    }

    #[test]
    fn json_omits_absent_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.json");
        let data = ChartData {
            reference_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            unit: Unit::Billions,
            bucket_count: 1,
            horizons: vec![0],
            points: points(),
        };
        write_chart_json(&path, &data).unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["referenceDate"], "2024-01-31");
        assert_eq!(value["unit"], "billions");
        let first = &value["points"][0];
        assert_eq!(first["modelReplay"], 27000.0);
        assert!(first.get("forecast").is_none());
        assert!(first.get("horizonIndex").is_none());
        assert_eq!(value["points"][1]["marker"], "today");
        assert_eq!(value["points"][2]["horizonIndex"], 0);
    }

    #[test]
    fn labels_with_commas_are_quoted() {
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("Nowcast"), "Nowcast");
    }

    #[test]
    fn unwritable_path_is_exit_code_2() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("chart.csv");
        let err = write_chart_csv(&path, &points()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
