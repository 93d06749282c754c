//! Delimited-text export of pipeline outputs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::domain::error::RiskoffError;
use crate::domain::evaluation::GroupSummary;
use crate::domain::frame::Frame;
use crate::domain::metrics::Metrics;
use crate::domain::sweep::SweepRow;
use crate::ports::export_port::ExportPort;

pub const EVALUATION_FILE: &str = "evaluation.csv";
pub const METRICS_FILE: &str = "metrics.csv";
pub const SWEEP_FILE: &str = "sweep.csv";

/// Writes one CSV file per artifact under `out_dir`, creating it on demand.
pub struct CsvExportAdapter {
    out_dir: PathBuf,
}

impl CsvExportAdapter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    fn prepare(&self, file_name: &str) -> Result<(PathBuf, csv::Writer<fs::File>), RiskoffError> {
        fs::create_dir_all(&self.out_dir)?;
        let path = self.out_dir.join(file_name);
        // Headers are written explicitly so empty tables still carry one.
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .map_err(|e| csv_error(&path, e))?;
        Ok((path, writer))
    }

    fn write_rows<T: Serialize>(
        &self,
        file_name: &str,
        header: &[&str],
        rows: &[T],
    ) -> Result<PathBuf, RiskoffError> {
        let (path, mut wtr) = self.prepare(file_name)?;
        wtr.write_record(header).map_err(|e| csv_error(&path, e))?;
        for row in rows {
            wtr.serialize(row).map_err(|e| csv_error(&path, e))?;
        }
        wtr.flush()?;
        info!(path = %path.display(), rows = rows.len(), "wrote export");
        Ok(path)
    }
}

fn csv_error(path: &Path, e: csv::Error) -> RiskoffError {
    RiskoffError::Data {
        reason: format!("failed to write {}: {}", path.display(), e),
    }
}

impl ExportPort for CsvExportAdapter {
    fn write_frame(&self, name: &str, frame: &Frame) -> Result<PathBuf, RiskoffError> {
        let (path, mut wtr) = self.prepare(&format!("{}.csv", name))?;

        let header: Vec<&str> = std::iter::once("date")
            .chain(frame.column_names())
            .collect();
        wtr.write_record(&header).map_err(|e| csv_error(&path, e))?;

        for (i, date) in frame.index().iter().enumerate() {
            let record: Vec<String> = std::iter::once(date.to_string())
                .chain(frame.columns().iter().map(|(_, col)| col.cell(i)))
                .collect();
            wtr.write_record(&record).map_err(|e| csv_error(&path, e))?;
        }
        wtr.flush()?;

        info!(path = %path.display(), rows = frame.len(), "wrote export");
        Ok(path)
    }

    fn write_evaluation(&self, rows: &[GroupSummary]) -> Result<PathBuf, RiskoffError> {
        self.write_rows(EVALUATION_FILE, GroupSummary::COLUMNS, rows)
    }

    fn write_metrics(&self, rows: &[Metrics]) -> Result<PathBuf, RiskoffError> {
        self.write_rows(METRICS_FILE, Metrics::COLUMNS, rows)
    }

    fn write_sweep(&self, rows: &[SweepRow]) -> Result<PathBuf, RiskoffError> {
        self.write_rows(SWEEP_FILE, SweepRow::COLUMNS, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::evaluation::SignalGroup;
    use crate::domain::frame::Column;
    use crate::domain::metrics::Portfolio;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn small_frame() -> Frame {
        let index = vec![
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        ];
        Frame::from_prices(index, vec![100.0, 101.5])
            .unwrap()
            .with_column("signal", Column::Flag(vec![None, Some(true)]))
            .unwrap()
    }

    #[test]
    fn frame_export_has_date_column_and_blank_undefined_cells() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvExportAdapter::new(dir.path().join("out"));

        let path = adapter.write_frame("indicators", &small_frame()).unwrap();
        assert_eq!(path.file_name().unwrap(), "indicators.csv");

        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "date,adj_close,signal");
        assert_eq!(lines[1], "2024-01-02,100,");
        assert_eq!(lines[2], "2024-01-03,101.5,true");
    }

    #[test]
    fn metrics_export_uses_snake_case_labels() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvExportAdapter::new(dir.path().to_path_buf());
        let rows = vec![Metrics {
            portfolio: Portfolio::BuyHold,
            total_return: 0.1,
            annualized_return: 0.1,
            annualized_volatility: 0.2,
            max_drawdown: -0.05,
            max_drawdown_duration: 3,
            sharpe_ratio: 0.5,
            calmar_ratio: 2.0,
        }];

        let path = adapter.write_metrics(&rows).unwrap();
        let content = fs::read_to_string(path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "portfolio,total_return,annualized_return,annualized_volatility,max_drawdown,max_drawdown_duration,sharpe_ratio,calmar_ratio"
        );
        assert!(lines.next().unwrap().starts_with("buy_hold,0.1,"));
    }

    #[test]
    fn evaluation_export_writes_nan_for_empty_groups() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvExportAdapter::new(dir.path().to_path_buf());
        let rows = vec![GroupSummary {
            group: SignalGroup::SignalDays,
            count: 0,
            mean_fwd_return: f64::NAN,
            median_fwd_return: f64::NAN,
        }];

        let path = adapter.write_evaluation(&rows).unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("signal_days,0,NaN,NaN"));
    }

    #[test]
    fn empty_tables_still_carry_a_header() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvExportAdapter::new(dir.path().to_path_buf());
        assert_eq!(adapter.out_dir(), dir.path());

        let sweep = fs::read_to_string(adapter.write_sweep(&[]).unwrap()).unwrap();
        assert_eq!(sweep.lines().collect::<Vec<_>>(), vec![SweepRow::COLUMNS.join(",")]);

        let evaluation = fs::read_to_string(adapter.write_evaluation(&[]).unwrap()).unwrap();
        assert_eq!(evaluation.trim_end(), "group,count,mean_fwd_return,median_fwd_return");

        let mut rdr = csv::Reader::from_path(dir.path().join(SWEEP_FILE)).unwrap();
        assert_eq!(rdr.headers().unwrap().len(), SweepRow::COLUMNS.len());
        assert_eq!(rdr.records().count(), 0);
    }

    #[test]
    fn header_is_written_once_above_rows() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvExportAdapter::new(dir.path().to_path_buf());
        let rows = vec![
            GroupSummary {
                group: SignalGroup::SignalDays,
                count: 2,
                mean_fwd_return: 0.01,
                median_fwd_return: 0.02,
            },
            GroupSummary {
                group: SignalGroup::Overall,
                count: 5,
                mean_fwd_return: 0.0,
                median_fwd_return: 0.0,
            },
        ];

        let content = fs::read_to_string(adapter.write_evaluation(&rows).unwrap()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], GroupSummary::COLUMNS.join(","));
        assert!(lines[1].starts_with("signal_days,2,"));
        assert!(lines[2].starts_with("overall,5,"));
    }
}
