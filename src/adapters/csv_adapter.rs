//! CSV file price adapter.
//!
//! Reads `<base_path>/<SYMBOL>.csv`. The file needs a header row with a
//! `date` column (`YYYY-MM-DD`) and a price column, `adj_close` unless
//! configured otherwise. Other columns are ignored. An empty price cell is
//! kept as an undefined value.

use crate::domain::error::RiskoffError;
use crate::domain::frame::{Column, Frame, PRICE_COL};
use crate::domain::market_query::{Interval, MarketQuery};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const DATE_COL: &str = "date";

pub struct CsvAdapter {
    base_path: PathBuf,
    price_column: String,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            price_column: PRICE_COL.to_string(),
        }
    }

    pub fn with_price_column(mut self, column: &str) -> Self {
        self.price_column = column.to_string();
        self
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path
            .join(format!("{}.csv", symbol.trim().to_uppercase()))
    }

    /// All rows of a symbol's file, sorted by date.
    fn read_rows(&self, path: &Path) -> Result<Vec<(NaiveDate, Option<f64>)>, RiskoffError> {
        let mut rdr = csv::Reader::from_path(path).map_err(|e| RiskoffError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let headers = rdr.headers().map_err(|e| RiskoffError::Data {
            reason: format!("CSV header error in {}: {}", path.display(), e),
        })?;
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| RiskoffError::missing_column(name))
        };
        let date_idx = position(DATE_COL)?;
        let price_idx = position(self.price_column.as_str())?;

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| RiskoffError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(date_idx).unwrap_or("").trim();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                RiskoffError::Data {
                    reason: format!("invalid date '{}': {}", date_str, e),
                }
            })?;

            let price_str = record.get(price_idx).unwrap_or("").trim();
            let price = if price_str.is_empty() {
                None
            } else {
                let value = price_str.parse::<f64>().map_err(|e| RiskoffError::Data {
                    reason: format!("invalid {} value '{}': {}", self.price_column, price_str, e),
                })?;
                // Non-finite or non-positive prices are gaps.
                if value.is_finite() && value > 0.0 {
                    Some(value)
                } else {
                    warn!(%date, value = price_str, "unusable price treated as missing");
                    None
                }
            };

            rows.push((date, price));
        }

        rows.sort_by_key(|(date, _)| *date);
        Ok(rows)
    }
}

/// Keeps the last row of each interval bucket.
fn resample(
    rows: Vec<(NaiveDate, Option<f64>)>,
    interval: Interval,
) -> Vec<(NaiveDate, Option<f64>)> {
    if interval == Interval::Daily {
        return rows;
    }
    let mut out: Vec<(NaiveDate, Option<f64>)> = Vec::with_capacity(rows.len());
    for row in rows {
        match out.last_mut() {
            Some(last) if interval.bucket(last.0) == interval.bucket(row.0) => *last = row,
            _ => out.push(row),
        }
    }
    out
}

impl DataPort for CsvAdapter {
    fn fetch_prices(&self, query: &MarketQuery) -> Result<Frame, RiskoffError> {
        let path = self.csv_path(&query.symbol);
        let mut rows = self.read_rows(&path)?;

        if let Some(cutoff) = rows
            .last()
            .and_then(|(last, _)| query.period.cutoff(*last))
        {
            rows.retain(|(date, _)| *date > cutoff);
        }
        let rows = resample(rows, query.interval);
        debug!(path = %path.display(), rows = rows.len(), "read price file");

        let (index, prices): (Vec<NaiveDate>, Vec<Option<f64>>) = rows.into_iter().unzip();
        let frame = Frame::new(index)?.with_column(PRICE_COL, Column::Float(prices))?;
        info!(
            symbol = %query.symbol,
            period = %query.period,
            interval = %query.interval,
            rows = frame.len(),
            "loaded prices"
        );
        Ok(frame)
    }

    fn list_symbols(&self) -> Result<Vec<String>, RiskoffError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| RiskoffError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RiskoffError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, RiskoffError> {
        let path = self.csv_path(symbol);
        if !path.exists() {
            return Ok(None);
        }
        let rows = self.read_rows(&path)?;
        Ok(match (rows.first(), rows.last()) {
            (Some((first, _)), Some((last, _))) => Some((*first, *last, rows.len())),
            _ => None,
        })
    }
}
