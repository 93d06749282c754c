#![allow(dead_code)]

use chrono::NaiveDate;
use riskoff::domain::error::RiskoffError;
use riskoff::domain::evaluation::GroupSummary;
use riskoff::domain::frame::{Column, Frame};
use riskoff::domain::indicator::SIGNAL_COL;
use riskoff::domain::market_query::MarketQuery;
use riskoff::domain::metrics::Metrics;
use riskoff::domain::sweep::SweepRow;
use riskoff::ports::data_port::DataPort;
use riskoff::ports::export_port::ExportPort;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

pub const SCENARIO_PRICES: [f64; 7] = [100.0, 102.0, 99.0, 101.0, 95.0, 105.0, 110.0];

pub struct MockDataPort {
    pub data: HashMap<String, Frame>,
    pub errors: HashMap<String, String>,
    pub queries: RefCell<Vec<MarketQuery>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            queries: RefCell::new(Vec::new()),
        }
    }

    pub fn with_prices(mut self, symbol: &str, frame: Frame) -> Self {
        self.data.insert(symbol.to_string(), frame);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_prices(&self, query: &MarketQuery) -> Result<Frame, RiskoffError> {
        self.queries.borrow_mut().push(query.clone());
        if let Some(reason) = self.errors.get(&query.symbol) {
            return Err(RiskoffError::Data {
                reason: reason.clone(),
            });
        }
        match self.data.get(&query.symbol) {
            Some(frame) => Ok(frame.clone()),
            None => Frame::new(Vec::new()),
        }
    }

    fn list_symbols(&self) -> Result<Vec<String>, RiskoffError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, RiskoffError> {
        Ok(self.data.get(symbol).and_then(|frame| {
            match (frame.index().first(), frame.index().last()) {
                (Some(first), Some(last)) => Some((*first, *last, frame.len())),
                _ => None,
            }
        }))
    }
}

/// Records every export call instead of touching the filesystem.
#[derive(Default)]
pub struct MockExportPort {
    pub frames: RefCell<Vec<(String, Frame)>>,
    pub evaluations: RefCell<Vec<Vec<GroupSummary>>>,
    pub metrics: RefCell<Vec<Vec<Metrics>>>,
    pub sweeps: RefCell<Vec<Vec<SweepRow>>>,
}

impl MockExportPort {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExportPort for MockExportPort {
    fn write_frame(&self, name: &str, frame: &Frame) -> Result<PathBuf, RiskoffError> {
        self.frames
            .borrow_mut()
            .push((name.to_string(), frame.clone()));
        Ok(PathBuf::from(format!("{name}.csv")))
    }

    fn write_evaluation(&self, rows: &[GroupSummary]) -> Result<PathBuf, RiskoffError> {
        self.evaluations.borrow_mut().push(rows.to_vec());
        Ok(PathBuf::from("evaluation.csv"))
    }

    fn write_metrics(&self, rows: &[Metrics]) -> Result<PathBuf, RiskoffError> {
        self.metrics.borrow_mut().push(rows.to_vec());
        Ok(PathBuf::from("metrics.csv"))
    }

    fn write_sweep(&self, rows: &[SweepRow]) -> Result<PathBuf, RiskoffError> {
        self.sweeps.borrow_mut().push(rows.to_vec());
        Ok(PathBuf::from("sweep.csv"))
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Consecutive calendar dates starting 2024-01-01.
pub fn daily_index(n: usize) -> Vec<NaiveDate> {
    let start = date(2024, 1, 1);
    (0..n)
        .map(|i| start + chrono::Duration::days(i as i64))
        .collect()
}

pub fn price_frame(prices: &[f64]) -> Frame {
    Frame::from_prices(daily_index(prices.len()), prices.to_vec()).unwrap()
}

pub fn frame_with_signal(prices: &[f64], signal: &[bool]) -> Frame {
    price_frame(prices)
        .with_column(
            SIGNAL_COL,
            Column::Flag(signal.iter().copied().map(Some).collect()),
        )
        .unwrap()
}

/// Deterministic oscillating series with drift, long enough to clear the
/// default 30-session warm-up.
pub fn generate_prices(n: usize, start_price: f64) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            start_price * (1.0 + 0.06 * (t / 9.0).sin() + 0.02 * (t / 2.5).cos() + 0.0005 * t)
        })
        .collect()
}
