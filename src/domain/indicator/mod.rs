//! Indicator engine: returns, rolling volatility, moving averages and the
//! deviation signal.
//!
//! Every function is a pure transformation of its inputs. [`compute_signals`]
//! returns a new [`Frame`] carrying the source columns plus:
//! - `returns`: `price[t] / price[t-1] - 1`, undefined at t = 0
//! - `volatility`: sample standard deviation of returns over `volatility_window`
//! - `ma_short` / `ma_long`: trailing arithmetic means of price
//! - `deviation`: `(price - ma_long) / ma_long`, undefined while `ma_long` is
//! - `signal`: `|deviation| > deviation_threshold`, undefined where `deviation` is

pub mod rolling;

use chrono::NaiveDate;
use std::fmt;

use crate::domain::error::RiskoffError;
use crate::domain::frame::{Column, Frame, PRICE_COL};
use rolling::{rolling_mean, rolling_stddev};

pub const RETURNS_COL: &str = "returns";
pub const VOLATILITY_COL: &str = "volatility";
pub const MA_SHORT_COL: &str = "ma_short";
pub const MA_LONG_COL: &str = "ma_long";
pub const DEVIATION_COL: &str = "deviation";
pub const SIGNAL_COL: &str = "signal";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorConfig {
    pub short_window: usize,
    pub long_window: usize,
    pub volatility_window: usize,
    /// Fractional threshold (0.03 = 3%).
    pub deviation_threshold: f64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            short_window: 10,
            long_window: 30,
            volatility_window: 20,
            deviation_threshold: 0.03,
        }
    }
}

impl IndicatorConfig {
    pub fn with_threshold(self, deviation_threshold: f64) -> Self {
        Self {
            deviation_threshold,
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), RiskoffError> {
        for (name, window) in [
            ("short_window", self.short_window),
            ("long_window", self.long_window),
            ("volatility_window", self.volatility_window),
        ] {
            if window == 0 {
                return Err(RiskoffError::invalid_parameter(
                    name,
                    "must be a positive integer",
                ));
            }
        }
        if !self.deviation_threshold.is_finite() || self.deviation_threshold < 0.0 {
            return Err(RiskoffError::invalid_parameter(
                "deviation_threshold",
                "must be a finite, non-negative fraction",
            ));
        }
        Ok(())
    }
}

impl fmt::Display for IndicatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MA({}/{}) VOL({}) DEV>{:.2}%",
            self.short_window,
            self.long_window,
            self.volatility_window,
            self.deviation_threshold * 100.0
        )
    }
}

pub fn compute_returns(prices: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(prices.len());
    if prices.is_empty() {
        return out;
    }
    out.push(None);
    out.extend(prices.windows(2).map(|w| match (w[0], w[1]) {
        (Some(prev), Some(curr)) => Some(curr / prev - 1.0).filter(|r| r.is_finite()),
        _ => None,
    }));
    out
}

pub fn compute_volatility(returns: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling_stddev(returns, window, 1)
}

pub fn compute_moving_average(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling_mean(values, window)
}

pub fn compute_deviation(prices: &[Option<f64>], long_ma: &[Option<f64>]) -> Vec<Option<f64>> {
    prices
        .iter()
        .zip(long_ma)
        .map(|(&p, &ma)| match (p, ma) {
            (Some(p), Some(ma)) => Some((p - ma) / ma).filter(|d| d.is_finite()),
            _ => None,
        })
        .collect()
}

pub fn flag_signals(deviation: &[Option<f64>], threshold: f64) -> Vec<Option<bool>> {
    deviation
        .iter()
        .map(|d| d.map(|d| d.abs() > threshold))
        .collect()
}

/// Computes every indicator column for `prices` and returns a new frame.
pub fn compute_signals(prices: &Frame, cfg: &IndicatorConfig) -> Result<Frame, RiskoffError> {
    cfg.validate()?;
    let price = prices.float(PRICE_COL)?;

    let returns = compute_returns(price);
    let volatility = compute_volatility(&returns, cfg.volatility_window);
    let ma_short = compute_moving_average(price, cfg.short_window);
    let ma_long = compute_moving_average(price, cfg.long_window);
    let deviation = compute_deviation(price, &ma_long);
    let signal = flag_signals(&deviation, cfg.deviation_threshold);

    prices
        .clone()
        .with_column(RETURNS_COL, Column::Float(returns))?
        .with_column(VOLATILITY_COL, Column::Float(volatility))?
        .with_column(MA_SHORT_COL, Column::Float(ma_short))?
        .with_column(MA_LONG_COL, Column::Float(ma_long))?
        .with_column(DEVIATION_COL, Column::Float(deviation))?
        .with_column(SIGNAL_COL, Column::Flag(signal))
}

pub fn signal_count(frame: &Frame) -> Result<usize, RiskoffError> {
    Ok(frame
        .flag(SIGNAL_COL)?
        .iter()
        .filter(|s| **s == Some(true))
        .count())
}

/// Most recent row of an indicator frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub price: Option<f64>,
    pub deviation: Option<f64>,
    pub signal_active: bool,
}

pub fn latest_snapshot(frame: &Frame) -> Result<Option<Snapshot>, RiskoffError> {
    let price = frame.float(PRICE_COL)?;
    let deviation = frame.float(DEVIATION_COL)?;
    let signal = frame.flag(SIGNAL_COL)?;

    Ok(frame.index().last().map(|&date| {
        let i = frame.len() - 1;
        Snapshot {
            date,
            price: price[i],
            deviation: deviation[i],
            signal_active: signal[i] == Some(true),
        }
    }))
}
