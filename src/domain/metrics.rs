//! Performance metrics for a return series and its equity curve.

use serde::Serialize;
use std::fmt;

use super::backtest::{BacktestFrame, drawdown_series};
use crate::domain::error::RiskoffError;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Dispersion below this is rounding noise from a constant series.
const MIN_STDDEV: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Portfolio {
    BuyHold,
    Strategy,
}

impl fmt::Display for Portfolio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Portfolio::BuyHold => write!(f, "buy_hold"),
            Portfolio::Strategy => write!(f, "strategy"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub portfolio: Portfolio,
    pub total_return: f64,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
    pub sharpe_ratio: f64,
    pub calmar_ratio: f64,
}

impl Metrics {
    pub const COLUMNS: &'static [&'static str] = &[
        "portfolio",
        "total_return",
        "annualized_return",
        "annualized_volatility",
        "max_drawdown",
        "max_drawdown_duration",
        "sharpe_ratio",
        "calmar_ratio",
    ];

    pub fn compute(
        portfolio: Portfolio,
        returns: &[f64],
        equity: &[f64],
        risk_free_rate: f64,
    ) -> Result<Self, RiskoffError> {
        if returns.len() != equity.len() {
            return Err(RiskoffError::Schema {
                reason: format!(
                    "return series has {} rows, equity curve has {}",
                    returns.len(),
                    equity.len()
                ),
            });
        }
        let Some(&last) = equity.last() else {
            return Err(RiskoffError::EmptySeries);
        };

        let annualized_return = annualized_return(equity, TRADING_DAYS_PER_YEAR);
        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity);

        Ok(Metrics {
            portfolio,
            total_return: last - 1.0,
            annualized_return,
            annualized_volatility: annualized_volatility(returns, TRADING_DAYS_PER_YEAR),
            max_drawdown,
            max_drawdown_duration,
            sharpe_ratio: sharpe_ratio(returns, risk_free_rate, TRADING_DAYS_PER_YEAR),
            calmar_ratio: calmar_ratio(annualized_return, max_drawdown),
        })
    }
}

/// One metrics row per portfolio: buy-and-hold first, then the strategy.
pub fn summarize_backtest(
    bt: &BacktestFrame,
    risk_free_rate: f64,
) -> Result<[Metrics; 2], RiskoffError> {
    Ok([
        Metrics::compute(Portfolio::BuyHold, &bt.daily_ret, &bt.bh_equity, risk_free_rate)?,
        Metrics::compute(
            Portfolio::Strategy,
            &bt.strat_ret,
            &bt.strat_equity,
            risk_free_rate,
        )?,
    ])
}

/// Compound annual growth over `(n - 1) / periods_per_year` years.
/// Fewer than two observations yield 0.
pub fn annualized_return(equity: &[f64], periods_per_year: f64) -> f64 {
    if equity.len() < 2 {
        return 0.0;
    }
    let total_return = equity[equity.len() - 1] / equity[0] - 1.0;
    let years = (equity.len() - 1) as f64 / periods_per_year;
    (1.0 + total_return).powf(1.0 / years) - 1.0
}

pub fn annualized_volatility(returns: &[f64], periods_per_year: f64) -> f64 {
    population_stddev(returns).map_or(0.0, |sd| sd * periods_per_year.sqrt())
}

/// Mean over stddev of excess daily returns, annualised. The annual risk-free
/// rate is converted to a daily rate by compound inversion. Zero or undefined
/// volatility yields 0.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate_annual: f64, periods_per_year: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let rf_daily = (1.0 + risk_free_rate_annual).powf(1.0 / periods_per_year) - 1.0;
    let excess: Vec<f64> = returns.iter().map(|r| r - rf_daily).collect();

    let n = excess.len() as f64;
    let mean = excess.iter().sum::<f64>() / n;
    match population_stddev(&excess) {
        Some(sd) if sd > MIN_STDDEV && sd.is_finite() => mean / sd * periods_per_year.sqrt(),
        _ => 0.0,
    }
}

pub fn max_drawdown(equity: &[f64]) -> f64 {
    compute_drawdown(equity).0
}

/// Annualised return over |max drawdown|; 0 when there was no drawdown.
pub fn calmar_ratio(annualized_return: f64, max_drawdown: f64) -> f64 {
    if max_drawdown == 0.0 {
        0.0
    } else {
        annualized_return / max_drawdown.abs()
    }
}

/// Returns (max drawdown as a non-positive fraction, longest underwater run
/// in sessions), both read off [`drawdown_series`].
fn compute_drawdown(equity: &[f64]) -> (f64, usize) {
    let drawdown = drawdown_series(equity);
    let max_dd = drawdown.iter().copied().fold(0.0_f64, f64::min);

    let mut max_dd_duration = 0usize;
    let mut current_dd_duration = 0usize;
    for &dd in &drawdown {
        if dd < 0.0 {
            current_dd_duration += 1;
            max_dd_duration = max_dd_duration.max(current_dd_duration);
        } else {
            current_dd_duration = 0;
        }
    }

    (max_dd, max_dd_duration)
}

fn population_stddev(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt())
}
