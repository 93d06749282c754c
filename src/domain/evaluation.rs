//! Forward-return evaluation of signal days.
//!
//! A descriptive grouping, not a hypothesis test: forward returns over a fixed
//! horizon are split into signal days, non-signal days and all days, and each
//! group reports its count, mean and median.

use serde::Serialize;
use std::fmt;

use crate::domain::error::RiskoffError;
use crate::domain::frame::{Column, Frame, PRICE_COL};
use crate::domain::indicator::SIGNAL_COL;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    /// Forward horizon in trading sessions.
    pub horizon_days: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self { horizon_days: 5 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalGroup {
    SignalDays,
    NonSignalDays,
    Overall,
}

impl fmt::Display for SignalGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalGroup::SignalDays => write!(f, "signal_days"),
            SignalGroup::NonSignalDays => write!(f, "non_signal_days"),
            SignalGroup::Overall => write!(f, "overall"),
        }
    }
}

/// One row of the evaluation table. Empty groups report NaN mean and median.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub group: SignalGroup,
    pub count: usize,
    pub mean_fwd_return: f64,
    pub median_fwd_return: f64,
}

impl GroupSummary {
    /// Field names in serialisation order.
    pub const COLUMNS: &'static [&'static str] =
        &["group", "count", "mean_fwd_return", "median_fwd_return"];

    fn from_values(group: SignalGroup, mut values: Vec<f64>) -> Self {
        Self {
            group,
            count: values.len(),
            mean_fwd_return: mean(&values),
            median_fwd_return: median(&mut values),
        }
    }
}

pub fn forward_return_col(horizon_days: usize) -> String {
    format!("fwd_ret_{}d", horizon_days)
}

/// `fwd[t] = price[t + h] / price[t] - 1`; the last `h` rows and any
/// non-finite result are undefined.
pub fn compute_forward_returns(
    prices: &[Option<f64>],
    horizon_days: usize,
) -> Result<Vec<Option<f64>>, RiskoffError> {
    if horizon_days == 0 {
        return Err(RiskoffError::invalid_parameter(
            "horizon_days",
            "must be > 0",
        ));
    }
    Ok((0..prices.len())
        .map(|t| match (prices[t], prices.get(t + horizon_days).copied().flatten()) {
            (Some(now), Some(later)) => Some(later / now - 1.0).filter(|r| r.is_finite()),
            _ => None,
        })
        .collect())
}

/// Returns a copy of `frame` with a `fwd_ret_{h}d` column appended.
pub fn with_forward_returns(frame: &Frame, horizon_days: usize) -> Result<Frame, RiskoffError> {
    let fwd = compute_forward_returns(frame.float(PRICE_COL)?, horizon_days)?;
    frame
        .clone()
        .with_column(&forward_return_col(horizon_days), Column::Float(fwd))
}

/// Groups forward returns by signal state. Rows with an undefined forward
/// return are excluded from every group; rows with an undefined signal
/// (indicator warm-up) count as non-signal days.
pub fn summarize_signal_performance(
    frame: &Frame,
    cfg: &EvalConfig,
) -> Result<Vec<GroupSummary>, RiskoffError> {
    let price = frame.float(PRICE_COL)?;
    let signal = frame.flag(SIGNAL_COL)?;
    let fwd = compute_forward_returns(price, cfg.horizon_days)?;

    let mut flagged = Vec::new();
    let mut unflagged = Vec::new();
    let mut overall = Vec::new();

    for (r, s) in fwd.iter().zip(signal) {
        let Some(r) = *r else { continue };
        if *s == Some(true) {
            flagged.push(r);
        } else {
            unflagged.push(r);
        }
        overall.push(r);
    }

    Ok(vec![
        GroupSummary::from_values(SignalGroup::SignalDays, flagged),
        GroupSummary::from_values(SignalGroup::NonSignalDays, unflagged),
        GroupSummary::from_values(SignalGroup::Overall, overall),
    ])
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
