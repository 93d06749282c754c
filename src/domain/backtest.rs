//! Position construction and equity-curve simulation.
//!
//! A signal at session t moves the strategy to cash for sessions
//! t+1 ..= t+cooldown_days. Overlapping cooldowns merge: a session is in cash
//! when at least one window covers it. The position for session τ is decided
//! from signals strictly before τ and then applied to the return realised over
//! (τ-1, τ].

use chrono::NaiveDate;

use crate::domain::error::RiskoffError;
use crate::domain::frame::{Column, Frame, PRICE_COL};
use crate::domain::indicator::SIGNAL_COL;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestConfig {
    pub cooldown_days: usize,
    /// Annual risk-free rate used when summarising the curves.
    pub risk_free_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            cooldown_days: 5,
            risk_free_rate: 0.0,
        }
    }
}

/// Long/cash position per session: 1.0 invested, 0.0 cash.
///
/// `is_cash[τ]` is the OR of `signal[t]` for `τ - cooldown_days <= t < τ`,
/// tracked with a running count of flagged sessions in that window.
/// Undefined signals count as not flagged.
pub fn build_position_from_signal(
    signal: &[Option<bool>],
    cooldown_days: usize,
) -> Result<Vec<f64>, RiskoffError> {
    if cooldown_days == 0 {
        return Err(RiskoffError::invalid_parameter(
            "cooldown_days",
            "must be > 0",
        ));
    }

    let flagged = |t: usize| signal[t] == Some(true);
    let mut active = 0usize;
    let mut position = Vec::with_capacity(signal.len());

    for tau in 0..signal.len() {
        if tau >= 1 && flagged(tau - 1) {
            active += 1;
        }
        if tau > cooldown_days && flagged(tau - 1 - cooldown_days) {
            active -= 1;
        }
        position.push(if active > 0 { 0.0 } else { 1.0 });
    }

    Ok(position)
}

/// `equity / running_max(equity) - 1`.
pub fn drawdown_series(equity: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    equity
        .iter()
        .map(|&e| {
            if e >= peak {
                peak = e;
                0.0
            } else {
                e / peak - 1.0
            }
        })
        .collect()
}

/// Running product of `1 + r`, so the first value is `1 + returns[0]`.
pub fn compound(returns: &[f64]) -> Vec<f64> {
    let mut acc = 1.0;
    returns
        .iter()
        .map(|r| {
            acc *= 1.0 + r;
            acc
        })
        .collect()
}

pub const DAILY_RET_COL: &str = "daily_ret";
pub const POSITION_COL: &str = "position";
pub const STRAT_RET_COL: &str = "strat_ret";
pub const BH_EQUITY_COL: &str = "bh_equity";
pub const STRAT_EQUITY_COL: &str = "strat_equity";
pub const BH_DRAWDOWN_COL: &str = "bh_drawdown";
pub const STRAT_DRAWDOWN_COL: &str = "strat_drawdown";

/// Output of one backtest run, aligned to the input index.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestFrame {
    pub index: Vec<NaiveDate>,
    pub daily_ret: Vec<f64>,
    pub position: Vec<f64>,
    pub strat_ret: Vec<f64>,
    pub bh_equity: Vec<f64>,
    pub strat_equity: Vec<f64>,
    pub bh_drawdown: Vec<f64>,
    pub strat_drawdown: Vec<f64>,
}

impl BacktestFrame {
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Fraction of sessions spent invested.
    pub fn exposure(&self) -> f64 {
        if self.position.is_empty() {
            return 0.0;
        }
        self.position.iter().sum::<f64>() / self.position.len() as f64
    }

    pub fn to_frame(&self) -> Result<Frame, RiskoffError> {
        let col = |v: &[f64]| Column::Float(v.iter().copied().map(Some).collect());
        Frame::new(self.index.clone())?
            .with_column(DAILY_RET_COL, col(&self.daily_ret))?
            .with_column(POSITION_COL, col(&self.position))?
            .with_column(STRAT_RET_COL, col(&self.strat_ret))?
            .with_column(BH_EQUITY_COL, col(&self.bh_equity))?
            .with_column(STRAT_EQUITY_COL, col(&self.strat_equity))?
            .with_column(BH_DRAWDOWN_COL, col(&self.bh_drawdown))?
            .with_column(STRAT_DRAWDOWN_COL, col(&self.strat_drawdown))
    }
}

/// Runs the cooldown rule over `frame` using the default column names.
pub fn run_backtest(frame: &Frame, cooldown_days: usize) -> Result<BacktestFrame, RiskoffError> {
    compute_equity_curves(frame, PRICE_COL, SIGNAL_COL, cooldown_days)
}

pub fn compute_equity_curves(
    frame: &Frame,
    price_col: &str,
    signal_col: &str,
    cooldown_days: usize,
) -> Result<BacktestFrame, RiskoffError> {
    let price = frame.float(price_col)?;
    let signal = frame.flag(signal_col)?;
    let position = build_position_from_signal(signal, cooldown_days)?;
    if frame.is_empty() {
        return Err(RiskoffError::EmptySeries);
    }

    // Returns run from the last defined price, so a move across a gap is
    // realised on the next defined session.
    let mut last_price: Option<f64> = None;
    let daily_ret: Vec<f64> = price
        .iter()
        .map(|p| {
            let curr = p.filter(|x| x.is_finite());
            let ret = match (last_price, curr) {
                (Some(prev), Some(curr)) => curr / prev - 1.0,
                _ => 0.0,
            };
            if curr.is_some() {
                last_price = curr;
            }
            ret
        })
        .collect();

    let strat_ret: Vec<f64> = daily_ret
        .iter()
        .zip(&position)
        .map(|(r, p)| r * p)
        .collect();

    let bh_equity = compound(&daily_ret);
    let strat_equity = compound(&strat_ret);
    let bh_drawdown = drawdown_series(&bh_equity);
    let strat_drawdown = drawdown_series(&strat_equity);

    Ok(BacktestFrame {
        index: frame.index().to_vec(),
        daily_ret,
        position,
        strat_ret,
        bh_equity,
        strat_equity,
        bh_drawdown,
        strat_drawdown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flags(bits: &[u8]) -> Vec<Option<bool>> {
        bits.iter().map(|&b| Some(b == 1)).collect()
    }

    fn frame(prices: &[f64], signal: Vec<Option<bool>>) -> Frame {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let index = (0..prices.len())
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect();
        Frame::from_prices(index, prices.to_vec())
            .unwrap()
            .with_column(SIGNAL_COL, Column::Flag(signal))
            .unwrap()
    }

    #[test]
    fn single_signal_moves_to_cash_for_cooldown() {
        let pos = build_position_from_signal(&flags(&[0, 1, 0, 0, 0, 0]), 3).unwrap();
        assert_eq!(pos, vec![1.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn overlapping_windows_merge() {
        let pos = build_position_from_signal(&flags(&[1, 1, 0, 0, 0, 0, 0]), 3).unwrap();
        // Cash at 1..=4, not a 6-session block.
        assert_eq!(pos, vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn signal_on_same_day_does_not_affect_position() {
        let pos = build_position_from_signal(&flags(&[0, 0, 1]), 5).unwrap();
        assert_eq!(pos, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn undefined_signals_are_not_flagged() {
        let pos = build_position_from_signal(&[None, None, Some(false)], 2).unwrap();
        assert_eq!(pos, vec![1.0; 3]);
    }

    #[test]
    fn zero_cooldown_is_configuration_error() {
        let err = build_position_from_signal(&flags(&[1]), 0).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn drawdown_resets_on_new_high() {
        let dd = drawdown_series(&[1.0, 1.1, 0.99, 1.1, 1.2]);
        assert_eq!(dd[0], 0.0);
        assert_eq!(dd[1], 0.0);
        assert_relative_eq!(dd[2], 0.99 / 1.1 - 1.0, epsilon = 1e-12);
        assert_eq!(dd[3], 0.0);
        assert_eq!(dd[4], 0.0);
    }

    #[test]
    fn scenario_equity_curves() {
        let prices = [100.0, 102.0, 99.0, 101.0, 95.0, 105.0, 110.0];
        let signal = vec![None, None, Some(false), Some(false), Some(true), Some(true), Some(true)];
        let bt = compute_equity_curves(&frame(&prices, signal), PRICE_COL, SIGNAL_COL, 1).unwrap();

        assert_eq!(bt.position, vec![1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0]);
        assert_eq!(bt.bh_equity[0], 1.0);
        assert_eq!(bt.strat_equity[0], 1.0);
        assert_relative_eq!(bt.bh_equity[6], 1.10, epsilon = 1e-12);
        assert_relative_eq!(bt.strat_equity[6], 0.95, epsilon = 1e-12);
        assert_eq!(bt.strat_ret[5], 0.0);
        assert_relative_eq!(bt.strat_drawdown[6], 0.95 / 1.02 - 1.0, epsilon = 1e-12);
        assert_eq!(bt.bh_drawdown[6], 0.0);
    }

    #[test]
    fn flat_prices_keep_equity_at_one() {
        let bt = run_backtest(&frame(&[50.0; 8], flags(&[1, 0, 1, 0, 0, 1, 0, 0])), 2).unwrap();
        assert!(bt.bh_equity.iter().all(|&e| e == 1.0));
        assert!(bt.strat_equity.iter().all(|&e| e == 1.0));
        assert!(bt.strat_drawdown.iter().all(|&d| d == 0.0));
    }

    fn gapped_frame(prices: Vec<Option<f64>>, signal: Vec<Option<bool>>) -> Frame {
        let index = (0..prices.len())
            .map(|i| NaiveDate::from_ymd_opt(2024, 1, 1 + i as u32).unwrap())
            .collect();
        Frame::new(index)
            .unwrap()
            .with_column(PRICE_COL, Column::Float(prices))
            .unwrap()
            .with_column(SIGNAL_COL, Column::Flag(signal))
            .unwrap()
    }

    #[test]
    fn price_gap_move_is_realised_after_the_gap() {
        let f = gapped_frame(vec![Some(10.0), None, Some(12.0)], vec![Some(false); 3]);
        let bt = run_backtest(&f, 1).unwrap();
        assert_eq!(bt.daily_ret[1], 0.0);
        assert_relative_eq!(bt.daily_ret[2], 0.2, epsilon = 1e-12);
        assert_relative_eq!(bt.bh_equity[2], 1.2, epsilon = 1e-12);
    }

    #[test]
    fn buy_hold_tracks_price_ratio_across_gaps() {
        let prices = vec![None, Some(20.0), None, None, Some(18.0), Some(f64::NAN), Some(25.0)];
        let f = gapped_frame(prices, vec![Some(false); 7]);
        let bt = run_backtest(&f, 1).unwrap();
        assert_eq!(&bt.daily_ret[..2], &[0.0, 0.0]);
        assert_relative_eq!(bt.bh_equity[4], 0.9, epsilon = 1e-12);
        assert_relative_eq!(bt.bh_equity[6], 1.25, epsilon = 1e-12);
    }

    #[test]
    fn cash_session_after_gap_skips_the_gap_move() {
        // Signal at 0 keeps session 1 in cash; the gap move lands on session 2.
        let f = gapped_frame(
            vec![Some(10.0), None, Some(12.0)],
            vec![Some(true), Some(false), Some(false)],
        );
        let bt = run_backtest(&f, 1).unwrap();
        assert_eq!(bt.position, vec![1.0, 0.0, 1.0]);
        assert_relative_eq!(bt.strat_equity[2], 1.2, epsilon = 1e-12);
    }

    #[test]
    fn missing_columns_are_schema_errors() {
        let f = frame(&[1.0, 2.0], flags(&[0, 0]));
        assert!(compute_equity_curves(&f, "close", SIGNAL_COL, 1).unwrap_err().is_schema());
        assert!(compute_equity_curves(&f, PRICE_COL, "flag", 1).unwrap_err().is_schema());
    }

    #[test]
    fn empty_frame_fails_loudly() {
        let f = frame(&[], vec![]);
        assert!(matches!(run_backtest(&f, 3), Err(RiskoffError::EmptySeries)));
    }

    #[test]
    fn exposure_and_export() {
        let bt = run_backtest(&frame(&[1.0, 2.0, 3.0, 4.0], flags(&[1, 0, 0, 0])), 2).unwrap();
        assert_relative_eq!(bt.exposure(), 0.5);
        let exported = bt.to_frame().unwrap();
        assert_eq!(exported.len(), 4);
        assert_eq!(exported.columns().len(), 7);
        assert_eq!(exported.float(POSITION_COL).unwrap()[1], Some(0.0));
    }
}
