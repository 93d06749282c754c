//! Grid sweep over deviation thresholds and cooldown windows.
//!
//! Every (threshold, cooldown) cell re-runs the indicator, backtest and
//! summary chain on the same price frame. Thresholds form the outer loop and
//! cooldowns the inner loop; rows always come back in that order, whether the
//! thresholds were evaluated in parallel or not.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::backtest::run_backtest;
use crate::domain::error::RiskoffError;
use crate::domain::frame::Frame;
use crate::domain::indicator::{IndicatorConfig, compute_signals, signal_count};
use crate::domain::metrics::{Metrics, summarize_backtest};

#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    pub short_window: usize,
    pub long_window: usize,
    pub volatility_window: usize,
    /// Thresholds in percent (3.0 = 3%).
    pub deviation_pcts: Vec<f64>,
    pub cooldown_days: Vec<usize>,
    pub risk_free_rate: f64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            short_window: 10,
            long_window: 30,
            volatility_window: 20,
            deviation_pcts: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            cooldown_days: vec![1, 3, 5, 7, 10, 15],
            risk_free_rate: 0.0,
        }
    }
}

impl SweepConfig {
    pub fn size(&self) -> usize {
        self.deviation_pcts.len() * self.cooldown_days.len()
    }

    fn indicator_config(&self, pct: f64) -> IndicatorConfig {
        IndicatorConfig {
            short_window: self.short_window,
            long_window: self.long_window,
            volatility_window: self.volatility_window,
            deviation_threshold: pct / 100.0,
        }
    }

    /// Checks every grid coordinate before any cell runs.
    pub fn validate(&self) -> Result<(), RiskoffError> {
        self.indicator_config(0.0).validate()?;
        for &pct in &self.deviation_pcts {
            if !pct.is_finite() || pct < 0.0 {
                return Err(RiskoffError::invalid_parameter(
                    "deviation_pcts",
                    format!("{} is not a finite, non-negative percentage", pct),
                ));
            }
        }
        if self.cooldown_days.contains(&0) {
            return Err(RiskoffError::invalid_parameter(
                "cooldown_days",
                "every cooldown must be > 0",
            ));
        }
        Ok(())
    }
}

/// One grid cell: strategy versus buy-and-hold at a (threshold, cooldown).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepRow {
    pub threshold_pct: f64,
    pub cooldown_days: usize,
    pub signal_count: usize,
    pub strategy_total_return: f64,
    pub strategy_sharpe: f64,
    pub strategy_max_drawdown: f64,
    pub buyhold_total_return: f64,
    pub buyhold_sharpe: f64,
    pub buyhold_max_drawdown: f64,
    pub delta_total_return: f64,
    pub delta_sharpe: f64,
}

impl SweepRow {
    pub const COLUMNS: &'static [&'static str] = &[
        "threshold_pct",
        "cooldown_days",
        "signal_count",
        "strategy_total_return",
        "strategy_sharpe",
        "strategy_max_drawdown",
        "buyhold_total_return",
        "buyhold_sharpe",
        "buyhold_max_drawdown",
        "delta_total_return",
        "delta_sharpe",
    ];

    fn from_metrics(
        threshold_pct: f64,
        cooldown_days: usize,
        signal_count: usize,
        strategy: &Metrics,
        buyhold: &Metrics,
    ) -> Self {
        Self {
            threshold_pct,
            cooldown_days,
            signal_count,
            strategy_total_return: strategy.total_return,
            strategy_sharpe: strategy.sharpe_ratio,
            strategy_max_drawdown: strategy.max_drawdown,
            buyhold_total_return: buyhold.total_return,
            buyhold_sharpe: buyhold.sharpe_ratio,
            buyhold_max_drawdown: buyhold.max_drawdown,
            delta_total_return: strategy.total_return - buyhold.total_return,
            delta_sharpe: strategy.sharpe_ratio - buyhold.sharpe_ratio,
        }
    }
}

/// Sweep executor. Parallel across thresholds when the `parallel` feature is
/// enabled, sequential otherwise.
#[derive(Debug, Clone)]
pub struct SweepEngine {
    parallel: bool,
}

impl Default for SweepEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SweepEngine {
    pub fn new() -> Self {
        Self {
            parallel: cfg!(feature = "parallel"),
        }
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel && cfg!(feature = "parallel");
        self
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn run(&self, prices: &Frame, cfg: &SweepConfig) -> Result<SweepResults, RiskoffError> {
        self.run_with_progress(prices, cfg, |_, _, _| {})
    }

    /// Runs the sweep, invoking `progress(cell_index, total_cells, row)` after
    /// each cell. Under parallel execution callbacks arrive out of order.
    pub fn run_with_progress<F>(
        &self,
        prices: &Frame,
        cfg: &SweepConfig,
        progress: F,
    ) -> Result<SweepResults, RiskoffError>
    where
        F: Fn(usize, usize, &SweepRow) + Send + Sync,
    {
        cfg.validate()?;
        let total = cfg.size();
        info!(
            cells = total,
            thresholds = cfg.deviation_pcts.len(),
            cooldowns = cfg.cooldown_days.len(),
            parallel = self.parallel,
            "starting sweep"
        );

        let job = |(i, pct): (usize, &f64)| -> Result<Vec<SweepRow>, RiskoffError> {
            let rows = sweep_threshold(prices, cfg, *pct)?;
            for (j, row) in rows.iter().enumerate() {
                progress(i * cfg.cooldown_days.len() + j, total, row);
            }
            Ok(rows)
        };

        #[cfg(feature = "parallel")]
        let nested = if self.parallel {
            cfg.deviation_pcts
                .par_iter()
                .enumerate()
                .map(job)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            cfg.deviation_pcts
                .iter()
                .enumerate()
                .map(job)
                .collect::<Result<Vec<_>, _>>()?
        };

        #[cfg(not(feature = "parallel"))]
        let nested = cfg
            .deviation_pcts
            .iter()
            .enumerate()
            .map(job)
            .collect::<Result<Vec<_>, _>>()?;

        let rows: Vec<SweepRow> = nested.into_iter().flatten().collect();
        info!(rows = rows.len(), "sweep complete");
        Ok(SweepResults::new(rows))
    }
}

/// Runs a sweep with the default engine.
pub fn run_sweep(prices: &Frame, cfg: &SweepConfig) -> Result<SweepResults, RiskoffError> {
    SweepEngine::new().run(prices, cfg)
}

fn sweep_threshold(
    prices: &Frame,
    cfg: &SweepConfig,
    pct: f64,
) -> Result<Vec<SweepRow>, RiskoffError> {
    let signals = compute_signals(prices, &cfg.indicator_config(pct))?;
    let count = signal_count(&signals)?;
    if count == 0 {
        warn!(threshold_pct = pct, "no signals at this threshold");
    }

    cfg.cooldown_days
        .iter()
        .map(|&cooldown| {
            let bt = run_backtest(&signals, cooldown)?;
            let [buyhold, strategy] = summarize_backtest(&bt, cfg.risk_free_rate)?;
            let row = SweepRow::from_metrics(pct, cooldown, count, &strategy, &buyhold);
            debug!(
                threshold_pct = pct,
                cooldown,
                signals = count,
                delta_sharpe = row.delta_sharpe,
                "sweep cell done"
            );
            Ok(row)
        })
        .collect()
}

/// Rows of a finished sweep, in traversal order.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepResults {
    rows: Vec<SweepRow>,
}

impl SweepResults {
    pub fn new(rows: Vec<SweepRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[SweepRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<SweepRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, threshold_pct: f64, cooldown_days: usize) -> Option<&SweepRow> {
        self.rows
            .iter()
            .find(|r| r.threshold_pct == threshold_pct && r.cooldown_days == cooldown_days)
    }

    /// Keeps rows whose threshold produced at least `min_signals` signals.
    pub fn with_min_signals(self, min_signals: usize) -> Self {
        Self {
            rows: self
                .rows
                .into_iter()
                .filter(|r| r.signal_count >= min_signals)
                .collect(),
        }
    }

    /// Rows ordered by `delta_sharpe`, best first. Ties keep traversal order.
    pub fn sorted_by_delta_sharpe(&self) -> Vec<&SweepRow> {
        let mut sorted: Vec<&SweepRow> = self.rows.iter().collect();
        sorted.sort_by(|a, b| b.delta_sharpe.total_cmp(&a.delta_sharpe));
        sorted
    }

    pub fn top_n(&self, n: usize) -> Vec<&SweepRow> {
        self.sorted_by_delta_sharpe().into_iter().take(n).collect()
    }

    pub fn best(&self) -> Option<&SweepRow> {
        self.sorted_by_delta_sharpe().into_iter().next()
    }
}
