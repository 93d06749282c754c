//! CLI definition and dispatch.
//!
//! Every subcommand resolves its settings from the INI file plus flag
//! overrides, then runs a pipeline against a [`DataPort`] and an
//! [`ExportPort`]. Result tables go to stdout; diagnostics go through
//! `tracing` to stderr.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_export_adapter::CsvExportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestConfig, BacktestFrame, run_backtest};
use crate::domain::config_validation::{parse_list, validate_config};
use crate::domain::error::RiskoffError;
use crate::domain::evaluation::{EvalConfig, GroupSummary, summarize_signal_performance};
use crate::domain::frame::{Frame, PRICE_COL};
use crate::domain::indicator::{IndicatorConfig, compute_signals, latest_snapshot, signal_count};
use crate::domain::market_query::{Interval, MarketQuery, Period};
use crate::domain::metrics::{Metrics, summarize_backtest};
use crate::domain::sweep::{SweepConfig, SweepEngine, SweepResults};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::export_port::ExportPort;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_OUT_DIR: &str = "output";
const SWEEP_ROWS_SHOWN: usize = 10;

#[derive(Parser, Debug)]
#[command(
    name = "riskoff",
    about = "Moving-average deviation signals with a cooldown risk-off backtest"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// INI configuration file; defaults apply when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Instrument symbol, overrides [data] symbol
    #[arg(long)]
    pub symbol: Option<String>,
    /// Lookback period such as 6mo, 1y, 5y or max
    #[arg(long)]
    pub period: Option<String>,
    /// Output directory for CSV exports
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute indicators and the deviation signal
    Signals {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Summarise forward returns on signal and non-signal days
    Evaluate {
        #[command(flatten)]
        common: CommonArgs,
        /// Forward horizon in trading sessions
        #[arg(long)]
        horizon: Option<usize>,
    },
    /// Backtest the cooldown rule against buy-and-hold
    Backtest {
        #[command(flatten)]
        common: CommonArgs,
        /// Sessions spent in cash after each signal
        #[arg(long)]
        cooldown: Option<usize>,
    },
    /// Sweep thresholds and cooldowns
    Sweep {
        #[command(flatten)]
        common: CommonArgs,
        /// Hide rows whose threshold produced fewer signals
        #[arg(long)]
        min_signals: Option<usize>,
        /// Evaluate grid cells on the calling thread
        #[arg(long)]
        sequential: bool,
    },
    /// Validate the configuration and show the resolved settings
    Validate {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// List symbols available in the data directory
    ListSymbols {
        #[command(flatten)]
        common: CommonArgs,
    },
}

/// Fully resolved run settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub query: MarketQuery,
    pub data_dir: PathBuf,
    pub price_column: String,
    pub out_dir: PathBuf,
    pub indicators: IndicatorConfig,
    pub backtest: BacktestConfig,
    pub evaluation: EvalConfig,
    pub sweep: SweepConfig,
    pub min_signals: usize,
    pub parallel: bool,
}

pub fn run(cli: Cli) -> ExitCode {
    match dispatch(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn dispatch(command: Command) -> Result<(), RiskoffError> {
    match command {
        Command::Signals { common } => {
            let settings = resolve_settings(&common)?;
            let (data, export) = adapters_for(&settings);
            let frame = run_signals_pipeline(&data, &export, &settings)?;
            print_snapshot(&settings, &frame)
        }
        Command::Evaluate { common, horizon } => {
            let mut settings = resolve_settings(&common)?;
            if let Some(h) = horizon {
                settings.evaluation.horizon_days = h;
            }
            let (data, export) = adapters_for(&settings);
            let rows = run_evaluate_pipeline(&data, &export, &settings)?;
            print_evaluation(&settings, &rows);
            Ok(())
        }
        Command::Backtest { common, cooldown } => {
            let mut settings = resolve_settings(&common)?;
            if let Some(cd) = cooldown {
                settings.backtest.cooldown_days = cd;
            }
            let (data, export) = adapters_for(&settings);
            let (bt, metrics) = run_backtest_pipeline(&data, &export, &settings)?;
            print_metrics(&settings, &bt, &metrics);
            Ok(())
        }
        Command::Sweep {
            common,
            min_signals,
            sequential,
        } => {
            let mut settings = resolve_settings(&common)?;
            if let Some(n) = min_signals {
                settings.min_signals = n;
            }
            if sequential {
                settings.parallel = false;
            }
            let (data, export) = adapters_for(&settings);
            let results = run_sweep_pipeline(&data, &export, &settings)?;
            print_sweep(&settings, &results);
            Ok(())
        }
        Command::Validate { common } => {
            let settings = resolve_settings(&common)?;
            let (data, _) = adapters_for(&settings);
            run_validate(&data, &settings)
        }
        Command::ListSymbols { common } => {
            let settings = resolve_settings(&common)?;
            let (data, _) = adapters_for(&settings);
            for symbol in data.list_symbols()? {
                println!("{symbol}");
            }
            Ok(())
        }
    }
}

fn adapters_for(settings: &Settings) -> (CsvAdapter, CsvExportAdapter) {
    (
        CsvAdapter::new(settings.data_dir.clone()).with_price_column(&settings.price_column),
        CsvExportAdapter::new(settings.out_dir.clone()),
    )
}

pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, RiskoffError> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            FileConfigAdapter::from_file(path)
        }
        None => {
            debug!("no config file given, using defaults");
            Ok(FileConfigAdapter::defaults())
        }
    }
}

fn resolve_settings(common: &CommonArgs) -> Result<Settings, RiskoffError> {
    let adapter = load_config(common.config.as_deref())?;
    build_settings(&adapter, common)
}

/// Validates `adapter`, builds every section and applies flag overrides.
pub fn build_settings(
    adapter: &dyn ConfigPort,
    overrides: &CommonArgs,
) -> Result<Settings, RiskoffError> {
    validate_config(adapter)?;

    let mut query = build_market_query(adapter)?;
    if let Some(symbol) = &overrides.symbol {
        query = MarketQuery::new(symbol, query.period, query.interval);
    }
    if let Some(period) = &overrides.period {
        query.period = period.parse()?;
    }

    let out_dir = match &overrides.out {
        Some(out) => out.clone(),
        None => PathBuf::from(
            adapter
                .get_string("output", "dir")
                .unwrap_or_else(|| DEFAULT_OUT_DIR.to_string()),
        ),
    };

    Ok(Settings {
        query,
        data_dir: PathBuf::from(
            adapter
                .get_string("data", "dir")
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
        ),
        price_column: adapter
            .get_string("data", "price_column")
            .unwrap_or_else(|| PRICE_COL.to_string()),
        out_dir,
        indicators: build_indicator_config(adapter),
        backtest: build_backtest_config(adapter),
        evaluation: build_eval_config(adapter),
        sweep: build_sweep_config(adapter)?,
        min_signals: get_usize(adapter, "sweep", "min_signals", 0),
        parallel: adapter.get_bool("sweep", "parallel", true),
    })
}

pub fn build_market_query(adapter: &dyn ConfigPort) -> Result<MarketQuery, RiskoffError> {
    let defaults = MarketQuery::default();
    let symbol = adapter
        .get_string("data", "symbol")
        .unwrap_or(defaults.symbol);
    let period = match adapter.get_string("data", "period") {
        Some(raw) => raw.parse::<Period>()?,
        None => defaults.period,
    };
    let interval = match adapter.get_string("data", "interval") {
        Some(raw) => raw.parse::<Interval>()?,
        None => defaults.interval,
    };
    Ok(MarketQuery::new(&symbol, period, interval))
}

pub fn build_indicator_config(adapter: &dyn ConfigPort) -> IndicatorConfig {
    let defaults = IndicatorConfig::default();
    IndicatorConfig {
        short_window: get_usize(adapter, "indicators", "short_window", defaults.short_window),
        long_window: get_usize(adapter, "indicators", "long_window", defaults.long_window),
        volatility_window: get_usize(
            adapter,
            "indicators",
            "volatility_window",
            defaults.volatility_window,
        ),
        deviation_threshold: adapter.get_double(
            "indicators",
            "deviation_threshold",
            defaults.deviation_threshold,
        ),
    }
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> BacktestConfig {
    let defaults = BacktestConfig::default();
    BacktestConfig {
        cooldown_days: get_usize(adapter, "backtest", "cooldown_days", defaults.cooldown_days),
        risk_free_rate: adapter.get_double("backtest", "risk_free_rate", defaults.risk_free_rate),
    }
}

pub fn build_eval_config(adapter: &dyn ConfigPort) -> EvalConfig {
    EvalConfig {
        horizon_days: get_usize(
            adapter,
            "evaluation",
            "horizon_days",
            EvalConfig::default().horizon_days,
        ),
    }
}

/// Sweep grid sharing the indicator windows and risk-free rate of the
/// single-run sections.
pub fn build_sweep_config(adapter: &dyn ConfigPort) -> Result<SweepConfig, RiskoffError> {
    let defaults = SweepConfig::default();
    let indicators = build_indicator_config(adapter);
    let list_error = |key: &str, reason: String| RiskoffError::ConfigInvalid {
        section: "sweep".to_string(),
        key: key.to_string(),
        reason,
    };

    let deviation_pcts = match adapter.get_string("sweep", "deviation_pcts") {
        Some(raw) => parse_list(&raw).map_err(|r| list_error("deviation_pcts", r))?,
        None => defaults.deviation_pcts,
    };
    let cooldown_days = match adapter.get_string("sweep", "cooldown_days") {
        Some(raw) => parse_list(&raw).map_err(|r| list_error("cooldown_days", r))?,
        None => defaults.cooldown_days,
    };

    Ok(SweepConfig {
        short_window: indicators.short_window,
        long_window: indicators.long_window,
        volatility_window: indicators.volatility_window,
        deviation_pcts,
        cooldown_days,
        risk_free_rate: build_backtest_config(adapter).risk_free_rate,
    })
}

fn get_usize(adapter: &dyn ConfigPort, section: &str, key: &str, default: usize) -> usize {
    let value = adapter.get_int(section, key, default as i64);
    usize::try_from(value).unwrap_or(default)
}

/// Fetches prices for the configured query; an empty result is an error.
pub fn load_prices(data_port: &dyn DataPort, settings: &Settings) -> Result<Frame, RiskoffError> {
    let prices = data_port.fetch_prices(&settings.query)?;
    if prices.is_empty() {
        return Err(RiskoffError::EmptySeries);
    }
    Ok(prices)
}

pub fn run_signals_pipeline(
    data_port: &dyn DataPort,
    export: &dyn ExportPort,
    settings: &Settings,
) -> Result<Frame, RiskoffError> {
    let prices = load_prices(data_port, settings)?;
    let signals = compute_signals(&prices, &settings.indicators)?;
    info!(
        config = %settings.indicators,
        signals = signal_count(&signals)?,
        "computed indicators"
    );
    export.write_frame("indicators", &signals)?;
    Ok(signals)
}

pub fn run_evaluate_pipeline(
    data_port: &dyn DataPort,
    export: &dyn ExportPort,
    settings: &Settings,
) -> Result<Vec<GroupSummary>, RiskoffError> {
    let prices = load_prices(data_port, settings)?;
    let signals = compute_signals(&prices, &settings.indicators)?;
    let rows = summarize_signal_performance(&signals, &settings.evaluation)?;
    info!(horizon = settings.evaluation.horizon_days, "evaluated signals");
    export.write_evaluation(&rows)?;
    Ok(rows)
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    export: &dyn ExportPort,
    settings: &Settings,
) -> Result<(BacktestFrame, [Metrics; 2]), RiskoffError> {
    let prices = load_prices(data_port, settings)?;
    let signals = compute_signals(&prices, &settings.indicators)?;
    let bt = run_backtest(&signals, settings.backtest.cooldown_days)?;
    let metrics = summarize_backtest(&bt, settings.backtest.risk_free_rate)?;
    info!(
        cooldown = settings.backtest.cooldown_days,
        exposure = bt.exposure(),
        "backtest complete"
    );
    export.write_frame("backtest", &bt.to_frame()?)?;
    export.write_metrics(&metrics)?;
    Ok((bt, metrics))
}

/// Runs the full grid and exports every row; the returned results are
/// filtered by `min_signals`.
pub fn run_sweep_pipeline(
    data_port: &dyn DataPort,
    export: &dyn ExportPort,
    settings: &Settings,
) -> Result<SweepResults, RiskoffError> {
    let prices = load_prices(data_port, settings)?;
    let engine = SweepEngine::new().with_parallelism(settings.parallel);
    let results = engine.run_with_progress(&prices, &settings.sweep, |idx, total, row| {
        debug!(
            cell = idx + 1,
            total,
            threshold_pct = row.threshold_pct,
            cooldown = row.cooldown_days,
            "cell finished"
        );
    })?;
    export.write_sweep(results.rows())?;
    Ok(results.with_min_signals(settings.min_signals))
}

pub fn run_validate(data_port: &dyn DataPort, settings: &Settings) -> Result<(), RiskoffError> {
    println!("Configuration OK");
    println!("  symbol:      {}", settings.query.symbol);
    println!("  period:      {}", settings.query.period);
    println!("  interval:    {}", settings.query.interval);
    println!("  data dir:    {}", settings.data_dir.display());
    println!("  price col:   {}", settings.price_column);
    println!("  output dir:  {}", settings.out_dir.display());
    println!("  indicators:  {}", settings.indicators);
    println!(
        "  backtest:    cooldown {}d, risk-free {:.2}%",
        settings.backtest.cooldown_days,
        settings.backtest.risk_free_rate * 100.0
    );
    println!("  horizon:     {}d", settings.evaluation.horizon_days);
    println!(
        "  sweep:       {} cells (min signals {}, parallel {})",
        settings.sweep.size(),
        settings.min_signals,
        settings.parallel
    );

    match data_port.get_data_range(&settings.query.symbol)? {
        Some((first, last, rows)) => {
            println!("  data:        {} rows, {} to {}", rows, first, last)
        }
        None => println!("  data:        no data for {}", settings.query.symbol),
    }
    Ok(())
}

fn pct(value: f64) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else {
        format!("{:.2}%", value * 100.0)
    }
}

fn print_snapshot(settings: &Settings, frame: &Frame) -> Result<(), RiskoffError> {
    let signals = signal_count(frame)?;
    println!(
        "{} {} ({} rows, {} signal days)",
        settings.query.symbol,
        settings.indicators,
        frame.len(),
        signals
    );
    if let Some(snap) = latest_snapshot(frame)? {
        println!(
            "{}  price {}  deviation {}  signal {}",
            snap.date,
            snap.price.map_or("n/a".to_string(), |p| format!("{:.2}", p)),
            snap.deviation.map_or("n/a".to_string(), pct),
            if snap.signal_active { "ACTIVE" } else { "inactive" }
        );
    }
    Ok(())
}

fn print_evaluation(settings: &Settings, rows: &[GroupSummary]) {
    println!(
        "{} forward {}d returns",
        settings.query.symbol, settings.evaluation.horizon_days
    );
    println!("{:<16} {:>6} {:>10} {:>10}", "group", "count", "mean", "median");
    for row in rows {
        println!(
            "{:<16} {:>6} {:>10} {:>10}",
            row.group.to_string(),
            row.count,
            pct(row.mean_fwd_return),
            pct(row.median_fwd_return)
        );
    }
}

fn print_metrics(settings: &Settings, bt: &BacktestFrame, metrics: &[Metrics]) {
    println!(
        "{} cooldown {}d, exposure {}",
        settings.query.symbol,
        settings.backtest.cooldown_days,
        pct(bt.exposure())
    );
    println!(
        "{:<10} {:>10} {:>10} {:>10} {:>10} {:>8} {:>8}",
        "portfolio", "total", "annual", "vol", "max dd", "sharpe", "calmar"
    );
    for m in metrics {
        println!(
            "{:<10} {:>10} {:>10} {:>10} {:>10} {:>8.2} {:>8.2}",
            m.portfolio.to_string(),
            pct(m.total_return),
            pct(m.annualized_return),
            pct(m.annualized_volatility),
            pct(m.max_drawdown),
            m.sharpe_ratio,
            m.calmar_ratio
        );
    }
}

fn print_sweep(settings: &Settings, results: &SweepResults) {
    println!(
        "{}: {} cells with at least {} signals",
        settings.query.symbol,
        results.len(),
        settings.min_signals
    );
    println!(
        "{:>7} {:>8} {:>7} {:>10} {:>8} {:>10} {:>8}",
        "thresh", "cooldown", "signals", "strat", "sharpe", "d.return", "d.sharpe"
    );
    for row in results.top_n(SWEEP_ROWS_SHOWN) {
        println!(
            "{:>6.1}% {:>8} {:>7} {:>10} {:>8.2} {:>10} {:>8.2}",
            row.threshold_pct,
            row.cooldown_days,
            row.signal_count,
            pct(row.strategy_total_return),
            row.strategy_sharpe,
            pct(row.delta_total_return),
            row.delta_sharpe
        );
    }
}
