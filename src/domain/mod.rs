//! Core domain types and pipeline stages.

pub mod error;
pub mod frame;
pub mod market_query;
pub mod indicator;
pub mod evaluation;
pub mod backtest;
pub mod metrics;
pub mod sweep;
pub mod config_validation;
