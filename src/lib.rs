//! riskoff: deviation signals, a cooldown risk-off backtest and parameter sweeps.
//!
//! Hexagonal architecture: the pure pipeline lives in [`domain`], collaborator
//! seams are traits in [`ports`], concrete file-backed implementations are in
//! [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
