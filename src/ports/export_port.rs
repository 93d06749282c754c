//! Result export port trait.

use std::path::PathBuf;

use crate::domain::error::RiskoffError;
use crate::domain::evaluation::GroupSummary;
use crate::domain::frame::Frame;
use crate::domain::metrics::Metrics;
use crate::domain::sweep::SweepRow;

/// Writes pipeline outputs as flat tables. Each method returns the path of
/// the artifact it wrote.
pub trait ExportPort {
    fn write_frame(&self, name: &str, frame: &Frame) -> Result<PathBuf, RiskoffError>;

    fn write_evaluation(&self, rows: &[GroupSummary]) -> Result<PathBuf, RiskoffError>;

    fn write_metrics(&self, rows: &[Metrics]) -> Result<PathBuf, RiskoffError>;

    fn write_sweep(&self, rows: &[SweepRow]) -> Result<PathBuf, RiskoffError>;
}
