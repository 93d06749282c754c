//! Instrument, lookback period and sampling interval of a price request.

use chrono::{Datelike, Days, Months, NaiveDate};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::RiskoffError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Days(u32),
    Weeks(u32),
    Months(u32),
    Years(u32),
    Max,
}

impl Period {
    /// Earliest date (exclusive) still inside the lookback ending at `last`.
    /// `None` means unbounded.
    pub fn cutoff(&self, last: NaiveDate) -> Option<NaiveDate> {
        match *self {
            Period::Days(n) => last.checked_sub_days(Days::new(n as u64)),
            Period::Weeks(n) => last.checked_sub_days(Days::new(7 * n as u64)),
            Period::Months(n) => last.checked_sub_months(Months::new(n)),
            Period::Years(n) => last.checked_sub_months(Months::new(12 * n)),
            Period::Max => None,
        }
    }
}

impl FromStr for Period {
    type Err = RiskoffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if s == "max" {
            return Ok(Period::Max);
        }
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (num, unit) = s.split_at(split);
        let n: u32 = num
            .parse()
            .map_err(|_| RiskoffError::invalid_parameter("period", format!("'{s}' has no count")))?;
        if n == 0 {
            return Err(RiskoffError::invalid_parameter("period", "must be > 0"));
        }
        match unit {
            "d" => Ok(Period::Days(n)),
            "wk" => Ok(Period::Weeks(n)),
            "mo" => Ok(Period::Months(n)),
            "y" => Ok(Period::Years(n)),
            _ => Err(RiskoffError::invalid_parameter(
                "period",
                format!("unknown unit in '{s}' (expected d, wk, mo, y or max)"),
            )),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Days(n) => write!(f, "{}d", n),
            Period::Weeks(n) => write!(f, "{}wk", n),
            Period::Months(n) => write!(f, "{}mo", n),
            Period::Years(n) => write!(f, "{}y", n),
            Period::Max => write!(f, "max"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Daily,
    Weekly,
}

impl Interval {
    /// Bucket key; consecutive rows sharing a key collapse to the last one.
    pub fn bucket(&self, date: NaiveDate) -> (i32, u32) {
        match self {
            Interval::Daily => (date.year(), date.ordinal()),
            Interval::Weekly => {
                let week = date.iso_week();
                (week.year(), week.week())
            }
        }
    }
}

impl FromStr for Interval {
    type Err = RiskoffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1d" => Ok(Interval::Daily),
            "1wk" => Ok(Interval::Weekly),
            other => Err(RiskoffError::invalid_parameter(
                "interval",
                format!("unsupported interval '{other}' (expected 1d or 1wk)"),
            )),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interval::Daily => write!(f, "1d"),
            Interval::Weekly => write!(f, "1wk"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketQuery {
    pub symbol: String,
    pub period: Period,
    pub interval: Interval,
}

impl MarketQuery {
    pub fn new(symbol: &str, period: Period, interval: Interval) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            period,
            interval,
        }
    }
}

impl Default for MarketQuery {
    fn default() -> Self {
        Self::new("SPY", Period::Years(1), Interval::Daily)
    }
}
