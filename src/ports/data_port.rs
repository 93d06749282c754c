//! Price data access port trait.

use crate::domain::error::RiskoffError;
use crate::domain::frame::Frame;
use crate::domain::market_query::MarketQuery;
use chrono::NaiveDate;

pub trait DataPort {
    /// Returns a date-indexed frame with an `adj_close` column, oldest row
    /// first, restricted to the query's lookback and sampled at its interval.
    fn fetch_prices(&self, query: &MarketQuery) -> Result<Frame, RiskoffError>;

    fn list_symbols(&self) -> Result<Vec<String>, RiskoffError>;

    /// First date, last date and row count available for `symbol`.
    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, RiskoffError>;
}
