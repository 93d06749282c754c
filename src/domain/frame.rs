//! Date-indexed columnar table shared by every pipeline stage.
//!
//! A `Frame` owns a strictly increasing date index and an ordered list of
//! named columns of the same length. `None` marks an undefined cell (warm-up
//! periods, look-ahead tails, gaps in the source data).

use chrono::NaiveDate;

use crate::domain::error::RiskoffError;

pub const PRICE_COL: &str = "adj_close";

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Float(Vec<Option<f64>>),
    Flag(Vec<Option<bool>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Float(v) => v.len(),
            Column::Flag(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Renders one cell for delimited-text export. Undefined cells are empty.
    pub fn cell(&self, row: usize) -> String {
        match self {
            Column::Float(v) => v[row].map(|x| x.to_string()).unwrap_or_default(),
            Column::Flag(v) => v[row].map(|b| b.to_string()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    index: Vec<NaiveDate>,
    columns: Vec<(String, Column)>,
}

impl Frame {
    pub fn new(index: Vec<NaiveDate>) -> Result<Self, RiskoffError> {
        if let Some(pair) = index.windows(2).find(|w| w[0] >= w[1]) {
            return Err(RiskoffError::Schema {
                reason: format!(
                    "index must be strictly increasing ({} followed by {})",
                    pair[0], pair[1]
                ),
            });
        }
        Ok(Self {
            index,
            columns: Vec::new(),
        })
    }

    /// Builds a price frame with a single defined `adj_close` column.
    pub fn from_prices(index: Vec<NaiveDate>, prices: Vec<f64>) -> Result<Self, RiskoffError> {
        Self::new(index)?.with_column(
            PRICE_COL,
            Column::Float(prices.into_iter().map(Some).collect()),
        )
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn columns(&self) -> &[(String, Column)] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }

    /// Returns a new frame with `column` appended, or replacing a column of
    /// the same name in place.
    pub fn with_column(mut self, name: &str, column: Column) -> Result<Self, RiskoffError> {
        if column.len() != self.index.len() {
            return Err(RiskoffError::Schema {
                reason: format!(
                    "column '{}' has {} rows, index has {}",
                    name,
                    column.len(),
                    self.index.len()
                ),
            });
        }
        match self.columns.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = column,
            None => self.columns.push((name.to_string(), column)),
        }
        Ok(self)
    }

    pub fn float(&self, name: &str) -> Result<&[Option<f64>], RiskoffError> {
        match self.column(name) {
            Some(Column::Float(v)) => Ok(v),
            _ => Err(RiskoffError::missing_column(name)),
        }
    }

    pub fn flag(&self, name: &str) -> Result<&[Option<bool>], RiskoffError> {
        match self.column(name) {
            Some(Column::Flag(v)) => Ok(v),
            _ => Err(RiskoffError::missing_column(name)),
        }
    }

    /// Keeps only the rows whose positions satisfy `keep`.
    pub fn filter_rows<F>(&self, keep: F) -> Self
    where
        F: Fn(usize, NaiveDate) -> bool,
    {
        let rows: Vec<usize> = (0..self.len())
            .filter(|&i| keep(i, self.index[i]))
            .collect();
        let index = rows.iter().map(|&i| self.index[i]).collect();
        let columns = self
            .columns
            .iter()
            .map(|(name, col)| {
                let col = match col {
                    Column::Float(v) => Column::Float(rows.iter().map(|&i| v[i]).collect()),
                    Column::Flag(v) => Column::Flag(rows.iter().map(|&i| v[i]).collect()),
                };
                (name.clone(), col)
            })
            .collect();
        Self { index, columns }
    }
}
