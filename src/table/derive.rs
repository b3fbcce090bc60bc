//! Derived columns and filtered views
//!
//! Every operation here returns a new table; the source table is left as it
//! was loaded.

use super::QcTable;
use crate::error::{PlotError, Result};
use log::debug;
use polars::prelude::*;

impl QcTable {
    /// Add a row index column holding 1, 2, ..., n
    pub fn with_row_index(&self, name: &str) -> Result<Self> {
        let n = self.height() as i64;
        let index: Vec<i64> = (1..=n).collect();

        let mut df = self.inner().clone();
        df.with_column(Series::new(name.into(), index).into_column())?;

        debug!("Added row index '{}' ({} rows)", name, n);
        Ok(QcTable::from_polars(df))
    }

    /// Add a boolean column that is true where `source` is strictly positive
    ///
    /// Missing source values yield a missing flag.
    pub fn with_positive_flag(&self, source: &str, name: &str) -> Result<Self> {
        let values = self.numeric(source)?;
        let flags: Vec<Option<bool>> = values.iter().map(|v| v.map(|x| x > 0.0)).collect();

        let mut df = self.inner().clone();
        df.with_column(Series::new(name.into(), flags).into_column())?;

        debug!("Added positivity flag '{}' from '{}'", name, source);
        Ok(QcTable::from_polars(df))
    }

    /// Keep only rows where `column` is strictly greater than zero
    ///
    /// Rows with a missing or NaN value are dropped.
    pub fn filter_positive(&self, column: &str) -> Result<Self> {
        // Same comparison as `with_positive_flag`; NaN > 0.0 is false
        let mask: BooleanChunked = self
            .numeric(column)?
            .into_iter()
            .map(|v| Some(v.is_some_and(|x| x > 0.0)))
            .collect();
        let filtered = self.inner().filter(&mask)?;

        debug!(
            "Filtered '{}' > 0: {} of {} rows kept",
            column,
            filtered.height(),
            self.height()
        );
        Ok(QcTable::from_polars(filtered))
    }

    /// Split rows into (`column == value`, everything else)
    ///
    /// Rows with a missing value land in the second half, so the two halves
    /// are disjoint and their sizes always sum to the table height.
    pub fn partition_by(&self, column: &str, value: &str) -> Result<(Self, Self)> {
        let series = self.series(column)?;
        if series.dtype() != &DataType::String {
            return Err(PlotError::Schema(format!(
                "cannot partition on '{}': expected a string column, found {}",
                column,
                series.dtype()
            )));
        }

        let mask = col(column).eq(lit(value)).fill_null(lit(false));

        let matching = self
            .inner()
            .clone()
            .lazy()
            .filter(mask.clone())
            .collect()?;
        let rest = self.inner().clone().lazy().filter(mask.not()).collect()?;

        debug!(
            "Partitioned on {} == '{}': {} / {} rows",
            column,
            value,
            matching.height(),
            rest.height()
        );
        Ok((QcTable::from_polars(matching), QcTable::from_polars(rest)))
    }
}
