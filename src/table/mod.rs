//! QC table module
//!
//! Holds the in-memory mass-spec QC table and every derivation the plots need.
//! The loaded table is never modified in place: each derivation returns a new
//! `QcTable` sharing the underlying polars buffers.
//!
//! Structure:
//! - `names.rs`: header normalization (lower snake_case)
//! - `loader.rs`: CSV loading
//! - `derive.rs`: derived columns and filtered views
//! - `schema.rs`: expected columns and type checks

pub mod derive;
pub mod loader;
pub mod names;
pub mod schema;

pub use loader::load_csv;
pub use names::{clean_name, clean_names};
pub use schema::QcSchema;

use crate::error::{PlotError, Result};
use polars::prelude::*;

/// Well-known column names after normalization
pub mod columns {
    pub const COMPOUND_NAME: &str = "compound_name";
    pub const ION_RATIO: &str = "ion_ratio";
    pub const CONCENTRATION: &str = "concentration";
    pub const EXPECTED_CONCENTRATION: &str = "expected_concentration";
    pub const SAMPLE_TYPE: &str = "sample_type";
    pub const ROW_INDEX: &str = "idx";
    pub const POSITIVE: &str = "positive";

    /// Sample type label for samples of unknown composition
    pub const UNKNOWN_SAMPLE: &str = "unknown";
}

/// Values of one column, split by whether they are continuous or discrete
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Discrete(Vec<Option<String>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Discrete(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnValues::Numeric(_))
    }

    /// True when the value at `row` is missing
    pub fn is_null(&self, row: usize) -> bool {
        match self {
            ColumnValues::Numeric(v) => v
                .get(row)
                .map_or(true, |x| x.map_or(true, |f| !f.is_finite())),
            ColumnValues::Discrete(v) => v.get(row).map_or(true, Option::is_none),
        }
    }

    /// Value at `row` rendered as a label (numbers use their shortest form)
    pub fn label(&self, row: usize) -> Option<String> {
        match self {
            ColumnValues::Numeric(v) => v.get(row).copied().flatten().map(format_number),
            ColumnValues::Discrete(v) => v.get(row).cloned().flatten(),
        }
    }
}

/// Format a number the way an axis or legend would show it
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let s = format!("{:.4}", value);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Mass-spec QC table backed by a polars DataFrame
#[derive(Debug, Clone)]
pub struct QcTable {
    df: DataFrame,
}

impl QcTable {
    /// Wrap an existing polars DataFrame
    pub fn from_polars(df: DataFrame) -> Self {
        QcTable { df }
    }

    /// Access the underlying polars DataFrame
    pub fn inner(&self) -> &DataFrame {
        &self.df
    }

    /// Number of rows
    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Column names in table order
    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.df.column(name).is_ok()
    }

    /// Look up a column, failing with the list of available names
    pub(crate) fn series(&self, name: &str) -> Result<&Series> {
        self.df
            .column(name)
            .map(|c| c.as_materialized_series())
            .map_err(|_| PlotError::MissingColumn {
                column: name.to_string(),
                available: self.column_names(),
            })
    }

    /// Extract a column as continuous or discrete values depending on its dtype
    ///
    /// Numeric dtypes become `Numeric`; strings, booleans and everything else
    /// become `Discrete`. Booleans are rendered as "TRUE"/"FALSE".
    pub fn values(&self, name: &str) -> Result<ColumnValues> {
        let series = self.series(name)?;
        if is_numeric_dtype(series.dtype()) {
            return Ok(ColumnValues::Numeric(self.numeric(name)?));
        }

        let values = match series.dtype() {
            DataType::String => series
                .str()?
                .into_iter()
                .map(|v| v.map(|s| s.to_string()))
                .collect(),
            DataType::Boolean => series
                .bool()?
                .into_iter()
                .map(|v| v.map(|b| if b { "TRUE" } else { "FALSE" }.to_string()))
                .collect(),
            _ => {
                let cast = series.cast(&DataType::String)?;
                let labels: Vec<Option<String>> = cast
                    .str()?
                    .into_iter()
                    .map(|v| v.map(|s| s.to_string()))
                    .collect();
                labels
            }
        };
        Ok(ColumnValues::Discrete(values))
    }

    /// Extract a numeric column as f64, failing if the column is not numeric
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let series = self.series(name)?;
        if !is_numeric_dtype(series.dtype()) {
            return Err(PlotError::NotNumeric {
                column: name.to_string(),
                dtype: series.dtype().to_string(),
                role: "numeric extraction".to_string(),
            });
        }
        let cast = series.cast(&DataType::Float64)?;
        let values: Vec<Option<f64>> = cast.f64()?.into_iter().collect();
        Ok(values)
    }

    /// Sorted distinct non-null values of a column, as labels
    pub fn distinct(&self, name: &str) -> Result<Vec<String>> {
        let values = self.values(name)?;
        Ok(distinct_levels(&values))
    }

    /// Row count and numeric ranges, for logging
    pub fn summary(&self) -> TableSummary {
        let mut ranges = Vec::new();
        for name in self.column_names() {
            if let Ok(ColumnValues::Numeric(values)) = self.values(&name) {
                let finite: Vec<f64> = values.into_iter().flatten().filter(|v| v.is_finite()).collect();
                if finite.is_empty() {
                    continue;
                }
                let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
                let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                ranges.push((name, min, max));
            }
        }
        TableSummary {
            total_rows: self.height(),
            total_columns: self.df.width(),
            numeric_ranges: ranges,
        }
    }
}

/// Sorted distinct labels; numeric columns sort numerically
pub fn distinct_levels(values: &ColumnValues) -> Vec<String> {
    match values {
        ColumnValues::Numeric(v) => {
            let mut nums: Vec<f64> = v.iter().copied().flatten().filter(|x| x.is_finite()).collect();
            nums.sort_by(|a, b| a.total_cmp(b));
            nums.dedup();
            nums.into_iter().map(format_number).collect()
        }
        ColumnValues::Discrete(v) => {
            let mut levels: Vec<String> = v.iter().flatten().cloned().collect();
            levels.sort();
            levels.dedup();
            levels
        }
    }
}

fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float64
            | DataType::Float32
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Summary statistics for a table
#[derive(Debug, Clone)]
pub struct TableSummary {
    pub total_rows: usize,
    pub total_columns: usize,
    /// (column, min, max) for every numeric column with finite values
    pub numeric_ranges: Vec<(String, f64, f64)>,
}

impl std::fmt::Display for TableSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TableSummary {{ rows: {}, columns: {}",
            self.total_rows, self.total_columns
        )?;
        for (name, min, max) in &self.numeric_ranges {
            write!(f, ", {}: [{:.3}, {:.3}]", name, min, max)?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::QcTable;

    /// Small QC table with two compounds and three sample types
    pub const SMALL_QC_CSV: &str = "\
batchName,sampleName,compoundName,ionRatio,response,concentration,sampleType,expectedConcentration
b1,s1,morphine,0.81,1.2,10.5,standard,10
b1,s2,morphine,0.0,0.0,0.0,blank,0
b1,s3,morphine,0.78,2.4,20.1,qc,20
b1,s4,morphine,0.92,0.9,7.3,unknown,
b1,s5,oxycodone,1.10,1.1,9.8,standard,10
b1,s6,oxycodone,-0.05,0.0,-1.0,unknown,
b1,s7,oxycodone,1.05,3.1,31.2,qc,30
b1,s8,oxycodone,1.21,0.4,4.1,unknown,
";

    pub fn small_table() -> QcTable {
        QcTable::from_csv_bytes(SMALL_QC_CSV.as_bytes().to_vec()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::small_table;
    use super::*;

    #[test]
    fn test_values_numeric_and_discrete() {
        let table = small_table();
        let ion = table.values(columns::ION_RATIO).unwrap();
        assert!(ion.is_numeric());
        assert_eq!(ion.len(), 8);

        let compound = table.values(columns::COMPOUND_NAME).unwrap();
        assert!(!compound.is_numeric());
        assert_eq!(compound.label(0).as_deref(), Some("morphine"));
    }

    #[test]
    fn test_missing_column_lists_available() {
        let table = small_table();
        let err = table.values("ionratio").unwrap_err();
        match err {
            PlotError::MissingColumn { column, available } => {
                assert_eq!(column, "ionratio");
                assert!(available.contains(&"ion_ratio".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_numeric_rejects_strings() {
        let table = small_table();
        assert!(matches!(
            table.numeric(columns::SAMPLE_TYPE),
            Err(PlotError::NotNumeric { .. })
        ));
    }

    #[test]
    fn test_distinct_sorted() {
        let table = small_table();
        assert_eq!(
            table.distinct(columns::SAMPLE_TYPE).unwrap(),
            vec!["blank", "qc", "standard", "unknown"]
        );
        assert_eq!(
            table.distinct(columns::COMPOUND_NAME).unwrap(),
            vec!["morphine", "oxycodone"]
        );
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(10.0), "10");
        assert_eq!(format_number(0.25), "0.25");
        assert_eq!(format_number(1.0 / 3.0), "0.3333");
    }

    #[test]
    fn test_summary_display() {
        let summary = small_table().summary();
        assert_eq!(summary.total_rows, 8);
        let text = summary.to_string();
        assert!(text.contains("rows: 8"));
        assert!(text.contains("ion_ratio"));
    }
}
