//! CSV loading
//!
//! Reads a QC export into a polars DataFrame and normalizes its headers.
//! Types are inferred by polars; no schema is imposed at load time.

use super::names::clean_names;
use super::QcTable;
use crate::error::Result;
use log::{debug, info};
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;

/// Load a CSV file into a `QcTable` with snake_case column names
pub fn load_csv(path: impl AsRef<Path>) -> Result<QcTable> {
    let path = path.as_ref();
    info!("Loading CSV {}", path.display());

    // Surface a plain I/O error for missing files instead of a polars one
    std::fs::metadata(path)?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    normalize(df)
}

impl QcTable {
    /// Load CSV data already held in memory
    pub fn from_csv_bytes(csv_data: Vec<u8>) -> Result<Self> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .into_reader_with_file_handle(Cursor::new(csv_data))
            .finish()?;

        normalize(df)
    }
}

fn normalize(mut df: DataFrame) -> Result<QcTable> {
    let raw: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let cleaned = clean_names(&raw);

    for (before, after) in raw.iter().zip(cleaned.iter()) {
        if before != after {
            debug!("Renamed column '{}' -> '{}'", before, after);
        }
    }

    df.set_column_names(cleaned.iter().map(String::as_str))?;

    let table = QcTable::from_polars(df);
    info!("Loaded {}", table.summary());
    Ok(table)
}
