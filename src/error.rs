use thiserror::Error;

/// Errors that can occur while loading tables and building plots
#[derive(Debug, Error)]
pub enum PlotError {
    /// File system error (missing CSV, unwritable output directory, ...)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error raised by polars while reading or transforming a table
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// A mapping referenced a column that is not in the table
    #[error("Column '{column}' not found (available: {})", available.join(", "))]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    /// A geom needs continuous data but the mapped column is discrete
    #[error("Column '{column}' is not numeric (type: {dtype}), required for {role}")]
    NotNumeric {
        column: String,
        dtype: String,
        role: String,
    },

    /// Layers disagree on an axis type, or a geom needs a scale it does not have
    #[error("Scale error: {0}")]
    Scale(String),

    /// Histogram bin width must be a positive finite number
    #[error("Invalid histogram bin width: {0}")]
    InvalidBinWidth(f64),

    /// The loaded table does not satisfy the expected schema
    #[error("Schema error: {0}")]
    Schema(String),

    /// Drawing backend error
    #[error("Render error: {0}")]
    Render(String),

    /// Configuration error (unreadable override file, malformed JSON, ...)
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Type alias for Results using PlotError
pub type Result<T> = std::result::Result<T, PlotError>;
