//! Expected QC table schema
//!
//! The loaded table carries whatever columns the export had; this module
//! checks that the ones the plots rely on are present and well typed.

use super::columns::*;
use super::{ColumnValues, QcTable};
use crate::error::{PlotError, Result};

/// Columns a QC table must carry, split by expected scalar type
#[derive(Debug, Clone)]
pub struct QcSchema {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

impl Default for QcSchema {
    fn default() -> Self {
        QcSchema {
            numeric: vec![
                ION_RATIO.to_string(),
                CONCENTRATION.to_string(),
                EXPECTED_CONCENTRATION.to_string(),
            ],
            categorical: vec![COMPOUND_NAME.to_string(), SAMPLE_TYPE.to_string()],
        }
    }
}

impl QcTable {
    /// Check that every declared column exists with the expected type
    ///
    /// Numeric columns must have a numeric dtype. Categorical columns must be
    /// strings with no missing or empty values.
    pub fn validate_schema(&self, schema: &QcSchema) -> Result<()> {
        for name in &schema.numeric {
            match self.values(name)? {
                ColumnValues::Numeric(_) => {}
                ColumnValues::Discrete(_) => {
                    return Err(PlotError::Schema(format!(
                        "column '{}' should be numeric",
                        name
                    )))
                }
            }
        }

        for name in &schema.categorical {
            match self.values(name)? {
                ColumnValues::Discrete(values) => {
                    if let Some(row) = values
                        .iter()
                        .position(|v| v.as_deref().map_or(true, |s| s.trim().is_empty()))
                    {
                        return Err(PlotError::Schema(format!(
                            "column '{}' has an empty value at row {}",
                            name,
                            row + 1
                        )));
                    }
                }
                ColumnValues::Numeric(_) => {
                    return Err(PlotError::Schema(format!(
                        "column '{}' should be categorical",
                        name
                    )))
                }
            }
        }

        Ok(())
    }
}
