//! Facet specification and panel layout
//!
//! A facet splits one plot into a grid of sub-plots, one per distinct value
//! of a categorical column (wrap) or per pair of values of two columns (grid).

use crate::error::Result;
use crate::table::{distinct_levels, ColumnValues, QcTable};

/// How to partition the plot into panels
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FacetSpec {
    #[default]
    None,
    /// One panel per value of `column`, wrapped into a near-square grid
    Wrap {
        column: String,
        ncol: Option<usize>,
    },
    /// Rows keyed by `rows`, columns keyed by `cols`
    Grid {
        rows: Option<String>,
        cols: Option<String>,
    },
}

/// Whether panels share axis ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacetScales {
    Fixed,
    /// Each panel scales x and y independently
    #[default]
    Free,
    FreeX,
    FreeY,
}

impl FacetScales {
    pub fn free_x(&self) -> bool {
        matches!(self, FacetScales::Free | FacetScales::FreeX)
    }

    pub fn free_y(&self) -> bool {
        matches!(self, FacetScales::Free | FacetScales::FreeY)
    }
}

impl FacetSpec {
    pub fn none() -> Self {
        FacetSpec::None
    }

    pub fn wrap(column: impl Into<String>) -> Self {
        FacetSpec::Wrap {
            column: column.into(),
            ncol: None,
        }
    }

    pub fn wrap_ncol(column: impl Into<String>, ncol: usize) -> Self {
        FacetSpec::Wrap {
            column: column.into(),
            ncol: Some(ncol.max(1)),
        }
    }

    /// `rows ~ cols` grid
    pub fn grid(rows: impl Into<String>, cols: impl Into<String>) -> Self {
        FacetSpec::Grid {
            rows: Some(rows.into()),
            cols: Some(cols.into()),
        }
    }

    /// `. ~ cols` grid: a single row of panels
    pub fn grid_cols(cols: impl Into<String>) -> Self {
        FacetSpec::Grid {
            rows: None,
            cols: Some(cols.into()),
        }
    }

    /// `rows ~ .` grid: a single column of panels
    pub fn grid_rows(rows: impl Into<String>) -> Self {
        FacetSpec::Grid {
            rows: Some(rows.into()),
            cols: None,
        }
    }

    pub fn has_faceting(&self) -> bool {
        !matches!(self, FacetSpec::None | FacetSpec::Grid { rows: None, cols: None })
    }

    /// Compute the panel layout and the panel each table row falls in
    ///
    /// Rows whose facet value is missing are assigned to no panel.
    pub fn layout(&self, table: &QcTable) -> Result<FacetLayout> {
        let n = table.height();
        match self {
            FacetSpec::None | FacetSpec::Grid { rows: None, cols: None } => Ok(FacetLayout {
                n_rows: 1,
                n_cols: 1,
                panels: vec![PanelKey {
                    row: 0,
                    col: 0,
                    label: None,
                }],
                assignment: vec![Some(0); n],
            }),
            FacetSpec::Wrap { column, ncol } => {
                let values = table.values(column)?;
                let levels = distinct_levels(&values);
                let count = levels.len().max(1);
                let n_cols = ncol
                    .unwrap_or_else(|| (count as f64).sqrt().ceil() as usize)
                    .clamp(1, count);
                let n_rows = count.div_ceil(n_cols);

                let panels = levels
                    .iter()
                    .enumerate()
                    .map(|(i, level)| PanelKey {
                        row: i / n_cols,
                        col: i % n_cols,
                        label: Some(level.clone()),
                    })
                    .collect();

                let assignment = (0..n)
                    .map(|row| level_index(&values, row, &levels))
                    .collect();

                Ok(FacetLayout {
                    n_rows,
                    n_cols,
                    panels,
                    assignment,
                })
            }
            FacetSpec::Grid { rows, cols } => {
                let row_values = rows.as_deref().map(|c| table.values(c)).transpose()?;
                let col_values = cols.as_deref().map(|c| table.values(c)).transpose()?;

                let row_levels = row_values.as_ref().map(distinct_levels).unwrap_or_default();
                let col_levels = col_values.as_ref().map(distinct_levels).unwrap_or_default();
                let n_rows = row_levels.len().max(1);
                let n_cols = col_levels.len().max(1);

                let mut panels = Vec::with_capacity(n_rows * n_cols);
                for r in 0..n_rows {
                    for c in 0..n_cols {
                        let label = match (row_levels.get(r), col_levels.get(c)) {
                            (Some(rl), Some(cl)) => Some(format!("{} | {}", rl, cl)),
                            (Some(rl), None) => Some(rl.clone()),
                            (None, Some(cl)) => Some(cl.clone()),
                            (None, None) => None,
                        };
                        panels.push(PanelKey { row: r, col: c, label });
                    }
                }

                let assignment = (0..n)
                    .map(|row| {
                        let r = match &row_values {
                            Some(values) => level_index(values, row, &row_levels)?,
                            None => 0,
                        };
                        let c = match &col_values {
                            Some(values) => level_index(values, row, &col_levels)?,
                            None => 0,
                        };
                        Some(r * n_cols + c)
                    })
                    .collect();

                Ok(FacetLayout {
                    n_rows,
                    n_cols,
                    panels,
                    assignment,
                })
            }
        }
    }
}

fn level_index(values: &ColumnValues, row: usize, levels: &[String]) -> Option<usize> {
    let label = values.label(row)?;
    levels.iter().position(|l| *l == label)
}

/// Position and strip label of one panel
#[derive(Debug, Clone, PartialEq)]
pub struct PanelKey {
    pub row: usize,
    pub col: usize,
    pub label: Option<String>,
}

/// Panels of a faceted plot plus the row-to-panel assignment
#[derive(Debug, Clone)]
pub struct FacetLayout {
    pub n_rows: usize,
    pub n_cols: usize,
    /// Panels in row-major order
    pub panels: Vec<PanelKey>,
    /// Panel index for every table row (`None` when the facet value is missing)
    pub assignment: Vec<Option<usize>>,
}

impl FacetLayout {
    pub fn n_panels(&self) -> usize {
        self.panels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::fixtures::small_table;

    #[test]
    fn test_no_facet_is_single_panel() {
        let table = small_table();
        let layout = FacetSpec::none().layout(&table).unwrap();
        assert_eq!(layout.n_panels(), 1);
        assert!(layout.assignment.iter().all(|a| *a == Some(0)));
    }

    #[test]
    fn test_wrap_one_panel_per_compound() {
        let table = small_table();
        let layout = FacetSpec::wrap("compound_name").layout(&table).unwrap();
        assert_eq!(layout.n_panels(), table.distinct("compound_name").unwrap().len());
        assert_eq!(layout.n_panels(), 2);
        assert_eq!(layout.panels[0].label.as_deref(), Some("morphine"));
        assert_eq!(layout.panels[1].label.as_deref(), Some("oxycodone"));
        assert_eq!(layout.assignment[0], Some(0));
        assert_eq!(layout.assignment[4], Some(1));
    }

    #[test]
    fn test_wrap_is_near_square() {
        let csv = "g,v\na,1\nb,2\nc,3\nd,4\ne,5\n";
        let table = QcTable::from_csv_bytes(csv.as_bytes().to_vec()).unwrap();
        let layout = FacetSpec::wrap("g").layout(&table).unwrap();
        assert_eq!((layout.n_rows, layout.n_cols), (2, 3));
        assert_eq!(layout.panels[4].row, 1);
        assert_eq!(layout.panels[4].col, 1);

        let layout = FacetSpec::wrap_ncol("g", 1).layout(&table).unwrap();
        assert_eq!((layout.n_rows, layout.n_cols), (5, 1));
    }

    #[test]
    fn test_grid_is_product_of_levels() {
        let table = small_table();
        let layout = FacetSpec::grid("sample_type", "compound_name")
            .layout(&table)
            .unwrap();
        assert_eq!(layout.n_rows, 4);
        assert_eq!(layout.n_cols, 2);
        assert_eq!(layout.n_panels(), 8);
        // Row 0 of the table: morphine / standard -> row "standard" (index 2), col 0
        assert_eq!(layout.assignment[0], Some(2 * 2));
        assert_eq!(layout.panels[4].label.as_deref(), Some("standard | morphine"));
    }

    #[test]
    fn test_grid_single_side() {
        let table = small_table();
        let layout = FacetSpec::grid_cols("compound_name").layout(&table).unwrap();
        assert_eq!((layout.n_rows, layout.n_cols), (1, 2));
        let layout = FacetSpec::grid_rows("compound_name").layout(&table).unwrap();
        assert_eq!((layout.n_rows, layout.n_cols), (2, 1));
    }

    #[test]
    fn test_missing_facet_column() {
        let table = small_table();
        assert!(FacetSpec::wrap("instrument").layout(&table).is_err());
    }
}
