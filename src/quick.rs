//! Quick plots: one-shot charts of a plain vector
//!
//! These are the base-graphics style shortcuts (`plot(x)`, `hist(x)`). They
//! still go through the grammar: each wraps the vector in a small table and a
//! fixed `PlotSpec`.

use polars::prelude::*;

use crate::config::PlotConfig;
use crate::error::Result;
use crate::grammar::{Aes, BuiltPlot, Geom, PlotGenerator, PlotSpec};
use crate::table::QcTable;

const INDEX_COLUMN: &str = "index";
const VALUE_COLUMN: &str = "value";

/// A vector plot ready to build
#[derive(Debug, Clone)]
pub struct QuickPlot {
    pub table: QcTable,
    pub spec: PlotSpec,
}

impl QuickPlot {
    pub fn build(&self, config: &PlotConfig) -> Result<BuiltPlot> {
        PlotGenerator::new(&self.table, &self.spec, config).build()
    }
}

fn vector_table(values: &[f64]) -> Result<QcTable> {
    let index: Vec<i64> = (1..=values.len() as i64).collect();
    let df = DataFrame::new(vec![
        Series::new(INDEX_COLUMN.into(), index).into_column(),
        Series::new(VALUE_COLUMN.into(), values.to_vec()).into_column(),
    ])?;
    Ok(QcTable::from_polars(df))
}

/// Points of each value against its 1-based position
pub fn quick_scatter(values: &[f64]) -> Result<QuickPlot> {
    let spec = PlotSpec::new()
        .aes(Aes::new().x(INDEX_COLUMN).y(VALUE_COLUMN))
        .add_layer(Geom::point())
        .x_label("Index")
        .y_label(VALUE_COLUMN);
    Ok(QuickPlot {
        table: vector_table(values)?,
        spec,
    })
}

/// Histogram of the values with the automatic bin count
pub fn quick_hist(values: &[f64]) -> Result<QuickPlot> {
    let spec = PlotSpec::new()
        .aes(Aes::new().x(VALUE_COLUMN))
        .add_layer(Geom::histogram())
        .title(format!("Histogram of {}", VALUE_COLUMN))
        .x_label(VALUE_COLUMN)
        .y_label("Frequency");
    Ok(QuickPlot {
        table: vector_table(values)?,
        spec,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::LayerMarks;

    #[test]
    fn test_quick_scatter_uses_index() {
        let plot = quick_scatter(&[0.5, 0.9, 1.2])
            .unwrap()
            .build(&PlotConfig::default())
            .unwrap();

        let LayerMarks::Points(points) = &plot.panels[0].layers[0] else {
            panic!("expected points");
        };
        let xy: Vec<(f64, f64)> = points.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(xy, vec![(1.0, 0.5), (2.0, 0.9), (3.0, 1.2)]);
        assert_eq!(plot.x_label, "Index");
        assert_eq!(plot.y_label, "value");
    }

    #[test]
    fn test_quick_hist_default_bins() {
        let values: Vec<f64> = (0..100).map(|i| i as f64 / 10.0).collect();
        let plot = quick_hist(&values)
            .unwrap()
            .build(&PlotConfig::default())
            .unwrap();

        let LayerMarks::Bars(bars) = &plot.panels[0].layers[0] else {
            panic!("expected bars");
        };
        let total: f64 = bars.iter().map(|b| b.ymax - b.ymin).sum();
        assert_eq!(total, 100.0);
        assert!(bars.len() <= 30);
        assert_eq!(plot.y_label, "Frequency");
    }

    #[test]
    fn test_quick_scatter_skips_nan() {
        let plot = quick_scatter(&[1.0, f64::NAN, 3.0])
            .unwrap()
            .build(&PlotConfig::default())
            .unwrap();
        assert_eq!(plot.panels[0].layers[0].len(), 2);
    }
}
