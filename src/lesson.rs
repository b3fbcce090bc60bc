//! The QC walkthrough: a fixed sequence of charts over one table
//!
//! Each step pairs a view of the table with a `PlotSpec`. Derived columns and
//! filtered views are computed once in `LessonData::prepare` and shared by
//! every step.

use log::info;

use crate::config::PlotConfig;
use crate::error::Result;
use crate::grammar::{
    Aes, BuiltPlot, FacetSpec, Geom, Layer, PlotGenerator, PlotSpec, Position,
};
use crate::table::columns::*;
use crate::table::{QcSchema, QcTable};

/// Bin width used by the fixed-width ion ratio histograms
pub const ION_RATIO_BINWIDTH: f64 = 0.01;

/// Table views shared by the lesson steps
#[derive(Debug, Clone)]
pub struct LessonData {
    /// Loaded table plus `idx` and `positive`
    pub table: QcTable,
    /// Rows with a strictly positive ion ratio
    pub positive: QcTable,
    /// Rows whose sample type is "unknown"
    pub unknowns: QcTable,
    /// Every other row (standards, QCs, blanks, missing sample types)
    pub known: QcTable,
}

impl LessonData {
    /// Validate the schema and derive every view the steps use
    pub fn prepare(table: &QcTable) -> Result<Self> {
        table.validate_schema(&QcSchema::default())?;

        let table = table
            .with_row_index(ROW_INDEX)?
            .with_positive_flag(ION_RATIO, POSITIVE)?;
        let positive = table.filter_positive(ION_RATIO)?;
        let (unknowns, known) = table.partition_by(SAMPLE_TYPE, UNKNOWN_SAMPLE)?;

        info!(
            "Lesson data: {} rows, {} positive, {} unknown, {} known",
            table.height(),
            positive.height(),
            unknowns.height(),
            known.height()
        );

        Ok(LessonData {
            table,
            positive,
            unknowns,
            known,
        })
    }
}

/// One chart of the walkthrough
#[derive(Debug, Clone)]
pub struct ChartStep {
    /// Stable name, used for output file names
    pub name: &'static str,
    pub table: QcTable,
    pub spec: PlotSpec,
}

impl ChartStep {
    fn new(name: &'static str, table: &QcTable, spec: PlotSpec) -> Self {
        ChartStep {
            name,
            table: table.clone(),
            spec,
        }
    }

    pub fn build(&self, config: &PlotConfig) -> Result<BuiltPlot> {
        PlotGenerator::new(&self.table, &self.spec, config).build()
    }
}

/// The walkthrough charts, in order
pub fn steps(data: &LessonData) -> Vec<ChartStep> {
    vec![
        ChartStep::new(
            "ion_ratio_by_index",
            &data.table,
            PlotSpec::new()
                .aes(Aes::new().x(ROW_INDEX).y(ION_RATIO))
                .add_layer(Geom::point())
                .title("Ion ratio by row")
                .x_label("Row")
                .y_label("Ion ratio"),
        ),
        ChartStep::new(
            "ion_ratio_histogram",
            &data.positive,
            PlotSpec::new()
                .aes(Aes::new().x(ION_RATIO))
                .add_layer(Geom::histogram())
                .title("Positive ion ratios")
                .x_label("Ion ratio"),
        ),
        ChartStep::new(
            "ion_ratio_histogram_binwidth",
            &data.positive,
            PlotSpec::new()
                .aes(Aes::new().x(ION_RATIO))
                .add_layer(Geom::histogram_binwidth(ION_RATIO_BINWIDTH))
                .title("Positive ion ratios, bin width 0.01")
                .x_label("Ion ratio"),
        ),
        ChartStep::new(
            "ion_ratio_histogram_by_compound",
            &data.positive,
            PlotSpec::new()
                .aes(Aes::new().x(ION_RATIO))
                .add_layer(Geom::histogram_binwidth(ION_RATIO_BINWIDTH))
                .facet(FacetSpec::wrap(COMPOUND_NAME))
                .title("Positive ion ratios by compound")
                .x_label("Ion ratio"),
        ),
        ChartStep::new(
            "calibration_by_compound",
            &data.known,
            PlotSpec::new()
                .aes(
                    Aes::new()
                        .x(EXPECTED_CONCENTRATION)
                        .y(CONCENTRATION)
                        .color(COMPOUND_NAME),
                )
                .add_layer(Geom::point())
                .add_layer(Geom::smooth_lm())
                .title("Calibration: known samples")
                .x_label("Expected concentration")
                .y_label("Measured concentration")
                .color_title("Compound"),
        ),
        ChartStep::new(
            "ion_ratio_boxplot",
            &data.positive,
            PlotSpec::new()
                .aes(Aes::new().x(COMPOUND_NAME).y(ION_RATIO).fill(SAMPLE_TYPE))
                .add_layer(Geom::boxplot())
                .layer(Layer::new(Geom::point_sized(1.5)).position(Position::jitter(0.2, 0.0)))
                .title("Ion ratio by compound and sample type")
                .y_label("Ion ratio")
                .legend_title("Sample Type")
                .hide_x_tick_labels(),
        ),
        ChartStep::new(
            "ion_ratio_grid",
            &data.table,
            PlotSpec::new()
                .aes(
                    Aes::new()
                        .x(ROW_INDEX)
                        .y(ION_RATIO)
                        .color(POSITIVE)
                        .shape(SAMPLE_TYPE),
                )
                .layer(Layer::new(Geom::point()).position(Position::dodge(0.5)))
                .facet(FacetSpec::grid(SAMPLE_TYPE, COMPOUND_NAME))
                .title("Ion ratio by sample type and compound")
                .x_label("Row")
                .y_label("Ion ratio")
                .color_title("Positive")
                .shape_title("Sample Type"),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::LayerMarks;
    use crate::table::fixtures::small_table;

    fn lesson() -> LessonData {
        LessonData::prepare(&small_table()).unwrap()
    }

    #[test]
    fn test_prepare_views() {
        let data = lesson();
        assert_eq!(data.table.height(), 8);
        assert!(data.table.has_column(ROW_INDEX));
        assert!(data.table.has_column(POSITIVE));
        assert_eq!(data.positive.height(), 6);
        assert_eq!(data.unknowns.height(), 3);
        assert_eq!(data.unknowns.height() + data.known.height(), 8);
        assert_eq!(data.known.height(), 5);
    }

    #[test]
    fn test_prepare_rejects_bad_schema() {
        let csv = "compoundName,ionRatio\nmorphine,0.8\n";
        let table = QcTable::from_csv_bytes(csv.as_bytes().to_vec()).unwrap();
        assert!(LessonData::prepare(&table).is_err());
    }

    #[test]
    fn test_step_order() {
        let names: Vec<&str> = steps(&lesson()).iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                "ion_ratio_by_index",
                "ion_ratio_histogram",
                "ion_ratio_histogram_binwidth",
                "ion_ratio_histogram_by_compound",
                "calibration_by_compound",
                "ion_ratio_boxplot",
                "ion_ratio_grid",
            ]
        );
    }

    #[test]
    fn test_every_step_builds() {
        let config = PlotConfig::default();
        for step in steps(&lesson()) {
            let plot = step.build(&config).unwrap();
            assert!(plot.n_panels() >= 1, "{} has no panels", step.name);
        }
    }

    #[test]
    fn test_compound_facet_has_panel_per_compound() {
        let data = lesson();
        let step = steps(&data)
            .into_iter()
            .find(|s| s.name == "ion_ratio_histogram_by_compound")
            .unwrap();
        let plot = step.build(&PlotConfig::default()).unwrap();
        assert_eq!(plot.n_panels(), 2);
    }

    #[test]
    fn test_calibration_excludes_unknowns() {
        let data = lesson();
        let step = steps(&data)
            .into_iter()
            .find(|s| s.name == "calibration_by_compound")
            .unwrap();
        let plot = step.build(&PlotConfig::default()).unwrap();
        let LayerMarks::Points(points) = &plot.panels[0].layers[0] else {
            panic!("expected points");
        };
        // standard, blank and QC rows; the three unknowns are left out
        assert_eq!(points.len(), 5);
        assert_eq!(
            step.table.distinct(SAMPLE_TYPE).unwrap(),
            vec!["blank", "qc", "standard"]
        );
        assert_eq!(plot.legends[0].title, "Compound");
    }
}
