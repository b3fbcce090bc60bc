//! Shared plot generation pipeline
//!
//! The pipeline:
//! 1. Builds every lesson step and the two quick plots
//! 2. Resolves image dimensions from the facet grid and legend
//! 3. Renders each plot to bytes
//! 4. Writes images and a manifest for output handling

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info};
use serde::Serialize;

use crate::config::PlotConfig;
use crate::error::Result;
use crate::grammar::{BuiltPlot, OutputFormat, PlotRenderer};
use crate::lesson::{steps, LessonData};
use crate::quick::{quick_hist, quick_scatter};
use crate::table::columns::ION_RATIO;

/// A rendered plot
#[derive(Debug, Clone)]
pub struct PlotResult {
    pub name: String,
    pub title: Option<String>,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
}

impl PlotResult {
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.format.ext())
    }
}

/// One line of manifest.json
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ManifestEntry {
    pub name: String,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub width: u32,
    pub height: u32,
}

impl From<&PlotResult> for ManifestEntry {
    fn from(result: &PlotResult) -> Self {
        ManifestEntry {
            name: result.name.clone(),
            file: result.file_name(),
            title: result.title.clone(),
            width: result.width,
            height: result.height,
        }
    }
}

/// Build every plot of the session without rendering
///
/// Lesson steps come first, in order, followed by the quick scatter of all ion
/// ratios and the quick histogram of the positive ones.
pub fn build_plots(data: &LessonData, config: &PlotConfig) -> Result<Vec<(String, BuiltPlot)>> {
    let mut plots = Vec::new();
    for step in steps(data) {
        let t0 = Instant::now();
        let plot = step.build(config)?;
        debug!(
            "Built '{}' ({} panel(s)) in {:.2?}",
            step.name,
            plot.n_panels(),
            t0.elapsed()
        );
        plots.push((step.name.to_string(), plot));
    }

    let all_ratios: Vec<f64> = data.table.numeric(ION_RATIO)?.into_iter().flatten().collect();
    let positive_ratios: Vec<f64> = data
        .positive
        .numeric(ION_RATIO)?
        .into_iter()
        .flatten()
        .collect();

    plots.push((
        "quick_scatter_ion_ratio".to_string(),
        quick_scatter(&all_ratios)?.build(config)?,
    ));
    plots.push((
        "quick_hist_ion_ratio".to_string(),
        quick_hist(&positive_ratios)?.build(config)?,
    ));
    Ok(plots)
}

/// Pixel size of a built plot, with legend space on the side it is drawn
pub fn plot_dimensions(plot: &BuiltPlot, config: &PlotConfig) -> (u32, u32) {
    let legend = plot.has_legend().then_some(plot.legend_position);
    config.resolve_dimensions(plot.n_cols, plot.n_rows, legend)
}

/// Render one built plot at the configured size
pub fn render_plot(name: &str, plot: &BuiltPlot, config: &PlotConfig) -> Result<PlotResult> {
    let (width, height) = plot_dimensions(plot, config);
    let format = config.to_output_format();

    let t0 = Instant::now();
    let bytes = PlotRenderer::new(plot, width, height).render_to_bytes(format)?;
    info!(
        "✓ {} rendered ({}x{}, {} bytes) in {:.2?}",
        name,
        width,
        height,
        bytes.len(),
        t0.elapsed()
    );

    Ok(PlotResult {
        name: name.to_string(),
        title: plot.title.clone(),
        bytes,
        width,
        height,
        format,
    })
}

/// Build and render every plot of the session
pub fn generate_plots(data: &LessonData, config: &PlotConfig) -> Result<Vec<PlotResult>> {
    let t0 = Instant::now();

    info!("[1/2] Building plots...");
    let plots = build_plots(data, config)?;
    info!("  {} plots built in {:.2?}", plots.len(), t0.elapsed());

    info!("[2/2] Rendering plots...");
    let results = plots
        .iter()
        .map(|(name, plot)| render_plot(name, plot, config))
        .collect::<Result<Vec<_>>>()?;
    info!("  Done in {:.2?}", t0.elapsed());

    Ok(results)
}

/// Write every image plus manifest.json into `out_dir`
///
/// Returns the manifest path.
pub fn write_results(results: &[PlotResult], out_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(out_dir)?;
    for result in results {
        std::fs::write(out_dir.join(result.file_name()), &result.bytes)?;
    }

    let manifest: Vec<ManifestEntry> = results.iter().map(ManifestEntry::from).collect();
    let json = serde_json::to_string_pretty(&manifest).map_err(std::io::Error::from)?;
    let manifest_path = out_dir.join("manifest.json");
    std::fs::write(&manifest_path, json)?;
    Ok(manifest_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::render::{LEGEND_HEIGHT, LEGEND_WIDTH};
    use crate::grammar::{Aes, Geom, LayerMarks, LegendPosition, PlotGenerator, PlotSpec};
    use crate::table::fixtures::small_table;
    use crate::table::QcTable;

    /// 100 rows, two compounds; rows 0, 5, 10, ... (40 of them) have a positive ion ratio
    fn hundred_rows() -> QcTable {
        let mut csv = String::from(
            "compoundName,ionRatio,concentration,sampleType,expectedConcentration\n",
        );
        for i in 0..100 {
            let compound = if i % 2 == 0 { "morphine" } else { "oxycodone" };
            let ratio = if i % 5 < 2 {
                0.5 + (i as f64) * 0.0123
            } else {
                -(i as f64) * 0.01
            };
            let sample_type = if i % 4 == 0 { "unknown" } else { "standard" };
            csv.push_str(&format!(
                "{},{},{},{},{}\n",
                compound,
                ratio,
                i as f64 * 0.5,
                sample_type,
                i
            ));
        }
        QcTable::from_csv_bytes(csv.into_bytes()).unwrap()
    }

    #[test]
    fn test_hundred_rows_binwidth_histogram() {
        let data = LessonData::prepare(&hundred_rows()).unwrap();
        assert_eq!(data.positive.height(), 40);

        let plots = build_plots(&data, &PlotConfig::default()).unwrap();
        let (_, plot) = plots
            .iter()
            .find(|(name, _)| name == "ion_ratio_histogram_binwidth")
            .unwrap();
        let LayerMarks::Bars(bars) = &plot.panels[0].layers[0] else {
            panic!("expected bars");
        };

        let total: f64 = bars.iter().map(|b| b.ymax - b.ymin).sum();
        assert_eq!(total, 40.0);
        for bar in bars {
            let k = (bar.xmin / 0.01).round();
            assert!((bar.xmin - k * 0.01).abs() < 1e-9);
        }
        let first = bars.iter().map(|b| b.xmin).fold(f64::INFINITY, f64::min);
        let last = bars.iter().map(|b| b.xmax).fold(f64::NEG_INFINITY, f64::max);
        assert!(first <= 0.5 && last >= 0.5 + 96.0 * 0.0123);
    }

    #[test]
    fn test_two_compounds_two_panels() {
        let data = LessonData::prepare(&hundred_rows()).unwrap();
        let plots = build_plots(&data, &PlotConfig::default()).unwrap();
        let (_, plot) = plots
            .iter()
            .find(|(name, _)| name == "ion_ratio_histogram_by_compound")
            .unwrap();
        assert_eq!(plot.n_panels(), 2);
    }

    #[test]
    fn test_build_plots_includes_quick_plots() {
        let data = LessonData::prepare(&small_table()).unwrap();
        let plots = build_plots(&data, &PlotConfig::default()).unwrap();
        assert_eq!(plots.len(), 9);
        assert_eq!(plots[7].0, "quick_scatter_ion_ratio");
        assert_eq!(plots[7].1.panels[0].layers[0].len(), 8);
        assert_eq!(plots[8].0, "quick_hist_ion_ratio");
    }

    #[test]
    fn test_legend_space_follows_plot_position() {
        let table = small_table();
        let spec = PlotSpec::new()
            .aes(Aes::new().x("concentration").y("ion_ratio").color("compound_name"))
            .add_layer(Geom::point());
        let config = PlotConfig::default();

        let right = PlotGenerator::new(&table, &spec, &config).build().unwrap();
        assert_eq!(plot_dimensions(&right, &config), (700 + LEGEND_WIDTH, 700));

        let bottom_spec = spec.clone().legend_position(LegendPosition::Bottom);
        let bottom = PlotGenerator::new(&table, &bottom_spec, &config).build().unwrap();
        assert_eq!(plot_dimensions(&bottom, &config), (700, 700 + LEGEND_HEIGHT));

        let hidden_spec = spec.legend_position(LegendPosition::None);
        let hidden = PlotGenerator::new(&table, &hidden_spec, &config).build().unwrap();
        assert_eq!(plot_dimensions(&hidden, &config), (700, 700));
    }

    #[test]
    fn test_write_results_manifest() {
        let out_dir = std::env::temp_dir().join(format!("ionplot_out_{}", uuid::Uuid::new_v4()));
        let results = vec![PlotResult {
            name: "ion_ratio_by_index".to_string(),
            title: Some("Ion ratio by row".to_string()),
            bytes: vec![1, 2, 3],
            width: 700,
            height: 700,
            format: OutputFormat::Png,
        }];

        let manifest_path = write_results(&results, &out_dir).unwrap();
        assert_eq!(
            std::fs::read(out_dir.join("ion_ratio_by_index.png")).unwrap(),
            vec![1, 2, 3]
        );
        let manifest: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(manifest_path).unwrap()).unwrap();
        assert_eq!(manifest[0]["file"], "ion_ratio_by_index.png");
        assert_eq!(manifest[0]["width"], 700);

        std::fs::remove_dir_all(&out_dir).unwrap();
    }

    // Needs a system sans-serif font
    #[test]
    #[ignore]
    fn test_generate_plots_renders_everything() {
        let data = LessonData::prepare(&small_table()).unwrap();
        let results = generate_plots(&data, &PlotConfig::default()).unwrap();
        assert_eq!(results.len(), 9);
        assert!(results.iter().all(|r| !r.bytes.is_empty()));
    }
}
