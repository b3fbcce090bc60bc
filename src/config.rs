//! Plot configuration from properties
//!
//! All default values come from plot_properties.json (embedded at compile time)
//! via `PropertyReader`; there are no hardcoded fallbacks in this module.
//!
//! Overrides are read from an optional JSON object such as
//! `{"theme": "bw", "point.size": 2, "plot.width": "1200"}`.

use std::path::Path;

use log::{debug, info};

use crate::error::{PlotError, Result};
use crate::grammar::render::{LEGEND_HEIGHT, LEGEND_WIDTH};
use crate::grammar::{LegendPosition, OutputFormat, Theme};
use crate::properties::{PlotDimension, PropertyReader, PropertyValue};

#[derive(Debug, Clone, PartialEq)]
pub struct PlotConfig {
    /// Theme name: "gray", "bw", "minimal", "classic"
    pub theme: String,

    /// Plot width (pixels or Auto)
    pub plot_width: PlotDimension,

    /// Plot height (pixels or Auto)
    pub plot_height: PlotDimension,

    /// Point radius in pixels for layers without an explicit size
    pub point_size: f64,

    /// Bin count for histograms without an explicit bin width
    pub histogram_bins: usize,

    /// Loess span for smooths without an explicit span
    pub smooth_span: f64,

    /// Legend position: "right", "bottom", "none"
    pub legend_position: String,

    /// Output format: "png" or "svg"
    pub output_format: String,

    /// Seed for jittered positions
    pub jitter_seed: u64,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self::from_properties(&[])
    }
}

impl PlotConfig {
    /// Create config from property overrides
    pub fn from_properties(overrides: &[PropertyValue]) -> Self {
        let props = PropertyReader::new(overrides);

        let plot_width =
            PlotDimension::parse(&props.get_string("plot.width"), PlotDimension::Auto);
        let plot_height =
            PlotDimension::parse(&props.get_string("plot.height"), PlotDimension::Auto);

        Self {
            theme: props.get_enum("theme"),
            plot_width,
            plot_height,
            point_size: props.get_f64_in_range("point.size", 0.5, 50.0),
            histogram_bins: props.get_usize_in_range("histogram.bins", 1, 1000),
            smooth_span: props.get_f64_in_range("smooth.span", 0.05, 10.0),
            legend_position: props.get_enum("legend.position"),
            output_format: props.get_enum("output.format"),
            jitter_seed: props.get_u64("jitter.seed"),
        }
    }

    /// Load overrides from a JSON file; a missing file means defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)?;
        let overrides = overrides_from_json(&json)?;
        info!(
            "Loaded {} property override(s) from {}",
            overrides.len(),
            path.display()
        );
        Ok(Self::from_properties(&overrides))
    }

    /// Resolve plot dimensions to pixels
    ///
    /// `legend` is where the plot draws its legend, `None` when it has none;
    /// legend space is added on that side.
    pub fn resolve_dimensions(
        &self,
        grid_cols: usize,
        grid_rows: usize,
        legend: Option<LegendPosition>,
    ) -> (u32, u32) {
        let (legend_width, legend_height) = match legend {
            Some(LegendPosition::Right) => (LEGEND_WIDTH, 0),
            Some(LegendPosition::Bottom) => (0, LEGEND_HEIGHT),
            Some(LegendPosition::None) | None => (0, 0),
        };

        let width = self.plot_width.resolve(grid_cols);
        let height = self.plot_height.resolve(grid_rows);
        (width + legend_width, height + legend_height)
    }

    pub fn to_legend_position(&self) -> LegendPosition {
        LegendPosition::parse(&self.legend_position)
    }

    /// Matches ggplot2's theme_gray(), theme_bw(), theme_minimal(), theme_classic()
    pub fn to_theme(&self) -> Theme {
        Theme::from_name(&self.theme)
    }

    pub fn to_output_format(&self) -> OutputFormat {
        OutputFormat::parse(&self.output_format)
    }
}

/// Turn a JSON object of property overrides into `PropertyValue`s
///
/// String values are taken as-is; numbers and booleans use their JSON text.
pub fn overrides_from_json(json: &str) -> Result<Vec<PropertyValue>> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| PlotError::Config(format!("Malformed config JSON: {}", e)))?;
    let object = value
        .as_object()
        .ok_or_else(|| PlotError::Config("Config must be a JSON object".to_string()))?;

    let mut overrides: Vec<PropertyValue> = object
        .iter()
        .map(|(name, v)| {
            let value = match v {
                serde_json::Value::String(s) => Ok(s.clone()),
                serde_json::Value::Number(n) => Ok(n.to_string()),
                serde_json::Value::Bool(b) => Ok(b.to_string()),
                other => Err(PlotError::Config(format!(
                    "Property '{}' must be a string, number or boolean, got {}",
                    name, other
                ))),
            }?;
            Ok(PropertyValue {
                name: name.clone(),
                value,
            })
        })
        .collect::<Result<_>>()?;
    overrides.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(overrides)
}
