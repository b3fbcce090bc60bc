//! Declarative plot specification
//!
//! A `PlotSpec` is pure data: it names columns, it does not hold any. It is
//! resolved against a table by `PlotGenerator::build`.

use super::aes::Aes;
use super::facet::{FacetScales, FacetSpec};
use super::geom::{Geom, Layer};
use super::theme::{LegendPosition, Theme};

/// Title and axis/legend titles
///
/// Unset axis and legend titles default to the mapped column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Labels {
    pub title: Option<String>,
    pub x: Option<String>,
    pub y: Option<String>,
    pub color: Option<String>,
    pub fill: Option<String>,
    pub shape: Option<String>,
}

/// Complete description of one plot
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSpec {
    pub aes: Aes,
    pub layers: Vec<Layer>,
    pub facet: FacetSpec,
    pub facet_scales: FacetScales,
    pub labels: Labels,
    /// Theme override; `None` uses the configured theme
    pub theme: Option<Theme>,
    /// Legend position override; `None` uses the configured position
    pub legend_position: Option<LegendPosition>,
    pub hide_x_tick_labels: bool,
    pub hide_y_tick_labels: bool,
}

impl Default for PlotSpec {
    fn default() -> Self {
        Self::new()
    }
}

impl PlotSpec {
    pub fn new() -> Self {
        PlotSpec {
            aes: Aes::new(),
            layers: Vec::new(),
            facet: FacetSpec::None,
            facet_scales: FacetScales::default(),
            labels: Labels::default(),
            theme: None,
            legend_position: None,
            hide_x_tick_labels: false,
            hide_y_tick_labels: false,
        }
    }

    pub fn aes(mut self, aes: Aes) -> Self {
        self.aes = aes;
        self
    }

    /// Add a layer using the plot-level mapping and identity position
    pub fn add_layer(mut self, geom: Geom) -> Self {
        self.layers.push(Layer::new(geom));
        self
    }

    /// Add a fully specified layer
    pub fn layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn facet(mut self, facet: FacetSpec) -> Self {
        self.facet = facet;
        self
    }

    pub fn facet_scales(mut self, scales: FacetScales) -> Self {
        self.facet_scales = scales;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.labels.title = Some(title.into());
        self
    }

    pub fn x_label(mut self, label: impl Into<String>) -> Self {
        self.labels.x = Some(label.into());
        self
    }

    pub fn y_label(mut self, label: impl Into<String>) -> Self {
        self.labels.y = Some(label.into());
        self
    }

    pub fn color_title(mut self, title: impl Into<String>) -> Self {
        self.labels.color = Some(title.into());
        self
    }

    pub fn fill_title(mut self, title: impl Into<String>) -> Self {
        self.labels.fill = Some(title.into());
        self
    }

    pub fn shape_title(mut self, title: impl Into<String>) -> Self {
        self.labels.shape = Some(title.into());
        self
    }

    /// Same title for every legend
    pub fn legend_title(self, title: impl Into<String>) -> Self {
        let title = title.into();
        self.color_title(title.clone())
            .fill_title(title.clone())
            .shape_title(title)
    }

    pub fn hide_x_tick_labels(mut self) -> Self {
        self.hide_x_tick_labels = true;
        self
    }

    pub fn hide_y_tick_labels(mut self) -> Self {
        self.hide_y_tick_labels = true;
        self
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = Some(theme);
        self
    }

    pub fn legend_position(mut self, position: LegendPosition) -> Self {
        self.legend_position = Some(position);
        self
    }

    /// Every column referenced by the mapping, the layers or the facet
    pub fn referenced_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        let mut push = |c: &str| {
            if !columns.iter().any(|x| x == c) {
                columns.push(c.to_string());
            }
        };
        for layer in &self.layers {
            for (_, column) in layer.resolved_aes(&self.aes).mapped() {
                push(column);
            }
        }
        for (_, column) in self.aes.mapped() {
            push(column);
        }
        match &self.facet {
            FacetSpec::None => {}
            FacetSpec::Wrap { column, .. } => push(column),
            FacetSpec::Grid { rows, cols } => {
                for c in rows.iter().chain(cols.iter()) {
                    push(c);
                }
            }
        }
        columns
    }
}
