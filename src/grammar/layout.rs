//! Plot generation: resolve a `PlotSpec` against a table
//!
//! `PlotGenerator::build` runs the statistical transforms, applies position
//! adjustments, trains scales, splits rows into facet panels and computes the
//! axis ranges of every panel. The result, `BuiltPlot`, holds everything the
//! renderer draws and nothing it has to compute.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::aes::{Aes, Channel};
use super::facet::FacetLayout;
use super::geom::{Geom, Layer, Position, SmoothMethod, LOESS_MAX_POINTS};
use super::palettes::{categorical_color, sequential_color};
use super::scale::{
    discrete_position, discrete_range, expand_continuous, AxisKind, ColorScale, Shape,
};
use super::spec::{Labels, PlotSpec};
use super::stat::{self, Binning, BoxStats, SMOOTH_EVAL_POINTS};
use super::theme::{LegendPosition, Theme};
use crate::config::PlotConfig;
use crate::error::{PlotError, Result};
use crate::table::{distinct_levels, ColumnValues, QcTable};

const DEFAULT_POINT_COLOR: [u8; 3] = [0, 0, 0];
const DEFAULT_BAR_FILL: [u8; 3] = [89, 89, 89];
const DEFAULT_SMOOTH_COLOR: [u8; 3] = [51, 102, 255];
const DEFAULT_BOX_FILL: [u8; 3] = [255, 255, 255];

/// Total width shared by the dodged boxes of one discrete x level
const BOX_DODGE_WIDTH: f64 = 0.75;

/// A drawn point
#[derive(Debug, Clone, PartialEq)]
pub struct PointMark {
    pub x: f64,
    pub y: f64,
    pub color: [u8; 3],
    pub shape: Shape,
    pub size: f64,
}

/// A histogram bar (stacked bars share x bounds)
#[derive(Debug, Clone, PartialEq)]
pub struct BarMark {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    pub fill: [u8; 3],
}

/// A smooth curve
#[derive(Debug, Clone, PartialEq)]
pub struct LineMark {
    pub points: Vec<(f64, f64)>,
    pub color: [u8; 3],
}

/// A box-and-whisker glyph centered at `x`
#[derive(Debug, Clone, PartialEq)]
pub struct BoxMark {
    pub x: f64,
    pub width: f64,
    pub stats: BoxStats,
    pub fill: [u8; 3],
}

/// Marks produced by one layer in one panel
#[derive(Debug, Clone, PartialEq)]
pub enum LayerMarks {
    Points(Vec<PointMark>),
    Bars(Vec<BarMark>),
    Lines(Vec<LineMark>),
    Boxes(Vec<BoxMark>),
}

impl LayerMarks {
    pub fn len(&self) -> usize {
        match self {
            LayerMarks::Points(m) => m.len(),
            LayerMarks::Bars(m) => m.len(),
            LayerMarks::Lines(m) => m.len(),
            LayerMarks::Boxes(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bounding box of the marks in data coordinates
    pub fn extent(&self) -> Option<Extent> {
        let mut extent: Option<Extent> = None;
        let mut include = |x: f64, y: f64| {
            let point = Extent::point(x, y);
            extent = Some(match extent {
                Some(e) => e.merge(point),
                None => point,
            });
        };
        match self {
            LayerMarks::Points(marks) => marks.iter().for_each(|m| include(m.x, m.y)),
            LayerMarks::Bars(marks) => {
                for m in marks {
                    include(m.xmin, m.ymin);
                    include(m.xmax, m.ymax);
                }
            }
            LayerMarks::Lines(marks) => {
                for m in marks {
                    m.points.iter().for_each(|&(x, y)| include(x, y));
                }
            }
            LayerMarks::Boxes(marks) => {
                for m in marks {
                    include(m.x - m.width / 2.0, m.stats.lower_whisker);
                    include(m.x + m.width / 2.0, m.stats.upper_whisker);
                    m.stats.outliers.iter().for_each(|&y| include(m.x, y));
                }
            }
        }
        extent
    }
}

/// Data-space bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Extent {
    fn point(x: f64, y: f64) -> Self {
        Extent {
            x_min: x,
            x_max: x,
            y_min: y,
            y_max: y,
        }
    }

    fn merge(self, other: Extent) -> Self {
        Extent {
            x_min: self.x_min.min(other.x_min),
            x_max: self.x_max.max(other.x_max),
            y_min: self.y_min.min(other.y_min),
            y_max: self.y_max.max(other.y_max),
        }
    }
}

/// One facet panel, ready to draw
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub row: usize,
    pub col: usize,
    /// Strip label; `None` for an unfaceted plot
    pub label: Option<String>,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    /// Marks in layer order
    pub layers: Vec<LayerMarks>,
}

/// Legend content
#[derive(Debug, Clone, PartialEq)]
pub enum LegendKind {
    Colors(Vec<(String, [u8; 3])>),
    Fills(Vec<(String, [u8; 3])>),
    Shapes(Vec<(String, Shape)>),
    Gradient {
        min: f64,
        max: f64,
        low: [u8; 3],
        high: [u8; 3],
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub title: String,
    pub kind: LegendKind,
}

/// A plot with all statistics, positions and scales resolved
#[derive(Debug, Clone)]
pub struct BuiltPlot {
    pub title: Option<String>,
    pub x_label: String,
    pub y_label: String,
    pub n_rows: usize,
    pub n_cols: usize,
    /// Panels in row-major order
    pub panels: Vec<Panel>,
    pub x_axis: AxisKind,
    pub y_axis: AxisKind,
    pub legends: Vec<Legend>,
    pub theme: Theme,
    pub legend_position: LegendPosition,
    pub hide_x_tick_labels: bool,
    pub hide_y_tick_labels: bool,
}

impl BuiltPlot {
    pub fn n_panels(&self) -> usize {
        self.panels.len()
    }

    /// True when a legend will actually be drawn
    pub fn has_legend(&self) -> bool {
        !self.legends.is_empty() && self.legend_position != LegendPosition::None
    }

    pub fn panel(&self, row: usize, col: usize) -> Option<&Panel> {
        self.panels.iter().find(|p| p.row == row && p.col == col)
    }
}

/// A layer with its mapping merged over the plot mapping
struct ResolvedLayer {
    geom: Geom,
    aes: Aes,
    position: Position,
}

impl ResolvedLayer {
    fn new(layer: &Layer, plot_aes: &Aes) -> Self {
        ResolvedLayer {
            geom: layer.geom.clone(),
            aes: layer.resolved_aes(plot_aes),
            position: layer.position,
        }
    }

    /// Channels whose values must be present for a row to be drawn
    fn needed_channels(&self) -> Vec<Channel> {
        self.aes
            .mapped()
            .into_iter()
            .map(|(channel, _)| channel)
            .filter(|c| !(matches!(self.geom, Geom::Histogram { .. }) && *c == Channel::Y))
            .collect()
    }
}

/// Color, fill and shape scales trained on the full table
#[derive(Default)]
struct TrainedScales {
    colors: Vec<(String, ColorScale)>,
    fills: Vec<(String, ColorScale)>,
    shapes: Vec<(String, Vec<String>)>,
}

impl TrainedScales {
    fn train(layers: &[ResolvedLayer], columns: &HashMap<String, ColumnValues>) -> Self {
        let mut scales = TrainedScales::default();
        for layer in layers {
            if let Some((name, values)) = lookup(layer, columns, Channel::Color) {
                if !scales.colors.iter().any(|(n, _)| n == name) {
                    scales.colors.push((name.to_string(), ColorScale::train(values)));
                }
            }
            if let Some((name, values)) = lookup(layer, columns, Channel::Fill) {
                if !scales.fills.iter().any(|(n, _)| n == name) {
                    scales.fills.push((name.to_string(), ColorScale::train(values)));
                }
            }
            if let Some((name, values)) = lookup(layer, columns, Channel::Shape) {
                if !scales.shapes.iter().any(|(n, _)| n == name) {
                    scales.shapes.push((name.to_string(), distinct_levels(values)));
                }
            }
        }
        scales
    }

    fn color(&self, column: Option<&str>) -> Option<&ColorScale> {
        let column = column?;
        self.colors.iter().find(|(n, _)| n == column).map(|(_, s)| s)
    }

    fn fill(&self, column: Option<&str>) -> Option<&ColorScale> {
        let column = column?;
        self.fills.iter().find(|(n, _)| n == column).map(|(_, s)| s)
    }

    fn shape_levels(&self, column: Option<&str>) -> Option<&[String]> {
        let column = column?;
        self.shapes
            .iter()
            .find(|(n, _)| n == column)
            .map(|(_, levels)| levels.as_slice())
    }

    fn legends(&self, labels: &Labels) -> Vec<Legend> {
        let mut legends = Vec::new();
        for (column, scale) in &self.colors {
            let title = labels.color.clone().unwrap_or_else(|| column.clone());
            legends.push(color_legend(title, scale, false));
        }
        for (column, scale) in &self.fills {
            let title = labels.fill.clone().unwrap_or_else(|| column.clone());
            legends.push(color_legend(title, scale, true));
        }
        for (column, levels) in &self.shapes {
            let title = labels.shape.clone().unwrap_or_else(|| column.clone());
            let entries = levels
                .iter()
                .enumerate()
                .map(|(i, level)| (level.clone(), Shape::for_level(i)))
                .collect();
            legends.push(Legend {
                title,
                kind: LegendKind::Shapes(entries),
            });
        }
        legends
    }
}

fn color_legend(title: String, scale: &ColorScale, fill: bool) -> Legend {
    let kind = match scale {
        ColorScale::Discrete { levels } => {
            let entries = levels
                .iter()
                .enumerate()
                .map(|(i, level)| (level.clone(), categorical_color(i)))
                .collect();
            if fill {
                LegendKind::Fills(entries)
            } else {
                LegendKind::Colors(entries)
            }
        }
        ColorScale::Continuous { min, max } => LegendKind::Gradient {
            min: *min,
            max: *max,
            low: sequential_color(0.0),
            high: sequential_color(1.0),
        },
        ColorScale::Constant(rgb) => LegendKind::Colors(vec![(String::new(), *rgb)]),
    };
    Legend { title, kind }
}

fn lookup<'c>(
    layer: &'c ResolvedLayer,
    columns: &'c HashMap<String, ColumnValues>,
    channel: Channel,
) -> Option<(&'c str, &'c ColumnValues)> {
    let name = layer.aes.get(channel)?;
    columns.get(name).map(|values| (name, values))
}

/// Position of `row` on an axis
fn axis_position(values: &ColumnValues, axis: &AxisKind, row: usize) -> Option<f64> {
    match (axis, values) {
        (AxisKind::Discrete(levels), values) => discrete_position(levels, &values.label(row)?),
        (AxisKind::Continuous, ColumnValues::Numeric(v)) => {
            v.get(row).copied().flatten().filter(|x| x.is_finite())
        }
        (AxisKind::Continuous, ColumnValues::Discrete(_)) => None,
    }
}

/// Everything the mark builders need for one layer
struct LayerContext<'c> {
    layer: &'c ResolvedLayer,
    columns: &'c HashMap<String, ColumnValues>,
    scales: &'c TrainedScales,
    x_axis: &'c AxisKind,
    y_axis: &'c AxisKind,
}

impl<'c> LayerContext<'c> {
    fn values(&self, channel: Channel) -> Option<&'c ColumnValues> {
        lookup(self.layer, self.columns, channel).map(|(_, values)| values)
    }

    fn x_at(&self, row: usize) -> Option<f64> {
        axis_position(self.values(Channel::X)?, self.x_axis, row)
    }

    fn y_at(&self, row: usize) -> Option<f64> {
        axis_position(self.values(Channel::Y)?, self.y_axis, row)
    }

    fn color_scale(&self) -> Option<&'c ColorScale> {
        self.scales.color(self.layer.aes.get(Channel::Color))
    }

    fn fill_scale(&self) -> Option<&'c ColorScale> {
        self.scales.fill(self.layer.aes.get(Channel::Fill))
    }

    fn shape_index(&self, row: usize) -> Option<usize> {
        let levels = self.scales.shape_levels(self.layer.aes.get(Channel::Shape))?;
        let label = self.values(Channel::Shape)?.label(row)?;
        levels.iter().position(|l| *l == label)
    }

    /// (color, fill, shape) group of a row, used for dodging
    fn group_key(&self, row: usize) -> (usize, usize, usize) {
        let color = self
            .color_scale()
            .map_or(0, |s| s.group(self.values(Channel::Color), row));
        let fill = self
            .fill_scale()
            .map_or(0, |s| s.group(self.values(Channel::Fill), row));
        (color, fill, self.shape_index(row).unwrap_or(0))
    }
}

/// Resolves a `PlotSpec` against a table into a `BuiltPlot`
pub struct PlotGenerator<'a> {
    table: &'a QcTable,
    spec: &'a PlotSpec,
    config: &'a PlotConfig,
}

impl<'a> PlotGenerator<'a> {
    pub fn new(table: &'a QcTable, spec: &'a PlotSpec, config: &'a PlotConfig) -> Self {
        PlotGenerator {
            table,
            spec,
            config,
        }
    }

    pub fn build(&self) -> Result<BuiltPlot> {
        let columns = self.load_columns()?;
        let facets = self.spec.facet.layout(self.table)?;
        let layers: Vec<ResolvedLayer> = self
            .spec
            .layers
            .iter()
            .map(|l| ResolvedLayer::new(l, &self.spec.aes))
            .collect();

        self.check_required_channels(&layers)?;
        let x_axis = axis_kind(&layers, &columns, Channel::X)?;
        let y_axis = axis_kind(&layers, &columns, Channel::Y)?;
        self.check_geom_data(&layers, &columns, &x_axis)?;

        let scales = TrainedScales::train(&layers, &columns);
        let mut rng = StdRng::seed_from_u64(self.config.jitter_seed);

        let mut marks: Vec<Vec<LayerMarks>> = vec![Vec::new(); facets.n_panels()];
        for layer in &layers {
            let ctx = LayerContext {
                layer,
                columns: &columns,
                scales: &scales,
                x_axis: &x_axis,
                y_axis: &y_axis,
            };
            let rows_by_panel = layer_rows(&ctx, &facets);

            // Fixed x scales share one set of bins across panels
            let shared_edges = match layer.geom {
                Geom::Histogram { .. } if !self.spec.facet_scales.free_x() => {
                    let all: Vec<usize> = rows_by_panel.iter().flatten().copied().collect();
                    Some(self.histogram_edges(&ctx, &all)?)
                }
                _ => None,
            };

            for (panel, rows) in rows_by_panel.iter().enumerate() {
                let layer_marks = match &layer.geom {
                    Geom::Point { size } => LayerMarks::Points(point_marks(
                        &ctx,
                        rows,
                        size.unwrap_or(self.config.point_size),
                        &mut rng,
                    )),
                    Geom::Histogram { .. } => {
                        let edges = match &shared_edges {
                            Some(edges) => edges.clone(),
                            None => self.histogram_edges(&ctx, rows)?,
                        };
                        LayerMarks::Bars(histogram_marks(&ctx, rows, &edges))
                    }
                    Geom::Smooth { method } => LayerMarks::Lines(smooth_marks(
                        &ctx,
                        rows,
                        *method,
                        self.config.smooth_span,
                    )),
                    Geom::Boxplot => LayerMarks::Boxes(box_marks(&ctx, rows)),
                };
                marks[panel].push(layer_marks);
            }
            debug!(
                "Built {} across {} panel(s)",
                layer.geom.name(),
                facets.n_panels()
            );
        }

        let panels = self.panel_ranges(&facets, marks, &x_axis, &y_axis);
        let legends = scales.legends(&self.spec.labels);

        Ok(BuiltPlot {
            title: self.spec.labels.title.clone(),
            x_label: self.axis_label(&layers, Channel::X),
            y_label: self.axis_label(&layers, Channel::Y),
            n_rows: facets.n_rows,
            n_cols: facets.n_cols,
            panels,
            x_axis,
            y_axis,
            legends,
            theme: self
                .spec
                .theme
                .clone()
                .unwrap_or_else(|| self.config.to_theme()),
            legend_position: self
                .spec
                .legend_position
                .unwrap_or_else(|| self.config.to_legend_position()),
            hide_x_tick_labels: self.spec.hide_x_tick_labels,
            hide_y_tick_labels: self.spec.hide_y_tick_labels,
        })
    }

    /// Extract every referenced column once; fails on the first missing one
    fn load_columns(&self) -> Result<HashMap<String, ColumnValues>> {
        let mut columns = HashMap::new();
        for name in self.spec.referenced_columns() {
            let values = self.table.values(&name)?;
            columns.insert(name, values);
        }
        Ok(columns)
    }

    fn check_required_channels(&self, layers: &[ResolvedLayer]) -> Result<()> {
        for layer in layers {
            for channel in layer.geom.required_channels() {
                if layer.aes.get(*channel).is_none() {
                    return Err(PlotError::Scale(format!(
                        "{} requires the '{}' aesthetic",
                        layer.geom.name(),
                        channel
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_geom_data(
        &self,
        layers: &[ResolvedLayer],
        columns: &HashMap<String, ColumnValues>,
        x_axis: &AxisKind,
    ) -> Result<()> {
        for layer in layers {
            let continuous: &[Channel] = match layer.geom {
                Geom::Histogram { .. } => &[Channel::X],
                Geom::Smooth { .. } => &[Channel::X, Channel::Y],
                Geom::Boxplot => &[Channel::Y],
                Geom::Point { .. } => &[],
            };
            for channel in continuous {
                if let Some((name, values)) = lookup(layer, columns, *channel) {
                    if !values.is_numeric() {
                        return Err(self.not_numeric(name, layer, *channel));
                    }
                }
            }
            if matches!(layer.geom, Geom::Boxplot) && !x_axis.is_discrete() {
                return Err(PlotError::Scale(
                    "geom_boxplot requires a discrete x aesthetic".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn not_numeric(&self, column: &str, layer: &ResolvedLayer, channel: Channel) -> PlotError {
        let dtype = self
            .table
            .series(column)
            .map(|s| s.dtype().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        PlotError::NotNumeric {
            column: column.to_string(),
            dtype,
            role: format!("{} {}", layer.geom.name(), channel),
        }
    }

    fn histogram_edges(&self, ctx: &LayerContext<'_>, rows: &[usize]) -> Result<Vec<f64>> {
        let values: Vec<f64> = rows.iter().filter_map(|&r| ctx.x_at(r)).collect();
        let binning = match ctx.layer.geom {
            Geom::Histogram {
                binwidth: Some(w), ..
            } => Binning::Width(w),
            Geom::Histogram { bins: Some(n), .. } => Binning::Count(n),
            _ => Binning::Count(self.config.histogram_bins),
        };
        stat::bin_edges(&values, binning)
    }

    fn panel_ranges(
        &self,
        facets: &FacetLayout,
        marks: Vec<Vec<LayerMarks>>,
        x_axis: &AxisKind,
        y_axis: &AxisKind,
    ) -> Vec<Panel> {
        let extents: Vec<Option<Extent>> = marks
            .iter()
            .map(|layers| layers.iter().filter_map(LayerMarks::extent).reduce(Extent::merge))
            .collect();
        let global = extents.iter().flatten().copied().reduce(Extent::merge);
        let scales = self.spec.facet_scales;

        facets
            .panels
            .iter()
            .zip(marks)
            .zip(extents)
            .map(|((key, layers), extent)| {
                let x_source = if scales.free_x() { extent.or(global) } else { global };
                let y_source = if scales.free_y() { extent.or(global) } else { global };
                Panel {
                    row: key.row,
                    col: key.col,
                    label: key.label.clone(),
                    x_range: axis_range(x_axis, x_source.map(|e| (e.x_min, e.x_max))),
                    y_range: axis_range(y_axis, y_source.map(|e| (e.y_min, e.y_max))),
                    layers,
                }
            })
            .collect()
    }

    fn axis_label(&self, layers: &[ResolvedLayer], channel: Channel) -> String {
        let explicit = match channel {
            Channel::X => &self.spec.labels.x,
            _ => &self.spec.labels.y,
        };
        if let Some(label) = explicit {
            return label.clone();
        }
        let all_histograms =
            !layers.is_empty() && layers.iter().all(|l| matches!(l.geom, Geom::Histogram { .. }));
        if channel == Channel::Y && all_histograms {
            return "count".to_string();
        }
        self.spec
            .aes
            .get(channel)
            .or_else(|| layers.iter().find_map(|l| l.aes.get(channel)))
            .unwrap_or_default()
            .to_string()
    }
}

fn axis_range(axis: &AxisKind, data: Option<(f64, f64)>) -> (f64, f64) {
    match axis {
        AxisKind::Discrete(levels) => discrete_range(levels.len()),
        AxisKind::Continuous => {
            let (min, max) = data.unwrap_or((0.0, 1.0));
            expand_continuous(min, max)
        }
    }
}

/// Continuous or discrete, agreed across layers
fn axis_kind(
    layers: &[ResolvedLayer],
    columns: &HashMap<String, ColumnValues>,
    channel: Channel,
) -> Result<AxisKind> {
    let mut kind: Option<AxisKind> = None;
    for layer in layers {
        if channel == Channel::Y && matches!(layer.geom, Geom::Histogram { .. }) {
            continue;
        }
        let Some((name, values)) = lookup(layer, columns, channel) else {
            continue;
        };
        let layer_kind = if values.is_numeric() {
            AxisKind::Continuous
        } else {
            AxisKind::Discrete(distinct_levels(values))
        };
        kind = Some(match (kind, layer_kind) {
            (None, k) => k,
            (Some(AxisKind::Continuous), AxisKind::Continuous) => AxisKind::Continuous,
            (Some(AxisKind::Discrete(mut a)), AxisKind::Discrete(b)) => {
                a.extend(b);
                a.sort();
                a.dedup();
                AxisKind::Discrete(a)
            }
            _ => {
                return Err(PlotError::Scale(format!(
                    "{} axis mixes discrete and continuous data (column '{}' in {})",
                    channel,
                    name,
                    layer.geom.name()
                )))
            }
        });
    }
    Ok(kind.unwrap_or(AxisKind::Continuous))
}

/// Rows of each panel that have every aesthetic the layer needs
fn layer_rows(ctx: &LayerContext<'_>, facets: &FacetLayout) -> Vec<Vec<usize>> {
    let needed: Vec<&ColumnValues> = ctx
        .layer
        .needed_channels()
        .into_iter()
        .filter_map(|c| ctx.values(c))
        .collect();

    let mut rows_by_panel = vec![Vec::new(); facets.n_panels()];
    let mut missing = 0usize;
    let mut unfaceted = 0usize;

    for (row, panel) in facets.assignment.iter().enumerate() {
        let Some(panel) = panel else {
            unfaceted += 1;
            continue;
        };
        if needed.iter().any(|values| values.is_null(row)) {
            missing += 1;
            continue;
        }
        rows_by_panel[*panel].push(row);
    }

    if missing > 0 {
        warn!(
            "{}: removed {} rows containing missing values",
            ctx.layer.geom.name(),
            missing
        );
    }
    if unfaceted > 0 {
        warn!(
            "{}: removed {} rows with a missing facet value",
            ctx.layer.geom.name(),
            unfaceted
        );
    }
    rows_by_panel
}

fn point_marks(
    ctx: &LayerContext<'_>,
    rows: &[usize],
    size: f64,
    rng: &mut StdRng,
) -> Vec<PointMark> {
    let color_scale = ctx.color_scale();
    let color_values = ctx.values(Channel::Color);
    let dodge_groups: Vec<(usize, usize, usize)> = match ctx.layer.position {
        Position::Dodge { .. } => rows
            .iter()
            .map(|&r| ctx.group_key(r))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
        _ => Vec::new(),
    };

    rows.iter()
        .filter_map(|&row| {
            let mut x = ctx.x_at(row)?;
            let mut y = ctx.y_at(row)?;
            match ctx.layer.position {
                Position::Identity => {}
                Position::Jitter { width, height } => {
                    if width > 0.0 {
                        x += rng.gen_range(-width..=width);
                    }
                    if height > 0.0 {
                        y += rng.gen_range(-height..=height);
                    }
                }
                Position::Dodge { width } => {
                    let n = dodge_groups.len();
                    if n > 1 {
                        let key = ctx.group_key(row);
                        let g = dodge_groups.iter().position(|k| *k == key).unwrap_or(0);
                        x += width * ((g as f64 + 0.5) / n as f64 - 0.5);
                    }
                }
            }
            let color = color_scale
                .and_then(|s| s.map(color_values, row))
                .unwrap_or(DEFAULT_POINT_COLOR);
            let shape = ctx.shape_index(row).map(Shape::for_level).unwrap_or_default();
            Some(PointMark {
                x,
                y,
                color,
                shape,
                size,
            })
        })
        .collect()
}

/// Stacked histogram bars, one stack segment per fill level
fn histogram_marks(ctx: &LayerContext<'_>, rows: &[usize], edges: &[f64]) -> Vec<BarMark> {
    let fill = ctx.fill_scale();
    let fill_values = ctx.values(Channel::Fill);
    let discrete_fill = matches!(fill, Some(ColorScale::Discrete { .. }));
    let n_groups = if discrete_fill {
        fill.map_or(1, ColorScale::n_groups)
    } else {
        1
    };

    let mut per_group: Vec<Vec<f64>> = vec![Vec::new(); n_groups];
    for &row in rows {
        let Some(x) = ctx.x_at(row) else { continue };
        let g = if discrete_fill {
            fill.map_or(0, |s| s.group(fill_values, row))
        } else {
            0
        };
        per_group[g].push(x);
    }

    let mut heights = vec![0.0; edges.len().saturating_sub(1)];
    let mut bars = Vec::new();
    for (g, values) in per_group.iter().enumerate() {
        if values.is_empty() {
            continue;
        }
        let color = if discrete_fill {
            categorical_color(g)
        } else {
            DEFAULT_BAR_FILL
        };
        for (i, bin) in stat::histogram(values, edges).into_iter().enumerate() {
            if bin.count == 0 {
                continue;
            }
            let ymin = heights[i];
            let ymax = ymin + bin.count as f64;
            heights[i] = ymax;
            bars.push(BarMark {
                xmin: bin.xmin,
                xmax: bin.xmax,
                ymin,
                ymax,
                fill: color,
            });
        }
    }
    bars
}

/// One fitted curve per color group
fn smooth_marks(
    ctx: &LayerContext<'_>,
    rows: &[usize],
    method: SmoothMethod,
    default_span: f64,
) -> Vec<LineMark> {
    let color_scale = ctx.color_scale();
    let color_values = ctx.values(Channel::Color);
    let discrete_color = matches!(color_scale, Some(ColorScale::Discrete { .. }));
    let n_groups = color_scale.map_or(1, ColorScale::n_groups);

    let mut xs: Vec<Vec<f64>> = vec![Vec::new(); n_groups];
    let mut ys: Vec<Vec<f64>> = vec![Vec::new(); n_groups];
    for &row in rows {
        let (Some(x), Some(y)) = (ctx.x_at(row), ctx.y_at(row)) else {
            continue;
        };
        let g = color_scale.map_or(0, |s| s.group(color_values, row));
        xs[g].push(x);
        ys[g].push(y);
    }

    (0..n_groups)
        .filter_map(|g| {
            let (gx, gy) = (&xs[g], &ys[g]);
            if gx.len() < 2 {
                return None;
            }
            let curve = match method {
                SmoothMethod::Linear => stat::linear_curve(gx, gy, SMOOTH_EVAL_POINTS),
                SmoothMethod::Loess { span } => {
                    stat::loess_curve(gx, gy, span.unwrap_or(default_span), SMOOTH_EVAL_POINTS)
                }
                SmoothMethod::Auto if gx.len() < LOESS_MAX_POINTS => {
                    debug!("geom_smooth: using method = 'loess' for {} points", gx.len());
                    stat::loess_curve(gx, gy, default_span, SMOOTH_EVAL_POINTS)
                }
                SmoothMethod::Auto => {
                    debug!("geom_smooth: using method = 'lm' for {} points", gx.len());
                    stat::linear_curve(gx, gy, SMOOTH_EVAL_POINTS)
                }
            };
            if curve.is_empty() {
                return None;
            }
            let color = if discrete_color {
                categorical_color(g)
            } else {
                DEFAULT_SMOOTH_COLOR
            };
            Some(LineMark {
                points: curve,
                color,
            })
        })
        .collect()
}

/// Boxes per discrete x level, dodged by fill level
fn box_marks(ctx: &LayerContext<'_>, rows: &[usize]) -> Vec<BoxMark> {
    let fill = ctx.fill_scale();
    let fill_values = ctx.values(Channel::Fill);
    let discrete_fill = matches!(fill, Some(ColorScale::Discrete { .. }));

    let mut groups: BTreeMap<(usize, usize), Vec<f64>> = BTreeMap::new();
    for &row in rows {
        let (Some(x), Some(y)) = (ctx.x_at(row), ctx.y_at(row)) else {
            continue;
        };
        let g = if discrete_fill {
            fill.map_or(0, |s| s.group(fill_values, row))
        } else {
            0
        };
        groups.entry((x.round() as usize, g)).or_default().push(y);
    }

    let levels: BTreeSet<usize> = groups.keys().map(|(level, _)| *level).collect();
    let mut marks = Vec::new();
    for level in levels {
        let present: Vec<(&(usize, usize), &Vec<f64>)> =
            groups.range((level, 0)..=(level, usize::MAX)).collect();
        let width = BOX_DODGE_WIDTH / present.len() as f64;
        for (i, ((_, g), ys)) in present.into_iter().enumerate() {
            let Some(stats) = stat::box_stats(ys) else {
                continue;
            };
            let center = level as f64 - BOX_DODGE_WIDTH / 2.0 + width * (i as f64 + 0.5);
            marks.push(BoxMark {
                x: center,
                width: width * 0.9,
                stats,
                fill: if discrete_fill {
                    categorical_color(*g)
                } else {
                    DEFAULT_BOX_FILL
                },
            });
        }
    }
    marks
}
