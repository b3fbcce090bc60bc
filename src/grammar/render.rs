//! Drawing a `BuiltPlot` with plotters
//!
//! The same generic drawing code serves the PNG (bitmap) and SVG backends.

use std::error::Error;
use std::path::Path;

use log::debug;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::prelude::*;

use super::layout::{BoxMark, BuiltPlot, LayerMarks, Legend, LegendKind, Panel, PointMark};
use super::scale::{AxisKind, Shape};
use super::theme::{LegendPosition, Theme};
use crate::error::{PlotError, Result};

/// Pixels reserved for a legend on the right
pub const LEGEND_WIDTH: u32 = 150;
/// Pixels reserved for a legend below the panels
pub const LEGEND_HEIGHT: u32 = 100;

const FONT: &str = "sans-serif";
const LEGEND_ROW: i32 = 20;

/// Image encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Png,
    Svg,
}

impl OutputFormat {
    /// Parse from a validated property value ("png", "svg")
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "svg" => OutputFormat::Svg,
            _ => OutputFormat::Png,
        }
    }

    /// File extension without the dot
    pub fn ext(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }
}

/// Renders a built plot to an image of fixed pixel size
pub struct PlotRenderer<'a> {
    plot: &'a BuiltPlot,
    width: u32,
    height: u32,
}

impl<'a> PlotRenderer<'a> {
    pub fn new(plot: &'a BuiltPlot, width: u32, height: u32) -> Self {
        PlotRenderer {
            plot,
            width,
            height,
        }
    }

    pub fn render_to_file(&self, path: &Path, format: OutputFormat) -> Result<()> {
        debug!(
            "Rendering {}x{} {} to {}",
            self.width,
            self.height,
            format.ext(),
            path.display()
        );
        let size = (self.width, self.height);
        let drawn = match format {
            OutputFormat::Png => draw_plot(BitMapBackend::new(path, size).into_drawing_area(), self.plot),
            OutputFormat::Svg => draw_plot(SVGBackend::new(path, size).into_drawing_area(), self.plot),
        };
        drawn.map_err(|e| PlotError::Render(e.to_string()))
    }

    /// Render to a uniquely named temporary file and return its contents
    pub fn render_to_bytes(&self, format: OutputFormat) -> Result<Vec<u8>> {
        let temp_path = std::env::temp_dir().join(format!(
            "ionplot_{}.{}",
            uuid::Uuid::new_v4(),
            format.ext()
        ));
        let rendered = self.render_to_file(&temp_path, format);
        take_temp_file(&temp_path, rendered)
    }
}

/// Read a rendered temp file, removing it whether or not rendering succeeded
fn take_temp_file(path: &Path, rendered: Result<()>) -> Result<Vec<u8>> {
    let bytes = rendered.and_then(|()| Ok(std::fs::read(path)?));
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    bytes
}

fn rgb(c: [u8; 3]) -> RGBColor {
    RGBColor(c[0], c[1], c[2])
}

fn draw_plot<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    plot: &BuiltPlot,
) -> std::result::Result<(), Box<dyn Error>>
where
    DB::ErrorType: 'static,
{
    let theme = &plot.theme;
    root.fill(&rgb(theme.plot_background))?;

    let body = match &plot.title {
        Some(title) => root.titled(
            title,
            (FONT, theme.base_font_size + 6).into_font().color(&rgb(theme.text_color)),
        )?,
        None => root.clone(),
    };

    let (width, height) = body.dim_in_pixel();
    let (panel_area, legend_area) = if plot.has_legend() {
        match plot.legend_position {
            LegendPosition::Bottom => {
                let (top, bottom) = body.split_vertically(height.saturating_sub(LEGEND_HEIGHT) as i32);
                (top, Some(bottom))
            }
            _ => {
                let (left, right) = body.split_horizontally(width.saturating_sub(LEGEND_WIDTH) as i32);
                (left, Some(right))
            }
        }
    } else {
        (body, None)
    };

    let cells = panel_area.split_evenly((plot.n_rows.max(1), plot.n_cols.max(1)));
    for panel in &plot.panels {
        let idx = panel.row * plot.n_cols.max(1) + panel.col;
        if let Some(cell) = cells.get(idx) {
            draw_panel(cell, panel, plot)?;
        }
    }

    if let Some(area) = legend_area {
        draw_legends(&area, &plot.legends, plot.legend_position, theme)?;
    }

    root.present()?;
    Ok(())
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &Panel,
    plot: &BuiltPlot,
) -> std::result::Result<(), Box<dyn Error>>
where
    DB::ErrorType: 'static,
{
    let theme = &plot.theme;
    let text_color = rgb(theme.text_color);
    let bottom_row = panel.row + 1 == plot.n_rows || plot.panel(panel.row + 1, panel.col).is_none();
    let left_col = panel.col == 0;

    let y_label_area: i32 = if left_col { 56 } else { 36 };

    let chart_area = match &panel.label {
        Some(label) => {
            let (strip_row, rest) = area.split_vertically(strip_height(theme) as i32 + 8);
            let strip = strip_row.margin(8, 0, 8 + y_label_area, 8);
            draw_strip(&strip, label, theme)?;
            rest
        }
        None => area.clone(),
    };

    let mut builder = ChartBuilder::on(&chart_area);
    builder
        .margin(8)
        .x_label_area_size(if bottom_row { 40 } else { 20 })
        .y_label_area_size(y_label_area);
    let mut chart = builder.build_cartesian_2d(
        panel.x_range.0..panel.x_range.1,
        panel.y_range.0..panel.y_range.1,
    )?;

    chart.plotting_area().fill(&rgb(theme.panel_background))?;

    let hide_x = plot.hide_x_tick_labels;
    let hide_y = plot.hide_y_tick_labels;
    let x_fmt = |v: &f64| if hide_x { String::new() } else { plot.x_axis.tick_label(*v) };
    let y_fmt = |v: &f64| if hide_y { String::new() } else { plot.y_axis.tick_label(*v) };

    let mut mesh = chart.configure_mesh();
    mesh.x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .x_labels(tick_count(&plot.x_axis))
        .y_labels(tick_count(&plot.y_axis))
        .max_light_lines(0)
        .label_style((FONT, theme.base_font_size - 2).into_font().color(&text_color))
        .axis_desc_style((FONT, theme.base_font_size).into_font().color(&text_color));
    match theme.grid_major {
        Some(grid) => {
            mesh.bold_line_style(&rgb(grid));
        }
        None => {
            mesh.disable_mesh();
        }
    }
    if theme.axis_lines {
        mesh.axis_style(&BLACK);
    } else {
        mesh.axis_style(&rgb(theme.panel_background));
    }
    if bottom_row {
        mesh.x_desc(plot.x_label.as_str());
    }
    if left_col {
        mesh.y_desc(plot.y_label.as_str());
    }
    mesh.draw()?;

    if let Some(border) = theme.panel_border {
        chart.draw_series(std::iter::once(Rectangle::new(
            [(panel.x_range.0, panel.y_range.0), (panel.x_range.1, panel.y_range.1)],
            rgb(border).stroke_width(1),
        )))?;
    }

    for layer in &panel.layers {
        match layer {
            LayerMarks::Points(points) => draw_points(&mut chart, points)?,
            LayerMarks::Bars(bars) => {
                chart.draw_series(bars.iter().map(|b| {
                    Rectangle::new([(b.xmin, b.ymin), (b.xmax, b.ymax)], rgb(b.fill).filled())
                }))?;
            }
            LayerMarks::Lines(lines) => {
                for line in lines {
                    chart.draw_series(std::iter::once(PathElement::new(
                        line.points.clone(),
                        rgb(line.color).stroke_width(2),
                    )))?;
                }
            }
            LayerMarks::Boxes(boxes) => {
                for b in boxes {
                    draw_box(&mut chart, b)?;
                }
            }
        }
    }
    Ok(())
}

fn strip_height(theme: &Theme) -> u32 {
    theme.base_font_size + 10
}

/// Facet label on a filled band above the panel
fn draw_strip<DB: DrawingBackend>(
    strip: &DrawingArea<DB, Shift>,
    label: &str,
    theme: &Theme,
) -> std::result::Result<(), Box<dyn Error>>
where
    DB::ErrorType: 'static,
{
    strip.fill(&rgb(theme.strip_background))?;
    let (w, h) = strip.dim_in_pixel();
    let style = (FONT, theme.base_font_size)
        .into_font()
        .color(&rgb(theme.text_color))
        .pos(Pos::new(HPos::Center, VPos::Center));
    strip.draw_text(label, &style, ((w / 2) as i32, (h / 2) as i32))?;
    Ok(())
}

/// Discrete axes get one tick per level
fn tick_count(axis: &AxisKind) -> usize {
    match axis {
        AxisKind::Discrete(levels) => levels.len().max(1),
        AxisKind::Continuous => 6,
    }
}

type Chart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn draw_points<DB: DrawingBackend>(
    chart: &mut Chart<'_, DB>,
    points: &[PointMark],
) -> std::result::Result<(), Box<dyn Error>>
where
    DB::ErrorType: 'static,
{
    let radius = |p: &PointMark| p.size.round().max(1.0) as i32;
    let of = |shape: Shape| points.iter().filter(move |p| p.shape == shape);

    chart.draw_series(
        of(Shape::Circle).map(|p| Circle::new((p.x, p.y), radius(p), rgb(p.color).filled())),
    )?;
    chart.draw_series(of(Shape::Triangle).map(|p| {
        TriangleMarker::new((p.x, p.y), radius(p) + 1, rgb(p.color).filled())
    }))?;
    chart.draw_series(of(Shape::Square).map(|p| {
        let r = radius(p);
        EmptyElement::at((p.x, p.y)) + Rectangle::new([(-r, -r), (r, r)], rgb(p.color).filled())
    }))?;
    chart.draw_series(
        of(Shape::Cross).map(|p| Cross::new((p.x, p.y), radius(p), rgb(p.color).stroke_width(2))),
    )?;
    Ok(())
}

fn draw_box<DB: DrawingBackend>(
    chart: &mut Chart<'_, DB>,
    b: &BoxMark,
) -> std::result::Result<(), Box<dyn Error>>
where
    DB::ErrorType: 'static,
{
    let s = &b.stats;
    let (left, right) = (b.x - b.width / 2.0, b.x + b.width / 2.0);
    let outline = RGBColor(51, 51, 51).stroke_width(1);

    chart.draw_series([
        Rectangle::new([(left, s.q1), (right, s.q3)], rgb(b.fill).filled()),
        Rectangle::new([(left, s.q1), (right, s.q3)], outline),
    ])?;
    chart.draw_series([
        PathElement::new(vec![(left, s.median), (right, s.median)], RGBColor(51, 51, 51).stroke_width(2)),
        PathElement::new(vec![(b.x, s.q3), (b.x, s.upper_whisker)], outline),
        PathElement::new(vec![(b.x, s.q1), (b.x, s.lower_whisker)], outline),
    ])?;
    chart.draw_series(
        s.outliers
            .iter()
            .map(|&y| Circle::new((b.x, y), 2, RGBColor(51, 51, 51).filled())),
    )?;
    Ok(())
}

fn draw_legends<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    legends: &[Legend],
    position: LegendPosition,
    theme: &Theme,
) -> std::result::Result<(), Box<dyn Error>>
where
    DB::ErrorType: 'static,
{
    let text_color = rgb(theme.text_color);
    let title_style = (FONT, theme.base_font_size).into_font().color(&text_color);
    let label_style = (FONT, theme.base_font_size - 2).into_font().color(&text_color);

    let (mut x, mut y) = (10, 20);
    for legend in legends {
        area.draw(&Text::new(legend.title.clone(), (x, y), title_style.clone()))?;
        let mut row = y + LEGEND_ROW;

        match &legend.kind {
            LegendKind::Colors(entries) => {
                for (label, color) in entries {
                    area.draw(&Circle::new((x + 8, row + 6), 5, rgb(*color).filled()))?;
                    area.draw(&Text::new(label.clone(), (x + 22, row), label_style.clone()))?;
                    row += LEGEND_ROW;
                }
            }
            LegendKind::Fills(entries) => {
                for (label, color) in entries {
                    area.draw(&Rectangle::new([(x + 2, row), (x + 14, row + 12)], rgb(*color).filled()))?;
                    area.draw(&Text::new(label.clone(), (x + 22, row), label_style.clone()))?;
                    row += LEGEND_ROW;
                }
            }
            LegendKind::Shapes(entries) => {
                let style = RGBColor(51, 51, 51).filled();
                for (label, shape) in entries {
                    let center = (x + 8, row + 6);
                    match shape {
                        Shape::Circle => area.draw(&Circle::new(center, 5, style))?,
                        Shape::Triangle => area.draw(&TriangleMarker::new(center, 6, style))?,
                        Shape::Square => area.draw(&Rectangle::new(
                            [(center.0 - 5, center.1 - 5), (center.0 + 5, center.1 + 5)],
                            style,
                        ))?,
                        Shape::Cross => area.draw(&Cross::new(
                            center,
                            5,
                            RGBColor(51, 51, 51).stroke_width(2),
                        ))?,
                    }
                    area.draw(&Text::new(label.clone(), (x + 22, row), label_style.clone()))?;
                    row += LEGEND_ROW;
                }
            }
            LegendKind::Gradient { min, max, low, high } => {
                const STEPS: i32 = 10;
                for i in 0..STEPS {
                    let t = i as f64 / (STEPS - 1) as f64;
                    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
                    let color = RGBColor(mix(low[0], high[0]), mix(low[1], high[1]), mix(low[2], high[2]));
                    let top = row + (STEPS - 1 - i) * 8;
                    area.draw(&Rectangle::new([(x + 2, top), (x + 16, top + 8)], color.filled()))?;
                }
                area.draw(&Text::new(format_gradient_label(*max), (x + 22, row), label_style.clone()))?;
                area.draw(&Text::new(
                    format_gradient_label(*min),
                    (x + 22, row + STEPS * 8 - 12),
                    label_style.clone(),
                ))?;
                row += STEPS * 8 + 4;
            }
        }

        match position {
            LegendPosition::Bottom => {
                x += LEGEND_WIDTH as i32;
            }
            _ => {
                y = row + LEGEND_ROW / 2;
            }
        }
    }
    Ok(())
}

fn format_gradient_label(value: f64) -> String {
    crate::table::format_number(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlotConfig;
    use crate::grammar::{Aes, FacetSpec, Geom, PlotGenerator, PlotSpec};
    use crate::table::fixtures::small_table;

    #[test]
    fn test_output_format() {
        assert_eq!(OutputFormat::parse("SVG"), OutputFormat::Svg);
        assert_eq!(OutputFormat::parse("png"), OutputFormat::Png);
        assert_eq!(OutputFormat::parse("gif"), OutputFormat::Png);
        assert_eq!(OutputFormat::Svg.ext(), "svg");
    }

    #[test]
    fn test_temp_file_removed_after_failed_render() {
        let path = std::env::temp_dir().join(format!("ionplot_{}.png", uuid::Uuid::new_v4()));
        std::fs::write(&path, b"partial").unwrap();

        let result = take_temp_file(&path, Err(PlotError::Render("backend".to_string())));
        assert!(matches!(result, Err(PlotError::Render(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_temp_file_read_then_removed() {
        let path = std::env::temp_dir().join(format!("ionplot_{}.svg", uuid::Uuid::new_v4()));
        std::fs::write(&path, b"<svg/>").unwrap();

        assert_eq!(take_temp_file(&path, Ok(())).unwrap(), b"<svg/>".to_vec());
        assert!(!path.exists());
    }

    // Needs a system sans-serif font
    #[test]
    #[ignore]
    fn test_facet_strips_use_theme_background() {
        let table = small_table();
        let spec = PlotSpec::new()
            .aes(Aes::new().x("concentration").y("ion_ratio"))
            .add_layer(Geom::point())
            .facet(FacetSpec::wrap("compound_name"));
        let config = PlotConfig::default();
        let plot = PlotGenerator::new(&table, &spec, &config).build().unwrap();

        let bytes = PlotRenderer::new(&plot, 1050, 700)
            .render_to_bytes(OutputFormat::Svg)
            .unwrap();
        let svg = String::from_utf8(bytes).unwrap();
        assert!(svg.contains("#D9D9D9"));
        assert!(svg.contains("morphine"));
    }

    // Needs a system sans-serif font
    #[test]
    #[ignore]
    fn test_render_svg_bytes() {
        let table = small_table();
        let spec = PlotSpec::new()
            .aes(Aes::new().x("compound_name").y("ion_ratio").fill("sample_type"))
            .add_layer(Geom::boxplot())
            .title("Ion ratio by compound");
        let config = PlotConfig::default();
        let plot = PlotGenerator::new(&table, &spec, &config).build().unwrap();

        let bytes = PlotRenderer::new(&plot, 800, 600)
            .render_to_bytes(OutputFormat::Svg)
            .unwrap();
        let svg = String::from_utf8(bytes).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Ion ratio by compound"));
    }
}
