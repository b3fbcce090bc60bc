//! Declarative plotting grammar
//!
//! A plot is a mapping of columns to visual channels (`Aes`), one or more
//! layers (`Geom` + `Position`), an optional facet and some labels. A `PlotSpec` is
//! resolved against a table by `PlotGenerator` and drawn by `PlotRenderer`.
//!
//! Structure:
//! - `aes.rs`, `geom.rs`, `facet.rs`, `spec.rs`: the declarative vocabulary
//! - `stat.rs`: binning, box statistics, smoothing
//! - `scale.rs`, `palettes.rs`, `theme.rs`: value-to-visual mappings and styling
//! - `layout.rs`: `PlotGenerator` and the resolved `BuiltPlot`
//! - `render.rs`: plotters PNG/SVG output

pub mod aes;
pub mod facet;
pub mod geom;
pub mod layout;
pub mod palettes;
pub mod render;
pub mod scale;
pub mod spec;
pub mod stat;
pub mod theme;

pub use aes::{Aes, Channel};
pub use facet::{FacetLayout, FacetScales, FacetSpec, PanelKey};
pub use geom::{Geom, Layer, Position, SmoothMethod};
pub use layout::{BuiltPlot, LayerMarks, Legend, LegendKind, Panel, PlotGenerator};
pub use render::{OutputFormat, PlotRenderer};
pub use scale::{AxisKind, Shape};
pub use spec::{Labels, PlotSpec};
pub use theme::{LegendPosition, Theme};
