//! ionplot library
//!
//! Declarative, faceted plots over mass-spec QC tables, plus the quick
//! vector plots they are contrasted with.
//!
//! Module organization:
//! - `table`: CSV loading, header normalization, derived columns and views
//! - `grammar`: plot specs, layout and rendering
//! - `quick`: one-shot scatter and histogram of a vector
//! - `lesson`: the QC walkthrough charts
//! - `pipeline`: build, render and write every chart of a session
//! - `config`, `properties`: defaults and overrides

pub mod config;
pub mod error;
pub mod grammar;
pub mod lesson;
pub mod pipeline;
pub mod properties;
pub mod quick;
pub mod table;

pub use config::PlotConfig;
pub use error::{PlotError, Result};
pub use grammar::{BuiltPlot, PlotGenerator, PlotRenderer, PlotSpec};
pub use table::{load_csv, QcTable};
