//! Geometric primitives, position adjustments and layers

use super::aes::{Aes, Channel};

/// How a smooth curve is fitted
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SmoothMethod {
    /// Loess below 1000 points, linear least squares above
    Auto,
    /// Local linear regression with tricube weights; `None` uses the configured span
    Loess { span: Option<f64> },
    /// Ordinary least squares line
    Linear,
}

/// Point count at which `SmoothMethod::Auto` switches from loess to linear
pub const LOESS_MAX_POINTS: usize = 1000;

/// A geometric rendering primitive
#[derive(Debug, Clone, PartialEq)]
pub enum Geom {
    /// Scatter points; `None` size uses the configured point size
    Point { size: Option<f64> },
    /// Binned counts of a continuous x
    ///
    /// An explicit `binwidth` wins over `bins`; with neither set the
    /// configured bin count is used.
    Histogram {
        binwidth: Option<f64>,
        bins: Option<usize>,
    },
    /// Smoothed trend curve, one per color group
    Smooth { method: SmoothMethod },
    /// Box-and-whisker summary of y per discrete x level
    Boxplot,
}

impl Geom {
    pub fn point() -> Self {
        Geom::Point { size: None }
    }

    pub fn point_sized(size: f64) -> Self {
        Geom::Point { size: Some(size) }
    }

    pub fn histogram() -> Self {
        Geom::Histogram {
            binwidth: None,
            bins: None,
        }
    }

    pub fn histogram_binwidth(binwidth: f64) -> Self {
        Geom::Histogram {
            binwidth: Some(binwidth),
            bins: None,
        }
    }

    pub fn histogram_bins(bins: usize) -> Self {
        Geom::Histogram {
            binwidth: None,
            bins: Some(bins),
        }
    }

    pub fn smooth() -> Self {
        Geom::Smooth {
            method: SmoothMethod::Auto,
        }
    }

    pub fn smooth_loess(span: f64) -> Self {
        Geom::Smooth {
            method: SmoothMethod::Loess { span: Some(span) },
        }
    }

    pub fn smooth_lm() -> Self {
        Geom::Smooth {
            method: SmoothMethod::Linear,
        }
    }

    pub fn boxplot() -> Self {
        Geom::Boxplot
    }

    /// ggplot2-style name, used in log messages
    pub fn name(&self) -> &'static str {
        match self {
            Geom::Point { .. } => "geom_point",
            Geom::Histogram { .. } => "geom_histogram",
            Geom::Smooth { .. } => "geom_smooth",
            Geom::Boxplot => "geom_boxplot",
        }
    }

    /// Channels that must be mapped for this geom
    pub fn required_channels(&self) -> &'static [Channel] {
        match self {
            Geom::Histogram { .. } => &[Channel::X],
            _ => &[Channel::X, Channel::Y],
        }
    }
}

/// Offset applied to marks to reduce overplotting
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Position {
    #[default]
    Identity,
    /// Uniform random offset in [-width, width] x [-height, height] (data units;
    /// one discrete level is one unit)
    Jitter { width: f64, height: f64 },
    /// Spread groups side by side within `width` of each discrete x level
    Dodge { width: f64 },
}

impl Position {
    pub fn jitter(width: f64, height: f64) -> Self {
        Position::Jitter { width, height }
    }

    pub fn dodge(width: f64) -> Self {
        Position::Dodge { width }
    }
}

/// One layer of a plot: a geom with an optional mapping override
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub geom: Geom,
    pub aes: Option<Aes>,
    pub position: Position,
}

impl Layer {
    pub fn new(geom: Geom) -> Self {
        Layer {
            geom,
            aes: None,
            position: Position::Identity,
        }
    }

    pub fn aes(mut self, aes: Aes) -> Self {
        self.aes = Some(aes);
        self
    }

    pub fn position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Effective mapping given the plot-level mapping
    pub fn resolved_aes(&self, plot_aes: &Aes) -> Aes {
        match &self.aes {
            Some(layer_aes) => plot_aes.merged_with(layer_aes),
            None => plot_aes.clone(),
        }
    }
}

impl From<Geom> for Layer {
    fn from(geom: Geom) -> Self {
        Layer::new(geom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_constructors() {
        assert_eq!(
            Geom::histogram_binwidth(0.01),
            Geom::Histogram {
                binwidth: Some(0.01),
                bins: None
            }
        );
        assert_eq!(Geom::histogram().required_channels(), &[Channel::X]);
        assert_eq!(Geom::boxplot().required_channels(), &[Channel::X, Channel::Y]);
    }

    #[test]
    fn test_layer_resolves_against_plot_aes() {
        let plot_aes = Aes::new().x("compound_name").y("ion_ratio");
        let layer = Layer::new(Geom::point())
            .aes(Aes::new().color("sample_type"))
            .position(Position::jitter(0.2, 0.0));

        let aes = layer.resolved_aes(&plot_aes);
        assert_eq!(aes.get(Channel::X), Some("compound_name"));
        assert_eq!(aes.get(Channel::Color), Some("sample_type"));
        assert_eq!(layer.position, Position::Jitter { width: 0.2, height: 0.0 });
    }
}
