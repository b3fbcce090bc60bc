//! Scales: map data values to axis positions, colors and point shapes

use super::palettes::{categorical_color, sequential_color};
use crate::table::{distinct_levels, format_number, ColumnValues};

/// Fraction of the data range added on each side of a continuous axis
pub const CONTINUOUS_EXPANSION: f64 = 0.05;

/// Padding added on each side of a discrete axis (levels sit at 1..n)
pub const DISCRETE_PADDING: f64 = 0.6;

/// Axis type of a position channel
#[derive(Debug, Clone, PartialEq)]
pub enum AxisKind {
    Continuous,
    /// Sorted levels; level i sits at position i + 1
    Discrete(Vec<String>),
}

impl AxisKind {
    pub fn is_discrete(&self) -> bool {
        matches!(self, AxisKind::Discrete(_))
    }

    /// Tick label for a position on this axis
    pub fn tick_label(&self, value: f64) -> String {
        match self {
            AxisKind::Continuous => format_number(value),
            AxisKind::Discrete(levels) => {
                let nearest = value.round();
                if (value - nearest).abs() > 1e-6 || nearest < 1.0 {
                    return String::new();
                }
                levels
                    .get(nearest as usize - 1)
                    .cloned()
                    .unwrap_or_default()
            }
        }
    }
}

/// Expand a continuous range by 5% on each side
///
/// A zero-width range is first widened so the axis never collapses.
pub fn expand_continuous(min: f64, max: f64) -> (f64, f64) {
    let (min, max) = if max - min <= 0.0 {
        let half = if min == 0.0 { 0.5 } else { min.abs() * 0.05 };
        (min - half, max + half)
    } else {
        (min, max)
    };
    let pad = (max - min) * CONTINUOUS_EXPANSION;
    (min - pad, max + pad)
}

/// Axis range of a discrete scale with `n_levels` levels
pub fn discrete_range(n_levels: usize) -> (f64, f64) {
    (1.0 - DISCRETE_PADDING, n_levels.max(1) as f64 + DISCRETE_PADDING)
}

/// Position of `label` on a discrete axis, 1-based
pub fn discrete_position(levels: &[String], label: &str) -> Option<f64> {
    levels
        .iter()
        .position(|l| l == label)
        .map(|i| (i + 1) as f64)
}

/// Maps a color or fill column to RGB
#[derive(Debug, Clone, PartialEq)]
pub enum ColorScale {
    /// One color per sorted level, from the categorical palette
    Discrete { levels: Vec<String> },
    /// Sequential palette interpolated over [min, max]
    Continuous { min: f64, max: f64 },
    /// Channel not mapped
    Constant([u8; 3]),
}

impl ColorScale {
    /// Train a scale on a column's values
    pub fn train(values: &ColumnValues) -> Self {
        match values {
            ColumnValues::Numeric(v) => {
                let finite = v.iter().copied().flatten().filter(|x| x.is_finite());
                let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
                    (lo.min(x), hi.max(x))
                });
                if min > max {
                    ColorScale::Continuous { min: 0.0, max: 1.0 }
                } else {
                    ColorScale::Continuous { min, max }
                }
            }
            ColumnValues::Discrete(_) => ColorScale::Discrete {
                levels: distinct_levels(values),
            },
        }
    }

    /// Color of `row`; `None` when the value is missing
    pub fn map(&self, values: Option<&ColumnValues>, row: usize) -> Option<[u8; 3]> {
        match self {
            ColorScale::Constant(rgb) => Some(*rgb),
            ColorScale::Discrete { levels } => {
                let label = values?.label(row)?;
                let idx = levels.iter().position(|l| *l == label)?;
                Some(categorical_color(idx))
            }
            ColorScale::Continuous { min, max } => match values? {
                ColumnValues::Numeric(v) => {
                    let x = v.get(row).copied().flatten().filter(|x| x.is_finite())?;
                    let t = if max > min { (x - min) / (max - min) } else { 0.0 };
                    Some(sequential_color(t))
                }
                ColumnValues::Discrete(_) => None,
            },
        }
    }

    /// Index of the group `row` belongs to, for splitting layers by color
    pub fn group(&self, values: Option<&ColumnValues>, row: usize) -> usize {
        match (self, values) {
            (ColorScale::Discrete { levels }, Some(values)) => values
                .label(row)
                .and_then(|label| levels.iter().position(|l| *l == label))
                .unwrap_or(0),
            _ => 0,
        }
    }

    pub fn n_groups(&self) -> usize {
        match self {
            ColorScale::Discrete { levels } => levels.len().max(1),
            _ => 1,
        }
    }
}

/// Point marker shapes, assigned to levels in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shape {
    #[default]
    Circle,
    Triangle,
    Square,
    Cross,
}

impl Shape {
    pub const CYCLE: [Shape; 4] = [Shape::Circle, Shape::Triangle, Shape::Square, Shape::Cross];

    pub fn for_level(index: usize) -> Shape {
        Self::CYCLE[index % Self::CYCLE.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_continuous() {
        let (lo, hi) = expand_continuous(0.0, 10.0);
        assert!((lo + 0.5).abs() < 1e-12);
        assert!((hi - 10.5).abs() < 1e-12);

        let (lo, hi) = expand_continuous(0.0, 0.0);
        assert!(lo < 0.0 && hi > 0.0);
        let (lo, hi) = expand_continuous(5.0, 5.0);
        assert!(lo < 5.0 && hi > 5.0);
    }

    #[test]
    fn test_discrete_axis() {
        let levels = vec!["morphine".to_string(), "oxycodone".to_string()];
        let (lo, hi) = discrete_range(2);
        assert!((lo - 0.4).abs() < 1e-12 && (hi - 2.6).abs() < 1e-12);
        assert_eq!(discrete_position(&levels, "oxycodone"), Some(2.0));
        assert_eq!(discrete_position(&levels, "codeine"), None);

        let axis = AxisKind::Discrete(levels);
        assert_eq!(axis.tick_label(1.0), "morphine");
        assert_eq!(axis.tick_label(1.5), "");
        assert_eq!(axis.tick_label(3.0), "");
        assert_eq!(AxisKind::Continuous.tick_label(0.5), "0.5");
    }

    #[test]
    fn test_discrete_color_scale() {
        let values = ColumnValues::Discrete(vec![
            Some("qc".to_string()),
            Some("blank".to_string()),
            None,
        ]);
        let scale = ColorScale::train(&values);
        assert_eq!(
            scale,
            ColorScale::Discrete {
                levels: vec!["blank".to_string(), "qc".to_string()]
            }
        );
        assert_eq!(scale.map(Some(&values), 1), Some(categorical_color(0)));
        assert_eq!(scale.map(Some(&values), 0), Some(categorical_color(1)));
        assert_eq!(scale.map(Some(&values), 2), None);
        assert_eq!(scale.group(Some(&values), 0), 1);
        assert_eq!(scale.n_groups(), 2);
    }

    #[test]
    fn test_continuous_color_scale() {
        let values = ColumnValues::Numeric(vec![Some(0.0), Some(10.0), None]);
        let scale = ColorScale::train(&values);
        assert_eq!(scale, ColorScale::Continuous { min: 0.0, max: 10.0 });
        assert_eq!(scale.map(Some(&values), 0), Some(sequential_color(0.0)));
        assert_eq!(scale.map(Some(&values), 1), Some(sequential_color(1.0)));
        assert_eq!(scale.map(Some(&values), 2), None);
    }

    #[test]
    fn test_shapes_cycle() {
        assert_eq!(Shape::for_level(0), Shape::Circle);
        assert_eq!(Shape::for_level(3), Shape::Cross);
        assert_eq!(Shape::for_level(4), Shape::Circle);
    }
}
