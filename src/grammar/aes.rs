//! Aesthetic mappings: which column drives which visual channel

use std::fmt;

/// A visual channel a column can be mapped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    X,
    Y,
    Color,
    Fill,
    Shape,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::X => "x",
            Channel::Y => "y",
            Channel::Color => "color",
            Channel::Fill => "fill",
            Channel::Shape => "shape",
        };
        f.write_str(name)
    }
}

/// Column-to-channel mapping
///
/// ```
/// use ionplot::grammar::Aes;
///
/// let aes = Aes::new().x("idx").y("ion_ratio").color("sample_type");
/// assert_eq!(aes.get_x(), Some("idx"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aes {
    x: Option<String>,
    y: Option<String>,
    color: Option<String>,
    fill: Option<String>,
    shape: Option<String>,
}

impl Aes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn x(mut self, column: impl Into<String>) -> Self {
        self.x = Some(column.into());
        self
    }

    pub fn y(mut self, column: impl Into<String>) -> Self {
        self.y = Some(column.into());
        self
    }

    pub fn color(mut self, column: impl Into<String>) -> Self {
        self.color = Some(column.into());
        self
    }

    pub fn fill(mut self, column: impl Into<String>) -> Self {
        self.fill = Some(column.into());
        self
    }

    pub fn shape(mut self, column: impl Into<String>) -> Self {
        self.shape = Some(column.into());
        self
    }

    pub fn get_x(&self) -> Option<&str> {
        self.x.as_deref()
    }

    pub fn get_y(&self) -> Option<&str> {
        self.y.as_deref()
    }

    /// Column mapped to `channel`, if any
    pub fn get(&self, channel: Channel) -> Option<&str> {
        match channel {
            Channel::X => self.x.as_deref(),
            Channel::Y => self.y.as_deref(),
            Channel::Color => self.color.as_deref(),
            Channel::Fill => self.fill.as_deref(),
            Channel::Shape => self.shape.as_deref(),
        }
    }

    /// Layer mapping on top of the plot mapping: `other` wins where set
    pub fn merged_with(&self, other: &Aes) -> Aes {
        Aes {
            x: other.x.clone().or_else(|| self.x.clone()),
            y: other.y.clone().or_else(|| self.y.clone()),
            color: other.color.clone().or_else(|| self.color.clone()),
            fill: other.fill.clone().or_else(|| self.fill.clone()),
            shape: other.shape.clone().or_else(|| self.shape.clone()),
        }
    }

    /// Every (channel, column) pair that is mapped
    pub fn mapped(&self) -> Vec<(Channel, &str)> {
        [
            Channel::X,
            Channel::Y,
            Channel::Color,
            Channel::Fill,
            Channel::Shape,
        ]
        .into_iter()
        .filter_map(|c| self.get(c).map(|col| (c, col)))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_aes_overrides_plot_aes() {
        let plot = Aes::new().x("idx").y("ion_ratio").color("sample_type");
        let layer = Aes::new().color("compound_name").shape("sample_type");
        let merged = plot.merged_with(&layer);

        assert_eq!(merged.get(Channel::X), Some("idx"));
        assert_eq!(merged.get(Channel::Color), Some("compound_name"));
        assert_eq!(merged.get(Channel::Shape), Some("sample_type"));
        assert_eq!(merged.get(Channel::Fill), None);
    }

    #[test]
    fn test_mapped_lists_set_channels() {
        let aes = Aes::new().x("a").fill("b");
        assert_eq!(aes.mapped(), vec![(Channel::X, "a"), (Channel::Fill, "b")]);
    }
}
