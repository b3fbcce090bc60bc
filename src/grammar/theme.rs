//! Non-data styling: backgrounds, grid lines, legend placement
//!
//! The named themes follow ggplot2's theme_gray(), theme_bw(), theme_minimal()
//! and theme_classic().

/// Where the legend is drawn relative to the panels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegendPosition {
    #[default]
    Right,
    Bottom,
    None,
}

impl LegendPosition {
    /// Parse from a validated property value ("right", "bottom", "none")
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "bottom" => Self::Bottom,
            "none" => Self::None,
            _ => Self::Right,
        }
    }
}

/// Visual theme applied by the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub name: &'static str,
    pub plot_background: [u8; 3],
    pub panel_background: [u8; 3],
    /// Panel border color; `None` draws no border
    pub panel_border: Option<[u8; 3]>,
    /// Major grid line color; `None` draws no grid
    pub grid_major: Option<[u8; 3]>,
    /// Draw x and y axis lines (classic look)
    pub axis_lines: bool,
    pub strip_background: [u8; 3],
    pub text_color: [u8; 3],
    pub base_font_size: u32,
}

impl Default for Theme {
    fn default() -> Self {
        Theme::gray()
    }
}

impl Theme {
    pub fn gray() -> Self {
        Theme {
            name: "gray",
            plot_background: [255, 255, 255],
            panel_background: [235, 235, 235],
            panel_border: None,
            grid_major: Some([255, 255, 255]),
            axis_lines: false,
            strip_background: [217, 217, 217],
            text_color: [77, 77, 77],
            base_font_size: 14,
        }
    }

    pub fn bw() -> Self {
        Theme {
            name: "bw",
            panel_background: [255, 255, 255],
            panel_border: Some([51, 51, 51]),
            grid_major: Some([235, 235, 235]),
            ..Theme::gray()
        }
    }

    pub fn minimal() -> Self {
        Theme {
            name: "minimal",
            panel_background: [255, 255, 255],
            grid_major: Some([235, 235, 235]),
            strip_background: [255, 255, 255],
            ..Theme::gray()
        }
    }

    pub fn classic() -> Self {
        Theme {
            name: "classic",
            panel_background: [255, 255, 255],
            grid_major: None,
            axis_lines: true,
            strip_background: [255, 255, 255],
            ..Theme::gray()
        }
    }

    /// Theme by property value; unknown names fall back to gray
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "bw" => Theme::bw(),
            "minimal" => Theme::minimal(),
            "classic" => Theme::classic(),
            _ => Theme::gray(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_from_name() {
        assert_eq!(Theme::from_name("BW").name, "bw");
        assert_eq!(Theme::from_name("classic").grid_major, None);
        assert_eq!(Theme::from_name("unknown"), Theme::gray());
        assert_eq!(Theme::bw().panel_background, [255, 255, 255]);
    }

    #[test]
    fn test_legend_position_parse() {
        assert_eq!(LegendPosition::parse("bottom"), LegendPosition::Bottom);
        assert_eq!(LegendPosition::parse("NONE"), LegendPosition::None);
        assert_eq!(LegendPosition::parse("left"), LegendPosition::Right);
    }
}
