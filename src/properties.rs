//! Plot property definitions with defaults from plot_properties.json
//!
//! plot_properties.json is embedded at compile time and is the single source
//! of default values. User overrides are read on top of it; invalid overrides
//! fall back to the default with a warning.

use log::warn;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

/// plot_properties.json embedded at compile time
const PROPERTIES_JSON: &str = include_str!("../plot_properties.json");

/// Property definition from plot_properties.json
#[derive(Debug, Clone)]
pub struct PropertyDef {
    pub name: String,
    pub kind: PropertyKind,
    pub default_value: String,
    pub description: String,
    /// For EnumeratedProperty, the valid values
    pub valid_values: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKind {
    String,
    Enumerated,
}

#[derive(Deserialize)]
struct RawProperties {
    properties: Vec<RawProperty>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProperty {
    name: String,
    kind: String,
    #[serde(default)]
    default_value: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    values: Option<Vec<String>>,
}

/// Registry of all plot properties with their defaults
pub struct PropertyRegistry {
    properties: HashMap<String, PropertyDef>,
}

impl PropertyRegistry {
    /// Parse a property document and build the registry
    ///
    /// Unknown property kinds are skipped with a warning.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: RawProperties = serde_json::from_str(json)?;
        let mut properties = HashMap::new();

        for prop in raw.properties {
            let kind = match prop.kind.as_str() {
                "StringProperty" => PropertyKind::String,
                "EnumeratedProperty" => PropertyKind::Enumerated,
                other => {
                    warn!("Unknown property kind '{}' for '{}'", other, prop.name);
                    continue;
                }
            };
            let valid_values = if kind == PropertyKind::Enumerated {
                prop.values
            } else {
                None
            };

            properties.insert(
                prop.name.clone(),
                PropertyDef {
                    name: prop.name,
                    kind,
                    default_value: prop.default_value,
                    description: prop.description,
                    valid_values,
                },
            );
        }

        Ok(Self { properties })
    }

    /// Get the default value for a property
    pub fn get_default(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(|p| p.default_value.as_str())
    }

    /// Get the property definition
    pub fn get_property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.get(name)
    }

    /// Check if a value is valid for an enumerated property
    pub fn is_valid_enum_value(&self, name: &str, value: &str) -> bool {
        self.properties
            .get(name)
            .and_then(|p| p.valid_values.as_ref())
            .map(|values| values.iter().any(|v| v.eq_ignore_ascii_case(value)))
            .unwrap_or(true) // Non-enumerated properties accept any value
    }
}

/// Global registry instance (initialized lazily)
static REGISTRY: OnceLock<PropertyRegistry> = OnceLock::new();

/// Get the global property registry
pub fn registry() -> &'static PropertyRegistry {
    REGISTRY.get_or_init(|| {
        PropertyRegistry::from_json(PROPERTIES_JSON).unwrap_or_else(|e| {
            warn!("plot_properties.json is invalid: {}", e);
            PropertyRegistry {
                properties: HashMap::new(),
            }
        })
    })
}

/// A single user override
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyValue {
    pub name: String,
    pub value: String,
}

/// Typed property reader
///
/// Reads user overrides, falling back to the registry defaults.
pub struct PropertyReader {
    /// User-set values (empty strings are treated as unset)
    user_values: HashMap<String, String>,
}

impl PropertyReader {
    pub fn new(overrides: &[PropertyValue]) -> Self {
        let user_values = overrides
            .iter()
            .filter(|p| !p.value.is_empty()) // Empty = not set
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect();

        Self { user_values }
    }

    /// Get string property (user value or registry default)
    pub fn get_string(&self, name: &str) -> String {
        if let Some(value) = self.user_values.get(name) {
            return value.clone();
        }
        registry().get_default(name).unwrap_or("").to_string()
    }

    /// Get enumerated property with validation
    ///
    /// The returned value is lowercased so callers can match on it directly.
    pub fn get_enum(&self, name: &str) -> String {
        let reg = registry();
        let default = reg.get_default(name).unwrap_or("");

        if let Some(value) = self.user_values.get(name) {
            if reg.is_valid_enum_value(name, value) {
                return value.to_lowercase();
            }
            let valid_values = reg
                .get_property(name)
                .and_then(|p| p.valid_values.as_ref())
                .map(|v| v.join(", "))
                .unwrap_or_default();
            warn!(
                "Invalid value '{}' for property '{}'. Valid values: [{}]. Using default: '{}'",
                value, name, valid_values, default
            );
        }

        default.to_lowercase()
    }

    /// Get f64 property; unparsable values fall back to the default
    pub fn get_f64(&self, name: &str) -> f64 {
        let default = registry()
            .get_default(name)
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0);

        let value = self.get_string(name);
        match value.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                warn!(
                    "Invalid numeric value '{}' for property '{}'. Using default: {}",
                    value, name, default
                );
                default
            }
        }
    }

    /// Get f64 property with range validation
    pub fn get_f64_in_range(&self, name: &str, min: f64, max: f64) -> f64 {
        let value = self.get_f64(name);
        if (min..=max).contains(&value) {
            return value;
        }

        let default = registry()
            .get_default(name)
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(min);
        warn!(
            "Value {} for property '{}' out of range [{}, {}]. Using default: {}",
            value, name, min, max, default
        );
        default
    }

    /// Get an unsigned integer property within [min, max]
    pub fn get_usize_in_range(&self, name: &str, min: usize, max: usize) -> usize {
        let default = registry()
            .get_default(name)
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(min);

        let value = self.get_string(name);
        match value.trim().parse::<usize>() {
            Ok(v) if (min..=max).contains(&v) => v,
            _ => {
                warn!(
                    "Invalid value '{}' for property '{}' (expected {}..={}). Using default: {}",
                    value, name, min, max, default
                );
                default
            }
        }
    }

    /// Get a u64 property
    pub fn get_u64(&self, name: &str) -> u64 {
        let default = registry()
            .get_default(name)
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);

        let value = self.get_string(name);
        value.trim().parse::<u64>().unwrap_or_else(|_| {
            warn!(
                "Invalid integer value '{}' for property '{}'. Using default: {}",
                value, name, default
            );
            default
        })
    }
}

/// Plot dimension - either explicit pixels or "auto" (derived from facet count)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PlotDimension {
    #[default]
    Auto,
    Pixels(u32),
}

impl PlotDimension {
    /// Parse from string property value
    ///
    /// Valid formats:
    /// - "auto" or "" (empty) → Auto
    /// - "1500" → Pixels(1500) if in valid range [100, 10000]
    pub fn parse(value: &str, default: PlotDimension) -> Self {
        let trimmed = value.trim();

        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
            return PlotDimension::Auto;
        }

        match trimmed.parse::<u32>() {
            Ok(px) if (100..=10000).contains(&px) => PlotDimension::Pixels(px),
            Ok(px) => {
                warn!(
                    "Plot dimension {} out of valid range [100-10000], using default: {:?}",
                    px, default
                );
                default
            }
            Err(_) => {
                warn!(
                    "Invalid plot dimension '{}', using default: {:?}",
                    trimmed, default
                );
                default
            }
        }
    }

    /// Resolve to actual pixels
    ///
    /// For Auto: base_size (700px) + (n_facets - 1) * size_per_facet (350px),
    /// capped at 4000px.
    pub fn resolve(&self, n_facets: usize) -> u32 {
        match self {
            PlotDimension::Pixels(px) => *px,
            PlotDimension::Auto => {
                const BASE_SIZE: u32 = 700;
                const SIZE_PER_FACET: u32 = 350;
                const MAX_SIZE: u32 = 4000;

                let extra = (n_facets.saturating_sub(1) as u32).saturating_mul(SIZE_PER_FACET);
                BASE_SIZE.saturating_add(extra).min(MAX_SIZE)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(pairs: &[(&str, &str)]) -> Vec<PropertyValue> {
        pairs
            .iter()
            .map(|(name, value)| PropertyValue {
                name: name.to_string(),
                value: value.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_registry_loads() {
        let reg = registry();
        assert!(reg.get_property("theme").is_some());
        assert!(reg.get_property("histogram.bins").is_some());
        assert!(reg.get_property("output.format").is_some());
    }

    #[test]
    fn test_registry_defaults() {
        let reg = registry();
        assert_eq!(reg.get_default("theme"), Some("gray"));
        assert_eq!(reg.get_default("legend.position"), Some("right"));
        assert_eq!(reg.get_default("histogram.bins"), Some("30"));
    }

    #[test]
    fn test_enum_validation() {
        let reg = registry();
        assert!(reg.is_valid_enum_value("output.format", "png"));
        assert!(reg.is_valid_enum_value("output.format", "SVG"));
        assert!(!reg.is_valid_enum_value("output.format", "jpeg"));
        // Free-form properties accept anything
        assert!(reg.is_valid_enum_value("plot.width", "whatever"));
    }

    #[test]
    fn test_reader_defaults() {
        let reader = PropertyReader::new(&[]);
        assert_eq!(reader.get_enum("theme"), "gray");
        assert_eq!(reader.get_f64("smooth.span"), 0.75);
        assert_eq!(reader.get_usize_in_range("histogram.bins", 1, 1000), 30);
        assert_eq!(reader.get_u64("jitter.seed"), 42);
    }

    #[test]
    fn test_reader_overrides() {
        let reader = PropertyReader::new(&overrides(&[
            ("theme", "BW"),
            ("histogram.bins", "50"),
            ("point.size", "5.5"),
        ]));
        assert_eq!(reader.get_enum("theme"), "bw");
        assert_eq!(reader.get_usize_in_range("histogram.bins", 1, 1000), 50);
        assert_eq!(reader.get_f64("point.size"), 5.5);
    }

    #[test]
    fn test_reader_invalid_values_fall_back() {
        let reader = PropertyReader::new(&overrides(&[
            ("theme", "neon"),
            ("histogram.bins", "0"),
            ("smooth.span", "wide"),
            ("jitter.seed", "-3"),
        ]));
        assert_eq!(reader.get_enum("theme"), "gray");
        assert_eq!(reader.get_usize_in_range("histogram.bins", 1, 1000), 30);
        assert_eq!(reader.get_f64("smooth.span"), 0.75);
        assert_eq!(reader.get_u64("jitter.seed"), 42);
        assert_eq!(reader.get_f64_in_range("smooth.span", 0.1, 1.0), 0.75);
    }

    #[test]
    fn test_empty_override_is_unset() {
        let reader = PropertyReader::new(&overrides(&[("theme", "")]));
        assert_eq!(reader.get_enum("theme"), "gray");
    }

    #[test]
    fn test_plot_dimension_auto() {
        let dim = PlotDimension::parse("auto", PlotDimension::Auto);
        assert_eq!(dim, PlotDimension::Auto);
        assert_eq!(dim.resolve(1), 700);
        assert_eq!(dim.resolve(2), 1050);
        assert_eq!(dim.resolve(3), 1400);
        assert_eq!(dim.resolve(20), 4000); // Capped at max
    }

    #[test]
    fn test_plot_dimension_pixels() {
        let dim = PlotDimension::parse("1500", PlotDimension::Auto);
        assert_eq!(dim, PlotDimension::Pixels(1500));
        assert_eq!(dim.resolve(10), 1500); // Ignores facet count
    }

    #[test]
    fn test_plot_dimension_invalid() {
        assert_eq!(PlotDimension::parse("", PlotDimension::Auto), PlotDimension::Auto);
        assert_eq!(PlotDimension::parse("abc", PlotDimension::Auto), PlotDimension::Auto);
        assert_eq!(PlotDimension::parse("50", PlotDimension::Auto), PlotDimension::Auto);
        assert_eq!(PlotDimension::parse("20000", PlotDimension::Auto), PlotDimension::Auto);
        assert_eq!(PlotDimension::parse("100", PlotDimension::Auto), PlotDimension::Pixels(100));
        assert_eq!(
            PlotDimension::parse("10000", PlotDimension::Auto),
            PlotDimension::Pixels(10000)
        );
    }
}
