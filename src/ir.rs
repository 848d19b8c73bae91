use crate::dataset::Dataset;
use crate::palette::Color;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::PlotError;

// =============================================================================
// Request vocabulary
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotType {
    Point,
    Line,
    Boxplot,
    Violin,
}

impl PlotType {
    pub const ALL: [PlotType; 4] = [
        PlotType::Point,
        PlotType::Line,
        PlotType::Boxplot,
        PlotType::Violin,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PlotType::Point => "point",
            PlotType::Line => "line",
            PlotType::Boxplot => "boxplot",
            PlotType::Violin => "violin",
        }
    }
}

impl FromStr for PlotType {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlotType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| PlotError::InvalidPlotType(s.to_string()))
    }
}

impl fmt::Display for PlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeStyle {
    #[default]
    Minimal,
    Classic,
}

impl ThemeStyle {
    pub const ALL: [ThemeStyle; 2] = [ThemeStyle::Minimal, ThemeStyle::Classic];

    pub fn as_str(self) -> &'static str {
        match self {
            ThemeStyle::Minimal => "minimal",
            ThemeStyle::Classic => "classic",
        }
    }
}

impl FromStr for ThemeStyle {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ThemeStyle::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| PlotError::InvalidTheme(s.to_string()))
    }
}

impl fmt::Display for ThemeStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Chart specification
// =============================================================================

/// Declarative description of one chart, handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub geom: Geom,
    pub mapping: Mapping,
    /// Discrete color/fill scale, present when something is grouped
    pub scale: Option<DiscreteScale>,
    /// Single fill for ungrouped boxplots and violins
    pub fixed_fill: Option<Color>,
    /// The resolved palette, before it is matched against levels
    pub palette: Vec<Color>,
    pub theme: ThemeStyle,
    pub labels: Labels,
    /// Working copy the chart draws from (ungrouped, group column categorical)
    pub data: Dataset,
}

impl ChartSpec {
    pub fn plot_type(&self) -> PlotType {
        self.geom.plot_type()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Geom {
    Point { size: f64, alpha: f64 },
    Line { width: f64, alpha: f64 },
    Boxplot { outline: Color },
    Violin { alpha: f64 },
}

impl Geom {
    pub fn plot_type(&self) -> PlotType {
        match self {
            Geom::Point { .. } => PlotType::Point,
            Geom::Line { .. } => PlotType::Line,
            Geom::Boxplot { .. } => PlotType::Boxplot,
            Geom::Violin { .. } => PlotType::Violin,
        }
    }
}

/// Aesthetic mappings (data columns → visual properties)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mapping {
    pub x: String,
    pub y: String,
    pub color: Option<String>,
    pub fill: Option<String>,
}

impl Mapping {
    /// The column driving series separation, whichever aesthetic carries it.
    pub fn group_column(&self) -> Option<&str> {
        self.color.as_deref().or(self.fill.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Aesthetic {
    Color,
    Fill,
}

/// Manual discrete scale: one entry per level; surplus palette values are unused.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscreteScale {
    pub aesthetic: Aesthetic,
    pub variable: String,
    pub levels: Vec<String>,
    pub values: Vec<Color>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Labels {
    pub title: String,
    pub subtitle: Option<String>,
    pub caption: Option<String>,
    pub x: String,
    pub y: String,
    pub legend: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plot_type_from_str() {
        assert_eq!("violin".parse::<PlotType>().unwrap(), PlotType::Violin);
        assert_eq!(
            "scatter3d".parse::<PlotType>(),
            Err(PlotError::InvalidPlotType("scatter3d".to_string()))
        );
        assert!("Point".parse::<PlotType>().is_err());
    }

    #[test]
    fn test_theme_from_str() {
        assert_eq!("classic".parse::<ThemeStyle>().unwrap(), ThemeStyle::Classic);
        assert_eq!(ThemeStyle::default(), ThemeStyle::Minimal);
        assert_eq!(
            "dark".parse::<ThemeStyle>(),
            Err(PlotError::InvalidTheme("dark".to_string()))
        );
    }

    #[test]
    fn test_mapping_group_column() {
        let mapping = Mapping {
            x: "cyl".to_string(),
            y: "mpg".to_string(),
            color: None,
            fill: Some("am".to_string()),
        };
        assert_eq!(mapping.group_column(), Some("am"));
    }

    #[test]
    fn test_geom_serializes_tagged() {
        let json = serde_json::to_value(Geom::Point { size: 3.0, alpha: 0.7 }).unwrap();
        assert_eq!(json["type"], "point");
        assert_eq!(json["size"], 3.0);
    }
}
