use crate::dataset::Column;
use crate::ir::{Aesthetic, DiscreteScale};
use crate::palette::{Color, ColorPalette};

/// Build a manual discrete scale over the levels of `column`.
/// Numeric columns are read through their categorical form.
pub fn build_discrete_scale(
    aesthetic: Aesthetic,
    variable: &str,
    column: &Column,
    palette: &ColorPalette,
) -> DiscreteScale {
    let levels = match column.levels() {
        Some(levels) => levels.to_vec(),
        None => column
            .to_categorical()
            .levels()
            .map(<[String]>::to_vec)
            .unwrap_or_default(),
    };

    DiscreteScale {
        aesthetic,
        variable: variable.to_string(),
        levels,
        values: palette.colors().to_vec(),
    }
}

impl DiscreteScale {
    /// Level → color pairs in level order. Only as many entries as levels.
    pub fn entries(&self) -> Vec<(&str, Color)> {
        if self.values.is_empty() {
            return Vec::new();
        }
        self.levels
            .iter()
            .enumerate()
            .map(|(i, level)| (level.as_str(), self.values[i % self.values.len()]))
            .collect()
    }
}

/// Axis extent in data space. Categorical axes place level `i` at `x = i`.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisScale {
    pub domain: (f64, f64),
    pub categories: Vec<String>,
}

impl AxisScale {
    pub fn continuous<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let (min, max) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });

        let domain = if min == f64::INFINITY {
            (0.0, 1.0)
        } else {
            pad_range(min, max)
        };

        AxisScale {
            domain,
            categories: Vec::new(),
        }
    }

    pub fn categorical(categories: Vec<String>) -> Self {
        let n = categories.len().max(1) as f64;
        AxisScale {
            domain: (-0.5, n - 0.5),
            categories,
        }
    }

    pub fn is_categorical(&self) -> bool {
        !self.categories.is_empty()
    }

    /// Tick label for a position on this axis.
    pub fn label(&self, value: f64) -> String {
        if self.is_categorical() {
            let rounded = value.round();
            if (value - rounded).abs() > 1e-6 || rounded < 0.0 {
                return String::new();
            }
            self.categories
                .get(rounded as usize)
                .cloned()
                .unwrap_or_default()
        } else {
            format!("{}", (value * 100.0).round() / 100.0)
        }
    }
}

pub fn pad_range(min: f64, max: f64) -> (f64, f64) {
    if min == max {
        (min - 1.0, max + 1.0)
    } else {
        let padding = (max - min) * 0.05;
        (min - padding, max + padding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::{viridis, BuiltinPalette};

    #[test]
    fn test_discrete_scale_entries_match_levels() {
        let column = Column::numeric(vec![Some(4.0), Some(8.0), Some(6.0), Some(4.0)]);
        let palette = ColorPalette::builtin(BuiltinPalette::Ocean, column.cardinality());
        let scale = build_discrete_scale(Aesthetic::Fill, "cyl", &column, &palette);

        assert_eq!(scale.levels, vec!["4", "6", "8"]);
        assert_eq!(scale.values.len(), 6);
        assert_eq!(scale.entries().len(), 3);
        assert_eq!(scale.entries()[1], ("6", palette.colors()[1]));
    }

    #[test]
    fn test_discrete_scale_empty_palette() {
        let column = Column::categorical(vec![Some("a".to_string())]);
        let scale = build_discrete_scale(Aesthetic::Color, "g", &column, &ColorPalette::new(vec![]));
        assert!(scale.entries().is_empty());
    }

    #[test]
    fn test_discrete_scale_generated_palette() {
        let column = Column::categorical(vec![Some("a".to_string()), Some("b".to_string())]);
        let scale = build_discrete_scale(Aesthetic::Color, "g", &column, &ColorPalette::generated(2));
        assert_eq!(scale.values, viridis(2));
    }

    #[test]
    fn test_scale_continuous_padding() {
        let axis = AxisScale::continuous(vec![0.0, 10.0]);
        assert!(axis.domain.0 < 0.0);
        assert!(axis.domain.1 > 10.0);
        assert!(!axis.is_categorical());
    }

    #[test]
    fn test_scale_single_point() {
        let axis = AxisScale::continuous(vec![5.0]);
        assert_eq!(axis.domain, (4.0, 6.0));
    }

    #[test]
    fn test_scale_empty_values() {
        let axis = AxisScale::continuous(Vec::new());
        assert_eq!(axis.domain, (0.0, 1.0));
    }

    #[test]
    fn test_scale_categorical() {
        let axis = AxisScale::categorical(vec!["A".to_string(), "B".to_string()]);
        assert!(axis.is_categorical());
        assert_eq!(axis.domain, (-0.5, 1.5));
        assert_eq!(axis.label(1.0), "B");
        assert_eq!(axis.label(0.5), "");
        assert_eq!(axis.label(7.0), "");
    }
}
