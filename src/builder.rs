use crate::dataset::{Column, Dataset};
use crate::error::{PlotError, Result};
use crate::ir::{Aesthetic, ChartSpec, DiscreteScale, Geom, Labels, Mapping, PlotType, ThemeStyle};
use crate::palette::{Color, ColorPalette};
use crate::scale::build_discrete_scale;
use tracing::debug;

const POINT_SIZE: f64 = 3.0;
const POINT_ALPHA: f64 = 0.7;
const LINE_WIDTH: f64 = 1.0;
const LINE_ALPHA: f64 = 0.8;
const VIOLIN_ALPHA: f64 = 0.7;
const BOX_OUTLINE: Color = Color::hex(0x333333);
/// Used only when the palette came out empty (a group column with no values).
const FALLBACK_FILL: Color = Color::hex(0x595959);

/// Arguments for one plot. Column references are plain column names.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotArgs {
    pub x: String,
    pub y: String,
    pub group: Option<String>,
    pub plot_type: String,
    /// Built-in palette name; unknown names fall back to viridis
    pub palette: Option<String>,
    pub theme: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub caption: Option<String>,
}

impl PlotArgs {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        PlotArgs {
            x: x.into(),
            y: y.into(),
            group: None,
            plot_type: PlotType::Point.as_str().to_string(),
            palette: None,
            theme: ThemeStyle::default().as_str().to_string(),
            title: None,
            subtitle: None,
            caption: None,
        }
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn plot_type(mut self, plot_type: impl Into<String>) -> Self {
        self.plot_type = plot_type.into();
        self
    }

    pub fn palette(mut self, palette: impl Into<String>) -> Self {
        self.palette = Some(palette.into());
        self
    }

    pub fn theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = theme.into();
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

/// Validate `args` against `dataset` and derive the full chart specification.
///
/// The dataset itself is never modified: grouping annotations are dropped
/// and a numeric group column is made categorical on a working copy, which
/// the returned chart carries.
///
/// # Errors
///
/// Fails on the first of: a missing x, y or group column (checked in that
/// order), an unknown theme, an unknown plot type. An unknown palette name
/// is not an error.
pub fn build_plot(dataset: &Dataset, args: &PlotArgs) -> Result<ChartSpec> {
    let mut data = dataset.clone();
    if data.is_grouped() {
        debug!(grouping = ?data.grouping(), "dropping grouping annotation");
        data.ungroup();
    }

    require_column(&data, &args.x, "x")?;
    require_column(&data, &args.y, "y")?;
    if let Some(group) = &args.group {
        require_column(&data, group, "group")?;
    }

    let group = args.group.as_deref();
    if let Some(g) = group {
        // A group that is also an axis keeps its numeric values; the scale
        // reads its categorical view instead.
        let is_axis = g == args.x || g == args.y;
        if !is_axis && data.is_numeric(g) == Some(true) {
            debug!(column = g, "converting numeric group column to categorical");
            data.convert_to_categorical(g);
        }
    }

    let x_column = require_column(&data, &args.x, "x")?;
    let x_categorical = !x_column.is_numeric();
    let group_count = match group {
        Some(g) => require_column(&data, g, "group")?.cardinality(),
        None if x_categorical => x_column.cardinality(),
        None => 1,
    };

    let palette = ColorPalette::resolve(args.palette.as_deref(), group_count);
    let theme: ThemeStyle = args.theme.parse()?;
    let plot_type: PlotType = args.plot_type.parse()?;

    debug!(
        plot_type = %plot_type,
        theme = %theme,
        group_count,
        palette_len = palette.len(),
        "resolved plot"
    );

    let first_color = palette.first().unwrap_or(FALLBACK_FILL);
    let scale_on = |aesthetic: Aesthetic, variable: &str| -> Result<DiscreteScale> {
        let column = require_column(&data, variable, "group")?;
        Ok(build_discrete_scale(aesthetic, variable, column, &palette))
    };

    let mut mapping = Mapping {
        x: args.x.clone(),
        y: args.y.clone(),
        color: None,
        fill: None,
    };
    let mut scale = None;
    let mut fixed_fill = None;

    let geom = match plot_type {
        PlotType::Point | PlotType::Line => {
            if let Some(g) = group {
                mapping.color = Some(g.to_string());
                scale = Some(scale_on(Aesthetic::Color, g)?);
            }
            if plot_type == PlotType::Point {
                Geom::Point {
                    size: POINT_SIZE,
                    alpha: POINT_ALPHA,
                }
            } else {
                Geom::Line {
                    width: LINE_WIDTH,
                    alpha: LINE_ALPHA,
                }
            }
        }
        PlotType::Boxplot => {
            match group {
                Some(g) => {
                    mapping.fill = Some(g.to_string());
                    scale = Some(scale_on(Aesthetic::Fill, g)?);
                }
                None => fixed_fill = Some(first_color),
            }
            Geom::Boxplot {
                outline: BOX_OUTLINE,
            }
        }
        PlotType::Violin => {
            match group {
                Some(g) => {
                    mapping.fill = Some(g.to_string());
                    scale = Some(scale_on(Aesthetic::Fill, g)?);
                }
                // Ungrouped categorical x still gets one color per level
                None if x_categorical => {
                    mapping.fill = Some(args.x.clone());
                    scale = Some(scale_on(Aesthetic::Fill, &args.x)?);
                }
                None => fixed_fill = Some(first_color),
            }
            Geom::Violin {
                alpha: VIOLIN_ALPHA,
            }
        }
    };

    let labels = Labels {
        title: resolve_title(args.title.as_deref(), &args.x, &args.y),
        subtitle: non_empty(args.subtitle.as_deref()),
        caption: non_empty(args.caption.as_deref()),
        x: args.x.clone(),
        y: args.y.clone(),
        legend: group.map(str::to_string),
    };

    Ok(ChartSpec {
        geom,
        mapping,
        scale,
        fixed_fill,
        palette: palette.into_colors(),
        theme,
        labels,
        data,
    })
}

fn require_column<'a>(data: &'a Dataset, name: &str, role: &'static str) -> Result<&'a Column> {
    data.column(name).ok_or_else(|| PlotError::ColumnNotFound {
        column: name.to_string(),
        role,
        available: data.column_names().to_vec(),
    })
}

/// Caller's title when non-empty, otherwise "Plot of {y} by {x}".
pub fn resolve_title(title: Option<&str>, x: &str, y: &str) -> String {
    match non_empty(title) {
        Some(t) => t,
        None => format!("Plot of {} by {}", y, x),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::viridis;
    use std::io::Cursor;

    const CARS: &str = "\
model,mpg,cyl,am,gear
Mazda RX4,21.0,6,1,4
Datsun 710,22.8,4,1,4
Hornet Sportabout,18.7,8,0,3
Valiant,18.1,6,0,3
Merc 240D,24.4,4,0,4
Fiat 128,32.4,4,1,4
Camaro Z28,13.3,8,0,3
Porsche 914-2,26.0,4,1,5
Ferrari Dino,19.7,6,1,5
";

    fn cars() -> Dataset {
        Dataset::from_reader(Cursor::new(CARS)).unwrap()
    }

    #[test]
    fn test_missing_columns_named_in_order() {
        let data = cars();

        let err = build_plot(&data, &PlotArgs::new("nope", "also_nope")).unwrap_err();
        assert!(matches!(&err, PlotError::ColumnNotFound { column, role: "x", .. } if column == "nope"));

        let err = build_plot(&data, &PlotArgs::new("cyl", "weight")).unwrap_err();
        assert!(err.to_string().contains("weight"));

        let err = build_plot(&data, &PlotArgs::new("cyl", "nope").group("nada")).unwrap_err();
        assert!(matches!(&err, PlotError::ColumnNotFound { column, role: "y", .. } if column == "nope"));

        let err = build_plot(&data, &PlotArgs::new("cyl", "mpg").group("carb")).unwrap_err();
        assert!(matches!(&err, PlotError::ColumnNotFound { role: "group", .. }));
        assert!(err.to_string().contains("carb"));
    }

    #[test]
    fn test_column_check_precedes_type_check() {
        let args = PlotArgs::new("cyl", "weight").plot_type("scatter3d");
        assert!(matches!(
            build_plot(&cars(), &args),
            Err(PlotError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_default_title() {
        let chart = build_plot(&cars(), &PlotArgs::new("cyl", "mpg").plot_type("point")).unwrap();
        assert_eq!(chart.labels.title, "Plot of mpg by cyl");
    }

    #[test]
    fn test_custom_title_overrides_default() {
        let args = PlotArgs::new("cyl", "mpg").title("My Custom Title");
        let chart = build_plot(&cars(), &args).unwrap();
        assert_eq!(chart.labels.title, "My Custom Title");
    }

    #[test]
    fn test_empty_title_uses_default() {
        assert_eq!(resolve_title(Some(""), "wt", "mpg"), "Plot of mpg by wt");
    }

    #[test]
    fn test_numeric_group_is_made_categorical() {
        let data = cars();
        let args = PlotArgs::new("mpg", "gear").group("cyl");
        let chart = build_plot(&data, &args).unwrap();

        assert_eq!(chart.data.is_numeric("cyl"), Some(false));
        // Caller's dataset untouched
        assert_eq!(data.is_numeric("cyl"), Some(true));

        let scale = chart.scale.unwrap();
        assert_eq!(scale.aesthetic, Aesthetic::Color);
        assert_eq!(scale.levels, vec!["4", "6", "8"]);
        assert_eq!(scale.entries().len(), 3);
    }

    #[test]
    fn test_group_on_axis_column_stays_numeric() {
        let data = cars();
        for args in [
            PlotArgs::new("cyl", "mpg").group("mpg"),
            PlotArgs::new("cyl", "mpg").group("cyl").plot_type("boxplot"),
        ] {
            let chart = build_plot(&data, &args).unwrap();
            assert_eq!(chart.data.is_numeric("mpg"), Some(true));
            assert_eq!(chart.data.is_numeric("cyl"), Some(true));
            let group = args.group.as_deref().unwrap();
            let cardinality = data.column(group).unwrap().cardinality();
            assert_eq!(chart.scale.unwrap().entries().len(), cardinality);
        }
    }

    #[test]
    fn test_known_palette_length() {
        let args = PlotArgs::new("mpg", "gear").group("cyl").palette("sunset");
        let chart = build_plot(&cars(), &args).unwrap();
        assert_eq!(chart.palette.len(), 6);

        let args = PlotArgs::new("cyl", "mpg").palette("forest");
        let chart = build_plot(&cars(), &args).unwrap();
        assert_eq!(chart.palette.len(), 6);
    }

    #[test]
    fn test_unknown_palette_falls_back_to_viridis() {
        let args = PlotArgs::new("mpg", "gear").group("cyl").palette("sunsett");
        let chart = build_plot(&cars(), &args).unwrap();
        assert_eq!(chart.palette, viridis(3));
    }

    #[test]
    fn test_ungrouped_numeric_x_uses_single_color() {
        let args = PlotArgs::new("cyl", "mpg").plot_type("boxplot");
        let chart = build_plot(&cars(), &args).unwrap();
        assert_eq!(chart.palette, viridis(1));
        assert_eq!(chart.fixed_fill, Some(viridis(1)[0]));
        assert!(chart.scale.is_none());
        assert_eq!(chart.labels.legend, None);
    }

    #[test]
    fn test_categorical_x_drives_group_count() {
        let args = PlotArgs::new("model", "mpg");
        let chart = build_plot(&cars(), &args).unwrap();
        assert_eq!(chart.palette.len(), 9);
        // Points are not auto-grouped on x
        assert!(chart.scale.is_none());
        assert_eq!(chart.mapping.color, None);
    }

    #[test]
    fn test_grouped_boxplot_fill_scale() {
        let args = PlotArgs::new("cyl", "mpg").group("am").plot_type("boxplot").palette("ocean");
        let chart = build_plot(&cars(), &args).unwrap();
        assert_eq!(chart.geom, Geom::Boxplot { outline: BOX_OUTLINE });
        assert_eq!(chart.mapping.fill.as_deref(), Some("am"));
        assert_eq!(chart.fixed_fill, None);
        let scale = chart.scale.unwrap();
        assert_eq!(scale.aesthetic, Aesthetic::Fill);
        assert_eq!(scale.levels, vec!["0", "1"]);
        assert_eq!(chart.labels.legend.as_deref(), Some("am"));
    }

    #[test]
    fn test_violin_falls_back_to_categorical_x() {
        let data = Dataset::from_reader(Cursor::new(
            "species,width\nsetosa,3.5\nversicolor,3.2\nvirginica,3.3\nsetosa,3.0",
        ))
        .unwrap();
        let args = PlotArgs::new("species", "width").plot_type("violin");
        let chart = build_plot(&data, &args).unwrap();

        assert_eq!(chart.mapping.fill.as_deref(), Some("species"));
        assert_eq!(chart.fixed_fill, None);
        let scale = chart.scale.unwrap();
        assert_eq!(scale.variable, "species");
        assert_eq!(scale.entries().len(), 3);
        assert_eq!(chart.labels.legend, None);
    }

    #[test]
    fn test_violin_numeric_x_single_fill() {
        let args = PlotArgs::new("cyl", "mpg").plot_type("violin").palette("berry");
        let chart = build_plot(&cars(), &args).unwrap();
        assert!(chart.scale.is_none());
        assert_eq!(chart.fixed_fill, Some(chart.palette[0]));
    }

    #[test]
    fn test_line_geometry() {
        let args = PlotArgs::new("mpg", "gear").group("am").plot_type("line");
        let chart = build_plot(&cars(), &args).unwrap();
        assert_eq!(chart.plot_type(), PlotType::Line);
        assert_eq!(chart.geom, Geom::Line { width: LINE_WIDTH, alpha: LINE_ALPHA });
        assert_eq!(chart.mapping.color.as_deref(), Some("am"));
    }

    #[test]
    fn test_invalid_plot_type() {
        let args = PlotArgs::new("cyl", "mpg").plot_type("scatter3d");
        assert_eq!(
            build_plot(&cars(), &args).unwrap_err(),
            PlotError::InvalidPlotType("scatter3d".to_string())
        );
    }

    #[test]
    fn test_invalid_theme() {
        let args = PlotArgs::new("cyl", "mpg").theme("dark");
        assert_eq!(
            build_plot(&cars(), &args).unwrap_err(),
            PlotError::InvalidTheme("dark".to_string())
        );
    }

    #[test]
    fn test_grouping_annotation_is_dropped() {
        let data = cars().group_by(["cyl"]);
        let chart = build_plot(&data, &PlotArgs::new("cyl", "mpg")).unwrap();
        assert!(!chart.data.is_grouped());
        assert!(data.is_grouped());
    }

    #[test]
    fn test_idempotent() {
        let data = cars();
        let args = PlotArgs::new("cyl", "mpg")
            .group("gear")
            .plot_type("violin")
            .palette("earth")
            .theme("classic")
            .subtitle("Motor Trend")
            .caption("1974");
        let first = build_plot(&data, &args).unwrap();
        let second = build_plot(&data, &args).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.labels.subtitle.as_deref(), Some("Motor Trend"));
        assert_eq!(first.theme, ThemeStyle::Classic);
    }
}
