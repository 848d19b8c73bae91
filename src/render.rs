use crate::dataset::Column;
use crate::ir::{ChartSpec, Geom, ThemeStyle};
use crate::palette::Color;
use crate::scale::AxisScale;
use anyhow::{anyhow, Context, Result};
use image::ImageEncoder;
use plotters::prelude::*;
use plotters::style::Color as _;
use tracing::debug;

/// Ink for ungrouped points and lines.
const DEFAULT_INK: Color = Color::hex(0x000000);
/// Share of a category slot taken by dodged boxes/violins.
const DODGE_WIDTH: f64 = 0.8;
const VIOLIN_GRID: usize = 64;
/// Largest accepted width or height in pixels.
pub const MAX_DIMENSION: u32 = 16_384;

#[derive(Debug, Clone, Copy)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            width: 800,
            height: 600,
        }
    }
}

/// One colored set of observations. For discrete-x geoms, `x` is the
/// category index.
#[derive(Debug, Clone)]
struct Series {
    key: Option<String>,
    color: Color,
    slot: usize,
    points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone)]
struct Layout {
    x_axis: AxisScale,
    y_axis: AxisScale,
    series: Vec<Series>,
    slots: usize,
}

/// Lay the chart's data out in plot coordinates, one series per scale level.
fn layout(chart: &ChartSpec) -> Result<Layout> {
    let data = &chart.data;
    let x_col = data
        .column(&chart.mapping.x)
        .ok_or_else(|| anyhow!("Column '{}' not found in chart data", chart.mapping.x))?;
    let y_col = data
        .column(&chart.mapping.y)
        .ok_or_else(|| anyhow!("Column '{}' not found in chart data", chart.mapping.y))?;
    if !y_col.is_numeric() {
        anyhow::bail!("Column '{}' must be numeric to be drawn on the y axis", chart.mapping.y);
    }

    let discrete_x = matches!(chart.geom, Geom::Boxplot { .. } | Geom::Violin { .. })
        || !x_col.is_numeric();
    let x_levels: Option<Vec<String>> = if discrete_x {
        Some(
            x_col
                .to_categorical()
                .levels()
                .map(<[String]>::to_vec)
                .unwrap_or_default(),
        )
    } else {
        None
    };

    let group_col: Option<&Column> = chart.mapping.group_column().and_then(|g| data.column(g));
    let keyed = chart.scale.is_some() && group_col.is_some();
    let (mut series, slots) = match (&chart.scale, group_col) {
        (Some(scale), Some(_)) => {
            let dodge = chart.mapping.group_column() != Some(chart.mapping.x.as_str());
            let series: Vec<Series> = scale
                .entries()
                .into_iter()
                .enumerate()
                .map(|(i, (level, color))| Series {
                    key: Some(level.to_string()),
                    color,
                    slot: if dodge { i } else { 0 },
                    points: Vec::new(),
                })
                .collect();
            let slots = if dodge { series.len().max(1) } else { 1 };
            (series, slots)
        }
        _ => (
            vec![Series {
                key: None,
                color: chart.fixed_fill.unwrap_or(DEFAULT_INK),
                slot: 0,
                points: Vec::new(),
            }],
            1,
        ),
    };

    for row in 0..data.n_rows() {
        let Some(y) = y_col.numeric_value(row) else {
            continue;
        };
        let x = match &x_levels {
            Some(levels) => x_col
                .label(row)
                .and_then(|l| levels.iter().position(|lv| *lv == l))
                .map(|idx| idx as f64),
            None => x_col.numeric_value(row),
        };
        let Some(x) = x else {
            continue;
        };

        let target = match (keyed, group_col) {
            (true, Some(col)) => col
                .label(row)
                .and_then(|l| series.iter().position(|s| s.key.as_deref() == Some(l.as_str()))),
            _ => Some(0),
        };
        if let Some(idx) = target {
            series[idx].points.push((x, y));
        }
    }

    let x_axis = match x_levels {
        Some(levels) => AxisScale::categorical(levels),
        None => AxisScale::continuous(series.iter().flat_map(|s| s.points.iter().map(|p| p.0))),
    };
    let y_axis = AxisScale::continuous(series.iter().flat_map(|s| s.points.iter().map(|p| p.1)));

    Ok(Layout {
        x_axis,
        y_axis,
        series,
        slots,
    })
}

/// Render a chart specification to PNG bytes
pub fn render_png(chart: &ChartSpec, config: &RenderConfig) -> Result<Vec<u8>> {
    if config.width == 0 || config.height == 0 {
        anyhow::bail!("Invalid dimensions: {}x{}", config.width, config.height);
    }
    if config.width > MAX_DIMENSION || config.height > MAX_DIMENSION {
        anyhow::bail!(
            "Image too large: {}x{} (max {} per side)",
            config.width,
            config.height,
            MAX_DIMENSION
        );
    }

    let layout = layout(chart)?;
    debug!(
        plot_type = %chart.plot_type(),
        series = layout.series.len(),
        width = config.width,
        height = config.height,
        "rendering chart"
    );

    let buffer_len = (config.width as usize)
        .checked_mul(config.height as usize)
        .and_then(|pixels| pixels.checked_mul(3))
        .ok_or_else(|| anyhow!("Image too large: {}x{}", config.width, config.height))?;
    let mut buffer = vec![0u8; buffer_len];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (config.width, config.height))
            .into_drawing_area();

        root.fill(&WHITE).context("Failed to fill background")?;

        let mut area = root
            .titled(&chart.labels.title, ("sans-serif", 22))
            .context("Failed to draw title")?;
        if let Some(subtitle) = &chart.labels.subtitle {
            area = area
                .titled(subtitle, ("sans-serif", 15))
                .context("Failed to draw subtitle")?;
        }

        let plot_area = match &chart.labels.caption {
            Some(caption) => {
                let (_, h) = area.dim_in_pixel();
                let (body, footer) = area.split_vertically((h as i32 - 24).max(1));
                footer
                    .draw_text(
                        caption,
                        &("sans-serif", 12).into_font().color(&RGBColor(90, 90, 90)),
                        (10, 4),
                    )
                    .context("Failed to draw caption")?;
                body
            }
            None => area,
        };

        let x_range = layout.x_axis.domain.0..layout.x_axis.domain.1;
        let y_range = layout.y_axis.domain.0..layout.y_axis.domain.1;

        let mut ctx = ChartBuilder::on(&plot_area)
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(x_range, y_range)
            .context("Failed to build chart")?;

        let x_axis = &layout.x_axis;
        let x_fmt = |v: &f64| x_axis.label(*v);
        let mut mesh = ctx.configure_mesh();
        mesh.x_desc(&chart.labels.x)
            .y_desc(&chart.labels.y)
            .x_label_formatter(&x_fmt);
        if x_axis.is_categorical() {
            mesh.x_labels(x_axis.categories.len() + 1);
        }
        match chart.theme {
            ThemeStyle::Minimal => {
                mesh.bold_line_style(RGBColor(222, 222, 222))
                    .light_line_style(RGBColor(244, 244, 244))
                    .axis_style(WHITE);
            }
            ThemeStyle::Classic => {
                mesh.disable_mesh().axis_style(BLACK);
            }
        }
        mesh.draw().context("Failed to draw mesh")?;

        let legend_title = chart.labels.legend.as_deref();
        let slot_width = DODGE_WIDTH / layout.slots as f64;

        for series in &layout.series {
            let rgb = to_rgb(series.color);
            let label = match (legend_title, &series.key) {
                (Some(title), Some(key)) => Some(format!("{} = {}", title, key)),
                _ => None,
            };
            let center_offset =
                (series.slot as f64 - (layout.slots as f64 - 1.0) / 2.0) * slot_width;

            match &chart.geom {
                Geom::Point { size, alpha } => {
                    let alpha = *alpha;
                    let radius = size.round().max(1.0) as i32;
                    let anno = ctx
                        .draw_series(
                            series
                                .points
                                .iter()
                                .map(|&p| Circle::new(p, radius, rgb.mix(alpha).filled())),
                        )
                        .context("Failed to draw points")?;
                    if let Some(label) = label {
                        anno.label(label)
                            .legend(move |(x, y)| Circle::new((x, y), 4, rgb.mix(alpha).filled()));
                    }
                }
                Geom::Line { width, alpha } => {
                    let alpha = *alpha;
                    let stroke = (width * 2.0).round().max(1.0) as u32;
                    let mut points = series.points.clone();
                    points.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
                    let anno = ctx
                        .draw_series(LineSeries::new(points, rgb.mix(alpha).stroke_width(stroke)))
                        .context("Failed to draw line series")?;
                    if let Some(label) = label {
                        anno.label(label).legend(move |(x, y)| {
                            PathElement::new(vec![(x, y), (x + 20, y)], rgb.mix(alpha).stroke_width(stroke))
                        });
                    }
                }
                Geom::Boxplot { outline } => {
                    let outline = to_rgb(*outline);
                    let half = slot_width * 0.45;
                    for (category, values) in by_category(series, x_axis.categories.len()) {
                        let Some(stats) = box_stats(&values) else {
                            continue;
                        };
                        let cx = category as f64 + center_offset;
                        let (x0, x1) = (cx - half, cx + half);
                        ctx.draw_series(std::iter::once(Rectangle::new(
                            [(x0, stats.q1), (x1, stats.q3)],
                            rgb.filled(),
                        )))
                        .context("Failed to draw box")?;
                        ctx.draw_series(std::iter::once(Rectangle::new(
                            [(x0, stats.q1), (x1, stats.q3)],
                            outline.stroke_width(1),
                        )))
                        .context("Failed to draw box outline")?;
                        ctx.draw_series(
                            [
                                vec![(x0, stats.median), (x1, stats.median)],
                                vec![(cx, stats.q3), (cx, stats.upper)],
                                vec![(cx, stats.q1), (cx, stats.lower)],
                            ]
                            .into_iter()
                            .map(|path| PathElement::new(path, outline.stroke_width(1))),
                        )
                        .context("Failed to draw whiskers")?;
                        ctx.draw_series(
                            stats
                                .outliers
                                .iter()
                                .map(|&y| Circle::new((cx, y), 2, outline.filled())),
                        )
                        .context("Failed to draw outliers")?;
                    }
                    if let Some(label) = label {
                        ctx.draw_series(std::iter::empty::<Circle<(f64, f64), i32>>())
                            .context("Failed to register legend")?
                            .label(label)
                            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], rgb.filled()));
                    }
                }
                Geom::Violin { alpha } => {
                    let alpha = *alpha;
                    let half = slot_width * 0.45;
                    for (category, values) in by_category(series, x_axis.categories.len()) {
                        let cx = category as f64 + center_offset;
                        let outline_points = violin_outline(&values, cx, half);
                        if outline_points.is_empty() {
                            continue;
                        }
                        let mut closed = outline_points.clone();
                        closed.push(outline_points[0]);
                        ctx.draw_series(std::iter::once(Polygon::new(
                            outline_points,
                            rgb.mix(alpha).filled(),
                        )))
                        .context("Failed to draw violin")?;
                        ctx.draw_series(std::iter::once(PathElement::new(
                            closed,
                            RGBColor(51, 51, 51).stroke_width(1),
                        )))
                        .context("Failed to draw violin outline")?;
                    }
                    if let Some(label) = label {
                        ctx.draw_series(std::iter::empty::<Circle<(f64, f64), i32>>())
                            .context("Failed to register legend")?
                            .label(label)
                            .legend(move |(x, y)| {
                                Rectangle::new([(x, y - 5), (x + 10, y + 5)], rgb.mix(alpha).filled())
                            });
                    }
                }
            }
        }

        if legend_title.is_some() && layout.series.iter().any(|s| s.key.is_some()) {
            ctx.configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK.mix(0.3))
                .label_font(("sans-serif", 13))
                .draw()
                .context("Failed to draw legend")?;
        }

        root.present().context("Failed to present drawing")?;
    }

    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(&buffer, config.width, config.height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
    }

    Ok(png_bytes)
}

fn to_rgb(color: Color) -> RGBColor {
    RGBColor(color.r, color.g, color.b)
}

/// Values of one series bucketed by category index, skipping empty buckets.
fn by_category(series: &Series, n_categories: usize) -> Vec<(usize, Vec<f64>)> {
    let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); n_categories];
    for &(x, y) in &series.points {
        if let Some(bucket) = buckets.get_mut(x as usize) {
            bucket.push(y);
        }
    }
    buckets
        .into_iter()
        .enumerate()
        .filter(|(_, values)| !values.is_empty())
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
struct BoxStats {
    lower: f64,
    q1: f64,
    median: f64,
    q3: f64,
    upper: f64,
    outliers: Vec<f64>,
}

/// Quantile with linear interpolation between order statistics.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Tukey box: whiskers reach the most extreme values within 1.5 IQR.
fn box_stats(values: &[f64]) -> Option<BoxStats> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let q1 = quantile(&sorted, 0.25);
    let median = quantile(&sorted, 0.5);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let (lo_fence, hi_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

    let inside: Vec<f64> = sorted
        .iter()
        .copied()
        .filter(|v| *v >= lo_fence && *v <= hi_fence)
        .collect();
    let outliers = sorted
        .iter()
        .copied()
        .filter(|v| *v < lo_fence || *v > hi_fence)
        .collect();

    Some(BoxStats {
        lower: inside.first().copied().unwrap_or(q1),
        q1,
        median,
        q3,
        upper: inside.last().copied().unwrap_or(q3),
        outliers,
    })
}

/// Mirrored Gaussian density outline, trimmed to the data range and scaled
/// so the widest point spans `half_width` on each side of `center`.
fn violin_outline(values: &[f64], center: f64, half_width: f64) -> Vec<(f64, f64)> {
    if values.is_empty() {
        return Vec::new();
    }
    let n = values.len() as f64;
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if min == max {
        return vec![(center - half_width, min), (center + half_width, max)];
    }

    let mean = values.iter().sum::<f64>() / n;
    let sd = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0).max(1.0)).sqrt();
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let iqr = quantile(&sorted, 0.75) - quantile(&sorted, 0.25);
    let spread = if iqr > 0.0 { sd.min(iqr / 1.34) } else { sd };
    let bandwidth = (0.9 * spread * n.powf(-0.2)).max((max - min) * 1e-3);

    let grid: Vec<f64> = (0..VIOLIN_GRID)
        .map(|i| min + (max - min) * i as f64 / (VIOLIN_GRID - 1) as f64)
        .collect();
    let density: Vec<f64> = grid
        .iter()
        .map(|&y| {
            values
                .iter()
                .map(|&v| (-0.5 * ((y - v) / bandwidth).powi(2)).exp())
                .sum::<f64>()
        })
        .collect();
    let peak = density.iter().copied().fold(0.0, f64::max);
    if peak <= 0.0 {
        return Vec::new();
    }

    let right = grid
        .iter()
        .zip(&density)
        .map(|(&y, &d)| (center + half_width * d / peak, y));
    let left = grid
        .iter()
        .zip(&density)
        .rev()
        .map(|(&y, &d)| (center - half_width * d / peak, y));
    right.chain(left).collect()
}
