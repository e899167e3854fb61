use crate::presentation::{ChartKind, ChartSpec};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::error::Error;
use std::f64::consts::PI;
use std::path::Path;

type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;

/// Configuration options for chart rendering
///
/// Titles, axis labels and series come from the [`ChartSpec`]; only the
/// canvas size is chosen by the caller.
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Width of the graph in pixels
    pub width: u32,

    /// Height of the graph in pixels
    pub height: u32,
}

impl Default for GraphOptions {
    /// 800x600 pixels
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

/// Renders a chart to an SVG document
///
/// This is the main entry point for drawing a dashboard chart. It dispatches
/// on the chart kind; a spec without data points yields an empty chart with
/// its title and axes rather than an error.
///
/// # Arguments
/// * `spec` - Finished dataset and encoding from the presentation layer
/// * `options` - Canvas size
///
/// # Returns
/// * A Result containing the SVG markup or an error
///
/// # Examples
/// ```
/// use provider_dashboard::graph::{render_chart, GraphOptions};
/// use provider_dashboard::presentation::{ChartKind, ChartSpec};
///
/// let spec = ChartSpec {
///     kind: ChartKind::Line,
///     title: "Empty".to_string(),
///     x_field: "month".to_string(),
///     y_field: "count".to_string(),
///     color_field: None,
///     x_label: "Month".to_string(),
///     y_label: "Count".to_string(),
///     category_order: vec!["Jan".to_string(), "Feb".to_string()],
///     series: Vec::new(),
/// };
///
/// let svg = render_chart(&spec, &GraphOptions::default()).unwrap();
/// assert!(svg.contains("<svg"));
/// ```
pub fn render_chart(spec: &ChartSpec, options: &GraphOptions) -> Result<String, Box<dyn Error>> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE)?;

        match spec.kind {
            ChartKind::Line => draw_line_chart(&root, spec)?,
            ChartKind::StackedBar => draw_stacked_bar_chart(&root, spec)?,
            ChartKind::Pie => draw_pie_chart(&root, spec)?,
        }

        root.present()?;
    }
    Ok(svg)
}

/// Saves a chart as an SVG file
///
/// # Arguments
/// * `spec` - Chart to draw
/// * `options` - Canvas size
/// * `path` - File path where the chart should be saved
pub fn save_chart(
    spec: &ChartSpec,
    options: &GraphOptions,
    path: impl AsRef<Path>,
) -> Result<(), Box<dyn Error>> {
    let svg = render_chart(spec, options)?;
    std::fs::write(path, svg)?;
    Ok(())
}

fn category_position(categories: &[String], value: &str) -> Option<usize> {
    categories.iter().position(|c| c == value)
}

fn category_label(categories: &[String], value: &SegmentValue<i32>) -> String {
    match value {
        SegmentValue::CenterOf(idx) => usize::try_from(*idx)
            .ok()
            .and_then(|i| categories.get(i))
            .cloned()
            .unwrap_or_default(),
        _ => String::new(),
    }
}

// Segmented axis over the categories; at least two segments so the range is never degenerate
fn segment_upper(categories: &[String]) -> i32 {
    (categories.len() as i32 - 1).max(1)
}

fn axis_max(max: f64) -> f64 {
    if max > 0.0 { max * 1.1 } else { 1.0 }
}

fn series_color(idx: usize) -> RGBAColor {
    Palette99::pick(idx).to_rgba()
}

/// Line chart over a categorical x axis, one line per series
///
/// Points are placed by their position in `category_order`, so months are
/// drawn in calendar order whatever order the rows arrived in.
fn draw_line_chart(root: &Area<'_>, spec: &ChartSpec) -> Result<(), Box<dyn Error>> {
    let categories = &spec.category_order;
    let y_max = spec
        .series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.y))
        .fold(0.0, f64::max);

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, ("sans-serif", 24).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d((0..segment_upper(categories)).into_segmented(), 0f64..axis_max(y_max))?;

    let formatter = |v: &SegmentValue<i32>| category_label(categories, v);
    chart
        .configure_mesh()
        .x_labels(categories.len().max(1))
        .x_label_formatter(&formatter)
        .x_desc(&spec.x_label)
        .y_desc(&spec.y_label)
        .draw()?;

    for (idx, series) in spec.series.iter().enumerate() {
        let color = series_color(idx);

        let mut points: Vec<(usize, f64)> = series
            .points
            .iter()
            .filter_map(|p| category_position(categories, &p.x).map(|pos| (pos, p.y)))
            .collect();
        points.sort_by_key(|(pos, _)| *pos);

        let coords: Vec<(SegmentValue<i32>, f64)> = points
            .iter()
            .map(|&(pos, y)| (SegmentValue::CenterOf(pos as i32), y))
            .collect();

        chart
            .draw_series(LineSeries::new(coords.clone(), color.stroke_width(2)))?
            .label(series.name.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));

        chart.draw_series(
            coords
                .into_iter()
                .map(|(x, y)| Circle::new((x, y), 3, color.filled())),
        )?;
    }

    if !spec.series.is_empty() {
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    Ok(())
}

/// Bars per category with one stacked segment per series
fn draw_stacked_bar_chart(root: &Area<'_>, spec: &ChartSpec) -> Result<(), Box<dyn Error>> {
    let categories = &spec.category_order;

    let mut totals = vec![0f64; categories.len()];
    for series in &spec.series {
        for point in &series.points {
            if let Some(pos) = category_position(categories, &point.x) {
                totals[pos] += point.y;
            }
        }
    }
    let y_max = totals.iter().copied().fold(0.0, f64::max);

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, ("sans-serif", 24).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d((0..segment_upper(categories)).into_segmented(), 0f64..axis_max(y_max))?;

    let formatter = |v: &SegmentValue<i32>| category_label(categories, v);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(categories.len().max(1))
        .x_label_formatter(&formatter)
        .x_desc(&spec.x_label)
        .y_desc(&spec.y_label)
        .draw()?;

    let mut base = vec![0f64; categories.len()];
    for (idx, series) in spec.series.iter().enumerate() {
        let color = series_color(idx);

        let mut bars = Vec::new();
        for point in &series.points {
            let Some(pos) = category_position(categories, &point.x) else {
                continue;
            };
            let bottom = base[pos];
            let top = bottom + point.y;
            base[pos] = top;

            let mut bar = Rectangle::new(
                [
                    (SegmentValue::Exact(pos as i32), bottom),
                    (SegmentValue::Exact(pos as i32 + 1), top),
                ],
                color.filled(),
            );
            bar.set_margin(0, 0, 8, 8);
            bars.push(bar);
        }

        chart
            .draw_series(bars)?
            .label(series.name.clone())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    if !spec.series.is_empty() {
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    Ok(())
}

/// Pie chart of the first series, slices in category order
///
/// Slices are drawn as polygons around the centre of the canvas and
/// labelled with their category and share.
fn draw_pie_chart(root: &Area<'_>, spec: &ChartSpec) -> Result<(), Box<dyn Error>> {
    let area = root.titled(&spec.title, ("sans-serif", 24).into_font())?;

    let Some(series) = spec.series.first() else {
        return Ok(());
    };

    let slices: Vec<(&str, f64)> = series
        .points
        .iter()
        .filter(|p| p.y > 0.0)
        .map(|p| (p.x.as_str(), p.y))
        .collect();
    let total: f64 = slices.iter().map(|(_, y)| y).sum();
    if total <= 0.0 {
        return Ok(());
    }

    let (width, height) = area.dim_in_pixel();
    let center = (width as i32 / 2, height as i32 / 2);
    let radius = f64::from(width.min(height)) * 0.35;
    let point_at = |angle: f64, r: f64| {
        (
            center.0 + (r * angle.cos()).round() as i32,
            center.1 + (r * angle.sin()).round() as i32,
        )
    };

    let mut start = -PI / 2.0;
    for (label, value) in slices {
        let sweep = 2.0 * PI * value / total;
        let color_idx = category_position(&spec.category_order, label).unwrap_or_default();
        let color = series_color(color_idx);

        let steps = ((sweep / (2.0 * PI)) * 120.0).ceil().max(2.0) as usize;
        let mut outline = Vec::with_capacity(steps + 2);
        outline.push(center);
        for step in 0..=steps {
            outline.push(point_at(start + sweep * step as f64 / steps as f64, radius));
        }
        area.draw(&Polygon::new(outline, color.filled()))?;

        let mid = start + sweep / 2.0;
        area.draw(&Text::new(
            format!("{} ({:.1}%)", label, 100.0 * value / total),
            point_at(mid, radius * 1.15),
            ("sans-serif", 14).into_font(),
        ))?;

        start += sweep;
    }

    Ok(())
}
