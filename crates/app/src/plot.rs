//! Stacked line charts rendered to PNG.

use std::error::Error;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

/// One named line on a panel.
pub struct Series<'a> {
    pub label: &'a str,
    pub color: RGBColor,
    pub x: &'a [f64],
    pub y: &'a [f64],
}

/// One chart in the vertical stack.
pub struct Panel<'a> {
    pub title: &'a str,
    pub x_label: &'a str,
    pub y_label: &'a str,
    pub series: Vec<Series<'a>>,
    /// Draw a reference line at y = 0
    pub zero_line: bool,
}

/// Axis bounds covering every value with 5% headroom on each side.
///
/// Flat data gets a unit band around it; no data gives `(0, 1)`.
pub fn axis_range(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

    if min > max {
        return (0.0, 1.0);
    }
    if max - min < f64::EPSILON * max.abs().max(1.0) {
        return (min - 1.0, max + 1.0);
    }
    let pad = 0.05 * (max - min);
    (min - pad, max + pad)
}

fn draw_panel(area: &DrawingArea<BitMapBackend<'_>, Shift>, panel: &Panel<'_>) -> Result<(), Box<dyn Error>> {
    let (x_min, x_max) = axis_range(panel.series.iter().flat_map(|s| s.x.iter().copied()));
    let zero = panel.zero_line.then_some(0.0);
    let (y_min, y_max) = axis_range(
        panel
            .series
            .iter()
            .flat_map(|s| s.y.iter().copied())
            .chain(zero),
    );

    let mut chart = ChartBuilder::on(area)
        .caption(panel.title, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(35)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc(panel.x_label)
        .y_desc(panel.y_label)
        .draw()?;

    for series in &panel.series {
        let color = series.color;
        chart
            .draw_series(LineSeries::new(
                series.x.iter().copied().zip(series.y.iter().copied()),
                &color,
            ))?
            .label(series.label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.filled()));
    }

    if panel.zero_line {
        chart.draw_series(LineSeries::new(vec![(x_min, 0.0), (x_max, 0.0)], &BLACK))?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    Ok(())
}

/// Renders `panels` top to bottom into a single PNG at `path`.
pub fn draw_stacked(path: impl AsRef<Path>, size: (u32, u32), panels: &[Panel<'_>]) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path.as_ref(), size).into_drawing_area();
    root.fill(&WHITE)?;

    let areas = root.split_evenly((panels.len().max(1), 1));
    for (area, panel) in areas.iter().zip(panels) {
        draw_panel(area, panel)?;
    }

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_range_pads_spread() {
        let (lo, hi) = axis_range([0.0, 10.0, 5.0]);
        assert!((lo + 0.5).abs() < 1e-12);
        assert!((hi - 10.5).abs() < 1e-12);
    }

    #[test]
    fn test_axis_range_flat_and_empty() {
        assert_eq!(axis_range([3.0, 3.0]), (2.0, 4.0));
        assert_eq!(axis_range(Vec::<f64>::new()), (0.0, 1.0));
        assert_eq!(axis_range([f64::NAN]), (0.0, 1.0));
    }

    #[test]
    fn test_axis_range_skips_non_finite() {
        let (lo, hi) = axis_range([f64::NEG_INFINITY, -2.0, 2.0, f64::NAN]);
        assert!((lo + 2.2).abs() < 1e-12);
        assert!((hi - 2.2).abs() < 1e-12);
    }
}
