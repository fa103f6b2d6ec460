//! Chart export to PNG (plotters bitmap).

use std::path::{Path, PathBuf};

use color_eyre::eyre::eyre;
use color_eyre::Result;
use log::info;
use plotters::prelude::*;

use crate::chart_data::{BarChartData, ChartData, LineChartData};

pub const DEFAULT_EXPORT_SIZE: (u32, u32) = (800, 600);

const PALETTE: [RGBColor; 7] = [
    RGBColor(0, 179, 230),   // cyan
    RGBColor(230, 0, 128),   // magenta
    RGBColor(0, 179, 0),     // green
    RGBColor(230, 204, 0),   // yellow
    RGBColor(0, 0, 230),     // blue
    RGBColor(230, 0, 0),     // red
    RGBColor(128, 230, 230), // light cyan
];

/// `<stem>_chart.png` next to the current directory, for a chart of `source`.
pub fn default_export_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "crosstab".to_string());
    PathBuf::from(format!("{}_chart.png", stem))
}

/// Label of the category at x position `x`, or empty between categories.
fn category_label(labels: &[String], x: f64) -> String {
    let i = x.round();
    if (x - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    labels.get(i as usize).cloned().unwrap_or_default()
}

/// Write chart to PNG using plotters bitmap backend.
pub fn write_chart_png(path: &Path, chart: &ChartData, size: (u32, u32)) -> Result<()> {
    match chart {
        ChartData::Line(line) => write_line_png(path, line, size)?,
        ChartData::Bar(bar) => write_bar_png(path, bar, size)?,
    }
    info!("chart written to {}", path.display());
    Ok(())
}

fn write_line_png(path: &Path, data: &LineChartData, size: (u32, u32)) -> Result<()> {
    if data.series.iter().all(|s| s.points.is_empty()) {
        return Err(eyre!("No data to export"));
    }
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let (y_min, y_max) = data.y_bounds();
    let n = data.x_labels.len();
    let labels = &data.x_labels;
    let formatter = |x: &f64| category_label(labels, *x);

    let mut chart = ChartBuilder::on(&root)
        .caption(data.title.as_str(), ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(90)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5..(data.x_max() + 0.5), y_min..(y_max * 1.05))?;

    chart
        .configure_mesh()
        .x_desc(data.x_label.as_str())
        .y_desc(data.y_label.as_str())
        .x_labels(n.max(2))
        .x_label_formatter(&formatter)
        .x_label_style(("sans-serif", 12).into_font().transform(FontTransform::Rotate90))
        .draw()?;

    // Legend heading: an empty series whose label is the pivot column name.
    chart
        .draw_series(LineSeries::new(std::iter::empty::<(f64, f64)>(), &WHITE))?
        .label(format!("{}:", data.legend_title))
        .legend(|(x, y)| EmptyElement::at((x, y)));

    for (idx, s) in data.series.iter().enumerate() {
        let color = PALETTE[idx % PALETTE.len()];
        chart
            .draw_series(LineSeries::new(s.points.iter().copied(), color))?
            .label(s.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        chart.draw_series(
            s.points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 3, color.filled())),
        )?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn write_bar_png(path: &Path, data: &BarChartData, size: (u32, u32)) -> Result<()> {
    if data.bars.is_empty() {
        return Err(eyre!("No data to export"));
    }
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let labels: Vec<String> = data.bars.iter().map(|(label, _)| label.clone()).collect();
    let formatter = |x: &f64| category_label(&labels, *x);
    let x_max = (labels.len() as f64 - 0.5).max(0.5);

    let mut chart = ChartBuilder::on(&root)
        .caption(data.title.as_str(), ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(90)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5..x_max, 0.0..(data.max_value() * 1.1).max(1.0))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(data.x_label.as_str())
        .y_desc(data.y_label.as_str())
        .x_labels(labels.len().max(2))
        .x_label_formatter(&formatter)
        .x_label_style(("sans-serif", 12).into_font().transform(FontTransform::Rotate90))
        .draw()?;

    let color = PALETTE[0];
    chart.draw_series(data.bars.iter().enumerate().map(|(i, (_, v))| {
        let x = i as f64;
        Rectangle::new([(x - 0.3, 0.0), (x + 0.3, *v)], color.filled())
    }))?;

    root.present()?;
    Ok(())
}
