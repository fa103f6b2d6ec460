//! Reshape aggregation results into chart input.
//!
//! The line chart puts index keys on a categorical x axis (position `i` is the
//! i-th row key), one series per pivot key. The bar chart lists distinct values
//! with their frequency.

use crate::pivot::{Distribution, PivotTable};

/// One (index, series, value) record of the long form.
#[derive(Debug, Clone, PartialEq)]
pub struct LongRecord {
    pub index: String,
    pub series: String,
    pub value: f64,
}

/// Melts the dense aggregation into long-form records, row-major.
pub fn long_form(pivot: &PivotTable) -> Vec<LongRecord> {
    let mut records = Vec::with_capacity(pivot.row_keys.len() * pivot.column_keys.len());
    for (row, index) in pivot.row_keys.iter().enumerate() {
        for (col, series) in pivot.column_keys.iter().enumerate() {
            records.push(LongRecord {
                index: index.clone(),
                series: series.clone(),
                value: pivot.cells[row][col],
            });
        }
    }
    records
}

/// Points of one line; x is the position of the index key.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub name: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineChartData {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Title of the legend: the pivot column name.
    pub legend_title: String,
    pub x_labels: Vec<String>,
    pub series: Vec<ChartSeries>,
}

impl LineChartData {
    /// (min, max) over all y values, widened to include 0.
    pub fn y_bounds(&self) -> (f64, f64) {
        let (min, max) = self
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|&(_, y)| y))
            .fold((0.0_f64, 0.0_f64), |(lo, hi), y| (lo.min(y), hi.max(y)));
        if min == max {
            (min, min + 1.0)
        } else {
            (min, max)
        }
    }

    /// Upper x bound; at least 1 so a single key still has a visible axis.
    pub fn x_max(&self) -> f64 {
        (self.x_labels.len().saturating_sub(1) as f64).max(1.0)
    }
}

/// Line chart for a non-empty aggregation; `None` when there is nothing to draw.
pub fn line_chart(pivot: &PivotTable) -> Option<LineChartData> {
    if pivot.is_empty() {
        return None;
    }
    let records = long_form(pivot);
    let mut series: Vec<ChartSeries> = pivot
        .column_keys
        .iter()
        .map(|name| ChartSeries {
            name: name.clone(),
            points: Vec::with_capacity(pivot.row_keys.len()),
        })
        .collect();
    let n_series = series.len();
    for (i, record) in records.iter().enumerate() {
        let x = (i / n_series) as f64;
        series[i % n_series].points.push((x, record.value));
    }
    Some(LineChartData {
        title: format!(
            "{} by {} and {}",
            pivot.value_label(),
            pivot.spec.index,
            pivot.spec.columns
        ),
        x_label: pivot.spec.index.clone(),
        y_label: pivot.value_label().to_string(),
        legend_title: pivot.spec.columns.clone(),
        x_labels: pivot.row_keys.clone(),
        series,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarChartData {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub bars: Vec<(String, f64)>,
}

impl BarChartData {
    pub fn max_value(&self) -> f64 {
        self.bars.iter().map(|(_, v)| *v).fold(0.0, f64::max)
    }
}

pub const FREQUENCY_LABEL: &str = "Frequency";

/// Bar chart of a single-column distribution, in distribution order.
pub fn bar_chart(distribution: &Distribution) -> BarChartData {
    BarChartData {
        title: format!("Distribution of {}", distribution.column),
        x_label: distribution.column.clone(),
        y_label: FREQUENCY_LABEL.to_string(),
        bars: distribution
            .entries
            .iter()
            .map(|(value, count)| (value.clone(), *count as f64))
            .collect(),
    }
}

/// Whatever chart the pipeline produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    Line(LineChartData),
    Bar(BarChartData),
}

impl ChartData {
    pub fn title(&self) -> &str {
        match self {
            ChartData::Line(line) => &line.title,
            ChartData::Bar(bar) => &bar.title,
        }
    }
}
