//! Filter, aggregate and chart in one synchronous pass.
//!
//! [`run`] is recomputed from scratch whenever the loaded table, the filter
//! selection or the pivot selectors change. Nothing is cached between runs.

use std::time::{Duration, Instant};

use color_eyre::eyre::eyre;
use color_eyre::Result;
use log::{debug, warn};

use crate::chart_data::{self, BarChartData, ChartData, LineChartData};
use crate::filter::{self, FilterSelection};
use crate::pivot::{self, Distribution, PivotSpec, PivotTable};
use crate::table::Table;

/// Shown in place of the chart when no rows survive filtering.
pub const EMPTY_RESULT_WARNING: &str = "No data matches the current filters.";

#[derive(Debug, Clone)]
pub enum PipelineOutput {
    /// The table has no columns at all.
    NoColumns,
    /// Fewer than two columns: value counts of the only column.
    Distribution {
        table: Table,
        distribution: Distribution,
        chart: BarChartData,
    },
    /// The general case. `chart` is `None` when the aggregation is empty.
    Pivot {
        filtered_rows: usize,
        pivot: PivotTable,
        chart: Option<LineChartData>,
    },
}

impl PipelineOutput {
    /// True when rendering should show [`EMPTY_RESULT_WARNING`].
    pub fn is_empty_result(&self) -> bool {
        match self {
            PipelineOutput::NoColumns => false,
            PipelineOutput::Distribution { distribution, .. } => distribution.is_empty(),
            PipelineOutput::Pivot { pivot, .. } => pivot.is_empty(),
        }
    }

    pub fn chart(&self) -> Option<ChartData> {
        match self {
            PipelineOutput::NoColumns => None,
            PipelineOutput::Distribution {
                distribution,
                chart,
                ..
            } => (!distribution.is_empty()).then(|| ChartData::Bar(chart.clone())),
            PipelineOutput::Pivot { chart, .. } => chart.clone().map(ChartData::Line),
        }
    }

    /// Plain-text rendition for `--print`: tab-separated, header first.
    /// An empty pivot still prints its header line; callers report the
    /// warning themselves.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        match self {
            PipelineOutput::NoColumns => {}
            PipelineOutput::Distribution { distribution, .. } => {
                out.push_str(&format!("{}\tcount\n", distribution.column));
                for (value, count) in &distribution.entries {
                    out.push_str(&format!("{}\t{}\n", value, count));
                }
            }
            PipelineOutput::Pivot { pivot, .. } => {
                out.push_str(&pivot.spec.index);
                for key in &pivot.column_keys {
                    out.push('\t');
                    out.push_str(key);
                }
                out.push('\n');
                for (key, cells) in pivot.row_keys.iter().zip(&pivot.cells) {
                    out.push_str(key);
                    for v in cells {
                        out.push('\t');
                        out.push_str(&pivot::format_value(*v));
                    }
                    out.push('\n');
                }
            }
        }
        out
    }
}

/// Runs filter, aggregation and chart preparation over a sanitized table.
///
/// With two or more columns `spec` is required.
pub fn run(
    table: &Table,
    selection: &FilterSelection,
    spec: Option<&PivotSpec>,
) -> Result<PipelineOutput> {
    if table.width() == 0 {
        return Ok(PipelineOutput::NoColumns);
    }
    let filtered = filter::apply(table, selection)?;
    if table.width() < 2 {
        let column = table.columns()[0].name.clone();
        let distribution = pivot::distribution(&filtered, &column)?;
        let chart = chart_data::bar_chart(&distribution);
        if distribution.is_empty() {
            warn!("{}", EMPTY_RESULT_WARNING);
        }
        return Ok(PipelineOutput::Distribution {
            table: filtered,
            distribution,
            chart,
        });
    }
    let spec = spec.ok_or_else(|| eyre!("Choose index, columns and values to pivot"))?;
    let pivot = pivot::pivot(&filtered, spec)?;
    if pivot.is_empty() {
        warn!("{}", EMPTY_RESULT_WARNING);
    }
    let chart = chart_data::line_chart(&pivot);
    Ok(PipelineOutput::Pivot {
        filtered_rows: filtered.height(),
        pivot,
        chart,
    })
}

/// [`run`] plus its wall-clock duration, for the debug line.
pub fn run_timed(
    table: &Table,
    selection: &FilterSelection,
    spec: Option<&PivotSpec>,
) -> (Result<PipelineOutput>, Duration) {
    let start = Instant::now();
    let output = run(table, selection, spec);
    let elapsed = start.elapsed();
    debug!("pipeline ran in {:?}", elapsed);
    (output, elapsed)
}
