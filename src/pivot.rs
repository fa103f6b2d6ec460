//! Pivot aggregation and the single-column distribution.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use log::debug;
use polars::lazy::frame::pivot::pivot_stable;
use polars::prelude::*;

use crate::table::Table;

/// Grouping key used for missing index or pivot values.
pub const BLANK_KEY: &str = "(blank)";

const INDEX_KEY: &str = "__crosstab_index";
const PIVOT_KEY: &str = "__crosstab_pivot";
const VALUE_KEY: &str = "__crosstab_value";
const COUNT_KEY: &str = "__crosstab_count";

/// How the measure column is aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Sum of a numeric measure.
    Sum,
    /// Number of rows; used for non-numeric measures.
    Count,
}

impl Aggregation {
    pub fn as_str(self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Count => "count",
        }
    }
}

/// Index (rows), pivot (columns) and measure column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotSpec {
    pub index: String,
    pub columns: String,
    pub values: String,
}

impl PivotSpec {
    pub fn new(
        index: impl Into<String>,
        columns: impl Into<String>,
        values: impl Into<String>,
    ) -> Self {
        Self {
            index: index.into(),
            columns: columns.into(),
            values: values.into(),
        }
    }
}

/// Dense cross-tabulation: `cells[row][col]` is the aggregate for
/// (`row_keys[row]`, `column_keys[col]`).
#[derive(Debug, Clone, PartialEq)]
pub struct PivotTable {
    pub spec: PivotSpec,
    pub aggregation: Aggregation,
    pub row_keys: Vec<String>,
    pub column_keys: Vec<String>,
    pub cells: Vec<Vec<f64>>,
}

impl PivotTable {
    fn empty(spec: &PivotSpec, aggregation: Aggregation) -> Self {
        Self {
            spec: spec.clone(),
            aggregation,
            row_keys: Vec::new(),
            column_keys: Vec::new(),
            cells: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.row_keys.is_empty()
    }

    /// Name of the measure as shown in labels: the measure column for sums,
    /// `count` for counts.
    pub fn value_label(&self) -> &str {
        match self.aggregation {
            Aggregation::Sum => &self.spec.values,
            Aggregation::Count => Aggregation::Count.as_str(),
        }
    }

    pub fn value(&self, row_key: &str, column_key: &str) -> Option<f64> {
        let row = self.row_keys.iter().position(|k| k == row_key)?;
        let col = self.column_keys.iter().position(|k| k == column_key)?;
        Some(self.cells[row][col])
    }

    pub fn total(&self) -> f64 {
        self.cells.iter().flatten().sum()
    }
}

/// Cross-tabulates `table` by `spec`.
///
/// Index and pivot values are grouped by their string form. A numeric measure
/// is summed; any other measure counts rows. Combinations without rows are 0.
/// Rows are ordered by index key and columns by pivot key.
pub fn pivot(table: &Table, spec: &PivotSpec) -> Result<PivotTable> {
    for name in [&spec.index, &spec.columns, &spec.values] {
        if !table.has_column(name) {
            return Err(eyre!("Column not found: {}", name));
        }
    }
    let aggregation = match table.kind(&spec.values) {
        Some(kind) if kind.is_numeric() => Aggregation::Sum,
        _ => Aggregation::Count,
    };
    if table.height() == 0 {
        return Ok(PivotTable::empty(spec, aggregation));
    }

    let key = |name: &str| {
        col(name)
            .cast(DataType::String)
            .fill_null(lit(BLANK_KEY))
    };
    let measure = match aggregation {
        Aggregation::Sum => col(spec.values.as_str()).cast(DataType::Float64),
        Aggregation::Count => lit(1.0_f64),
    };
    let long = table
        .df()
        .clone()
        .lazy()
        .select([
            key(spec.index.as_str()).alias(INDEX_KEY),
            key(spec.columns.as_str()).alias(PIVOT_KEY),
            measure.alias(VALUE_KEY),
        ])
        .collect()?;

    let agg_expr = col(PlSmallStr::from_static("")).sum();
    let wide = pivot_stable(
        &long,
        [PIVOT_KEY],
        Some([INDEX_KEY]),
        Some([VALUE_KEY]),
        true,
        Some(agg_expr),
        None,
    )?;
    let column_keys: Vec<String> = wide
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .filter(|s| s != INDEX_KEY)
        .collect();
    let wide = wide
        .lazy()
        .with_columns(
            column_keys
                .iter()
                .map(|c| col(c.as_str()).fill_null(lit(0.0_f64)))
                .collect::<Vec<_>>(),
        )
        .sort_by_exprs(vec![col(INDEX_KEY)], Default::default())
        .collect()?;

    let row_keys: Vec<String> = wide
        .column(INDEX_KEY)?
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or(BLANK_KEY).to_string())
        .collect();
    let mut cells = vec![Vec::with_capacity(column_keys.len()); row_keys.len()];
    for key in &column_keys {
        let values = wide.column(key)?.cast(&DataType::Float64)?;
        for (row, v) in values.f64()?.into_iter().enumerate() {
            cells[row].push(v.unwrap_or(0.0));
        }
    }
    debug!(
        "pivot {} x {} ({} of '{}')",
        row_keys.len(),
        column_keys.len(),
        aggregation.as_str(),
        spec.values
    );
    Ok(PivotTable {
        spec: spec.clone(),
        aggregation,
        row_keys,
        column_keys,
        cells,
    })
}

/// Aggregate as displayed: whole numbers without decimals, others with two.
pub fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{:.2}", v)
    }
}

/// Frequency of each distinct value of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    pub column: String,
    /// (value, count), most frequent first.
    pub entries: Vec<(String, usize)>,
}

impl Distribution {
    pub fn count(&self, value: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(v, _)| v == value)
            .map(|(_, n)| *n)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Counts distinct non-missing values of `column`.
pub fn distribution(table: &Table, column: &str) -> Result<Distribution> {
    let series = table
        .df()
        .column(column)?
        .as_materialized_series()
        .drop_nulls()
        .cast(&DataType::String)?;
    // value_counts signature: (sort: bool, parallel: bool, name: PlSmallStr, normalize: bool)
    let counts = series.value_counts(true, false, COUNT_KEY.into(), false)?;
    let values = counts.column(column)?.str()?;
    let frequencies = counts.column(COUNT_KEY)?.cast(&DataType::UInt64)?;
    let entries = values
        .into_iter()
        .zip(frequencies.u64()?.into_iter())
        .filter_map(|(value, count)| Some((value?.to_string(), count? as usize)))
        .collect();
    Ok(Distribution {
        column: column.to_string(),
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ColumnKind, RawColumn, RawTable};

    fn sales() -> Table {
        Table::from_dataframe(
            df!(
                "region" => &["North", "South", "North"],
                "product" => &["A", "B", "A"],
                "sales" => &[10_i64, 20, 30],
            )
            .unwrap(),
        )
    }

    #[test]
    fn sums_numeric_measure_and_fills_zero() {
        let result = pivot(&sales(), &PivotSpec::new("region", "product", "sales")).unwrap();
        assert_eq!(result.aggregation, Aggregation::Sum);
        assert_eq!(result.row_keys, vec!["North", "South"]);
        assert_eq!(result.column_keys, vec!["A", "B"]);
        assert_eq!(result.cells, vec![vec![40.0, 0.0], vec![0.0, 20.0]]);
    }

    #[test]
    fn counts_text_measure() {
        let result = pivot(&sales(), &PivotSpec::new("region", "product", "product")).unwrap();
        assert_eq!(result.aggregation, Aggregation::Count);
        assert_eq!(result.value("North", "A"), Some(2.0));
        assert_eq!(result.value("South", "B"), Some(1.0));
        assert_eq!(result.total(), 3.0);
        assert_eq!(result.value_label(), "count");
    }

    #[test]
    fn mixed_measure_is_counted() {
        let raw = RawTable::new(vec![
            RawColumn::from_series(Series::new("k".into(), &["a", "a"])),
            RawColumn::new(Series::new("m".into(), &["1", "x"]), ColumnKind::Mixed),
        ]);
        let table = Table::from_raw(raw).unwrap();
        let result = pivot(&table, &PivotSpec::new("k", "k", "m")).unwrap();
        assert_eq!(result.aggregation, Aggregation::Count);
        assert_eq!(result.value("a", "a"), Some(2.0));
    }

    #[test]
    fn missing_keys_become_blank() {
        let table = Table::from_dataframe(
            df!(
                "k" => &[Some("a"), None],
                "p" => &["x", "x"],
                "v" => &[1.5_f64, 2.5],
            )
            .unwrap(),
        );
        let result = pivot(&table, &PivotSpec::new("k", "p", "v")).unwrap();
        assert_eq!(result.value(BLANK_KEY, "x"), Some(2.5));
        assert_eq!(result.value("a", "x"), Some(1.5));
    }

    #[test]
    fn numeric_keys_group_by_string_form() {
        let table = Table::from_dataframe(
            df!(
                "year" => &[2024_i64, 2023, 2024],
                "p" => &["x", "x", "y"],
                "v" => &[1_i64, 2, 3],
            )
            .unwrap(),
        );
        let result = pivot(&table, &PivotSpec::new("year", "p", "v")).unwrap();
        assert_eq!(result.row_keys, vec!["2023", "2024"]);
        assert_eq!(result.value("2024", "y"), Some(3.0));
    }

    #[test]
    fn empty_table_gives_empty_result() {
        let table = Table::from_dataframe(sales().df().head(Some(0)));
        let result = pivot(&table, &PivotSpec::new("region", "product", "sales")).unwrap();
        assert!(result.is_empty());
        assert!(result.column_keys.is_empty());
    }

    #[test]
    fn unknown_column_is_an_error() {
        let err = pivot(&sales(), &PivotSpec::new("region", "nope", "sales")).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn value_formatting() {
        assert_eq!(format_value(40.0), "40");
        assert_eq!(format_value(2.5), "2.50");
        assert_eq!(format_value(-3.0), "-3");
    }

    #[test]
    fn distribution_counts_values() {
        let table = Table::from_dataframe(
            df!("status" => &[Some("open"), Some("closed"), Some("open"), None]).unwrap(),
        );
        let dist = distribution(&table, "status").unwrap();
        assert_eq!(dist.entries.len(), 2);
        assert_eq!(dist.count("open"), Some(2));
        assert_eq!(dist.count("closed"), Some(1));
        assert_eq!(dist.entries[0].0, "open");
    }
}
