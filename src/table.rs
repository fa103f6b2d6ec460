//! Tabular data model.
//!
//! A [`RawTable`] is what a loader produces: columns in file order, names not
//! yet unique. The sanitizer turns it into a [`Table`], which wraps a Polars
//! `DataFrame` and caches each column's [`ColumnKind`] decided at load time.

use color_eyre::Result;
use polars::prelude::*;

/// Declared value kind of a column, decided once when the file is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Integers, floats and booleans.
    Numeric,
    /// Only strings.
    Text,
    /// Dates and date-times.
    Temporal,
    /// Strings mixed with numbers or other cell kinds; stored as strings.
    Mixed,
}

impl ColumnKind {
    /// Whether the measure aggregation for this column is a sum.
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Numeric)
    }

    /// Kind of a column whose values already have a single Polars dtype.
    pub fn from_dtype(dtype: &DataType) -> Self {
        match dtype {
            DataType::Boolean
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64 => ColumnKind::Numeric,
            DataType::Date | DataType::Datetime(_, _) | DataType::Time => ColumnKind::Temporal,
            DataType::String => ColumnKind::Text,
            _ => ColumnKind::Mixed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Text => "text",
            ColumnKind::Temporal => "temporal",
            ColumnKind::Mixed => "mixed",
        }
    }
}

/// One column of a raw table. The column name is the series name.
#[derive(Debug, Clone)]
pub struct RawColumn {
    pub series: Series,
    pub kind: ColumnKind,
}

impl RawColumn {
    pub fn new(series: Series, kind: ColumnKind) -> Self {
        Self { series, kind }
    }

    /// Column whose kind follows from the series dtype.
    pub fn from_series(series: Series) -> Self {
        let kind = ColumnKind::from_dtype(series.dtype());
        Self { series, kind }
    }

    pub fn name(&self) -> &str {
        self.series.name().as_str()
    }
}

/// Columns as read from the file, possibly with duplicate names.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub columns: Vec<RawColumn>,
}

impl RawTable {
    pub fn new(columns: Vec<RawColumn>) -> Self {
        Self { columns }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    pub fn height(&self) -> usize {
        self.columns.first().map_or(0, |c| c.series.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: ColumnKind,
}

/// A table with unique column names and cached column kinds.
///
/// Tables are never mutated: filtering produces a new `Table` sharing the
/// column metadata of its source.
#[derive(Debug, Clone)]
pub struct Table {
    df: DataFrame,
    columns: Vec<ColumnInfo>,
}

impl Table {
    /// Builds a table from raw columns. Fails on duplicate names or
    /// columns of different lengths.
    pub fn from_raw(raw: RawTable) -> Result<Self> {
        let columns: Vec<ColumnInfo> = raw
            .columns
            .iter()
            .map(|c| ColumnInfo {
                name: c.name().to_string(),
                kind: c.kind,
            })
            .collect();
        let df = DataFrame::new(raw.columns.into_iter().map(|c| c.series.into()).collect())?;
        Ok(Self { df, columns })
    }

    /// Wraps a frame, deriving column kinds from the dtypes.
    pub fn from_dataframe(df: DataFrame) -> Self {
        let columns = df
            .get_columns()
            .iter()
            .map(|c| ColumnInfo {
                name: c.name().to_string(),
                kind: ColumnKind::from_dtype(c.dtype()),
            })
            .collect();
        Self { df, columns }
    }

    /// Same columns and kinds over a new frame (e.g. after filtering rows).
    pub(crate) fn with_frame(&self, df: DataFrame) -> Self {
        Self {
            df,
            columns: self.columns.clone(),
        }
    }

    pub fn df(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn kind(&self, name: &str) -> Option<ColumnKind> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.kind)
    }

    /// Values of `name` as strings, one per row; `None` for missing cells.
    pub fn string_values(&self, name: &str) -> Result<Vec<Option<String>>> {
        let column = self.df.column(name)?.cast(&DataType::String)?;
        Ok(column
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect())
    }
}
