//! Reading spreadsheets into a [`RawTable`].
//!
//! Excel workbooks go through calamine (first sheet only, header on the first
//! row); CSV/TSV files go through the Polars CSV reader. Both keep duplicate
//! header names so that the sanitizer decides which occurrence survives.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use log::{debug, info};
use polars::datatypes::TimeUnit;
use polars::prelude::*;

use crate::table::{ColumnKind, RawColumn, RawTable};
use crate::{FileFormat, OpenOptions};

/// Inferred storage type for an Excel column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ExcelColType {
    Int64,
    Float64,
    Boolean,
    Datetime,
    Utf8,
}

/// Loads `path` according to `options`, detecting the format from the
/// extension when not forced.
pub fn load(path: &Path, options: &OpenOptions) -> Result<RawTable> {
    let format = options
        .format
        .or_else(|| FileFormat::from_path(path))
        .ok_or_else(|| {
            eyre!(
                "Unsupported file type: {}. Expected an Excel workbook or CSV file.",
                path.display()
            )
        })?;
    info!("loading {} as {:?}", path.display(), format);
    let raw = match format {
        FileFormat::Excel => read_excel(path)?,
        FileFormat::Csv => read_delimited(path, options.delimiter.unwrap_or(b','))?,
        FileFormat::Tsv => read_delimited(path, options.delimiter.unwrap_or(b'\t'))?,
    };
    info!(
        "loaded {} columns x {} rows",
        raw.columns.len(),
        raw.height()
    );
    Ok(raw)
}

/// Reads the first worksheet. The first row is the header; blank header cells
/// become `column_<n>`.
pub fn read_excel(path: &Path) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path).map_err(|e| eyre!("Excel: {}", e))?;
    if workbook.sheet_names().is_empty() {
        return Err(eyre!("Excel file has no worksheets"));
    }
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| eyre!("Excel: no first sheet"))?
        .map_err(|e| eyre!("Excel: {}", e))?;
    let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
    let Some((header, body)) = rows.split_first() else {
        return Ok(RawTable::default());
    };

    let mut columns = Vec::with_capacity(header.len());
    for (col_idx, cell) in header.iter().enumerate() {
        let name = header_name(cell, col_idx);
        let cells: Vec<Option<&Data>> = body.iter().map(|row| row.get(col_idx)).collect();
        let (col_type, kind) = infer_column_type(&cells);
        debug!("column '{}' inferred as {:?} ({})", name, col_type, kind.as_str());
        let series = column_to_series(&name, &cells, col_type)?;
        columns.push(RawColumn::new(series, kind));
    }
    Ok(RawTable::new(columns))
}

fn header_name(cell: &Data, col_idx: usize) -> String {
    let name = match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    if name.is_empty() {
        format!("column_{}", col_idx + 1)
    } else {
        name
    }
}

/// Chooses a storage type and a declared kind from the cell kinds present.
fn infer_column_type(cells: &[Option<&Data>]) -> (ExcelColType, ColumnKind) {
    let mut has_string = false;
    let mut has_float = false;
    let mut has_int = false;
    let mut has_bool = false;
    let mut has_datetime = false;
    for cell in cells.iter().flatten() {
        match cell {
            Data::String(s) if s.trim().is_empty() => {}
            Data::String(_) => has_string = true,
            Data::Float(_) => has_float = true,
            Data::Int(_) => has_int = true,
            Data::Bool(_) => has_bool = true,
            Data::DateTime(_) | Data::DateTimeIso(_) => has_datetime = true,
            Data::DurationIso(_) => has_string = true,
            Data::Error(_) | Data::Empty => {}
        }
    }
    let has_number = has_float || has_int || has_bool;
    if has_string {
        let kind = if has_number || has_datetime {
            ColumnKind::Mixed
        } else {
            ColumnKind::Text
        };
        (ExcelColType::Utf8, kind)
    } else if has_datetime {
        if has_number {
            (ExcelColType::Utf8, ColumnKind::Mixed)
        } else {
            (ExcelColType::Datetime, ColumnKind::Temporal)
        }
    } else if has_float {
        let all_whole = cells.iter().flatten().all(|cell| match cell {
            Data::Float(f) => f.is_finite() && (f - f.trunc()).abs() < 1e-10,
            _ => true,
        });
        if all_whole && !has_bool {
            (ExcelColType::Int64, ColumnKind::Numeric)
        } else {
            (ExcelColType::Float64, ColumnKind::Numeric)
        }
    } else if has_int {
        if has_bool {
            (ExcelColType::Float64, ColumnKind::Numeric)
        } else {
            (ExcelColType::Int64, ColumnKind::Numeric)
        }
    } else if has_bool {
        (ExcelColType::Boolean, ColumnKind::Numeric)
    } else {
        // Entirely empty column
        (ExcelColType::Utf8, ColumnKind::Text)
    }
}

fn cell_to_f64(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn cell_to_naive_datetime(cell: &Data) -> Option<NaiveDateTime> {
    match cell {
        Data::DateTime(dt) => dt.as_datetime(),
        Data::DateTimeIso(s) => parse_naive_datetime_str(s),
        _ => None,
    }
}

/// Parses an ISO-style date/datetime string; tries FORMATS in order.
fn parse_naive_datetime_str(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ];
    let s = s.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// String form of a cell for text and mixed columns. Whole floats print
/// without a fractional part so `3` typed in Excel stays `3`.
fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if s.trim().is_empty() => None,
        Data::String(s) => Some(s.clone()),
        Data::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
            Some(format!("{}", *f as i64))
        }
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(_) | Data::DateTimeIso(_) => {
            cell_to_naive_datetime(cell).map(|dt| dt.to_string())
        }
        Data::DurationIso(s) => Some(s.clone()),
    }
}

/// Build a Polars Series from a column of calamine cells using the inferred type.
fn column_to_series(
    name: &str,
    cells: &[Option<&Data>],
    col_type: ExcelColType,
) -> Result<Series> {
    let series = match col_type {
        ExcelColType::Int64 => {
            let v: Vec<Option<i64>> = cells
                .iter()
                .map(|c| c.and_then(cell_to_f64).map(|f| f as i64))
                .collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Float64 => {
            let v: Vec<Option<f64>> = cells.iter().map(|c| c.and_then(cell_to_f64)).collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Boolean => {
            let v: Vec<Option<bool>> = cells
                .iter()
                .map(|c| match c {
                    Some(Data::Bool(b)) => Some(*b),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Datetime => {
            let v: Vec<Option<i64>> = cells
                .iter()
                .map(|c| {
                    c.and_then(cell_to_naive_datetime)
                        .map(|dt| dt.and_utc().timestamp_micros())
                })
                .collect();
            Series::new(name.into(), v)
                .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
        }
        ExcelColType::Utf8 => {
            let v: Vec<Option<String>> = cells.iter().map(|c| c.and_then(cell_to_string)).collect();
            Series::new(name.into(), v)
        }
    };
    Ok(series)
}

/// Reads a delimited text file with a header row. Duplicate header names
/// are kept as separate raw columns.
pub fn read_delimited(path: &Path, delimiter: u8) -> Result<RawTable> {
    let header = read_header_names(path, delimiter)?;
    let df = CsvReadOptions::default()
        .with_has_header(false)
        .with_skip_rows(1)
        .with_parse_options(CsvParseOptions::default().with_separator(delimiter))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    let columns = df
        .get_columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let name = header
                .get(idx)
                .filter(|n| !n.is_empty())
                .cloned()
                .unwrap_or_else(|| format!("column_{}", idx + 1));
            let mut series = column.as_materialized_series().clone();
            series.rename(name.into());
            RawColumn::from_series(series)
        })
        .collect();
    Ok(RawTable::new(columns))
}

/// Names from the header record, read as text by the same CSV parser so that
/// quoted names may contain delimiters, doubled quotes and newlines.
fn read_header_names(path: &Path, delimiter: u8) -> Result<Vec<String>> {
    let header = CsvReadOptions::default()
        .with_has_header(false)
        .with_n_rows(Some(1))
        .with_infer_schema_length(Some(0))
        .with_parse_options(CsvParseOptions::default().with_separator(delimiter))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    header
        .get_columns()
        .iter()
        .map(|column| -> Result<String> {
            let name = column.str()?.get(0).unwrap_or_default();
            Ok(name.trim_start_matches('\u{feff}').trim().to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str, suffix: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn infer_mixed_and_text() {
        let s = Data::String("a".to_string());
        let n = Data::Float(2.0);
        assert_eq!(
            infer_column_type(&[Some(&s), Some(&n)]),
            (ExcelColType::Utf8, ColumnKind::Mixed)
        );
        assert_eq!(
            infer_column_type(&[Some(&s), None]),
            (ExcelColType::Utf8, ColumnKind::Text)
        );
    }

    #[test]
    fn infer_whole_floats_as_int() {
        let a = Data::Float(10.0);
        let b = Data::Float(20.0);
        let c = Data::Float(2.5);
        assert_eq!(
            infer_column_type(&[Some(&a), Some(&b)]),
            (ExcelColType::Int64, ColumnKind::Numeric)
        );
        assert_eq!(
            infer_column_type(&[Some(&a), Some(&c)]),
            (ExcelColType::Float64, ColumnKind::Numeric)
        );
    }

    #[test]
    fn cell_strings_drop_trailing_zero() {
        assert_eq!(cell_to_string(&Data::Float(3.0)), Some("3".to_string()));
        assert_eq!(cell_to_string(&Data::Float(3.5)), Some("3.5".to_string()));
        assert_eq!(cell_to_string(&Data::Empty), None);
    }

    #[test]
    fn blank_header_gets_position_name() {
        assert_eq!(header_name(&Data::Empty, 2), "column_3");
        assert_eq!(header_name(&Data::String(" qty ".into()), 0), "qty");
    }

    #[test]
    fn csv_keeps_duplicate_headers() {
        let file = write_temp("a,b,a\n1,x,2\n3,y,4\n", ".csv");
        let raw = read_delimited(file.path(), b',').unwrap();
        assert_eq!(raw.column_names(), vec!["a", "b", "a"]);
        assert_eq!(raw.height(), 2);
        assert_eq!(raw.columns[0].kind, ColumnKind::Numeric);
        assert_eq!(raw.columns[1].kind, ColumnKind::Text);
    }

    #[test]
    fn quoted_header_names() {
        let file = write_temp("\"x, y\",z\n1,2\n", ".csv");
        assert_eq!(
            read_header_names(file.path(), b',').unwrap(),
            vec!["x, y".to_string(), "z".to_string()]
        );
    }

    #[test]
    fn multiline_quoted_header_stays_aligned() {
        let file = write_temp(
            "\"unit\nprice\",\"say \"\"hi\"\"\",qty\n2.5,hello,3\n4.0,bye,1\n",
            ".csv",
        );
        let raw = read_delimited(file.path(), b',').unwrap();
        assert_eq!(
            raw.column_names(),
            vec!["unit\nprice", "say \"hi\"", "qty"]
        );
        assert_eq!(raw.height(), 2);
        assert_eq!(raw.columns[0].kind, ColumnKind::Numeric);
        assert_eq!(raw.columns[1].kind, ColumnKind::Text);
        assert_eq!(raw.columns[2].series.i64().unwrap().get(0), Some(3));
    }

    #[test]
    fn unknown_extension_is_an_error() {
        let file = write_temp("a\n1\n", ".dat");
        let err = load(file.path(), &OpenOptions::default()).unwrap_err();
        assert!(err.to_string().contains("Unsupported file type"));
    }

    #[test]
    fn forced_format_overrides_extension() {
        let file = write_temp("a;b\n1;2\n", ".dat");
        let options = OpenOptions::new()
            .with_format(FileFormat::Csv)
            .with_delimiter(b';');
        let raw = load(file.path(), &options).unwrap();
        assert_eq!(raw.column_names(), vec!["a", "b"]);
    }
}
