//! Shared CLI definitions for crosstab.
//!
//! Used by the main application and by the build script (manpage).

use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

/// File format for spreadsheet files (used to bypass extension-based detection).
/// When `--format` is not specified, format is auto-detected from the file extension.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum FileFormat {
    /// Excel or OpenDocument workbook (.xls, .xlsx, .xlsm, .xlsb, .ods); first sheet only
    Excel,
    /// Comma-separated values
    Csv,
    /// Tab-separated values
    Tsv,
}

impl FileFormat {
    /// Detect file format from path extension. Returns None when extension is missing or unknown.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Parse format from extension string (e.g. "xlsx", "csv").
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "xls" | "xlsx" | "xlsm" | "xlsb" | "ods" => Some(Self::Excel),
            "csv" => Some(Self::Csv),
            "tsv" => Some(Self::Tsv),
            _ => None,
        }
    }
}

/// Command-line arguments for crosstab
#[derive(Clone, Parser, Debug, Default)]
#[command(
    name = "crosstab",
    version,
    about = "Spreadsheet cross-tabulation in the terminal",
    long_about = "Load a spreadsheet, drop bookkeeping columns, filter rows by value and \
view a pivot table with a line chart. Runs as an interactive terminal UI unless \
--print or --export-chart is given."
)]
pub struct Args {
    /// Path to the spreadsheet to open (not required with --generate-config)
    #[arg(required_unless_present = "generate_config", value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Force file format (excel, csv, tsv). By default format is auto-detected from the file extension.
    #[arg(long = "format", value_enum)]
    pub format: Option<FileFormat>,

    /// Specify the delimiter to use when reading a delimited text file
    #[arg(long = "delimiter")]
    pub delimiter: Option<u8>,

    /// Column used for the pivot table rows (default: first column)
    #[arg(long = "index", value_name = "COL")]
    pub index: Option<String>,

    /// Column whose distinct values become the pivot table columns (default: second column)
    #[arg(long = "columns", value_name = "COL")]
    pub columns: Option<String>,

    /// Column to aggregate; summed when numeric, counted otherwise (default: first column)
    #[arg(long = "values", value_name = "COL")]
    pub values: Option<String>,

    /// Keep only rows whose COL value is one of the listed values. Repeatable. Example: --filter region=North,South
    #[arg(long = "filter", value_name = "COL=V1,V2")]
    pub filter: Vec<String>,

    /// Narrow the candidate values of a filter column by a case-insensitive substring. Example: --search product=ab
    #[arg(long = "search", value_name = "COL=TERM")]
    pub search: Vec<String>,

    /// Run the pipeline once and print the result table to stdout instead of opening the UI
    #[arg(long = "print", action)]
    pub print: bool,

    /// Render the chart to a PNG file and exit
    #[arg(long = "export-chart", value_name = "FILE")]
    pub export_chart: Option<PathBuf>,

    /// Enable debug mode to show operational information
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Write log records to this file (RUST_LOG controls the level)
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Generate default configuration file at ~/.config/crosstab/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,
}

impl Args {
    /// True when the run is non-interactive (print or export only).
    pub fn is_headless(&self) -> bool {
        self.print || self.export_chart.is_some()
    }
}

/// Split a `COL=VALUE` argument at the first `=`.
/// Returns None when there is no `=` or the column part is empty.
pub fn split_assignment(arg: &str) -> Option<(&str, &str)> {
    let (column, value) = arg.split_once('=')?;
    if column.is_empty() {
        None
    } else {
        Some((column, value))
    }
}
