//! Short, user-facing messages for errors shown in the error overlay.

use std::io::ErrorKind;

use color_eyre::Report;
use polars::prelude::PolarsError;

/// One sentence describing a Polars error without the internal context lines.
pub fn user_message_from_polars(error: &PolarsError) -> String {
    let detail = first_line(&error.to_string());
    match error {
        PolarsError::ColumnNotFound(_) => format!("Column not found: {}", strip_kind(&detail)),
        PolarsError::ComputeError(_) => format!("Could not read the data: {}", strip_kind(&detail)),
        PolarsError::Duplicate(_) => format!("Duplicate column name: {}", strip_kind(&detail)),
        PolarsError::NoData(_) => "The file contains no data.".to_string(),
        PolarsError::SchemaMismatch(_) | PolarsError::ShapeMismatch(_) => {
            format!("The sheet layout is inconsistent: {}", strip_kind(&detail))
        }
        PolarsError::IO { error, .. } => user_message_from_io(error),
        _ => detail,
    }
}

pub fn user_message_from_io(error: &std::io::Error) -> String {
    match error.kind() {
        ErrorKind::NotFound => "File not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied.".to_string(),
        ErrorKind::InvalidData | ErrorKind::UnexpectedEof => {
            "The file is damaged or not a spreadsheet.".to_string()
        }
        _ => first_line(&error.to_string()),
    }
}

/// Message for any error that reached the UI. The first Polars or io error
/// in the chain decides the wording; otherwise the report's own message.
pub fn user_message(report: &Report) -> String {
    for cause in report.chain() {
        if let Some(e) = cause.downcast_ref::<PolarsError>() {
            return user_message_from_polars(e);
        }
        if let Some(e) = cause.downcast_ref::<std::io::Error>() {
            return user_message_from_io(e);
        }
    }
    first_line(&report.to_string())
}

fn first_line(s: &str) -> String {
    s.lines().next().unwrap_or_default().trim().to_string()
}

/// Drops a leading `Kind: ` that Polars puts in front of some messages.
fn strip_kind(s: &str) -> &str {
    match s.split_once(": ") {
        Some((head, rest)) if !head.contains(' ') => rest,
        _ => s,
    }
}
