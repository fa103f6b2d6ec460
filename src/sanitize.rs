//! Column sanitizer: deduplicate column names and drop bookkeeping columns.

use std::collections::HashSet;

use log::debug;

use crate::table::RawTable;

/// Columns dropped from every loaded spreadsheet. An entry removes columns
/// named exactly like it and columns whose name starts with it.
pub const DEFAULT_EXCLUDED_COLUMNS: &[&str] = &[
    "id",
    "created_at",
    "created_by_id",
    "updated_at",
    "updated_by_id",
    "part_id",
    "place_id",
    "purchase_id",
    "ref",
    "category_id",
    "image",
    "price_currency",
    "is_locally_bought",
    "obsolete",
    "resell_price",
    "resell_price_currency",
];

/// Exclusion entries, matched by prefix and by exact name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionList {
    entries: Vec<String>,
}

impl ExclusionList {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// The built-in list, [`DEFAULT_EXCLUDED_COLUMNS`].
    pub fn builtin() -> Self {
        Self::new(DEFAULT_EXCLUDED_COLUMNS.iter().copied())
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn excludes(&self, column: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| column.starts_with(entry.as_str()) || column == entry)
    }
}

impl Default for ExclusionList {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Returns `raw` with duplicate names collapsed to their first occurrence and
/// excluded columns removed. Column order is preserved.
pub fn sanitize(raw: &RawTable, exclusions: &ExclusionList) -> RawTable {
    let mut seen = HashSet::new();
    let mut dropped = Vec::new();
    let columns = raw
        .columns
        .iter()
        .filter(|column| {
            let name = column.name();
            if !seen.insert(name.to_string()) {
                dropped.push(format!("{} (duplicate)", name));
                return false;
            }
            if exclusions.excludes(name) {
                dropped.push(name.to_string());
                return false;
            }
            true
        })
        .cloned()
        .collect();
    if !dropped.is_empty() {
        debug!("sanitize dropped columns: {}", dropped.join(", "));
    }
    RawTable::new(columns)
}
