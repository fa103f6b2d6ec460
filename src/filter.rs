//! Filter engine.
//!
//! Every filter column offers its distinct values as checkboxes. The user may
//! narrow the visible candidates with a case-insensitive search and flip a
//! "select all" toggle. The checked, visible values form the column's kept set;
//! rows survive when their value is in the kept set of every filtered column.
//! An empty kept set puts no constraint on the column.

use std::collections::{BTreeMap, BTreeSet};

use color_eyre::Result;
use log::debug;
use polars::prelude::*;

use crate::table::Table;

/// Kept values per filtered column, by string form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    columns: BTreeMap<String, BTreeSet<String>>,
}

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<I, S>(&mut self, column: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns
            .insert(column.into(), values.into_iter().map(Into::into).collect());
    }

    pub fn remove(&mut self, column: &str) -> Option<BTreeSet<String>> {
        self.columns.remove(column)
    }

    pub fn get(&self, column: &str) -> Option<&BTreeSet<String>> {
        self.columns.get(column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Columns that actually constrain rows (non-empty kept sets).
    pub fn constraints(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.columns
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(column, values)| (column.as_str(), values))
    }
}

/// Distinct non-missing values of `column` as strings, in the column's
/// natural order (numbers numerically, dates chronologically, text
/// lexicographically).
pub fn candidate_values(table: &Table, column: &str) -> Result<Vec<String>> {
    let values = table
        .df()
        .clone()
        .lazy()
        .select([col(column)])
        .filter(col(column).is_not_null())
        .unique_stable(None, UniqueKeepStrategy::First)
        .sort_by_exprs(vec![col(column)], Default::default())
        .select([col(column).cast(DataType::String)])
        .collect()?;
    Ok(values
        .column(column)?
        .str()?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect())
}

/// True when `value` contains `search`, ignoring case. An empty search
/// matches everything.
pub fn matches_search(value: &str, search: &str) -> bool {
    search.is_empty() || value.to_lowercase().contains(&search.to_lowercase())
}

/// Rows of `table` that satisfy every constraint in `selection`.
pub fn apply(table: &Table, selection: &FilterSelection) -> Result<Table> {
    let df = table.df();
    let mut mask: Option<BooleanChunked> = None;
    for (column, kept) in selection.constraints() {
        let values = df.column(column)?.cast(&DataType::String)?;
        let column_mask: BooleanChunked = values
            .str()?
            .into_iter()
            .map(|v| v.is_some_and(|v| kept.contains(v)))
            .collect();
        mask = Some(match mask {
            Some(acc) => &acc & &column_mask,
            None => column_mask,
        });
    }
    let Some(mask) = mask else {
        return Ok(table.clone());
    };
    let filtered = df.filter(&mask)?;
    debug!(
        "filter kept {} of {} rows ({} constrained columns)",
        filtered.height(),
        df.height(),
        selection.constraints().count()
    );
    Ok(table.with_frame(filtered))
}

/// Checkbox state of one filter column.
///
/// `checked` holds the state of every individual checkbox, including values
/// currently hidden by the search. Flipping "select all" resets every
/// checkbox of the column to the new toggle value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFilter {
    column: String,
    candidates: Vec<String>,
    search: String,
    select_all: bool,
    checked: BTreeSet<String>,
}

impl ColumnFilter {
    /// Filter over `column` of `table` with "select all" on.
    pub fn new(table: &Table, column: &str) -> Result<Self> {
        Ok(Self::with_candidates(
            column,
            candidate_values(table, column)?,
        ))
    }

    pub fn with_candidates(column: impl Into<String>, candidates: Vec<String>) -> Self {
        let checked = candidates.iter().cloned().collect();
        Self {
            column: column.into(),
            candidates,
            search: String::new(),
            select_all: true,
            checked,
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
    }

    pub fn select_all(&self) -> bool {
        self.select_all
    }

    pub fn set_select_all(&mut self, select_all: bool) {
        self.select_all = select_all;
        self.checked = if select_all {
            self.candidates.iter().cloned().collect()
        } else {
            BTreeSet::new()
        };
    }

    pub fn toggle_select_all(&mut self) {
        self.set_select_all(!self.select_all);
    }

    /// Candidates matching the current search, in candidate order.
    pub fn visible(&self) -> Vec<&str> {
        self.candidates
            .iter()
            .filter(|v| matches_search(v, &self.search))
            .map(String::as_str)
            .collect()
    }

    pub fn is_checked(&self, value: &str) -> bool {
        self.checked.contains(value)
    }

    pub fn set_checked(&mut self, value: &str, checked: bool) {
        if checked {
            if self.candidates.iter().any(|c| c == value) {
                self.checked.insert(value.to_string());
            }
        } else {
            self.checked.remove(value);
        }
    }

    pub fn toggle(&mut self, value: &str) {
        let checked = self.is_checked(value);
        self.set_checked(value, !checked);
    }

    /// Visible values that are checked.
    pub fn selected(&self) -> BTreeSet<String> {
        self.visible()
            .into_iter()
            .filter(|v| self.checked.contains(*v))
            .map(str::to_string)
            .collect()
    }
}

/// Builds the selection for a set of column filters.
pub fn selection_of<'a>(filters: impl IntoIterator<Item = &'a ColumnFilter>) -> FilterSelection {
    let mut selection = FilterSelection::new();
    for filter in filters {
        selection.insert(filter.column(), filter.selected());
    }
    selection
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_dataframe(
            df!(
                "region" => &["North", "South", "North", "East"],
                "qty" => &[Some(10_i64), Some(2), None, Some(100)],
            )
            .unwrap(),
        )
    }

    #[test]
    fn candidates_numeric_order() {
        let values = candidate_values(&sample(), "qty").unwrap();
        assert_eq!(values, vec!["2", "10", "100"]);
    }

    #[test]
    fn candidates_text_order_and_distinct() {
        let values = candidate_values(&sample(), "region").unwrap();
        assert_eq!(values, vec!["East", "North", "South"]);
    }

    #[test]
    fn search_is_case_insensitive() {
        assert!(matches_search("North", "nor"));
        assert!(matches_search("North", ""));
        assert!(!matches_search("South", "nor"));
    }

    #[test]
    fn apply_single_constraint() {
        let mut selection = FilterSelection::new();
        selection.insert("region", ["North"]);
        let filtered = apply(&sample(), &selection).unwrap();
        assert_eq!(filtered.height(), 2);
        assert_eq!(filtered.width(), 2);
    }

    #[test]
    fn missing_values_never_match() {
        let mut selection = FilterSelection::new();
        selection.insert("qty", ["10", "2", "100"]);
        let filtered = apply(&sample(), &selection).unwrap();
        assert_eq!(filtered.height(), 3);
    }

    #[test]
    fn empty_selection_is_no_filter() {
        let mut selection = FilterSelection::new();
        selection.insert("region", Vec::<String>::new());
        let filtered = apply(&sample(), &selection).unwrap();
        assert_eq!(filtered.height(), 4);
    }

    #[test]
    fn unknown_column_is_an_error() {
        let mut selection = FilterSelection::new();
        selection.insert("nope", ["x"]);
        assert!(apply(&sample(), &selection).is_err());
    }

    #[test]
    fn column_filter_defaults_to_all_selected() {
        let filter = ColumnFilter::new(&sample(), "region").unwrap();
        assert!(filter.select_all());
        assert_eq!(filter.selected().len(), 3);
    }

    #[test]
    fn select_all_off_clears_checkboxes() {
        let mut filter = ColumnFilter::new(&sample(), "region").unwrap();
        filter.set_select_all(false);
        assert!(filter.selected().is_empty());
        filter.toggle("South");
        assert_eq!(filter.selected(), BTreeSet::from(["South".to_string()]));
        filter.set_select_all(true);
        assert_eq!(filter.selected().len(), 3);
    }

    #[test]
    fn search_narrows_selection() {
        let mut filter = ColumnFilter::new(&sample(), "region").unwrap();
        filter.set_search("TH");
        assert_eq!(filter.visible(), vec!["North", "South"]);
        assert_eq!(filter.selected().len(), 2);
        filter.set_search("");
        assert_eq!(filter.selected().len(), 3);
    }

    #[test]
    fn unknown_value_cannot_be_checked() {
        let mut filter = ColumnFilter::new(&sample(), "region").unwrap();
        filter.set_select_all(false);
        filter.set_checked("West", true);
        assert!(!filter.is_checked("West"));
    }
}
