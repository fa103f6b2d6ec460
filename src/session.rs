//! Session-scoped UI state that feeds the pipeline.
//!
//! A [`Session`] is created for every loaded table and replaced on the next
//! load. It owns the per-column filter panels (search text, select-all and
//! checkbox state) and the three pivot selectors.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use log::debug;

use crate::filter::{self, ColumnFilter, FilterSelection};
use crate::pipeline::{self, PipelineOutput};
use crate::pivot::PivotSpec;
use crate::table::Table;

/// One of the three pivot selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    Index,
    Columns,
    Values,
}

impl Selector {
    pub const ALL: [Selector; 3] = [Selector::Index, Selector::Columns, Selector::Values];

    pub fn label(self) -> &'static str {
        match self {
            Selector::Index => "Index",
            Selector::Columns => "Columns",
            Selector::Values => "Values",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    table: Table,
    filters: Vec<ColumnFilter>,
    index: usize,
    columns: usize,
    values: usize,
}

impl Session {
    /// Session over a sanitized table, with no filters and the default
    /// selectors: first column as index, second as columns, first as values.
    pub fn new(table: Table) -> Self {
        let columns = if table.width() > 1 { 1 } else { 0 };
        Self {
            table,
            filters: Vec::new(),
            index: 0,
            columns,
            values: 0,
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Active filter panels, in the order they were added.
    pub fn filters(&self) -> &[ColumnFilter] {
        &self.filters
    }

    pub fn is_filter_column(&self, column: &str) -> bool {
        self.filters.iter().any(|f| f.column() == column)
    }

    /// Adds `column` as a filter target, or removes it if already one.
    /// Returns whether the column is a filter target afterwards.
    pub fn toggle_filter_column(&mut self, column: &str) -> Result<bool> {
        if let Some(pos) = self.filters.iter().position(|f| f.column() == column) {
            self.filters.remove(pos);
            debug!("filter column '{}' removed", column);
            return Ok(false);
        }
        self.add_filter_column(column)?;
        Ok(true)
    }

    fn add_filter_column(&mut self, column: &str) -> Result<&mut ColumnFilter> {
        if !self.table.has_column(column) {
            return Err(eyre!("Column not found: {}", column));
        }
        if let Some(pos) = self.filters.iter().position(|f| f.column() == column) {
            return Ok(&mut self.filters[pos]);
        }
        let filter = ColumnFilter::new(&self.table, column)?;
        debug!(
            "filter column '{}' added ({} candidates)",
            column,
            filter.candidates().len()
        );
        self.filters.push(filter);
        let last = self.filters.len() - 1;
        Ok(&mut self.filters[last])
    }

    pub fn filter(&self, column: &str) -> Option<&ColumnFilter> {
        self.filters.iter().find(|f| f.column() == column)
    }

    pub fn filter_mut(&mut self, column: &str) -> Option<&mut ColumnFilter> {
        self.filters.iter_mut().find(|f| f.column() == column)
    }

    /// Keeps only `values` of `column` (unchecks the rest). Unknown values are
    /// ignored.
    pub fn keep_values<S: AsRef<str>>(&mut self, column: &str, values: &[S]) -> Result<()> {
        let filter = self.add_filter_column(column)?;
        filter.set_select_all(false);
        for value in values {
            filter.set_checked(value.as_ref(), true);
        }
        Ok(())
    }

    /// Sets the search text of `column`, making it a filter target if needed.
    pub fn set_search(&mut self, column: &str, search: &str) -> Result<()> {
        self.add_filter_column(column)?.set_search(search);
        Ok(())
    }

    pub fn selection(&self) -> FilterSelection {
        filter::selection_of(&self.filters)
    }

    fn slot(&self, selector: Selector) -> usize {
        match selector {
            Selector::Index => self.index,
            Selector::Columns => self.columns,
            Selector::Values => self.values,
        }
    }

    fn slot_mut(&mut self, selector: Selector) -> &mut usize {
        match selector {
            Selector::Index => &mut self.index,
            Selector::Columns => &mut self.columns,
            Selector::Values => &mut self.values,
        }
    }

    /// Column chosen by `selector`, if the table has any columns.
    pub fn selected(&self, selector: Selector) -> Option<&str> {
        self.table
            .columns()
            .get(self.slot(selector))
            .map(|c| c.name.as_str())
    }

    pub fn set_selector(&mut self, selector: Selector, column: &str) -> Result<()> {
        let pos = self
            .table
            .columns()
            .iter()
            .position(|c| c.name == column)
            .ok_or_else(|| eyre!("Column not found: {}", column))?;
        *self.slot_mut(selector) = pos;
        Ok(())
    }

    /// Moves `selector` to the next (or previous) column, wrapping around.
    pub fn cycle_selector(&mut self, selector: Selector, forward: bool) {
        let width = self.table.width();
        if width == 0 {
            return;
        }
        let slot = self.slot_mut(selector);
        *slot = if forward {
            (*slot + 1) % width
        } else {
            (*slot + width - 1) % width
        };
    }

    /// The pivot triple, or `None` for tables with fewer than two columns.
    pub fn pivot_spec(&self) -> Option<PivotSpec> {
        if self.table.width() < 2 {
            return None;
        }
        Some(PivotSpec::new(
            self.selected(Selector::Index)?,
            self.selected(Selector::Columns)?,
            self.selected(Selector::Values)?,
        ))
    }

    pub fn run(&self) -> Result<PipelineOutput> {
        pipeline::run(&self.table, &self.selection(), self.pivot_spec().as_ref())
    }
}
