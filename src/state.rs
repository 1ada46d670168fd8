use std::collections::BTreeSet;
use std::sync::Arc;

use crate::data::filter::{filter, FilterSelection};
use crate::data::model::{CrashTable, MonthName};
use crate::views::ViewSet;

// ---------------------------------------------------------------------------
// Dashboard state
// ---------------------------------------------------------------------------

/// Row counts shown alongside the views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    /// Rows in the loaded table.
    pub total_rows: usize,
    /// Rows whose timestamp did not parse.
    pub unparsed_rows: usize,
    /// Rows passing the current selection.
    pub selected_rows: usize,
}

/// The selection-driven state behind every page, independent of rendering.
///
/// The loaded table is shared and never modified. Every selection change
/// refilters from it and recomputes all views.
pub struct Dashboard {
    table: Arc<CrashTable>,
    selection: FilterSelection,
    /// Rows passing `selection`.
    visible: CrashTable,
    views: ViewSet,
}

impl Dashboard {
    /// Start with everything selected.
    pub fn new(table: Arc<CrashTable>) -> Self {
        let selection = FilterSelection::all(&table);
        Self::with_selection(table, selection)
    }

    pub fn with_selection(table: Arc<CrashTable>, selection: FilterSelection) -> Self {
        let visible = filter(&table, &selection);
        let views = ViewSet::compute(&visible);
        Self {
            table,
            selection,
            visible,
            views,
        }
    }

    pub fn table(&self) -> &CrashTable {
        &self.table
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.selection
    }

    pub fn visible(&self) -> &CrashTable {
        &self.visible
    }

    pub fn views(&self) -> &ViewSet {
        &self.views
    }

    pub fn summary(&self) -> Summary {
        Summary {
            total_rows: self.table.len(),
            unparsed_rows: self.table.unparsed_count(),
            selected_rows: self.visible.len(),
        }
    }

    /// Years offered by the year selector.
    pub fn available_years(&self) -> BTreeSet<i32> {
        self.table.years()
    }

    /// Months offered by the month selector.
    pub fn available_months(&self) -> BTreeSet<MonthName> {
        self.table.months()
    }

    /// Replace the whole selection.
    pub fn set_selection(&mut self, selection: FilterSelection) {
        self.selection = selection;
        self.refilter();
    }

    /// Toggle a single year.
    pub fn toggle_year(&mut self, year: i32) {
        if !self.selection.years.remove(&year) {
            self.selection.years.insert(year);
        }
        self.refilter();
    }

    /// Toggle a single month.
    pub fn toggle_month(&mut self, month: MonthName) {
        if !self.selection.months.remove(&month) {
            self.selection.months.insert(month);
        }
        self.refilter();
    }

    pub fn select_all_years(&mut self) {
        self.selection.years = self.available_years();
        self.refilter();
    }

    pub fn select_no_years(&mut self) {
        self.selection.years.clear();
        self.refilter();
    }

    pub fn select_all_months(&mut self) {
        self.selection.months = self.available_months();
        self.refilter();
    }

    pub fn select_no_months(&mut self) {
        self.selection.months.clear();
        self.refilter();
    }

    /// Recompute `visible` and every view after a selection change.
    fn refilter(&mut self) {
        self.visible = filter(&self.table, &self.selection);
        self.views = ViewSet::compute(&self.visible);
        log::debug!(
            "Selection {:?} / {:?} matches {} of {} rows",
            self.selection.years,
            self.selection.months,
            self.visible.len(),
            self.table.len()
        );
    }
}
