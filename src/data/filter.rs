use std::collections::BTreeSet;

use super::model::{CrashRecord, CrashTable, MonthName};

// ---------------------------------------------------------------------------
// Filter selection: which years and months are chosen
// ---------------------------------------------------------------------------

/// The years and months currently selected.
///
/// An empty set selects nothing for that dimension: it is not "no filter".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterSelection {
    pub years: BTreeSet<i32>,
    pub months: BTreeSet<MonthName>,
}

impl FilterSelection {
    pub fn new(
        years: impl IntoIterator<Item = i32>,
        months: impl IntoIterator<Item = MonthName>,
    ) -> Self {
        Self {
            years: years.into_iter().collect(),
            months: months.into_iter().collect(),
        }
    }

    /// Every year and month present in `table` (i.e., show everything that
    /// has a timestamp).
    pub fn all(table: &CrashTable) -> Self {
        Self {
            years: table.years(),
            months: table.months(),
        }
    }

    /// Whether a row passes. Rows without a derived year or month never do.
    pub fn matches(&self, record: &CrashRecord) -> bool {
        match record.calendar {
            Some(cal) => self.years.contains(&cal.year) && self.months.contains(&cal.month),
            None => false,
        }
    }
}

/// Return indices of rows that pass the selection, in table order.
pub fn filtered_indices(table: &CrashTable, selection: &FilterSelection) -> Vec<usize> {
    if selection.years.is_empty() || selection.months.is_empty() {
        return Vec::new();
    }
    table
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| selection.matches(rec))
        .map(|(i, _)| i)
        .collect()
}

/// The subset of `table` passing `selection`, as a new table. The input is
/// left untouched.
pub fn filter(table: &CrashTable, selection: &FilterSelection) -> CrashTable {
    let records = filtered_indices(table, selection)
        .into_iter()
        .map(|i| table.records[i].clone())
        .collect();
    CrashTable {
        records,
        columns: table.columns,
    }
}
