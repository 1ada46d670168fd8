//! Aggregation views over a (usually filtered) crash table.
//!
//! Month and weekday axes are fixed and always zero-filled. Year, hour and
//! category axes come from the data and only list keys that occur.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::Weekday;
use serde::{Serialize, Serializer};

use crate::data::model::{weekday_name, CrashTable, MonthName, WEEKDAYS};

/// Maximum entries in the top-locations view.
pub const TOP_LOCATIONS: usize = 5;

// ---------------------------------------------------------------------------
// View containers
// ---------------------------------------------------------------------------

/// One key and its fatality count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountEntry<K> {
    pub key: K,
    pub count: u64,
}

/// An ordered key → count table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CountView<K> {
    entries: Vec<CountEntry<K>>,
}

impl<K> CountView<K> {
    fn from_pairs(pairs: impl IntoIterator<Item = (K, u64)>) -> Self {
        Self {
            entries: pairs
                .into_iter()
                .map(|(key, count)| CountEntry { key, count })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[CountEntry<K>] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, u64)> {
        self.entries.iter().map(|e| (&e.key, e.count))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|e| &e.key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|e| e.count).sum()
    }
}

impl<K: PartialEq> CountView<K> {
    /// Count for `key`, `None` when the key is not listed.
    pub fn get(&self, key: &K) -> Option<u64> {
        self.entries.iter().find(|e| &e.key == key).map(|e| e.count)
    }
}

/// A two-dimensional count table. Cells for combinations that never occur
/// are `None`, not zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossTab<R, C> {
    pub rows: Vec<R>,
    pub columns: Vec<C>,
    /// `cells[row][column]`.
    pub cells: Vec<Vec<Option<u64>>>,
}

impl<R: PartialEq, C: PartialEq> CrossTab<R, C> {
    pub fn get(&self, row: &R, column: &C) -> Option<u64> {
        let r = self.rows.iter().position(|x| x == row)?;
        let c = self.columns.iter().position(|x| x == column)?;
        self.cells[r][c]
    }
}

impl<R, C> CrossTab<R, C> {
    /// Sum of all populated cells.
    pub fn total(&self) -> u64 {
        self.cells.iter().flatten().flatten().sum()
    }
}

// ---------------------------------------------------------------------------
// Axis keys with a display form
// ---------------------------------------------------------------------------

/// Hour of day, shown as `HH:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HourOfDay(pub u32);

impl fmt::Display for HourOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00", self.0)
    }
}

impl Serialize for HourOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Day of week, shown by its full English name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DayOfWeek(pub Weekday);

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(weekday_name(self.0))
    }
}

impl Serialize for DayOfWeek {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(weekday_name(self.0))
    }
}

/// A crash position for the map layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapPoint {
    pub latitude: f64,
    pub longitude: f64,
}

// ---------------------------------------------------------------------------
// Single-axis views
// ---------------------------------------------------------------------------

/// Counts per month, January to December. Always twelve entries.
pub fn monthly_counts(table: &CrashTable) -> CountView<MonthName> {
    let mut counts = [0u64; 12];
    for month in table.records.iter().filter_map(|r| r.month()) {
        counts[month as usize] += 1;
    }
    CountView::from_pairs(MonthName::ALL.into_iter().zip(counts))
}

/// Counts per day of week, Monday to Sunday. Always seven entries.
pub fn weekday_counts(table: &CrashTable) -> CountView<DayOfWeek> {
    let mut counts = [0u64; 7];
    for day in table.records.iter().filter_map(|r| r.weekday()) {
        counts[day.num_days_from_monday() as usize] += 1;
    }
    CountView::from_pairs(WEEKDAYS.into_iter().map(DayOfWeek).zip(counts))
}

/// Counts per year, ascending. Years without rows are not listed.
pub fn yearly_counts(table: &CrashTable) -> CountView<i32> {
    let mut counts: BTreeMap<i32, u64> = BTreeMap::new();
    for year in table.records.iter().filter_map(|r| r.year()) {
        *counts.entry(year).or_default() += 1;
    }
    CountView::from_pairs(counts)
}

/// Counts per hour of day, ascending. Hours without rows are not listed.
pub fn hourly_counts(table: &CrashTable) -> CountView<HourOfDay> {
    let mut counts: BTreeMap<HourOfDay, u64> = BTreeMap::new();
    for hour in table.records.iter().filter_map(|r| r.hour()) {
        *counts.entry(HourOfDay(hour)).or_default() += 1;
    }
    CountView::from_pairs(counts)
}

/// Counts per victim category, most frequent first; ties keep the order in
/// which categories were first seen. `None` when the source has no victim
/// column.
pub fn victim_counts(table: &CrashTable) -> Option<CountView<String>> {
    if !table.columns.victim {
        return None;
    }
    let counts = ranked_counts(table.records.iter().filter_map(|r| r.victim()));
    Some(CountView::from_pairs(counts))
}

/// The [`TOP_LOCATIONS`] most frequent crash locations, most frequent
/// first; ties keep first-seen order. `None` when the source has no
/// location column.
pub fn top_locations(table: &CrashTable) -> Option<CountView<String>> {
    if !table.columns.location {
        return None;
    }
    let mut counts = ranked_counts(table.records.iter().filter_map(|r| r.location()));
    counts.truncate(TOP_LOCATIONS);
    Some(CountView::from_pairs(counts))
}

/// Positions of rows carrying both coordinates, in table order.
pub fn map_points(table: &CrashTable) -> Vec<MapPoint> {
    table
        .records
        .iter()
        .filter_map(|r| r.coordinates())
        .map(|(latitude, longitude)| MapPoint {
            latitude,
            longitude,
        })
        .collect()
}

/// Count occurrences, then sort descending by count. The sort is stable, so
/// equal counts stay in first-seen order.
fn ranked_counts<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<(String, u64)> {
    let mut slots: HashMap<&'a str, usize> = HashMap::new();
    let mut counts: Vec<(String, u64)> = Vec::new();
    for key in keys {
        let slot = *slots.entry(key).or_insert_with(|| {
            counts.push((key.to_string(), 0));
            counts.len() - 1
        });
        counts[slot].1 += 1;
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

// ---------------------------------------------------------------------------
// Cross-tabulations
// ---------------------------------------------------------------------------

/// Month × year counts. Rows are all twelve months in calendar order;
/// columns are the years present, ascending.
pub fn month_year_crosstab(table: &CrashTable) -> CrossTab<MonthName, i32> {
    let mut counts: BTreeMap<(MonthName, i32), u64> = BTreeMap::new();
    for cal in table.records.iter().filter_map(|r| r.calendar) {
        *counts.entry((cal.month, cal.year)).or_default() += 1;
    }
    let years: Vec<i32> = table.years().into_iter().collect();
    build_crosstab(years, |month, year| counts.get(&(month, *year)).copied())
}

/// Month × victim counts. Rows are all twelve months in calendar order;
/// columns follow the victim-type view's order. `None` when the source has
/// no victim column.
pub fn month_victim_crosstab(table: &CrashTable) -> Option<CrossTab<MonthName, String>> {
    if !table.columns.victim {
        return None;
    }
    let mut counts: HashMap<(MonthName, &str), u64> = HashMap::new();
    for rec in &table.records {
        if let (Some(month), Some(victim)) = (rec.month(), rec.victim()) {
            *counts.entry((month, victim)).or_default() += 1;
        }
    }
    let victims: Vec<String> = ranked_counts(
        table
            .records
            .iter()
            .filter(|r| r.month().is_some())
            .filter_map(|r| r.victim()),
    )
    .into_iter()
    .map(|(victim, _)| victim)
    .collect();
    Some(build_crosstab(victims, |month, victim| {
        counts.get(&(month, victim.as_str())).copied()
    }))
}

fn build_crosstab<C>(
    columns: Vec<C>,
    cell: impl Fn(MonthName, &C) -> Option<u64>,
) -> CrossTab<MonthName, C> {
    let cells = MonthName::ALL
        .iter()
        .map(|&month| columns.iter().map(|c| cell(month, c)).collect())
        .collect();
    CrossTab {
        rows: MonthName::ALL.to_vec(),
        columns,
        cells,
    }
}

// ---------------------------------------------------------------------------
// The full set handed to the presentation layer
// ---------------------------------------------------------------------------

/// Every view computed from one filtered table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSet {
    pub rows: usize,
    pub monthly: CountView<MonthName>,
    pub weekday: CountView<DayOfWeek>,
    pub yearly: CountView<i32>,
    pub hourly: CountView<HourOfDay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub victims: Option<CountView<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_locations: Option<CountView<String>>,
    pub month_year: CrossTab<MonthName, i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month_victim: Option<CrossTab<MonthName, String>>,
    pub map_points: Vec<MapPoint>,
}

impl ViewSet {
    pub fn compute(table: &CrashTable) -> Self {
        Self {
            rows: table.len(),
            monthly: monthly_counts(table),
            weekday: weekday_counts(table),
            yearly: yearly_counts(table),
            hourly: hourly_counts(table),
            victims: victim_counts(table),
            top_locations: top_locations(table),
            month_year: month_year_crosstab(table),
            month_victim: month_victim_crosstab(table),
            map_points: map_points(table),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TIMESTAMP_FORMATS;
    use crate::data::calendar::derive_calendar;
    use crate::data::model::{RawCrashRecord, RawCrashTable, SourceColumns};

    fn row(ts: &str, victim: &str, loc: &str) -> RawCrashRecord {
        RawCrashRecord {
            timestamp: ts.to_string(),
            victim: (!victim.is_empty()).then(|| victim.to_string()),
            location: (!loc.is_empty()).then(|| loc.to_string()),
            latitude: None,
            longitude: None,
        }
    }

    fn table(rows: Vec<RawCrashRecord>) -> CrashTable {
        let raw = RawCrashTable {
            records: rows,
            columns: SourceColumns::all(),
        };
        derive_calendar(&raw, DEFAULT_TIMESTAMP_FORMATS)
    }

    #[test]
    fn monthly_counts_fill_every_month() {
        let t = table(vec![
            row("2021-07-04 23:00", "", ""),
            row("2021-07-05 01:00", "", ""),
            row("2020-02-01 12:00", "", ""),
            row("bad", "", ""),
        ]);
        let view = monthly_counts(&t);
        assert_eq!(view.len(), 12);
        assert_eq!(view.keys().copied().collect::<Vec<_>>(), MonthName::ALL.to_vec());
        assert_eq!(view.get(&MonthName::July), Some(2));
        assert_eq!(view.get(&MonthName::February), Some(1));
        assert_eq!(view.get(&MonthName::March), Some(0));
        assert_eq!(view.total(), 3);
    }

    #[test]
    fn monthly_counts_of_empty_table_are_all_zero() {
        let view = monthly_counts(&CrashTable::default());
        assert_eq!(view.len(), 12);
        assert!(view.iter().all(|(_, n)| n == 0));
    }

    #[test]
    fn weekday_counts_run_monday_to_sunday() {
        // 2021-07-04 is a Sunday, 2021-07-05 a Monday.
        let t = table(vec![
            row("2021-07-04 23:00", "", ""),
            row("2021-07-05 01:00", "", ""),
        ]);
        let view = weekday_counts(&t);
        let labels: Vec<String> = view.keys().map(|d| d.to_string()).collect();
        assert_eq!(labels.first().map(String::as_str), Some("Monday"));
        assert_eq!(labels.last().map(String::as_str), Some("Sunday"));
        assert_eq!(view.get(&DayOfWeek(Weekday::Sun)), Some(1));
        assert_eq!(view.get(&DayOfWeek(Weekday::Wed)), Some(0));
    }

    #[test]
    fn yearly_and_hourly_counts_skip_missing_keys() {
        let t = table(vec![
            row("2022-01-01 08:00", "", ""),
            row("2019-01-01 23:30", "", ""),
            row("2022-03-01 08:10", "", ""),
        ]);
        let years = yearly_counts(&t);
        assert_eq!(years.keys().copied().collect::<Vec<_>>(), vec![2019, 2022]);
        assert_eq!(years.get(&2022), Some(2));
        assert_eq!(years.get(&2020), None);

        let hours = hourly_counts(&t);
        let labels: Vec<String> = hours.keys().map(|h| h.to_string()).collect();
        assert_eq!(labels, vec!["08:00", "23:00"]);
        assert_eq!(hours.get(&HourOfDay(8)), Some(2));
    }

    #[test]
    fn victim_counts_rank_by_frequency_then_first_seen() {
        let t = table(vec![
            row("2021-01-01 00:00", "PEDESTRIAN", ""),
            row("2021-01-01 00:00", "DRIVER", ""),
            row("2021-01-01 00:00", "CYCLIST", ""),
            row("2021-01-01 00:00", "CYCLIST", ""),
            row("2021-01-01 00:00", "", ""),
        ]);
        let view = victim_counts(&t).unwrap();
        let pairs: Vec<(&str, u64)> = view.iter().map(|(k, n)| (k.as_str(), n)).collect();
        assert_eq!(pairs, vec![("CYCLIST", 2), ("PEDESTRIAN", 1), ("DRIVER", 1)]);
    }

    #[test]
    fn victim_views_are_skipped_without_the_column() {
        let mut t = table(vec![row("2021-01-01 00:00", "", "MAIN ST")]);
        t.columns.victim = false;
        assert!(victim_counts(&t).is_none());
        assert!(month_victim_crosstab(&t).is_none());
        assert!(top_locations(&t).is_some());
    }

    #[test]
    fn top_locations_truncate_to_five() {
        let mut rows = Vec::new();
        for (loc, n) in [("A", 1), ("B", 3), ("C", 2), ("D", 1), ("E", 4), ("F", 1), ("G", 2)] {
            for _ in 0..n {
                rows.push(row("2021-01-01 00:00", "", loc));
            }
        }
        let view = top_locations(&table(rows)).unwrap();
        assert_eq!(view.len(), TOP_LOCATIONS);
        let keys: Vec<&str> = view.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["E", "B", "C", "G", "A"]);
        let first = view.entries()[0].count;
        assert!(view.iter().all(|(_, n)| n <= first));
    }

    #[test]
    fn month_year_crosstab_leaves_gaps_empty() {
        let t = table(vec![
            row("2020-07-01 00:00", "", ""),
            row("2021-07-01 00:00", "", ""),
            row("2021-07-02 00:00", "", ""),
            row("2021-08-01 00:00", "", ""),
            row("bad", "", ""),
        ]);
        let tab = month_year_crosstab(&t);
        assert_eq!(tab.rows, MonthName::ALL.to_vec());
        assert_eq!(tab.columns, vec![2020, 2021]);
        assert_eq!(tab.get(&MonthName::July, &2021), Some(2));
        assert_eq!(tab.get(&MonthName::August, &2020), None);
        assert_eq!(tab.get(&MonthName::January, &2021), None);
        assert_eq!(tab.total(), 4);
    }

    #[test]
    fn month_victim_crosstab_counts_pairs() {
        let t = table(vec![
            row("2021-07-01 00:00", "DRIVER", ""),
            row("2021-07-02 00:00", "DRIVER", ""),
            row("2021-08-01 00:00", "PEDESTRIAN", ""),
            row("2021-08-01 00:00", "", ""),
        ]);
        let tab = month_victim_crosstab(&t).unwrap();
        assert_eq!(tab.columns, vec!["DRIVER".to_string(), "PEDESTRIAN".to_string()]);
        assert_eq!(tab.get(&MonthName::July, &"DRIVER".to_string()), Some(2));
        assert_eq!(tab.get(&MonthName::July, &"PEDESTRIAN".to_string()), None);
        assert_eq!(tab.total(), 3);
    }

    #[test]
    fn map_points_need_both_coordinates() {
        let mut rows = vec![row("2021-01-01 00:00", "", ""); 3];
        rows[0].latitude = Some(41.9);
        rows[0].longitude = Some(-87.6);
        rows[1].latitude = Some(41.8);
        let points = map_points(&table(rows));
        assert_eq!(
            points,
            vec![MapPoint {
                latitude: 41.9,
                longitude: -87.6
            }]
        );
    }

    #[test]
    fn view_set_serialises_without_absent_views() {
        let mut t = table(vec![row("2021-07-04 23:00", "", "MAIN ST")]);
        t.columns.victim = false;
        let json = serde_json::to_value(ViewSet::compute(&t)).unwrap();
        assert!(json.get("victims").is_none());
        assert!(json.get("month_victim").is_none());
        assert_eq!(json["monthly"][6]["key"], "July");
        assert_eq!(json["monthly"][6]["count"], 1);
        assert_eq!(json["hourly"][0]["key"], "23:00");
        assert_eq!(json["top_locations"][0]["key"], "MAIN ST");
    }
}
