use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, Weekday};
use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// MonthName – the fixed twelve-entry calendar axis
// ---------------------------------------------------------------------------

/// A calendar month. Ordering is calendar order (January first), which is
/// the row order of every month-keyed view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MonthName {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl MonthName {
    /// All months in calendar order.
    pub const ALL: [MonthName; 12] = [
        MonthName::January,
        MonthName::February,
        MonthName::March,
        MonthName::April,
        MonthName::May,
        MonthName::June,
        MonthName::July,
        MonthName::August,
        MonthName::September,
        MonthName::October,
        MonthName::November,
        MonthName::December,
    ];

    /// Month from its 1-based number (1 = January).
    pub fn from_number(n: u32) -> Option<Self> {
        n.checked_sub(1)
            .and_then(|i| Self::ALL.get(i as usize))
            .copied()
    }

    /// 1-based month number.
    pub fn number(self) -> u32 {
        self as u32 + 1
    }

    /// Full English name, e.g. `"July"`.
    pub fn name(self) -> &'static str {
        match self {
            MonthName::January => "January",
            MonthName::February => "February",
            MonthName::March => "March",
            MonthName::April => "April",
            MonthName::May => "May",
            MonthName::June => "June",
            MonthName::July => "July",
            MonthName::August => "August",
            MonthName::September => "September",
            MonthName::October => "October",
            MonthName::November => "November",
            MonthName::December => "December",
        }
    }
}

impl fmt::Display for MonthName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a string is not a full English month name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a month name")]
pub struct ParseMonthError(pub String);

impl FromStr for MonthName {
    type Err = ParseMonthError;

    /// Accepts full English names, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseMonthError(s.to_string()))
    }
}

impl Serialize for MonthName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Full English day name, e.g. `"Monday"`.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Days of the week, Monday first.
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

// ---------------------------------------------------------------------------
// Raw rows – exactly what the source holds
// ---------------------------------------------------------------------------

/// One row of the source table, before any calendar derivation.
///
/// Text fields that were empty in the source are `None`; so are
/// coordinates that were empty or not a number.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawCrashRecord {
    /// Timestamp text as it appeared in the source.
    pub timestamp: String,
    pub victim: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Which optional columns the source schema actually carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SourceColumns {
    pub victim: bool,
    pub location: bool,
    pub latitude: bool,
    pub longitude: bool,
}

impl SourceColumns {
    /// Every optional column present.
    pub fn all() -> Self {
        SourceColumns {
            victim: true,
            location: true,
            latitude: true,
            longitude: true,
        }
    }
}

/// The loaded source, in file order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawCrashTable {
    pub records: Vec<RawCrashRecord>,
    pub columns: SourceColumns,
}

impl RawCrashTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Derived rows
// ---------------------------------------------------------------------------

/// Calendar components of a parsed timestamp. Either all of them exist
/// or none do, so a row can never carry a year without a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CalendarFields {
    pub year: i32,
    pub month: MonthName,
    pub weekday: Weekday,
    /// Hour of day, 0–23.
    pub hour: u32,
}

/// A source row plus its parsed timestamp and derived calendar fields.
#[derive(Debug, Clone, PartialEq)]
pub struct CrashRecord {
    /// Source fields, untouched.
    pub raw: RawCrashRecord,
    /// `None` when the raw timestamp did not parse.
    pub timestamp: Option<NaiveDateTime>,
    /// `Some` exactly when `timestamp` is `Some`.
    pub calendar: Option<CalendarFields>,
}

impl CrashRecord {
    pub fn year(&self) -> Option<i32> {
        self.calendar.map(|c| c.year)
    }

    pub fn month(&self) -> Option<MonthName> {
        self.calendar.map(|c| c.month)
    }

    pub fn weekday(&self) -> Option<Weekday> {
        self.calendar.map(|c| c.weekday)
    }

    pub fn hour(&self) -> Option<u32> {
        self.calendar.map(|c| c.hour)
    }

    pub fn victim(&self) -> Option<&str> {
        self.raw.victim.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.raw.location.as_deref()
    }

    /// Both coordinates, when both are present. A zero on either axis is
    /// the source's "location unknown" marker and counts as missing.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let latitude = self.raw.latitude?;
        let longitude = self.raw.longitude?;
        if latitude == 0.0 || longitude == 0.0 {
            return None;
        }
        Some((latitude, longitude))
    }
}

/// Rows with derived calendar columns, in source order.
///
/// Built once at startup and shared read-only; filtering produces a new
/// table rather than touching this one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CrashTable {
    pub records: Vec<CrashRecord>,
    pub columns: SourceColumns,
}

impl CrashTable {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows whose timestamp failed to parse.
    pub fn unparsed_count(&self) -> usize {
        self.records.iter().filter(|r| r.timestamp.is_none()).count()
    }

    /// Distinct years present, ascending.
    pub fn years(&self) -> BTreeSet<i32> {
        self.records.iter().filter_map(CrashRecord::year).collect()
    }

    /// Distinct months present, calendar order.
    pub fn months(&self) -> BTreeSet<MonthName> {
        self.records.iter().filter_map(CrashRecord::month).collect()
    }
}
