//! Calendar derivation: parse each raw timestamp and attach year, month,
//! day of week and hour.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};

use super::model::{CalendarFields, CrashRecord, CrashTable, MonthName, RawCrashTable};

/// Parse `raw` against each format in turn. Returns `None` when none match.
pub fn parse_timestamp<S: AsRef<str>>(raw: &str, formats: &[S]) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    formats.iter().find_map(|f| parse_with(trimmed, f.as_ref()))
}

/// One format, read as a naive date-time, an offset date-time (local part)
/// or a bare date (midnight).
fn parse_with(text: &str, format: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_str(text, format) {
        return Some(ts.naive_local());
    }
    NaiveDate::parse_from_str(text, format)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Calendar components of a parsed timestamp.
pub fn calendar_fields(ts: &NaiveDateTime) -> CalendarFields {
    CalendarFields {
        year: ts.year(),
        // month() is always 1..=12
        month: MonthName::from_number(ts.month()).unwrap_or(MonthName::January),
        weekday: ts.weekday(),
        hour: ts.hour(),
    }
}

/// Build the derived table. Rows whose timestamp does not parse are kept,
/// with the parsed timestamp and every calendar field left unset.
pub fn derive_calendar<S: AsRef<str>>(raw: &RawCrashTable, formats: &[S]) -> CrashTable {
    let records: Vec<CrashRecord> = raw
        .records
        .iter()
        .enumerate()
        .map(|(row, rec)| {
            let timestamp = parse_timestamp(&rec.timestamp, formats);
            if timestamp.is_none() {
                log::debug!("Row {row}: unparseable timestamp '{}'", rec.timestamp);
            }
            CrashRecord {
                raw: rec.clone(),
                timestamp,
                calendar: timestamp.as_ref().map(calendar_fields),
            }
        })
        .collect();

    let table = CrashTable {
        records,
        columns: raw.columns,
    };
    let unparsed = table.unparsed_count();
    if unparsed > 0 {
        log::warn!(
            "{unparsed} of {} rows have an unparseable timestamp and will match no filter",
            table.len()
        );
    }
    table
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;

    use super::*;
    use crate::config::DEFAULT_TIMESTAMP_FORMATS;
    use crate::data::model::RawCrashRecord;

    fn raw_table(stamps: &[&str]) -> RawCrashTable {
        RawCrashTable {
            records: stamps
                .iter()
                .map(|s| RawCrashRecord {
                    timestamp: s.to_string(),
                    ..Default::default()
                })
                .collect(),
            columns: Default::default(),
        }
    }

    #[test]
    fn parses_each_default_layout() {
        for raw in [
            "2021-07-04 23:00",
            "2021-07-04 23:00:00",
            "2021-07-04T23:00:00",
            "2021-07-04T23:00:00.000",
            "07/04/2021 11:00:00 PM",
            "07/04/2021 23:00",
        ] {
            let ts = parse_timestamp(raw, DEFAULT_TIMESTAMP_FORMATS)
                .unwrap_or_else(|| panic!("{raw} should parse"));
            assert_eq!(ts.to_string(), "2021-07-04 23:00:00");
        }
    }

    #[test]
    fn parses_offsets_as_local_time() {
        for raw in [
            "2021-07-04 23:00:00+00:00",
            "2021-07-04T23:00:00Z",
            "2021-07-04T23:00:00-05:00",
            "2021-07-04T23:00:00.250+02:00",
        ] {
            let ts = parse_timestamp(raw, DEFAULT_TIMESTAMP_FORMATS)
                .unwrap_or_else(|| panic!("{raw} should parse"));
            assert_eq!((ts.date().to_string(), ts.hour()), ("2021-07-04".to_string(), 23));
        }
    }

    #[test]
    fn date_only_values_resolve_to_midnight() {
        for raw in ["2021-07-04", "07/04/2021"] {
            let ts = parse_timestamp(raw, DEFAULT_TIMESTAMP_FORMATS)
                .unwrap_or_else(|| panic!("{raw} should parse"));
            assert_eq!(ts.to_string(), "2021-07-04 00:00:00");
        }
    }

    #[test]
    fn rejects_garbage_and_blank() {
        assert!(parse_timestamp("bad", DEFAULT_TIMESTAMP_FORMATS).is_none());
        assert!(parse_timestamp("   ", DEFAULT_TIMESTAMP_FORMATS).is_none());
        assert!(parse_timestamp("2021-13-40 25:00", DEFAULT_TIMESTAMP_FORMATS).is_none());
    }

    #[test]
    fn single_fixed_format_is_strict() {
        assert!(parse_timestamp("07/04/2021 23:00", &["%Y-%m-%d %H:%M"]).is_none());
    }

    #[test]
    fn derives_calendar_fields() {
        let table = derive_calendar(&raw_table(&["2021-07-04 23:15"]), DEFAULT_TIMESTAMP_FORMATS);
        let cal = table.records[0].calendar.unwrap();
        assert_eq!(cal.year, 2021);
        assert_eq!(cal.month, MonthName::July);
        assert_eq!(cal.weekday, Weekday::Sun);
        assert_eq!(cal.hour, 23);
    }

    #[test]
    fn unparseable_rows_are_kept_with_nothing_derived() {
        let raw = raw_table(&["2021-07-04 23:00", "bad", ""]);
        let table = derive_calendar(&raw, DEFAULT_TIMESTAMP_FORMATS);

        assert_eq!(table.len(), 3);
        assert_eq!(table.unparsed_count(), 2);
        for rec in &table.records[1..] {
            assert_eq!(rec.timestamp, None);
            assert_eq!(rec.year(), None);
            assert_eq!(rec.month(), None);
            assert_eq!(rec.weekday(), None);
            assert_eq!(rec.hour(), None);
        }
        assert_eq!(table.records[1].raw.timestamp, "bad");
    }

    #[test]
    fn derived_fields_match_parsed_timestamp() {
        let raw = raw_table(&[
            "2019-01-01 00:00",
            "2020-02-29 12:30",
            "2022-12-31 23:59",
            "2023-06-15 07:05",
        ]);
        let table = derive_calendar(&raw, DEFAULT_TIMESTAMP_FORMATS);
        for rec in &table.records {
            let ts = rec.timestamp.unwrap();
            let cal = rec.calendar.unwrap();
            assert_eq!(cal.year, ts.year());
            assert_eq!(cal.month.number(), ts.month());
            assert_eq!(cal.weekday, ts.weekday());
            assert_eq!(cal.hour, ts.hour());
        }
    }
}
