use std::fmt::{Display, Write};
use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;

use crate::views::{CountView, CrossTab, ViewSet};

// ---------------------------------------------------------------------------
// Views → Arrow record batches
// ---------------------------------------------------------------------------

/// Two-column batch: `key_name` (text) and `fatalities` (count).
pub fn count_batch<K: Display>(
    view: &CountView<K>,
    key_name: &str,
) -> Result<RecordBatch, ArrowError> {
    let keys = StringArray::from_iter_values(view.keys().map(|k| k.to_string()));
    let counts = UInt64Array::from_iter_values(view.iter().map(|(_, n)| n));

    let schema = Arc::new(Schema::new(vec![
        Field::new(key_name, DataType::Utf8, false),
        Field::new("fatalities", DataType::UInt64, false),
    ]));
    RecordBatch::try_new(schema, vec![Arc::new(keys), Arc::new(counts)])
}

/// One text column named `row_name`, then one nullable count column per
/// cross-tab column. Empty cells become nulls.
pub fn crosstab_batch<R: Display, C: Display>(
    tab: &CrossTab<R, C>,
    row_name: &str,
) -> Result<RecordBatch, ArrowError> {
    let mut fields = vec![Field::new(row_name, DataType::Utf8, false)];
    let mut arrays: Vec<ArrayRef> = vec![Arc::new(StringArray::from_iter_values(
        tab.rows.iter().map(|r| r.to_string()),
    ))];

    for (c, column) in tab.columns.iter().enumerate() {
        fields.push(Field::new(column.to_string(), DataType::UInt64, true));
        let values: UInt64Array = tab.cells.iter().map(|row| row[c]).collect();
        arrays.push(Arc::new(values));
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
}

// ---------------------------------------------------------------------------
// Text and JSON output
// ---------------------------------------------------------------------------

fn section(out: &mut String, title: &str, batch: RecordBatch) -> Result<(), ArrowError> {
    let table = pretty_format_batches(&[batch])?;
    // Writing to a String cannot fail.
    let _ = writeln!(out, "{title}\n{table}\n");
    Ok(())
}

/// Render every view as a titled ASCII table. Views skipped for a missing
/// source column are noted instead.
pub fn format_views(views: &ViewSet) -> Result<String, ArrowError> {
    let mut out = String::new();
    let _ = writeln!(out, "Fatalities in selection: {}\n", views.rows);

    section(&mut out, "By month", count_batch(&views.monthly, "month")?)?;
    section(&mut out, "By year", count_batch(&views.yearly, "year")?)?;
    section(&mut out, "By hour", count_batch(&views.hourly, "hour")?)?;
    section(&mut out, "By day of week", count_batch(&views.weekday, "day")?)?;

    match &views.victims {
        Some(v) => section(&mut out, "By victim type", count_batch(v, "victim")?)?,
        None => out.push_str("By victim type: no victim column in source\n\n"),
    }
    match &views.top_locations {
        Some(v) => section(&mut out, "Top crash locations", count_batch(v, "location")?)?,
        None => out.push_str("Top crash locations: no location column in source\n\n"),
    }

    section(&mut out, "Month x year", crosstab_batch(&views.month_year, "month")?)?;
    if let Some(tab) = &views.month_victim {
        section(&mut out, "Month x victim type", crosstab_batch(tab, "month")?)?;
    }

    let _ = writeln!(out, "Map points: {}", views.map_points.len());
    Ok(out)
}

/// The complete view set as pretty-printed JSON.
pub fn views_json(views: &ViewSet) -> serde_json::Result<String> {
    serde_json::to_string_pretty(views)
}

#[cfg(test)]
mod tests {
    use arrow::array::Array;

    use super::*;
    use crate::config::DEFAULT_TIMESTAMP_FORMATS;
    use crate::data::calendar::derive_calendar;
    use crate::data::model::{RawCrashRecord, RawCrashTable, SourceColumns};
    use crate::views::{monthly_counts, month_year_crosstab};

    fn table() -> crate::data::model::CrashTable {
        let raw = RawCrashTable {
            records: ["2020-07-01 10:00", "2021-07-04 23:00", "2021-08-01 01:00"]
                .iter()
                .map(|ts| RawCrashRecord {
                    timestamp: ts.to_string(),
                    victim: Some("DRIVER".to_string()),
                    location: Some("MAIN ST".to_string()),
                    ..Default::default()
                })
                .collect(),
            columns: SourceColumns::all(),
        };
        derive_calendar(&raw, DEFAULT_TIMESTAMP_FORMATS)
    }

    #[test]
    fn count_batch_has_key_and_count_columns() {
        let batch = count_batch(&monthly_counts(&table()), "month").unwrap();
        assert_eq!(batch.num_rows(), 12);
        assert_eq!(batch.schema().field(0).name(), "month");
        assert_eq!(batch.schema().field(1).name(), "fatalities");

        let counts = batch
            .column(1)
            .as_any()
            .downcast_ref::<UInt64Array>()
            .unwrap();
        assert_eq!(counts.value(6), 2);
    }

    #[test]
    fn crosstab_batch_marks_gaps_as_null() {
        let batch = crosstab_batch(&month_year_crosstab(&table()), "month").unwrap();
        assert_eq!(batch.num_columns(), 3);
        assert_eq!(batch.schema().field(1).name(), "2020");

        let y2020 = batch.column(1);
        assert!(!y2020.is_null(6));
        assert!(y2020.is_null(7));
    }

    #[test]
    fn text_output_lists_every_section() {
        let out = format_views(&ViewSet::compute(&table())).unwrap();
        for title in [
            "By month",
            "By year",
            "By hour",
            "By day of week",
            "By victim type",
            "Top crash locations",
            "Month x year",
            "Month x victim type",
        ] {
            assert!(out.contains(title), "missing {title}");
        }
        assert!(out.contains("MAIN ST"));
    }
}
