use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::DataType;
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::reader::ChunkReader;
use serde_json::{Map, Value as JsonValue};

use super::model::{RawCrashRecord, RawCrashTable, SourceColumns};
use crate::config::ColumnNames;
use crate::error::LoadError;

/// Largest response body accepted from a remote source.
const MAX_DOWNLOAD_BYTES: u64 = 512 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Supported tabular encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Json,
    Parquet,
}

impl SourceFormat {
    /// Pick the format from a path or URL by extension. Query strings and
    /// fragments on URLs are ignored.
    pub fn detect(source: &str) -> Result<Self, LoadError> {
        let path = source.split(['?', '#']).next().unwrap_or(source);
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "csv" => Ok(SourceFormat::Csv),
            "json" => Ok(SourceFormat::Json),
            "parquet" | "pq" => Ok(SourceFormat::Parquet),
            "" => Err(LoadError::UnsupportedFormat(format!(
                "{source} has no file extension"
            ))),
            other => Err(LoadError::UnsupportedFormat(format!(".{other}"))),
        }
    }
}

/// Load the crash source named by `source`, either a local path or an
/// `http://` / `https://` URL.
pub fn load_source(source: &str, columns: &ColumnNames) -> Result<RawCrashTable, LoadError> {
    let table = if is_url(source) {
        load_url(source, columns)?
    } else {
        load_file(Path::new(source), columns)?
    };
    log::info!(
        "Loaded {} crash rows from {source} (optional columns: {:?})",
        table.len(),
        table.columns
    );
    Ok(table)
}

/// Load a crash table from a local file. Dispatch by extension.
pub fn load_file(path: &Path, columns: &ColumnNames) -> Result<RawCrashTable, LoadError> {
    let format = SourceFormat::detect(&path.to_string_lossy())?;
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match format {
        SourceFormat::Csv => read_csv(file, columns),
        SourceFormat::Json => read_json(file, columns),
        SourceFormat::Parquet => read_parquet(file, columns),
    }
}

fn is_url(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

// ---------------------------------------------------------------------------
// Remote sources
// ---------------------------------------------------------------------------

fn agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(Duration::from_secs(60))
            .build()
    })
}

fn load_url(url: &str, columns: &ColumnNames) -> Result<RawCrashTable, LoadError> {
    let format = SourceFormat::detect(url)?;
    log::debug!("Fetching {url}");

    let response = agent().get(url).call().map_err(|source| LoadError::Network {
        url: url.to_string(),
        source: Box::new(source),
    })?;
    let body_err = |source: std::io::Error| LoadError::Body {
        url: url.to_string(),
        source,
    };

    let body = read_capped(response.into_reader(), MAX_DOWNLOAD_BYTES).map_err(body_err)?;

    match format {
        SourceFormat::Csv => read_csv(body.as_slice(), columns),
        SourceFormat::Json => read_json(body.as_slice(), columns),
        SourceFormat::Parquet => {
            // Parquet needs random access, so spool the body to disk.
            let mut spool = tempfile::tempfile().map_err(body_err)?;
            spool.write_all(&body).map_err(body_err)?;
            spool.seek(SeekFrom::Start(0)).map_err(body_err)?;
            read_parquet(spool, columns)
        }
    }
}

/// Read a whole body, failing once it grows past `max_bytes`.
fn read_capped(reader: impl Read, max_bytes: u64) -> std::io::Result<Vec<u8>> {
    let mut body = Vec::new();
    reader.take(max_bytes + 1).read_to_end(&mut body)?;
    if body.len() as u64 > max_bytes {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("response exceeded {max_bytes} bytes"),
        ));
    }
    Ok(body)
}

// ---------------------------------------------------------------------------
// Cell helpers shared by every format
// ---------------------------------------------------------------------------

/// Trimmed text, or `None` when blank.
fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// A finite coordinate, or `None` when blank or not a number.
fn parse_coordinate(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Column positions resolved against one source's headers.
struct ColumnIndex {
    timestamp: usize,
    victim: Option<usize>,
    location: Option<usize>,
    latitude: Option<usize>,
    longitude: Option<usize>,
}

impl ColumnIndex {
    fn resolve(headers: &[String], names: &ColumnNames) -> Result<Self, LoadError> {
        let timestamp = ColumnNames::position(headers, &names.timestamp)
            .ok_or_else(|| LoadError::MissingColumn(names.timestamp.clone()))?;
        Ok(ColumnIndex {
            timestamp,
            victim: ColumnNames::position(headers, &names.victim),
            location: ColumnNames::position(headers, &names.location),
            latitude: ColumnNames::position(headers, &names.latitude),
            longitude: ColumnNames::position(headers, &names.longitude),
        })
    }

    fn present(&self) -> SourceColumns {
        SourceColumns {
            victim: self.victim.is_some(),
            location: self.location.is_some(),
            latitude: self.latitude.is_some(),
            longitude: self.longitude.is_some(),
        }
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one crash per row.
/// Columns other than the configured ones are ignored.
pub fn read_csv<R: Read>(reader: R, names: &ColumnNames) -> Result<RawCrashTable, LoadError> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();
    let index = ColumnIndex::resolve(&headers, names)?;

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result?;
        let text = |idx: Option<usize>| idx.and_then(|i| row.get(i)).and_then(non_empty);
        let coord = |idx: Option<usize>| idx.and_then(|i| row.get(i)).and_then(parse_coordinate);

        records.push(RawCrashRecord {
            timestamp: row.get(index.timestamp).unwrap_or("").to_string(),
            victim: text(index.victim),
            location: text(index.location),
            latitude: coord(index.latitude),
            longitude: coord(index.longitude),
        });
    }

    Ok(RawCrashTable {
        records,
        columns: index.present(),
    })
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Crash_Date": "2021-07-04 23:00", "Victim": "PEDESTRIAN",
///     "Crash_Location": "MAIN ST", "Latitude": 41.88, "Longitude": -87.63 },
///   ...
/// ]
/// ```
///
/// A column counts as present when any record carries the key.
pub fn read_json<R: Read>(reader: R, names: &ColumnNames) -> Result<RawCrashTable, LoadError> {
    let root: JsonValue = serde_json::from_reader(reader)?;
    let Some(rows) = root.as_array() else {
        return Err(LoadError::UnsupportedFormat(
            "expected a top-level JSON array of records".to_string(),
        ));
    };

    let mut present = SourceColumns::default();
    let mut saw_timestamp = false;
    let mut records = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let obj = row.as_object().ok_or_else(|| LoadError::MalformedRow {
            row: i,
            message: "not a JSON object".to_string(),
        })?;

        let timestamp = json_field(obj, &names.timestamp);
        let victim = json_field(obj, &names.victim);
        let location = json_field(obj, &names.location);
        let latitude = json_field(obj, &names.latitude);
        let longitude = json_field(obj, &names.longitude);

        saw_timestamp |= timestamp.is_some();
        present.victim |= victim.is_some();
        present.location |= location.is_some();
        present.latitude |= latitude.is_some();
        present.longitude |= longitude.is_some();

        records.push(RawCrashRecord {
            timestamp: timestamp.and_then(json_text).unwrap_or_default(),
            victim: victim.and_then(json_text).as_deref().and_then(non_empty),
            location: location.and_then(json_text).as_deref().and_then(non_empty),
            latitude: latitude.and_then(json_coordinate),
            longitude: longitude.and_then(json_coordinate),
        });
    }

    if !records.is_empty() && !saw_timestamp {
        return Err(LoadError::MissingColumn(names.timestamp.clone()));
    }

    Ok(RawCrashTable {
        records,
        columns: present,
    })
}

fn json_field<'a>(obj: &'a Map<String, JsonValue>, name: &str) -> Option<&'a JsonValue> {
    let wanted = name.trim();
    obj.iter()
        .find(|(key, _)| key.trim().eq_ignore_ascii_case(wanted))
        .map(|(_, value)| value)
}

fn json_text(val: &JsonValue) -> Option<String> {
    match val {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Null => None,
        other => Some(other.to_string()),
    }
}

fn json_coordinate(val: &JsonValue) -> Option<f64> {
    match val {
        JsonValue::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        JsonValue::String(s) => parse_coordinate(s),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load crash rows from Parquet.
///
/// Text columns may be `Utf8` or `LargeUtf8`; any other type is rendered
/// through Arrow's display formatting, so `Timestamp` columns come out as
/// ISO-8601 text and numeric coordinates as decimal text.
pub fn read_parquet<T>(input: T, names: &ColumnNames) -> Result<RawCrashTable, LoadError>
where
    T: ChunkReader + 'static,
{
    let builder = ParquetRecordBatchReaderBuilder::try_new(input)?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let index = ColumnIndex::resolve(&headers, names)?;
    let reader = builder.build()?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;
        let column = |idx: Option<usize>| idx.map(|i| batch.column(i).clone());
        let ts_col = batch.column(index.timestamp).clone();
        let victim_col = column(index.victim);
        let location_col = column(index.location);
        let lat_col = column(index.latitude);
        let lon_col = column(index.longitude);

        for row in 0..batch.num_rows() {
            let text = |col: &Option<ArrayRef>| {
                col.as_ref()
                    .and_then(|c| cell_text(c, row))
                    .as_deref()
                    .and_then(non_empty)
            };
            let coord = |col: &Option<ArrayRef>| {
                col.as_ref()
                    .and_then(|c| cell_text(c, row))
                    .as_deref()
                    .and_then(parse_coordinate)
            };

            records.push(RawCrashRecord {
                timestamp: cell_text(&ts_col, row).unwrap_or_default(),
                victim: text(&victim_col),
                location: text(&location_col),
                latitude: coord(&lat_col),
                longitude: coord(&lon_col),
            });
        }
    }

    Ok(RawCrashTable {
        records,
        columns: index.present(),
    })
}

/// Text of a single cell, `None` for nulls.
fn cell_text(col: &ArrayRef, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Utf8 => Some(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Some(col.as_string::<i64>().value(row).to_string()),
        _ => array_value_to_string(col.as_ref(), row).ok(),
    }
}
