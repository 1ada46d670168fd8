//! Pipeline configuration: source column names and timestamp formats.

/// Source header for each logical crash field.
///
/// Headers are matched case-insensitively after trimming whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNames {
    pub timestamp: String,
    pub victim: String,
    pub location: String,
    pub latitude: String,
    pub longitude: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            timestamp: "Crash_Date".to_string(),
            victim: "Victim".to_string(),
            location: "Crash_Location".to_string(),
            latitude: "Latitude".to_string(),
            longitude: "Longitude".to_string(),
        }
    }
}

impl ColumnNames {
    /// Position of `name` among `headers`, if any.
    pub fn position(headers: &[String], name: &str) -> Option<usize> {
        let wanted = name.trim();
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(wanted))
    }
}

/// Timestamp layouts tried in order when no explicit format is given.
///
/// Layouts with an offset keep the local wall-clock time; date-only
/// layouts resolve to midnight.
pub const DEFAULT_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S%:z",
    "%+",
    "%Y-%m-%d",
    "%m/%d/%Y",
];

/// Everything the loader and deriver need to know about a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub columns: ColumnNames,
    /// `chrono` format strings, tried in order.
    pub timestamp_formats: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            columns: ColumnNames::default(),
            timestamp_formats: DEFAULT_TIMESTAMP_FORMATS
                .iter()
                .map(|f| f.to_string())
                .collect(),
        }
    }
}

impl PipelineConfig {
    /// Replace the format list with a single fixed format.
    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_formats = vec![format.into()];
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case_and_padding() {
        let headers = vec![
            "crash_date".to_string(),
            " VICTIM ".to_string(),
            "Latitude".to_string(),
        ];
        assert_eq!(ColumnNames::position(&headers, "Crash_Date"), Some(0));
        assert_eq!(ColumnNames::position(&headers, "Victim"), Some(1));
        assert_eq!(ColumnNames::position(&headers, "Longitude"), None);
    }

    #[test]
    fn explicit_format_replaces_defaults() {
        let config = PipelineConfig::default().with_timestamp_format("%d.%m.%Y %H:%M");
        assert_eq!(config.timestamp_formats, vec!["%d.%m.%Y %H:%M".to_string()]);
    }
}
