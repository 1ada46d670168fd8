use std::path::PathBuf;

use thiserror::Error;

/// Failure to produce a crash table from a source. Fatal at startup.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("source not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("reading {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("fetching {url}")]
    Network {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("reading response body from {url}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV")]
    Csv(#[from] csv::Error),

    #[error("malformed JSON")]
    Json(#[from] serde_json::Error),

    #[error("malformed parquet")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("reading arrow batch")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("source has no '{0}' column")]
    MissingColumn(String),

    #[error("unsupported source format: {0}")]
    UnsupportedFormat(String),

    #[error("row {row}: {message}")]
    MalformedRow { row: usize, message: String },
}
