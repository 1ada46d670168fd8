//! Filter-and-aggregate pipeline behind a traffic-crash fatality dashboard.
//!
//! Load a crash source once, derive calendar columns, then refilter by
//! year and month and recompute the aggregation views on every selection
//! change.

pub mod config;
pub mod data;
pub mod error;
pub mod render;
pub mod state;
pub mod views;

use config::PipelineConfig;
use data::model::CrashTable;
use error::LoadError;

/// Load `source` and derive its calendar columns.
pub fn load_table(source: &str, config: &PipelineConfig) -> Result<CrashTable, LoadError> {
    let raw = data::loader::load_source(source, &config.columns)?;
    Ok(data::calendar::derive_calendar(&raw, &config.timestamp_formats))
}
