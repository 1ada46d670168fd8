use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use crash_dash::config::PipelineConfig;
use crash_dash::data::filter::FilterSelection;
use crash_dash::data::model::MonthName;
use crash_dash::render::{format_views, views_json};
use crash_dash::state::Dashboard;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// ASCII tables
    Table,
    /// One JSON document with every view
    Json,
}

#[derive(Parser)]
#[command(name = "crash-dash", about = "Traffic-crash fatality views for a year/month selection")]
struct Cli {
    /// Crash source: local path or http(s) URL ending in .csv, .json or .parquet
    #[arg(env = "CRASH_DASH_SOURCE")]
    source: String,

    /// Comma-separated years to include (default: every year in the source)
    #[arg(long, value_delimiter = ',')]
    years: Option<Vec<i32>>,

    /// Comma-separated full month names to include (default: every month in the source)
    #[arg(long, value_delimiter = ',')]
    months: Option<Vec<MonthName>>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Single `chrono` format for the timestamp column, replacing the built-in list
    #[arg(long)]
    timestamp_format: Option<String>,

    /// Timestamp column header
    #[arg(long)]
    timestamp_column: Option<String>,

    /// Victim category column header
    #[arg(long)]
    victim_column: Option<String>,

    /// Crash location column header
    #[arg(long)]
    location_column: Option<String>,

    /// Latitude column header
    #[arg(long)]
    latitude_column: Option<String>,

    /// Longitude column header
    #[arg(long)]
    longitude_column: Option<String>,
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        if let Some(format) = &self.timestamp_format {
            config = config.with_timestamp_format(format.clone());
        }
        let columns = &mut config.columns;
        for (slot, value) in [
            (&mut columns.timestamp, &self.timestamp_column),
            (&mut columns.victim, &self.victim_column),
            (&mut columns.location, &self.location_column),
            (&mut columns.latitude, &self.latitude_column),
            (&mut columns.longitude, &self.longitude_column),
        ] {
            if let Some(name) = value {
                *slot = name.clone();
            }
        }
        config
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = cli.pipeline_config();
    let table = crash_dash::load_table(&cli.source, &config)
        .with_context(|| format!("loading crash data from {}", cli.source))?;
    let table = Arc::new(table);

    let mut dashboard = Dashboard::new(Arc::clone(&table));
    let defaults = dashboard.selection().clone();
    dashboard.set_selection(FilterSelection {
        years: cli.years.map_or(defaults.years, |y| y.into_iter().collect()),
        months: cli.months.map_or(defaults.months, |m| m.into_iter().collect()),
    });

    let summary = dashboard.summary();
    log::info!(
        "{} of {} rows selected ({} with unparseable timestamps)",
        summary.selected_rows,
        summary.total_rows,
        summary.unparsed_rows
    );

    let output = match cli.format {
        OutputFormat::Table => format_views(dashboard.views()).context("formatting views")?,
        OutputFormat::Json => views_json(dashboard.views()).context("serialising views")?,
    };
    println!("{output}");
    Ok(())
}
