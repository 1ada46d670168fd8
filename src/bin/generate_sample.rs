use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// SplitMix64: tiny, deterministic, good enough for sample data.
struct SimpleRng(u64);

impl SimpleRng {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)`.
    fn unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.below(items.len() as u64) as usize]
    }
}

struct Row {
    crash_date: String,
    victim: String,
    location: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

const VICTIMS: &[&str] = &["DRIVER", "PASSENGER", "PEDESTRIAN", "BICYCLE", "MOTORCYCLE"];
const LOCATIONS: &[&str] = &[
    "W CERMAK RD",
    "S CICERO AVE",
    "N LAKE SHORE DR",
    "W 79TH ST",
    "S ASHLAND AVE",
    "W NORTH AVE",
    "S HALSTED ST",
    "N PULASKI RD",
];

fn generate_rows(n: usize, rng: &mut SimpleRng) -> Vec<Row> {
    (0..n)
        .map(|i| {
            // Every 40th row carries a timestamp that will not parse.
            let crash_date = if i % 40 == 39 {
                "UNKNOWN".to_string()
            } else {
                format!(
                    "{}-{:02}-{:02} {:02}:{:02}",
                    2018 + rng.below(6),
                    1 + rng.below(12),
                    1 + rng.below(28),
                    rng.below(24),
                    rng.below(60)
                )
            };
            // Roughly one row in ten lacks coordinates.
            let located = rng.below(10) != 0;
            Row {
                crash_date,
                victim: rng.pick(VICTIMS).to_string(),
                location: rng.pick(LOCATIONS).to_string(),
                latitude: located.then(|| 41.65 + rng.unit() * 0.35),
                longitude: located.then(|| -87.85 + rng.unit() * 0.3),
            }
        })
        .collect()
}

fn write_csv(path: &str, rows: &[Row]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    writer.write_record(["Crash_Date", "Victim", "Crash_Location", "Latitude", "Longitude"])?;
    for row in rows {
        let coord = |v: Option<f64>| v.map(|v| format!("{v:.6}")).unwrap_or_default();
        writer.write_record([
            row.crash_date.clone(),
            row.victim.clone(),
            row.location.clone(),
            coord(row.latitude),
            coord(row.longitude),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &str, rows: &[Row]) -> Result<()> {
    let text = |f: fn(&Row) -> &str| StringArray::from(rows.iter().map(f).collect::<Vec<_>>());
    let schema = Arc::new(Schema::new(vec![
        Field::new("Crash_Date", DataType::Utf8, false),
        Field::new("Victim", DataType::Utf8, false),
        Field::new("Crash_Location", DataType::Utf8, false),
        Field::new("Latitude", DataType::Float64, true),
        Field::new("Longitude", DataType::Float64, true),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(text(|r| r.crash_date.as_str())),
            Arc::new(text(|r| r.victim.as_str())),
            Arc::new(text(|r| r.location.as_str())),
            Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.latitude))),
            Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.longitude))),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let output_path = args.next().unwrap_or_else(|| "sample_crashes.csv".to_string());
    let n_rows: usize = match args.next() {
        Some(n) => n.parse().context("row count must be a number")?,
        None => 2000,
    };

    let mut rng = SimpleRng(42);
    let rows = generate_rows(n_rows, &mut rng);

    if output_path.ends_with(".parquet") || output_path.ends_with(".pq") {
        write_parquet(&output_path, &rows)?;
    } else {
        write_csv(&output_path, &rows)?;
    }

    println!("Wrote {} crash rows to {output_path}", rows.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_rows() {
        let a = generate_rows(50, &mut SimpleRng(7));
        let b = generate_rows(50, &mut SimpleRng(7));
        let dates = |rows: &[Row]| rows.iter().map(|r| r.crash_date.clone()).collect::<Vec<_>>();
        assert_eq!(dates(&a), dates(&b));
        assert_eq!(a[39].crash_date, "UNKNOWN");
    }

    #[test]
    fn unit_stays_in_range() {
        let mut rng = SimpleRng(42);
        for _ in 0..1000 {
            let u = rng.unit();
            assert!((0.0..1.0).contains(&u));
        }
        assert!(rng.below(12) < 12);
    }
}
