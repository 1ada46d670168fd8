//! Data layer: crash rows, loading, calendar derivation and filtering.
//!
//! Architecture:
//! ```text
//!  .csv / .json / .parquet  (path or URL)
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse source → RawCrashTable
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ calendar  │  parse timestamps, add year/month/weekday/hour → CrashTable
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  years × months selection → filtered CrashTable
//!   └──────────┘
//! ```

pub mod calendar;
pub mod filter;
pub mod loader;
pub mod model;
