//! Trade data acquisition: providers, CSV import/export, and the Parquet cache.

pub mod cache;
pub mod circuit_breaker;
pub mod comtrade;
pub mod csv_io;
pub mod provider;
pub mod synthetic;

pub use cache::{CacheMeta, CacheStatus, ParquetCache};
pub use circuit_breaker::CircuitBreaker;
pub use comtrade::ComtradeProvider;
pub use csv_io::{read_records_csv, read_records_from, write_records_csv, write_records_to};
pub use provider::{DataError, DataSource, FetchProgress, FetchResult, LogProgress, TradeProvider};
pub use synthetic::{month_ends, SyntheticGenerator, DEFAULT_SEED};

use chrono::NaiveDate;

/// Last calendar day of the given month, `None` for an invalid month.
pub fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)?;
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}
