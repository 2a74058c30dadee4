//! Trade data provider trait and structured error types.
//!
//! The TradeProvider trait abstracts over data sources (UN Comtrade, CSV import,
//! synthetic generation) so the loader can fall back between them and tests can
//! substitute a mock.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{Partner, TradeRecord, ValidationError};

/// Structured error types for data operations.
///
/// These are designed to be displayable in CLI output and logs alike.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("no trade data returned for {partner} {start_year}-{end_year}")]
    NoData {
        partner: Partner,
        start_year: i32,
        end_year: i32,
    },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("csv error: {0}")]
    Csv(String),

    #[error("no cached data for partner '{partner}'")]
    NoCachedData { partner: Partner },

    #[error("invalid record: {0}")]
    Validation(#[from] ValidationError),

    #[error("data error: {0}")]
    Other(String),
}

/// Where a set of records came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Comtrade,
    CsvImport,
    Cache,
    Synthetic,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DataSource::Comtrade => "UN Comtrade",
            DataSource::CsvImport => "CSV import",
            DataSource::Cache => "cache",
            DataSource::Synthetic => "synthetic",
        })
    }
}

/// Records for one partner returned by a provider.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub partner: Partner,
    pub records: Vec<TradeRecord>,
    pub source: DataSource,
}

/// A source of Colombia ↔ partner trade records.
///
/// The cache layer sits above this trait; providers don't know about it.
pub trait TradeProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch monthly records for one partner over an inclusive year range.
    fn fetch(&self, partner: Partner, start_year: i32, end_year: i32)
        -> Result<FetchResult, DataError>;

    /// Whether the provider will currently accept requests.
    fn is_available(&self) -> bool;
}

/// Progress callback for multi-partner downloads.
pub trait FetchProgress: Send {
    fn on_start(&self, partner: Partner, index: usize, total: usize);

    fn on_complete(&self, partner: Partner, index: usize, total: usize, result: &Result<usize, DataError>);

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Progress reporter that emits tracing events.
pub struct LogProgress;

impl FetchProgress for LogProgress {
    fn on_start(&self, partner: Partner, index: usize, total: usize) {
        info!("[{}/{}] fetching Colombia-{partner} trade data", index + 1, total);
    }

    fn on_complete(
        &self,
        partner: Partner,
        _index: usize,
        _total: usize,
        result: &Result<usize, DataError>,
    ) {
        match result {
            Ok(n) => info!(%partner, records = n, "fetch ok"),
            Err(e) => warn!(%partner, error = %e, "fetch failed"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        info!("download complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}
