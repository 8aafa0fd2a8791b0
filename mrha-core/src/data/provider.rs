//! Data provider trait and structured error types.
//!
//! Providers return bars oldest first. They do not validate or deduplicate:
//! malformed series are rejected later by the analysis run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::PriceBar;

/// Bar interval. Daily or coarser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    #[default]
    Day,
    Week,
    Month,
}

impl Interval {
    pub fn as_str(self) -> &'static str {
        match self {
            Interval::Day => "day",
            Interval::Week => "week",
            Interval::Month => "month",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" | "days" | "d" => Ok(Interval::Day),
            "week" | "weeks" | "w" => Ok(Interval::Week),
            "month" | "months" | "m" => Ok(Interval::Month),
            other => Err(DataError::Other(format!("unknown interval '{other}'"))),
        }
    }
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("csv error in {path}: {message}")]
    CsvError { path: String, message: String },

    #[error("no cached {interval} data for symbol '{symbol}', run `download {symbol}` first")]
    NoCachedData { symbol: String, interval: Interval },

    #[error("data error: {0}")]
    Other(String),
}

/// Bars for one symbol from one provider call.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub interval: Interval,
    pub bars: Vec<PriceBar>,
    pub source: DataSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    Upbit,
    CsvImport,
    Cache,
    Synthetic,
}

impl DataSource {
    pub fn as_str(self) -> &'static str {
        match self {
            DataSource::Upbit => "upbit",
            DataSource::CsvImport => "csv",
            DataSource::Cache => "cache",
            DataSource::Synthetic => "synthetic",
        }
    }
}

/// A source of OHLC bars.
///
/// The cache sits above this trait; providers know nothing about it.
pub trait DataProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch the trailing `count` bars for `symbol`, oldest first.
    fn fetch(&self, symbol: &str, interval: Interval, count: usize)
        -> Result<FetchResult, DataError>;

    /// False while rate-limited or blocked.
    fn is_available(&self) -> bool;
}

/// Progress callback for multi-symbol downloads.
pub trait DownloadProgress: Send {
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    fn on_complete(&self, symbol: &str, index: usize, total: usize, result: &Result<usize, DataError>);

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Prints download progress to stdout.
pub struct StdoutProgress;

impl DownloadProgress for StdoutProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        println!("[{}/{}] Fetching {symbol}...", index + 1, total);
    }

    fn on_complete(&self, symbol: &str, _index: usize, _total: usize, result: &Result<usize, DataError>) {
        match result {
            Ok(bars) => println!("  OK: {symbol} ({bars} bars)"),
            Err(e) => println!("  FAIL: {symbol}: {e}"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        println!("\nDownload complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}
