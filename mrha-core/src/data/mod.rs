//! Price data sources and the local Parquet cache.

pub mod cache;
pub mod circuit_breaker;
pub mod csv_import;
pub mod download;
pub mod provider;
pub mod upbit;

pub use cache::{hash_bars, CacheMeta, CacheStatus, ParquetCache};
pub use circuit_breaker::CircuitBreaker;
pub use csv_import::{read_csv_bars, CsvProvider};
pub use download::{download_single, download_symbols, DownloadSummary};
pub use provider::{
    DataError, DataProvider, DataSource, DownloadProgress, FetchResult, Interval, StdoutProgress,
};
pub use upbit::UpbitProvider;
