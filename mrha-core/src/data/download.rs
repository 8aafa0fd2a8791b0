//! Multi-symbol download into the cache, with progress reporting.

use tracing::{info, warn};

use super::cache::ParquetCache;
use super::provider::{DataError, DataProvider, DownloadProgress, Interval};

#[derive(Debug)]
pub struct DownloadSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<(String, DataError)>,
}

impl DownloadSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Fetch each symbol and replace its cache entry.
///
/// Stops early once the provider reports itself unavailable; the remaining
/// symbols are counted as failed with `CircuitBreakerTripped`.
pub fn download_symbols(
    provider: &dyn DataProvider,
    cache: &ParquetCache,
    symbols: &[&str],
    interval: Interval,
    count: usize,
    progress: &dyn DownloadProgress,
) -> DownloadSummary {
    let total = symbols.len();
    let mut succeeded = 0;
    let mut errors: Vec<(String, DataError)> = Vec::new();

    for (i, symbol) in symbols.iter().enumerate() {
        progress.on_start(symbol, i, total);
        let result = download_single(provider, cache, symbol, interval, count);
        progress.on_complete(symbol, i, total, &result);

        match result {
            Ok(_) => succeeded += 1,
            Err(e) => {
                warn!(symbol, error = %e, "download failed");
                errors.push((symbol.to_string(), e));
            }
        }

        if !provider.is_available() {
            for sym in &symbols[i + 1..] {
                errors.push((sym.to_string(), DataError::CircuitBreakerTripped));
            }
            break;
        }
    }

    let failed = errors.len();
    progress.on_batch_complete(succeeded, failed, total);
    info!(provider = provider.name(), succeeded, failed, "download batch finished");

    DownloadSummary {
        total,
        succeeded,
        failed,
        errors,
    }
}

/// Fetch one symbol and cache it. Returns the bar count written.
pub fn download_single(
    provider: &dyn DataProvider,
    cache: &ParquetCache,
    symbol: &str,
    interval: Interval,
    count: usize,
) -> Result<usize, DataError> {
    let fetched = provider.fetch(symbol, interval, count)?;
    let meta = cache.write(symbol, interval, &fetched.bars, fetched.source)?;
    Ok(meta.bar_count)
}
