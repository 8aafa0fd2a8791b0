//! Bar loading and data resolution for the runner.
//!
//! Fallback policy for one symbol:
//! 1. If the cache holds at least `count` bars for the interval → use it
//! 2. Otherwise, if a provider is available → fetch and cache
//! 3. If the fetch fails but a shorter cached series exists → use that
//! 4. If no data and `synthetic` → generate a seeded random walk (tagged)
//! 5. Otherwise → fail with a clear error
//!
//! The loader keeps the trailing `count` bars and otherwise passes data
//! through untouched; duplicate or unordered dates are left for the analysis
//! run to reject.

use chrono::{Months, NaiveDate};
use mrha_core::data::{DataError, DataProvider, DataSource, Interval, ParquetCache};
use mrha_core::domain::PriceBar;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(
        "no cached data for '{symbol}' and no network access (use --synthetic for synthetic data)"
    )]
    NoCachedDataOffline { symbol: String },

    #[error("no cached data for '{symbol}' and download failed: {reason}")]
    DownloadFailed { symbol: String, reason: String },

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub interval: Interval,
    /// Trailing bars to keep.
    pub count: usize,
    /// Never make network requests.
    pub offline: bool,
    /// Generate synthetic bars when real data is unavailable.
    pub synthetic: bool,
    /// Skip the cache and fetch again (`--refresh`).
    pub force: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            interval: Interval::Day,
            count: 365,
            offline: false,
            synthetic: false,
            force: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedData {
    pub symbol: String,
    pub bars: Vec<PriceBar>,
    pub source: DataSource,
    /// BLAKE3 over the symbol and every bar value.
    pub dataset_hash: String,
}

impl LoadedData {
    pub fn is_synthetic(&self) -> bool {
        self.source == DataSource::Synthetic
    }

    fn new(symbol: &str, mut bars: Vec<PriceBar>, source: DataSource, count: usize) -> Self {
        if bars.len() > count {
            bars.drain(..bars.len() - count);
        }
        let dataset_hash = compute_dataset_hash(symbol, &bars);
        Self {
            symbol: symbol.to_string(),
            bars,
            source,
            dataset_hash,
        }
    }
}

/// Load bars for one symbol with cache → provider → synthetic fallback.
pub fn load_bars(
    symbol: &str,
    cache: &ParquetCache,
    provider: Option<&dyn DataProvider>,
    opts: &LoadOptions,
) -> Result<LoadedData, LoadError> {
    // A cached series shorter than `count` is kept only as a fallback.
    let mut short_cache: Option<Vec<PriceBar>> = None;
    if !opts.force {
        match cache.load(symbol, opts.interval) {
            Ok(bars) if bars.len() >= opts.count => {
                debug!(symbol, bars = bars.len(), "loaded from cache");
                return Ok(LoadedData::new(symbol, bars, DataSource::Cache, opts.count));
            }
            Ok(bars) => {
                debug!(symbol, cached = bars.len(), requested = opts.count, "cache too short");
                short_cache = Some(bars);
            }
            Err(DataError::NoCachedData { .. }) => {}
            Err(e) => warn!(symbol, error = %e, "cache read failed"),
        }
    }

    let mut failure: Option<String> = None;
    if !opts.offline {
        match provider {
            Some(prov) if prov.is_available() => {
                match prov.fetch(symbol, opts.interval, opts.count) {
                    Ok(fetched) => {
                        if let Err(e) = cache.write(symbol, opts.interval, &fetched.bars, fetched.source) {
                            warn!(symbol, error = %e, "failed to cache fetched bars");
                        }
                        info!(symbol, provider = prov.name(), bars = fetched.bars.len(), "fetched");
                        return Ok(LoadedData::new(symbol, fetched.bars, fetched.source, opts.count));
                    }
                    Err(e) => {
                        warn!(symbol, provider = prov.name(), error = %e, "fetch failed");
                        failure = Some(e.to_string());
                    }
                }
            }
            Some(prov) => failure = Some(format!("provider '{}' is unavailable", prov.name())),
            None => failure = Some("no provider configured".into()),
        }
    }

    if let Some(bars) = short_cache {
        warn!(symbol, bars = bars.len(), requested = opts.count, "using short cached series");
        return Ok(LoadedData::new(symbol, bars, DataSource::Cache, opts.count));
    }

    if opts.synthetic {
        warn!(symbol, "generating synthetic data; results are tagged as synthetic");
        let bars = generate_synthetic_bars(symbol, opts.interval, opts.count);
        return Ok(LoadedData::new(symbol, bars, DataSource::Synthetic, opts.count));
    }

    if opts.offline {
        return Err(LoadError::NoCachedDataOffline {
            symbol: symbol.to_string(),
        });
    }
    Err(LoadError::DownloadFailed {
        symbol: symbol.to_string(),
        reason: failure.unwrap_or_else(|| "data not cached".into()),
    })
}

/// BLAKE3 over the symbol, then every bar's date and values in order.
pub fn compute_dataset_hash(symbol: &str, bars: &[PriceBar]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(symbol.as_bytes());
    for bar in bars {
        hasher.update(bar.date.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

const SYNTHETIC_START: (i32, u32, u32) = (2020, 1, 1);

/// `count` bars of a random walk from 100.0, seeded by BLAKE3 of the symbol.
///
/// Dates step by the interval from 2020-01-01 with no calendar gaps.
pub fn generate_synthetic_bars(symbol: &str, interval: Interval, count: usize) -> Vec<PriceBar> {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let (y, m, d) = SYNTHETIC_START;
    let Some(mut date) = NaiveDate::from_ymd_opt(y, m, d) else {
        return Vec::new();
    };

    let mut bars = Vec::with_capacity(count);
    let mut price = 100.0_f64;
    for _ in 0..count {
        let step: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + step);
        let mut bar = PriceBar::new(
            date,
            open,
            open.max(close) * (1.0 + rng.gen_range(0.0..0.01)),
            open.min(close) * (1.0 - rng.gen_range(0.0..0.01)),
            close,
        );
        bar.volume = rng.gen_range(500_000.0..5_000_000.0);
        bars.push(bar);

        price = close;
        date = match interval {
            Interval::Day => date + chrono::Duration::days(1),
            Interval::Week => date + chrono::Duration::weeks(1),
            Interval::Month => match date.checked_add_months(Months::new(1)) {
                Some(next) => next,
                None => break,
            },
        };
    }
    bars
}
