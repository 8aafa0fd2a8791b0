//! Parquet cache with Hive-style partitioning.
//!
//! Layout: `{cache_dir}/symbol={SYMBOL}/{year}.parquet` plus a `meta.json`
//! sidecar recording the interval, date range and a BLAKE3 hash of the bars.
//!
//! - writes go to `.tmp` and are renamed into place
//! - a write replaces every partition of the symbol
//! - unreadable partitions are renamed to `.quarantined` and skipped

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::provider::{DataError, DataSource, Interval};
use crate::domain::PriceBar;

const COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    pub interval: Interval,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bar_count: usize,
    pub data_hash: String,
    pub source: DataSource,
    pub cached_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub symbol: String,
    pub cached: bool,
    pub interval: Option<Interval>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub bar_count: Option<usize>,
}

pub struct ParquetCache {
    cache_dir: PathBuf,
}

impl ParquetCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("symbol={symbol}"))
    }

    fn year_path(&self, symbol: &str, year: i32) -> PathBuf {
        self.symbol_dir(symbol).join(format!("{year}.parquet"))
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join("meta.json")
    }

    /// Replace the cached series for `symbol`.
    pub fn write(
        &self,
        symbol: &str,
        interval: Interval,
        bars: &[PriceBar],
        source: DataSource,
    ) -> Result<CacheMeta, DataError> {
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            return Err(DataError::CacheError("no bars to cache".into()));
        };

        let sym_dir = self.symbol_dir(symbol);
        fs::create_dir_all(&sym_dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;
        remove_partitions(&sym_dir)?;

        let mut by_year: BTreeMap<i32, Vec<&PriceBar>> = BTreeMap::new();
        for bar in bars {
            by_year.entry(bar.date.year()).or_default().push(bar);
        }

        for (year, year_bars) in &by_year {
            let mut df = bars_to_dataframe(year_bars)?;
            let path = self.year_path(symbol, *year);
            let tmp_path = path.with_extension("parquet.tmp");
            write_parquet(&mut df, &tmp_path)?;
            fs::rename(&tmp_path, &path).map_err(|e| {
                let _ = fs::remove_file(&tmp_path);
                DataError::CacheError(format!("atomic rename failed: {e}"))
            })?;
        }

        let meta = CacheMeta {
            symbol: symbol.to_string(),
            interval,
            start_date: first.date,
            end_date: last.date,
            bar_count: bars.len(),
            data_hash: hash_bars(bars)?,
            source,
            cached_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(symbol), meta_json)
            .map_err(|e| DataError::CacheError(format!("meta write: {e}")))?;

        debug!(symbol, %interval, bars = bars.len(), "cache written");
        Ok(meta)
    }

    /// Every cached bar for `symbol` at `interval`, in stored order.
    ///
    /// A cache holding a different interval counts as a miss.
    pub fn load(&self, symbol: &str, interval: Interval) -> Result<Vec<PriceBar>, DataError> {
        let missing = || DataError::NoCachedData {
            symbol: symbol.to_string(),
            interval,
        };

        match self.get_meta(symbol) {
            Some(meta) if meta.interval == interval => {}
            _ => return Err(missing()),
        }

        let sym_dir = self.symbol_dir(symbol);
        let mut paths: Vec<PathBuf> = fs::read_dir(&sym_dir)
            .map_err(|e| DataError::CacheError(format!("read dir: {e}")))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("parquet"))
            .collect();
        paths.sort();

        let mut all_bars = Vec::new();
        for path in paths {
            match load_and_validate_parquet(&path) {
                Ok(bars) => all_bars.extend(bars),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "quarantining corrupt cache file");
                    let _ = fs::rename(&path, path.with_extension("parquet.quarantined"));
                }
            }
        }

        if all_bars.is_empty() {
            return Err(missing());
        }
        Ok(all_bars)
    }

    pub fn get_meta(&self, symbol: &str) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(symbol)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Symbols with a `symbol=` directory under the cache root, sorted.
    pub fn cached_symbols(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };
        let mut symbols: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(|name| name.strip_prefix("symbol="))
                    .map(str::to_string)
            })
            .collect();
        symbols.sort();
        symbols
    }

    pub fn status(&self, symbols: &[&str]) -> Vec<CacheStatus> {
        symbols
            .iter()
            .map(|sym| {
                let meta = self.get_meta(sym);
                CacheStatus {
                    symbol: sym.to_string(),
                    cached: meta.is_some(),
                    interval: meta.as_ref().map(|m| m.interval),
                    start_date: meta.as_ref().map(|m| m.start_date),
                    end_date: meta.as_ref().map(|m| m.end_date),
                    bar_count: meta.as_ref().map(|m| m.bar_count),
                }
            })
            .collect()
    }
}

/// Stable content hash of a bar series.
pub fn hash_bars(bars: &[PriceBar]) -> Result<String, DataError> {
    let bytes = serde_json::to_vec(bars)
        .map_err(|e| DataError::CacheError(format!("hash serialization: {e}")))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

fn remove_partitions(sym_dir: &Path) -> Result<(), DataError> {
    let entries =
        fs::read_dir(sym_dir).map_err(|e| DataError::CacheError(format!("read dir: {e}")))?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("parquet") {
            fs::remove_file(&path)
                .map_err(|e| DataError::CacheError(format!("remove {}: {e}", path.display())))?;
        }
    }
    Ok(())
}

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

fn bars_to_dataframe(bars: &[&PriceBar]) -> Result<DataFrame, DataError> {
    let epoch = epoch();
    let dates: Vec<i32> = bars
        .iter()
        .map(|b| (b.date - epoch).num_days() as i32)
        .collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| DataError::ParquetError(format!("date cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let file =
        fs::File::create(path).map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

fn load_and_validate_parquet(path: &Path) -> Result<Vec<PriceBar>, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(DataError::CacheError("empty parquet file".into()));
    }
    for name in COLUMNS {
        if df.column(name).is_err() {
            return Err(DataError::CacheError(format!("missing column '{name}'")));
        }
    }

    dataframe_to_bars(&df)
}

fn f64_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Float64Chunked, DataError> {
    df.column(name)
        .and_then(|c| c.f64())
        .map_err(|e| DataError::ParquetError(format!("{name} column: {e}")))
}

fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<PriceBar>, DataError> {
    let date_ca = df
        .column("date")
        .and_then(|c| c.date())
        .map_err(|e| DataError::ParquetError(format!("date column: {e}")))?;
    let open_ca = f64_column(df, "open")?;
    let high_ca = f64_column(df, "high")?;
    let low_ca = f64_column(df, "low")?;
    let close_ca = f64_column(df, "close")?;
    let vol_ca = f64_column(df, "volume")?;

    let epoch = epoch();
    (0..df.height())
        .map(|i| {
            let days = date_ca
                .get(i)
                .ok_or_else(|| DataError::ParquetError(format!("null date at row {i}")))?;
            Ok(PriceBar {
                date: epoch + chrono::Duration::days(days as i64),
                open: open_ca.get(i).unwrap_or(f64::NAN),
                high: high_ca.get(i).unwrap_or(f64::NAN),
                low: low_ca.get(i).unwrap_or(f64::NAN),
                close: close_ca.get(i).unwrap_or(f64::NAN),
                volume: vol_ca.get(i).unwrap_or(0.0),
            })
        })
        .collect()
}
