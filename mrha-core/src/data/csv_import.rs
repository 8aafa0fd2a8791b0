//! CSV provider: `{dir}/{SYMBOL}.csv` with a `date,open,high,low,close[,volume]` header.
//!
//! Rows are returned in file order. The trailing `count` rows are kept.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use super::provider::{DataError, DataProvider, DataSource, FetchResult, Interval};
use crate::domain::PriceBar;

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
}

pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }
}

/// Read every bar in a CSV file.
pub fn read_csv_bars(path: &Path) -> Result<Vec<PriceBar>, DataError> {
    let csv_err = |message: String| DataError::CsvError {
        path: path.display().to_string(),
        message,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| csv_err(e.to_string()))?;

    reader
        .deserialize::<CsvRow>()
        .enumerate()
        .map(|(i, row)| {
            let row = row.map_err(|e| csv_err(format!("row {}: {e}", i + 1)))?;
            Ok(PriceBar {
                date: row.date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume.unwrap_or(0.0),
            })
        })
        .collect()
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(&self, symbol: &str, interval: Interval, count: usize) -> Result<FetchResult, DataError> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        let mut bars = read_csv_bars(&path)?;
        if bars.len() > count {
            bars.drain(..bars.len() - count);
        }

        Ok(FetchResult {
            symbol: symbol.to_string(),
            interval,
            bars,
            source: DataSource::CsvImport,
        })
    }

    fn is_available(&self) -> bool {
        self.dir.is_dir()
    }
}
