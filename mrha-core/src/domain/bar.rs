//! PriceBar: the raw OHLC input unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// One OHLC bar for a single symbol, keyed by date.
///
/// `volume` is carried for universe ranking (trading value) only; no stage of
/// the MRHA pipeline reads it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume: 0.0,
        }
    }

    /// Arithmetic mean of the four price fields.
    pub fn mean_price(&self) -> f64 {
        (self.open + self.high + self.low + self.close) / 4.0
    }

    /// Close × volume, the notional traded on this bar.
    pub fn trading_value(&self) -> f64 {
        self.close * self.volume
    }

    /// First price field that is NaN, infinite or negative.
    fn invalid_field(&self) -> Option<(&'static str, f64)> {
        [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite() || *v < 0.0)
    }
}

/// Check the loader contract: strictly ascending unique dates, finite non-negative prices.
///
/// Duplicate dates are reported before ordering problems so that a repeated
/// date always surfaces as `DuplicateDate`, whatever its position.
pub fn validate_series(bars: &[PriceBar]) -> Result<(), AnalysisError> {
    let mut seen = std::collections::HashSet::with_capacity(bars.len());
    for bar in bars {
        if !seen.insert(bar.date) {
            return Err(AnalysisError::DuplicateDate { date: bar.date });
        }
    }

    for pair in bars.windows(2) {
        if pair[1].date < pair[0].date {
            return Err(AnalysisError::UnorderedDates {
                previous: pair[0].date,
                next: pair[1].date,
            });
        }
    }

    for bar in bars {
        if let Some((field, value)) = bar.invalid_field() {
            return Err(AnalysisError::InvalidPrice {
                date: bar.date,
                field,
                value,
            });
        }
    }

    Ok(())
}
