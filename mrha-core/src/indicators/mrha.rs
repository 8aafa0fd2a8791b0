//! Modified Revised Heikin-Ashi (MRHA): the second smoothing stage.
//!
//! - mh_open  = (h_open + h_close) / 2
//! - mh_high  = trailing 5-bar mean of h_open
//! - mh_low   = trailing 5-bar mean of h_low
//! - mh_close = (mh_open + high + low + 2 × close) / 5
//!
//! Rows whose window is incomplete are dropped, so MRHA bar `i` corresponds to
//! source bar `i + MRHA_OFFSET`. Every later stage indexes the MRHA series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::heikin_ashi::RevisedHaBar;
use super::rolling_mean;
use crate::domain::PriceBar;

/// Trailing window width for mh_high / mh_low.
pub const MRHA_WINDOW: usize = 5;

/// Number of leading source bars with no MRHA value.
pub const MRHA_OFFSET: usize = MRHA_WINDOW - 1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MrhaBar {
    pub date: NaiveDate,
    pub mh_open: f64,
    pub mh_high: f64,
    pub mh_low: f64,
    pub mh_close: f64,
}

impl MrhaBar {
    pub fn is_bullish_body(&self) -> bool {
        self.mh_close > self.mh_open
    }

    pub fn is_bearish_body(&self) -> bool {
        self.mh_close < self.mh_open
    }
}

/// Smooth a revised Heikin-Ashi series into MRHA bars.
///
/// `revised` and `bars` must be index-aligned. Returns `len - MRHA_OFFSET`
/// bars, or none when fewer than `MRHA_WINDOW` bars are supplied.
pub fn smooth(revised: &[RevisedHaBar], bars: &[PriceBar]) -> Vec<MrhaBar> {
    debug_assert_eq!(revised.len(), bars.len(), "MRHA inputs must be index-aligned");
    let n = revised.len().min(bars.len());
    if n < MRHA_WINDOW {
        return Vec::new();
    }

    let h_opens: Vec<f64> = revised[..n].iter().map(|c| c.h_open).collect();
    let h_lows: Vec<f64> = revised[..n].iter().map(|c| c.h_low).collect();
    let mean_open = rolling_mean(&h_opens, MRHA_WINDOW);
    let mean_low = rolling_mean(&h_lows, MRHA_WINDOW);

    (MRHA_OFFSET..n)
        .map(|i| {
            let candle = &revised[i];
            let bar = &bars[i];
            let mh_open = (candle.h_open + candle.h_close) / 2.0;
            MrhaBar {
                date: bar.date,
                mh_open,
                mh_high: mean_open[i],
                mh_low: mean_low[i],
                mh_close: (mh_open + bar.high + bar.low + 2.0 * bar.close) / 5.0,
            }
        })
        .collect()
}
