//! Candle transforms and per-bar price levels.
//!
//! Pipeline order: `heikin_ashi` (sequential recurrence over the whole series),
//! then `mrha` (5-bar trailing smoothing, drops the warmup rows), then `levels`
//! (pure per-bar thresholds and 5-bar price targets aligned to the MRHA index).
//!
//! Rolling helpers mark warmup positions with `f64::NAN`; no value at index t
//! depends on input past t.

pub mod heikin_ashi;
pub mod levels;
pub mod mrha;

pub use heikin_ashi::{revised_heikin_ashi, OpenSeed, RevisedHaBar};
pub use levels::{aligned_targets, price_targets, signal_levels, PriceTargets, SignalLevels};
pub use mrha::{smooth, MrhaBar, MRHA_OFFSET, MRHA_WINDOW};

/// Trailing mean over `period` values. The first `period - 1` outputs are NaN.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    assert!(period >= 1, "rolling period must be >= 1");
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if n < period {
        return result;
    }

    let mut sum: f64 = values[..period].iter().sum();
    result[period - 1] = sum / period as f64;
    for i in period..n {
        sum += values[i] - values[i - period];
        result[i] = sum / period as f64;
    }
    result
}

/// Trailing maximum over `period` values. The first `period - 1` outputs are NaN.
pub fn rolling_max(values: &[f64], period: usize) -> Vec<f64> {
    rolling_extreme(values, period, f64::max)
}

/// Trailing minimum over `period` values. The first `period - 1` outputs are NaN.
pub fn rolling_min(values: &[f64], period: usize) -> Vec<f64> {
    rolling_extreme(values, period, f64::min)
}

fn rolling_extreme(values: &[f64], period: usize, pick: fn(f64, f64) -> f64) -> Vec<f64> {
    assert!(period >= 1, "rolling period must be >= 1");
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if n < period {
        return result;
    }
    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        result[i] = window[1..].iter().copied().fold(window[0], pick);
    }
    result
}

/// Create bars from close prices for testing.
///
/// open = prev close (or close for the first bar), high = max(open, close) + 1,
/// low = min(open, close) - 1, one calendar day apart.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::PriceBar> {
    use crate::domain::PriceBar;
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            PriceBar::new(
                base_date + chrono::Duration::days(i as i64),
                open,
                open.max(close) + 1.0,
                (open.min(close) - 1.0).max(0.0),
                close,
            )
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
