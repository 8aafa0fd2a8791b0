//! Breakout/reversal thresholds and 5-bar price targets.
//!
//! Per MRHA bar, using the raw bar on the same date:
//! - Ebr  = (4 × mh_open − low) / 3,  Btrg = 1.00618 × Ebr
//! - Ebl  = (4 × mh_open − high) / 3, Strg = 0.99382 × Ebl
//!
//! Targets over the trailing 5 raw bars:
//! - Bullish = min(low) × 1.0618
//! - Bearish = max(high) × 0.9382

use serde::{Deserialize, Serialize};

use super::mrha::{MrhaBar, MRHA_OFFSET, MRHA_WINDOW};
use super::{rolling_max, rolling_min};
use crate::domain::PriceBar;

pub const BUY_TRIGGER_FACTOR: f64 = 1.00618;
pub const SELL_TRIGGER_FACTOR: f64 = 0.99382;
pub const BULLISH_TARGET_FACTOR: f64 = 1.0618;
pub const BEARISH_TARGET_FACTOR: f64 = 0.9382;

/// Entry and reversal thresholds for a single bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalLevels {
    /// Bearish-reversal level; a short is closed above it.
    pub ebr: f64,
    /// Long entry trigger.
    pub btrg: f64,
    /// Bullish-reversal level; a long is closed below it.
    pub ebl: f64,
    /// Short entry trigger.
    pub strg: f64,
}

impl SignalLevels {
    pub fn compute(mh_open: f64, raw_low: f64, raw_high: f64) -> Self {
        let ebr = (4.0 * mh_open - raw_low) / 3.0;
        let ebl = (4.0 * mh_open - raw_high) / 3.0;
        Self {
            ebr,
            btrg: BUY_TRIGGER_FACTOR * ebr,
            ebl,
            strg: SELL_TRIGGER_FACTOR * ebl,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceTargets {
    pub bullish: f64,
    pub bearish: f64,
}

/// Thresholds for every MRHA bar, read against the raw bar it was built from.
pub fn signal_levels(mrha: &[MrhaBar], bars: &[PriceBar]) -> Vec<SignalLevels> {
    mrha.iter()
        .zip(bars.iter().skip(MRHA_OFFSET))
        .map(|(m, raw)| {
            debug_assert_eq!(m.date, raw.date);
            SignalLevels::compute(m.mh_open, raw.low, raw.high)
        })
        .collect()
}

/// Targets indexed like the raw series; `None` for the first `MRHA_OFFSET` bars.
pub fn price_targets(bars: &[PriceBar]) -> Vec<Option<PriceTargets>> {
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let max_high = rolling_max(&highs, MRHA_WINDOW);
    let min_low = rolling_min(&lows, MRHA_WINDOW);

    max_high
        .into_iter()
        .zip(min_low)
        .map(|(hi, lo)| {
            if hi.is_nan() || lo.is_nan() {
                None
            } else {
                Some(PriceTargets {
                    bullish: lo * BULLISH_TARGET_FACTOR,
                    bearish: hi * BEARISH_TARGET_FACTOR,
                })
            }
        })
        .collect()
}

/// Targets aligned to the MRHA index. Every MRHA bar has a full raw window.
pub fn aligned_targets(bars: &[PriceBar]) -> Vec<PriceTargets> {
    price_targets(bars).into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::heikin_ashi::{revised_heikin_ashi, OpenSeed};
    use crate::indicators::mrha::smooth;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn levels_known_values() {
        let lv = SignalLevels::compute(100.0, 97.0, 106.0);
        assert_approx(lv.ebr, 101.0, DEFAULT_EPSILON);
        assert_approx(lv.btrg, 101.0 * 1.00618, DEFAULT_EPSILON);
        assert_approx(lv.ebl, 98.0, DEFAULT_EPSILON);
        assert_approx(lv.strg, 98.0 * 0.99382, DEFAULT_EPSILON);
    }

    #[test]
    fn triggers_sit_outside_reversal_levels() {
        let lv = SignalLevels::compute(50.0, 48.0, 53.0);
        assert!(lv.btrg > lv.ebr);
        assert!(lv.strg < lv.ebl);
    }

    #[test]
    fn targets_warmup_and_values() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        let targets = price_targets(&bars);
        assert!(targets[..4].iter().all(Option::is_none));

        let t4 = targets[4].unwrap();
        let min_low = bars[..5].iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let max_high = bars[..5].iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        assert_approx(t4.bullish, min_low * 1.0618, DEFAULT_EPSILON);
        assert_approx(t4.bearish, max_high * 0.9382, DEFAULT_EPSILON);
    }

    #[test]
    fn aligned_series_match_mrha_length() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 11.0, 10.0, 12.0, 13.0, 14.0]);
        let ha = revised_heikin_ashi(&bars, OpenSeed::default()).unwrap();
        let mrha = smooth(&ha, &bars);

        let levels = signal_levels(&mrha, &bars);
        let targets = aligned_targets(&bars);
        assert_eq!(levels.len(), mrha.len());
        assert_eq!(targets.len(), mrha.len());

        let expected = SignalLevels::compute(mrha[2].mh_open, bars[6].low, bars[6].high);
        assert_eq!(levels[2], expected);
    }
}
