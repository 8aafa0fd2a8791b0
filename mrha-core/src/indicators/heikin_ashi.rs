//! Revised Heikin-Ashi: the first smoothing stage.
//!
//! - h_close[i] = mean(open, high, low, close)[i]
//! - h_open[0]  = seed (see [`OpenSeed`])
//! - h_open[i]  = (h_open[i-1] + h_close[i-1]) / 2
//! - h_high[i]  = max(h_open[i], h_close[i], high[i])
//! - h_low[i]   = min(h_open[i], h_close[i], low[i])
//!
//! h_open is a left-to-right recurrence: every value depends on the resolved
//! value before it, so the column is built in a single forward pass.

use serde::{Deserialize, Serialize};

use crate::domain::{validate_series, PriceBar};
use crate::error::AnalysisError;

/// Initial condition for h_open on the first bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenSeed {
    /// h_open[0] = open[0].
    #[default]
    SourceOpen,
    /// h_open[0] = h_close[0], the bar's mean price.
    MeanPrice,
}

/// One revised Heikin-Ashi candle, index-aligned with its source bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RevisedHaBar {
    pub h_open: f64,
    pub h_high: f64,
    pub h_low: f64,
    pub h_close: f64,
}

/// Transform raw bars into revised Heikin-Ashi candles.
///
/// Output has the same length and index as `bars`. Fails on duplicate or
/// unordered dates and on non-finite or negative prices.
pub fn revised_heikin_ashi(
    bars: &[PriceBar],
    seed: OpenSeed,
) -> Result<Vec<RevisedHaBar>, AnalysisError> {
    validate_series(bars)?;

    let closes: Vec<f64> = bars.iter().map(PriceBar::mean_price).collect();

    let mut opens = Vec::with_capacity(bars.len());
    if let (Some(first), Some(&first_close)) = (bars.first(), closes.first()) {
        let mut prev_open = match seed {
            OpenSeed::SourceOpen => first.open,
            OpenSeed::MeanPrice => first_close,
        };
        opens.push(prev_open);
        for &prev_close in &closes[..closes.len() - 1] {
            prev_open = (prev_open + prev_close) / 2.0;
            opens.push(prev_open);
        }
    }

    Ok(bars
        .iter()
        .zip(opens)
        .zip(closes)
        .map(|((bar, h_open), h_close)| RevisedHaBar {
            h_open,
            h_high: h_open.max(h_close).max(bar.high),
            h_low: h_open.min(h_close).min(bar.low),
            h_close,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};
    use chrono::NaiveDate;

    fn ohlc(data: &[(f64, f64, f64, f64)]) -> Vec<PriceBar> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        data.iter()
            .enumerate()
            .map(|(i, &(o, h, l, c))| PriceBar::new(base + chrono::Duration::days(i as i64), o, h, l, c))
            .collect()
    }

    #[test]
    fn recurrence_known_values() {
        let bars = ohlc(&[
            (10.0, 12.0, 9.0, 11.0),
            (11.0, 15.0, 10.0, 14.0),
            (14.0, 14.0, 13.0, 13.5),
        ]);
        let ha = revised_heikin_ashi(&bars, OpenSeed::SourceOpen).unwrap();

        assert_approx(ha[0].h_close, 10.5, DEFAULT_EPSILON);
        assert_approx(ha[1].h_close, 12.5, DEFAULT_EPSILON);
        assert_approx(ha[2].h_close, 13.625, DEFAULT_EPSILON);

        assert_approx(ha[0].h_open, 10.0, DEFAULT_EPSILON);
        // (10 + 10.5) / 2
        assert_approx(ha[1].h_open, 10.25, DEFAULT_EPSILON);
        // (10.25 + 12.5) / 2
        assert_approx(ha[2].h_open, 11.375, DEFAULT_EPSILON);

        assert_approx(ha[1].h_high, 15.0, DEFAULT_EPSILON);
        assert_approx(ha[1].h_low, 10.0, DEFAULT_EPSILON);
        // raw low 13 is above both h_open and h_close
        assert_approx(ha[2].h_low, 11.375, DEFAULT_EPSILON);
    }

    #[test]
    fn mean_price_seed() {
        let bars = ohlc(&[(10.0, 12.0, 9.0, 11.0), (11.0, 15.0, 10.0, 14.0)]);
        let ha = revised_heikin_ashi(&bars, OpenSeed::MeanPrice).unwrap();
        assert_approx(ha[0].h_open, 10.5, DEFAULT_EPSILON);
        assert_approx(ha[1].h_open, 10.5, DEFAULT_EPSILON);
    }

    #[test]
    fn output_is_index_aligned() {
        let bars = make_bars(&[100.0, 101.0, 99.0, 102.0, 104.0, 103.0]);
        let ha = revised_heikin_ashi(&bars, OpenSeed::default()).unwrap();
        assert_eq!(ha.len(), bars.len());
    }

    #[test]
    fn containment_holds() {
        let bars = make_bars(&[100.0, 90.0, 120.0, 80.0, 130.0, 70.0]);
        for candle in revised_heikin_ashi(&bars, OpenSeed::default()).unwrap() {
            assert!(candle.h_high >= candle.h_open.max(candle.h_close));
            assert!(candle.h_low <= candle.h_open.min(candle.h_close));
        }
    }

    #[test]
    fn empty_series_is_empty() {
        assert!(revised_heikin_ashi(&[], OpenSeed::default()).unwrap().is_empty());
    }

    #[test]
    fn duplicate_dates_abort() {
        let mut bars = make_bars(&[100.0, 101.0, 102.0]);
        bars[2].date = bars[1].date;
        assert!(matches!(
            revised_heikin_ashi(&bars, OpenSeed::default()),
            Err(AnalysisError::DuplicateDate { .. })
        ));
    }
}
