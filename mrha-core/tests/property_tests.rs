//! Property tests for pipeline invariants.
//!
//! Uses proptest over random-walk price series to verify:
//! 1. Revised Heikin-Ashi keeps length and contains open/close in high/low
//! 2. MRHA drops exactly the four warmup rows
//! 3. TD setup values stay in 0..=9, never both sides on one bar, runs end at 9
//! 4. Position only changes on bars with a signal
//! 5. Backtest conservation: total value = holdings × price + cash
//! 6. Commission only ever costs: buys spend at least notional, sells return at most notional

use chrono::NaiveDate;
use mrha_core::domain::{PriceBar, TradeSide};
use mrha_core::indicators::{revised_heikin_ashi, smooth, OpenSeed, MRHA_OFFSET};
use mrha_core::setup::td_setup;
use mrha_core::{AnalysisParams, BacktestConfig, MrhaAnalysis, MIN_BARS};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

/// Random walk of `len` bars with moves up to ±5% and valid OHLC ranges.
fn arb_bars(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<PriceBar>> {
    (
        10.0..1_000.0_f64,
        prop::collection::vec((-0.05..0.05_f64, 0.0..0.03_f64, 0.0..0.03_f64), len),
    )
        .prop_map(|(start, moves)| {
            let base = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
            let mut prev = start;
            moves
                .into_iter()
                .enumerate()
                .map(|(i, (step, up, down))| {
                    let open = prev;
                    let close = (prev * (1.0 + step)).max(0.01);
                    prev = close;
                    PriceBar::new(
                        base + chrono::Duration::days(i as i64),
                        open,
                        open.max(close) * (1.0 + up),
                        open.min(close) * (1.0 - down),
                        close,
                    )
                })
                .collect()
        })
}

fn arb_config() -> impl Strategy<Value = BacktestConfig> {
    (1_000.0..1e9_f64, 0.0..0.01_f64).prop_map(|(initial_capital, commission)| BacktestConfig {
        initial_capital,
        commission,
    })
}

fn close_enough(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

// ── 1–2. Transforms ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn revised_ha_is_aligned_and_contained(bars in arb_bars(1..200)) {
        let ha = revised_heikin_ashi(&bars, OpenSeed::SourceOpen).unwrap();
        prop_assert_eq!(ha.len(), bars.len());
        for c in &ha {
            prop_assert!(c.h_high >= c.h_open.max(c.h_close));
            prop_assert!(c.h_low <= c.h_open.min(c.h_close));
        }
    }

    #[test]
    fn mrha_drops_four_rows(bars in arb_bars(5..200)) {
        let ha = revised_heikin_ashi(&bars, OpenSeed::MeanPrice).unwrap();
        let mrha = smooth(&ha, &bars);
        prop_assert_eq!(mrha.len(), bars.len() - MRHA_OFFSET);
        prop_assert_eq!(mrha[0].date, bars[4].date);
    }
}

// ── 3. TD setup ──────────────────────────────────────────────────────

proptest! {
    #[test]
    fn setup_values_are_well_formed(closes in prop::collection::vec(1.0..100.0_f64, 0..300)) {
        let marks = td_setup(&closes);
        prop_assert_eq!(marks.len(), closes.len());
        for i in 0..closes.len() {
            let (b, s) = (marks.buy[i], marks.sell[i]);
            prop_assert!(b <= 9 && s <= 9);
            prop_assert!(b == 0 || s == 0, "both setups on bar {}", i);
        }
        for column in [&marks.buy, &marks.sell] {
            for (i, &v) in column.iter().enumerate() {
                if v == 9 {
                    let run: Vec<u8> = column[i - 8..=i].to_vec();
                    prop_assert_eq!(run, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
                }
            }
        }
    }
}

// ── 4–6. Full run ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn position_changes_only_on_signals(bars in arb_bars(MIN_BARS..250)) {
        let analysis = MrhaAnalysis::run("P", bars, &AnalysisParams::default()).unwrap();
        let signals = analysis.signals();
        for i in 1..signals.len() {
            if signals[i].signal.is_none() {
                prop_assert_eq!(signals[i].position, signals[i - 1].position);
            } else {
                prop_assert_ne!(signals[i].position, signals[i - 1].position);
            }
        }
    }

    #[test]
    fn backtest_conserves_value(bars in arb_bars(MIN_BARS..250), config in arb_config()) {
        let params = AnalysisParams { backtest: config, ..AnalysisParams::default() };
        let analysis = MrhaAnalysis::run("C", bars, &params).unwrap();

        for (state, bar) in analysis.portfolio().iter().zip(analysis.mrha()) {
            prop_assert!(close_enough(state.total_value, state.holdings * bar.mh_close + state.cash));
            prop_assert!(state.cash >= -1e-6 * config.initial_capital);
            prop_assert!(state.holdings >= 0.0);
        }
        prop_assert_eq!(analysis.portfolio()[0].total_value, config.initial_capital);
    }

    #[test]
    fn commission_never_creates_cash(bars in arb_bars(MIN_BARS..250), config in arb_config()) {
        let params = AnalysisParams { backtest: config, ..AnalysisParams::default() };
        let analysis = MrhaAnalysis::run("F", bars, &params).unwrap();
        let portfolio = analysis.portfolio();

        for trade in analysis.trades() {
            let i = trade.bar_index;
            let delta = portfolio[i].cash - portfolio[i - 1].cash;
            let notional = trade.notional();
            match trade.side {
                TradeSide::Buy => prop_assert!(-delta >= notional - 1e-6 * notional.max(1.0)),
                TradeSide::Sell => prop_assert!(delta <= notional + 1e-6 * notional.max(1.0)),
            }
        }
    }
}
