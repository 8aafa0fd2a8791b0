//! End-to-end scenarios through `MrhaAnalysis::run`.
//!
//! 1. Steady +1% uptrend: one long entry, never short
//! 2. Flat prices: no trades, capital unchanged
//! 3. Duplicate dates: run aborts with no output
//! 4. Falling closes: TD buy setup stamped 1..9 on MRHA bars 4..12
//! 5. Short entries are tracked by the position machine but never settled

use chrono::NaiveDate;
use mrha_core::domain::{Position, PriceBar, Signal, SignalAction, TradeSide};
use mrha_core::{AnalysisError, AnalysisParams, MrhaAnalysis};

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

/// open = previous close, high/low one unit outside the body.
fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            PriceBar::new(
                base + chrono::Duration::days(i as i64),
                open,
                open.max(close) + 1.0,
                (open.min(close) - 1.0).max(0.0),
                close,
            )
        })
        .collect()
}

fn geometric(n: usize, start: f64, step: f64) -> Vec<f64> {
    (0..n).map(|i| start * step.powi(i as i32)).collect()
}

fn run(bars: Vec<PriceBar>) -> MrhaAnalysis {
    MrhaAnalysis::run("TEST", bars, &AnalysisParams::default()).unwrap()
}

// ──────────────────────────────────────────────
// Scenarios
// ──────────────────────────────────────────────

#[test]
fn uptrend_enters_long_once_and_never_shorts() {
    let analysis = run(bars_from_closes(&geometric(20, 100.0, 1.01)));

    let buys = analysis
        .signals()
        .iter()
        .filter(|s| s.signal == Some(Signal::Buy))
        .count();
    assert!(buys <= 1);
    assert!(analysis
        .signals()
        .iter()
        .all(|s| s.signal != Some(Signal::Sell) && s.position != Position::Short));

    let ledger_buys = analysis
        .trades()
        .iter()
        .filter(|t| t.side == TradeSide::Buy)
        .count();
    assert!(ledger_buys <= 1);
}

#[test]
fn uptrend_buy_is_executed_at_mh_close() {
    let analysis = run(bars_from_closes(&geometric(20, 100.0, 1.01)));
    let Some(trade) = analysis.trades().first() else {
        return;
    };
    let bar = analysis.mrha()[trade.bar_index];
    assert_eq!(trade.date, bar.date);
    assert_eq!(trade.price, bar.mh_close);
    assert_eq!(analysis.signals()[trade.bar_index].entry_price, Some(bar.mh_close));
}

#[test]
fn flat_series_never_trades() {
    let bars: Vec<PriceBar> = bars_from_closes(&[250.0; 20])
        .into_iter()
        .map(|mut b| {
            b.high = 250.0;
            b.low = 250.0;
            b
        })
        .collect();
    let analysis = run(bars);

    assert!(analysis.trades().is_empty());
    assert_eq!(analysis.portfolio().len(), 16);
    for state in analysis.portfolio() {
        assert_eq!(state.total_value, 100_000_000.0);
        assert_eq!(state.holdings, 0.0);
    }
    assert_eq!(analysis.latest_action(), SignalAction::Hold);
}

#[test]
fn duplicate_date_aborts_the_run() {
    let mut bars = bars_from_closes(&geometric(20, 100.0, 1.01));
    bars[12].date = bars[11].date;

    let err = MrhaAnalysis::run("DUP", bars, &AnalysisParams::default()).unwrap_err();
    assert_eq!(
        err,
        AnalysisError::DuplicateDate {
            date: NaiveDate::from_ymd_opt(2024, 1, 12).unwrap()
        }
    );
}

#[test]
fn unordered_dates_abort_the_run() {
    let mut bars = bars_from_closes(&geometric(20, 100.0, 1.01));
    bars.swap(3, 4);
    assert!(matches!(
        MrhaAnalysis::run("ORD", bars, &AnalysisParams::default()),
        Err(AnalysisError::UnorderedDates { .. })
    ));
}

#[test]
fn negative_price_aborts_the_run() {
    let mut bars = bars_from_closes(&geometric(20, 100.0, 1.01));
    bars[5].low = -1.0;
    assert!(matches!(
        MrhaAnalysis::run("NEG", bars, &AnalysisParams::default()),
        Err(AnalysisError::InvalidPrice { field: "low", .. })
    ));
}

#[test]
fn falling_closes_stamp_buy_setup() {
    // 17 raw bars → 13 MRHA bars with strictly falling mh_close
    let analysis = run(bars_from_closes(&geometric(17, 100.0, 0.99)));
    let closes: Vec<f64> = analysis.mrha().iter().map(|m| m.mh_close).collect();
    assert_eq!(closes.len(), 13);
    assert!(closes.windows(2).all(|w| w[1] < w[0]));

    let setup = analysis.setup();
    assert_eq!(setup.buy, vec![0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    assert!(setup.sell.iter().all(|&v| v == 0));

    let rows = analysis.rows();
    assert_eq!(rows[12].td_buy_setup, 9);
    assert_eq!(rows[3].td_buy_setup, 0);
}

#[test]
fn short_entry_is_not_settled_as_a_trade() {
    let analysis = run(bars_from_closes(&geometric(17, 100.0, 0.99)));

    assert!(analysis
        .signals()
        .iter()
        .any(|s| s.signal == Some(Signal::Sell)));
    assert!(analysis.signals().iter().any(|s| s.position == Position::Short));

    assert!(analysis.trades().is_empty());
    assert!(analysis
        .portfolio()
        .iter()
        .all(|s| s.total_value == 100_000_000.0));
}

#[test]
fn recent_actions_window() {
    let analysis = run(bars_from_closes(&geometric(17, 100.0, 0.99)));
    let recent = analysis.recent_actions(6);
    assert_eq!(recent.len(), 6);
    // the short entry sits on MRHA bar 1, outside the last six bars
    assert!(recent.iter().all(|&a| a == SignalAction::Hold));

    let all = analysis.recent_actions(usize::MAX);
    assert_eq!(all.last(), Some(&SignalAction::Hold));
    assert_eq!(all[all.len() - 2], SignalAction::Sell);
}
