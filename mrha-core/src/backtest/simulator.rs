//! Long-only replay of the signal column.
//!
//! Executes at mh_close. Bar 0 is the seed: initial capital in cash, no
//! holdings, zero return. From bar 1:
//! - `Signal::Buy` while not in the market: spend all cash on whole shares
//! - `Signal::Sell` while in the market: liquidate everything
//! - anything else: carry holdings and cash forward
//!
//! Exits (`Signal::Exit`) do not trade, and short entries only ever close an
//! open long. Short positions tracked by the position machine never settle
//! as ledger trades.

use tracing::debug;

use super::account::Account;
use super::{BacktestConfig, BacktestOutcome, PortfolioState};
use crate::domain::{Signal, Trade, TradeSide};
use crate::indicators::MrhaBar;
use crate::position::PositionSignal;

/// Replay `signals` against `mrha` closes. Both must be index-aligned.
pub fn run_backtest(
    mrha: &[MrhaBar],
    signals: &[PositionSignal],
    config: &BacktestConfig,
) -> BacktestOutcome {
    debug_assert_eq!(mrha.len(), signals.len());
    let n = mrha.len().min(signals.len());

    let mut account = Account::new(config.initial_capital, config.commission);
    let mut portfolio = Vec::with_capacity(n);
    let mut trades = Vec::new();
    if n == 0 {
        return BacktestOutcome::default();
    }

    portfolio.push(PortfolioState {
        holdings: 0.0,
        cash: account.cash(),
        total_value: account.total_value(),
        returns: 0.0,
    });

    let mut in_market = false;
    for i in 1..n {
        let bar = &mrha[i];
        let price = bar.mh_close;

        let side = match signals[i].signal {
            Some(Signal::Buy) if !in_market && price > 0.0 => Some(TradeSide::Buy),
            Some(Signal::Sell) if in_market => Some(TradeSide::Sell),
            _ => None,
        };

        if let Some(side) = side {
            let shares = account.execute(side, price);
            in_market = side == TradeSide::Buy;
            debug!(date = %bar.date, ?side, price, shares, "backtest fill");
            trades.push(Trade {
                bar_index: i,
                date: bar.date,
                side,
                price,
                shares,
            });
        }

        let (total_value, returns) = account.mark(price);
        portfolio.push(PortfolioState {
            holdings: account.holdings(),
            cash: account.cash(),
            total_value,
            returns,
        });
    }

    BacktestOutcome {
        portfolio,
        trades,
        commission_paid: account.commission_paid(),
    }
}
