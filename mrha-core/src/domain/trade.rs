//! Trade: one executed leg in the backtest ledger.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

/// A single fill recorded by the backtest simulator.
///
/// Trades are append-only: once pushed to the ledger they are never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub bar_index: usize,
    pub date: NaiveDate,
    pub side: TradeSide,
    pub price: f64,
    pub shares: f64,
}

impl Trade {
    /// Price × shares, before commission.
    pub fn notional(&self) -> f64 {
        self.price * self.shares
    }
}
