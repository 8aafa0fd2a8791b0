//! Backtest simulator: portfolio state per MRHA bar plus an append-only trade ledger.

pub mod account;
pub mod simulator;

use serde::{Deserialize, Serialize};

use crate::domain::Trade;

pub use account::Account;
pub use simulator::run_backtest;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000_000.0;
pub const DEFAULT_COMMISSION: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    /// Fraction of notional charged on both legs.
    pub commission: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            commission: DEFAULT_COMMISSION,
        }
    }
}

/// Account snapshot after a bar has been processed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub holdings: f64,
    pub cash: f64,
    pub total_value: f64,
    pub returns: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestOutcome {
    /// One state per MRHA bar.
    pub portfolio: Vec<PortfolioState>,
    pub trades: Vec<Trade>,
    /// Commission charged across all trades.
    #[serde(default)]
    pub commission_paid: f64,
}

impl BacktestOutcome {
    pub fn total_values(&self) -> Vec<f64> {
        self.portfolio.iter().map(|s| s.total_value).collect()
    }

    pub fn returns(&self) -> Vec<f64> {
        self.portfolio.iter().map(|s| s.returns).collect()
    }
}
