//! Performance metrics: pure reductions over the backtest's portfolio series.
//!
//! Every metric takes the total-value curve or the per-bar returns column and
//! returns a scalar. Division guards resolve to 0.0 rather than erroring.

use mrha_core::backtest::{BacktestOutcome, PortfolioState};
use serde::{Deserialize, Serialize};

/// Bars per year used for annualization.
pub const PERIODS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub final_value: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    /// Most negative peak-to-trough change, e.g. -0.15.
    pub max_drawdown: f64,
    pub trade_count: usize,
    /// Commission charged across all trades.
    #[serde(default)]
    pub total_commission: f64,
}

impl PerformanceMetrics {
    pub fn compute(outcome: &BacktestOutcome) -> Self {
        Self {
            total_commission: outcome.commission_paid,
            ..Self::from_portfolio(&outcome.portfolio, outcome.trades.len())
        }
    }

    pub fn from_portfolio(portfolio: &[PortfolioState], trade_count: usize) -> Self {
        let values: Vec<f64> = portfolio.iter().map(|s| s.total_value).collect();
        let returns: Vec<f64> = portfolio.iter().map(|s| s.returns).collect();
        let total = total_return(&values);
        Self {
            final_value: values.last().copied().unwrap_or(0.0),
            total_return: total,
            annualized_return: annualized_return(total, values.len()),
            sharpe_ratio: sharpe_ratio(&returns),
            max_drawdown: max_drawdown(&values),
            trade_count,
            total_commission: 0.0,
        }
    }
}

/// last / first − 1. Zero for an empty curve or a zero starting value.
pub fn total_return(values: &[f64]) -> f64 {
    match (values.first(), values.last()) {
        (Some(&first), Some(&last)) if first != 0.0 => last / first - 1.0,
        _ => 0.0,
    }
}

/// (1 + total)^(252 / n) − 1 over `n` bars.
pub fn annualized_return(total_return: f64, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    (1.0 + total_return).powf(PERIODS_PER_YEAR / n as f64) - 1.0
}

/// sqrt(252) × mean / sample std of the returns column.
///
/// The seeded zero return of bar 0 is included. Fewer than two observations
/// or zero deviation gives 0.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(returns);
    if std == 0.0 || !std.is_finite() {
        return 0.0;
    }
    PERIODS_PER_YEAR.sqrt() * mean_f64(returns) / std
}

/// min(value / running max − 1). Zero for a non-decreasing curve.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &v in values {
        peak = peak.max(v);
        if peak > 0.0 {
            max_dd = max_dd.min(v / peak - 1.0);
        }
    }
    max_dd
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
