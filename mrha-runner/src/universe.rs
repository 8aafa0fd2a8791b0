//! Scan universe selection: rank tickers by their latest trading value.

use serde::{Deserialize, Serialize};

/// A ticker with the close × volume of its most recent bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub ticker: String,
    pub trading_value: f64,
}

impl Candidate {
    pub fn new(ticker: impl Into<String>, trading_value: f64) -> Self {
        Self {
            ticker: ticker.into(),
            trading_value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTicker {
    pub ticker: String,
    /// 1-based position in the final selection.
    pub rank: usize,
    pub trading_value: f64,
    pub owned: bool,
}

/// Top `top_n` candidates by trading value, then any owned tickers that
/// missed the cut, ranked 1.. in that order.
///
/// Owned tickers with no candidate entry are skipped. Ties keep input order.
pub fn rank_by_trading_value(
    candidates: &[Candidate],
    top_n: usize,
    owned: &[String],
) -> Vec<RankedTicker> {
    let mut sorted: Vec<&Candidate> = candidates.iter().collect();
    sorted.sort_by(|a, b| b.trading_value.total_cmp(&a.trading_value));

    let is_owned = |ticker: &str| owned.iter().any(|o| o == ticker);

    let mut selected: Vec<&Candidate> = sorted.iter().take(top_n).copied().collect();
    for candidate in sorted.iter().skip(top_n) {
        if is_owned(&candidate.ticker) && !selected.iter().any(|s| s.ticker == candidate.ticker) {
            selected.push(candidate);
        }
    }

    selected
        .into_iter()
        .enumerate()
        .map(|(i, c)| RankedTicker {
            ticker: c.ticker.clone(),
            rank: i + 1,
            trading_value: c.trading_value,
            owned: is_owned(&c.ticker),
        })
        .collect()
}
