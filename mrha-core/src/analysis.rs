//! One analysis run: raw bars through every pipeline stage to the backtest.
//!
//! The run owns every derived series. Nothing is shared between runs, so
//! independent symbols can be analysed on separate threads.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::backtest::{run_backtest, BacktestConfig, BacktestOutcome, PortfolioState};
use crate::domain::{Position, PriceBar, Signal, SignalAction, Symbol, Trade, TradeSide};
use crate::error::AnalysisError;
use crate::indicators::{
    aligned_targets, revised_heikin_ashi, signal_levels, smooth, MrhaBar, OpenSeed, PriceTargets,
    RevisedHaBar, SignalLevels, MRHA_OFFSET,
};
use crate::position::{generate_signals, PositionSignal};
use crate::setup::{td_setup, SetupMarks};

/// Fewest raw bars accepted; leaves ten MRHA bars after the warmup drop.
pub const MIN_BARS: usize = 14;

/// Length of the recent-signal window published to the signal queue.
pub const RECENT_SIGNAL_WINDOW: usize = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    pub open_seed: OpenSeed,
    pub backtest: BacktestConfig,
}

/// Joined per-bar view over every derived series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRow {
    pub date: NaiveDate,
    pub mrha: MrhaBar,
    pub levels: SignalLevels,
    pub targets: PriceTargets,
    pub td_buy_setup: u8,
    pub td_sell_setup: u8,
    pub signal: Option<Signal>,
    pub position: Position,
    pub entry_price: Option<f64>,
    pub exit_price: Option<f64>,
    pub portfolio: PortfolioState,
}

#[derive(Debug, Clone)]
pub struct MrhaAnalysis {
    symbol: Symbol,
    params: AnalysisParams,
    bars: Vec<PriceBar>,
    revised: Vec<RevisedHaBar>,
    mrha: Vec<MrhaBar>,
    levels: Vec<SignalLevels>,
    targets: Vec<PriceTargets>,
    setup: SetupMarks,
    signals: Vec<PositionSignal>,
    backtest: BacktestOutcome,
}

impl MrhaAnalysis {
    /// Run the whole pipeline. Fails before any stage runs if the input is
    /// too short, and in the Heikin-Ashi stage if it is malformed; there is
    /// no partial result.
    pub fn run(
        symbol: impl Into<Symbol>,
        bars: Vec<PriceBar>,
        params: &AnalysisParams,
    ) -> Result<Self, AnalysisError> {
        if bars.len() < MIN_BARS {
            return Err(AnalysisError::InsufficientData {
                required: MIN_BARS,
                available: bars.len(),
            });
        }

        let revised = revised_heikin_ashi(&bars, params.open_seed)?;
        let mrha = smooth(&revised, &bars);
        let levels = signal_levels(&mrha, &bars);
        let targets = aligned_targets(&bars);
        let closes: Vec<f64> = mrha.iter().map(|m| m.mh_close).collect();
        let setup = td_setup(&closes);
        let signals = generate_signals(&mrha, &levels, &targets);
        let backtest = run_backtest(&mrha, &signals, &params.backtest);

        Ok(Self {
            symbol: symbol.into(),
            params: *params,
            bars,
            revised,
            mrha,
            levels,
            targets,
            setup,
            signals,
            backtest,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn params(&self) -> &AnalysisParams {
        &self.params
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn revised(&self) -> &[RevisedHaBar] {
        &self.revised
    }

    pub fn mrha(&self) -> &[MrhaBar] {
        &self.mrha
    }

    pub fn levels(&self) -> &[SignalLevels] {
        &self.levels
    }

    pub fn targets(&self) -> &[PriceTargets] {
        &self.targets
    }

    pub fn setup(&self) -> &SetupMarks {
        &self.setup
    }

    pub fn signals(&self) -> &[PositionSignal] {
        &self.signals
    }

    pub fn trades(&self) -> &[Trade] {
        &self.backtest.trades
    }

    pub fn portfolio(&self) -> &[PortfolioState] {
        &self.backtest.portfolio
    }

    pub fn backtest(&self) -> &BacktestOutcome {
        &self.backtest
    }

    /// Date of the last MRHA bar.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.mrha.last().map(|m| m.date)
    }

    /// The raw bar an MRHA index was built from.
    pub fn source_bar(&self, mrha_index: usize) -> Option<&PriceBar> {
        self.bars.get(mrha_index + MRHA_OFFSET)
    }

    /// Close × volume of the most recent raw bar.
    pub fn latest_trading_value(&self) -> f64 {
        self.bars.last().map(PriceBar::trading_value).unwrap_or(0.0)
    }

    pub fn rows(&self) -> Vec<AnalysisRow> {
        (0..self.mrha.len())
            .map(|i| {
                let sig = self.signals[i];
                AnalysisRow {
                    date: self.mrha[i].date,
                    mrha: self.mrha[i],
                    levels: self.levels[i],
                    targets: self.targets[i],
                    td_buy_setup: self.setup.buy[i],
                    td_sell_setup: self.setup.sell[i],
                    signal: sig.signal,
                    position: sig.position,
                    entry_price: sig.entry_price,
                    exit_price: sig.exit_price,
                    portfolio: self.backtest.portfolio[i],
                }
            })
            .collect()
    }

    /// BUY/SELL when the ledger traded on the last processed date, else HOLD.
    pub fn latest_action(&self) -> SignalAction {
        let Some(last) = self.last_date() else {
            return SignalAction::Hold;
        };
        match self.trades().iter().rev().find(|t| t.date == last) {
            Some(t) if t.side == TradeSide::Buy => SignalAction::Buy,
            Some(_) => SignalAction::Sell,
            None => SignalAction::Hold,
        }
    }

    /// The last `count` per-bar signals as actions, most recent first.
    pub fn recent_actions(&self, count: usize) -> Vec<SignalAction> {
        self.signals
            .iter()
            .rev()
            .take(count)
            .map(|s| SignalAction::from_signal(s.signal))
            .collect()
    }
}
