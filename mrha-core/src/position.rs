//! Flat/Long/Short position machine driven by MRHA candle shape.
//!
//! Bar 0 of the MRHA series has no previous bar to compare against and is
//! always Flat with no signal. From bar 1 onward at most one transition fires
//! per bar, checked in this order:
//!
//! 1. Flat → Long   bullish candle and close above Btrg
//! 2. Flat → Short  bearish candle and close below Strg
//! 3. Long → Flat   close below Ebl or above the bullish target
//! 4. Short → Flat  close above Ebr or below the bearish target
//!
//! "Close" is mh_close throughout.

use serde::{Deserialize, Serialize};

use crate::domain::{Position, Signal};
use crate::indicators::{MrhaBar, PriceTargets, SignalLevels};

/// Per-bar output of the position machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionSignal {
    /// `None` when no transition fired on this bar.
    pub signal: Option<Signal>,
    pub position: Position,
    pub entry_price: Option<f64>,
    pub exit_price: Option<f64>,
}

/// Close above its own open and above the previous bar's mh_high.
pub fn is_bullish_candle(bar: &MrhaBar, prev: &MrhaBar) -> bool {
    bar.is_bullish_body() && bar.mh_close > prev.mh_high
}

/// Close below its own open and below the previous bar's mh_low.
pub fn is_bearish_candle(bar: &MrhaBar, prev: &MrhaBar) -> bool {
    bar.is_bearish_body() && bar.mh_close < prev.mh_low
}

/// Carried state of the machine. Feed bars in index order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionMachine {
    position: Position,
}

impl PositionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Evaluate one bar against the previous one and advance the state.
    pub fn step(
        &mut self,
        bar: &MrhaBar,
        prev: &MrhaBar,
        levels: &SignalLevels,
        targets: &PriceTargets,
    ) -> PositionSignal {
        let close = bar.mh_close;
        let (signal, next, entry, exit) = match self.position {
            Position::Flat if is_bullish_candle(bar, prev) && close > levels.btrg => {
                (Some(Signal::Buy), Position::Long, Some(close), None)
            }
            Position::Flat if is_bearish_candle(bar, prev) && close < levels.strg => {
                (Some(Signal::Sell), Position::Short, Some(close), None)
            }
            Position::Long if close < levels.ebl || close > targets.bullish => {
                (Some(Signal::Exit), Position::Flat, None, Some(close))
            }
            Position::Short if close > levels.ebr || close < targets.bearish => {
                (Some(Signal::Exit), Position::Flat, None, Some(close))
            }
            current => (None, current, None, None),
        };

        self.position = next;
        PositionSignal {
            signal,
            position: next,
            entry_price: entry,
            exit_price: exit,
        }
    }
}

/// Run the machine over an aligned MRHA series.
///
/// `levels` and `targets` must be indexed like `mrha`. The output has the
/// same length; bar 0 is the default Flat record.
pub fn generate_signals(
    mrha: &[MrhaBar],
    levels: &[SignalLevels],
    targets: &[PriceTargets],
) -> Vec<PositionSignal> {
    debug_assert_eq!(mrha.len(), levels.len());
    debug_assert_eq!(mrha.len(), targets.len());

    let n = mrha.len().min(levels.len()).min(targets.len());
    let mut out = Vec::with_capacity(n);
    if n == 0 {
        return out;
    }
    out.push(PositionSignal::default());

    let mut machine = PositionMachine::new();
    for i in 1..n {
        out.push(machine.step(&mrha[i], &mrha[i - 1], &levels[i], &targets[i]));
    }
    out
}
