//! Per-bar signal and position states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A transition emitted by the position machine on a single bar.
///
/// Numeric encoding follows the signal column convention: `Buy = 1`,
/// `Exit = 0`, `Sell = -1`. Bars without a transition carry no signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    /// Flat → Long.
    Buy,
    /// Flat → Short.
    Sell,
    /// Long or Short → Flat.
    Exit,
}

impl Signal {
    pub fn value(self) -> i8 {
        match self {
            Signal::Buy => 1,
            Signal::Exit => 0,
            Signal::Sell => -1,
        }
    }
}

/// Position state carried from bar to bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Short,
    #[default]
    Flat,
    Long,
}

impl Position {
    pub fn value(self) -> i8 {
        match self {
            Position::Short => -1,
            Position::Flat => 0,
            Position::Long => 1,
        }
    }
}

/// Action published to the signal queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

impl SignalAction {
    pub const ALL: [SignalAction; 3] = [SignalAction::Buy, SignalAction::Sell, SignalAction::Hold];

    /// Translate a per-bar signal: entries map to BUY/SELL, exits and empty bars to HOLD.
    pub fn from_signal(signal: Option<Signal>) -> Self {
        match signal {
            Some(Signal::Buy) => SignalAction::Buy,
            Some(Signal::Sell) => SignalAction::Sell,
            Some(Signal::Exit) | None => SignalAction::Hold,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SignalAction::Buy => "BUY",
            SignalAction::Sell => "SELL",
            SignalAction::Hold => "HOLD",
        }
    }
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
