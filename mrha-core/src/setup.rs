//! TD Setup counter over the MRHA close series.
//!
//! Each bar compares mh_close[i] with mh_close[i - 4]:
//! - lower  → buy run +1, sell run reset
//! - higher → sell run +1, buy run reset
//! - equal, or no reference yet → both runs reset
//!
//! When a run reaches 9 the nine bars ending at `i` are stamped 1..=9 and that
//! run restarts from zero.

use serde::{Deserialize, Serialize};

/// Bars in a completed setup.
pub const SETUP_LENGTH: usize = 9;

/// Distance to the reference close.
pub const SETUP_LOOKBACK: usize = 4;

/// Outcome of feeding one bar to the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupEvent {
    None,
    BuyComplete,
    SellComplete,
}

/// Transient run counters carried from bar to bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetupCounter {
    pub buy_count: usize,
    pub sell_count: usize,
}

impl SetupCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one bar. `reference` is the close `SETUP_LOOKBACK` bars back.
    pub fn step(&mut self, close: f64, reference: Option<f64>) -> SetupEvent {
        match reference {
            Some(r) if close < r => {
                self.buy_count += 1;
                self.sell_count = 0;
            }
            Some(r) if close > r => {
                self.sell_count += 1;
                self.buy_count = 0;
            }
            _ => {
                self.buy_count = 0;
                self.sell_count = 0;
            }
        }

        if self.buy_count == SETUP_LENGTH {
            self.buy_count = 0;
            SetupEvent::BuyComplete
        } else if self.sell_count == SETUP_LENGTH {
            self.sell_count = 0;
            SetupEvent::SellComplete
        } else {
            SetupEvent::None
        }
    }
}

/// Stamped setup values per bar, 0 where no completed run covers the bar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupMarks {
    pub buy: Vec<u8>,
    pub sell: Vec<u8>,
}

impl SetupMarks {
    pub fn len(&self) -> usize {
        self.buy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buy.is_empty()
    }

    /// Write 1..=9 over the nine bars ending at `end`.
    ///
    /// A run can only complete once nine bars exist, but the start index is
    /// still checked so a short series can never wrap or panic.
    fn stamp(column: &mut [u8], end: usize) {
        let Some(start) = (end + 1).checked_sub(SETUP_LENGTH) else {
            return;
        };
        for (offset, slot) in column[start..=end].iter_mut().enumerate() {
            *slot = (offset + 1) as u8;
        }
    }
}

/// Run the setup counter over a close series in index order.
pub fn td_setup(closes: &[f64]) -> SetupMarks {
    let mut marks = SetupMarks {
        buy: vec![0; closes.len()],
        sell: vec![0; closes.len()],
    };
    let mut counter = SetupCounter::new();

    for (i, &close) in closes.iter().enumerate() {
        let reference = i.checked_sub(SETUP_LOOKBACK).map(|j| closes[j]);
        match counter.step(close, reference) {
            SetupEvent::BuyComplete => SetupMarks::stamp(&mut marks.buy, i),
            SetupEvent::SellComplete => SetupMarks::stamp(&mut marks.sell, i),
            SetupEvent::None => {}
        }
    }

    marks
}
