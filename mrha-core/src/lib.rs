//! MRHA Core: price series, the MRHA pipeline, signals and the backtest simulator.
//!
//! Stages run strictly left to right over one symbol's bars:
//! - revised Heikin-Ashi recurrence (`indicators::heikin_ashi`)
//! - 5-bar MRHA smoothing, warmup rows dropped (`indicators::mrha`)
//! - signal levels and price targets (`indicators::levels`)
//! - TD setup counter (`setup`)
//! - Flat/Long/Short position machine (`position`)
//! - cash and holdings replay with a trade ledger (`backtest`)
//!
//! `analysis::MrhaAnalysis` runs them in order and owns the results.
//! `data` supplies bars from Upbit, CSV files or the Parquet cache.

pub mod analysis;
pub mod backtest;
pub mod data;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod position;
pub mod setup;

pub use analysis::{AnalysisParams, AnalysisRow, MrhaAnalysis, MIN_BARS, RECENT_SIGNAL_WINDOW};
pub use backtest::{BacktestConfig, BacktestOutcome, PortfolioState};
pub use error::AnalysisError;
