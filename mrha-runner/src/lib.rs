//! MRHA Runner: run orchestration on top of `mrha-core`.
//!
//! This crate provides:
//! - TOML run configuration with content-hashed run ids
//! - Data loading with cache/download/synthetic fallback
//! - Performance metrics over the backtest portfolio
//! - Single-symbol runs and parallel universe scans
//! - Signal-queue records, notifications and artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod notify;
pub mod runner;
pub mod signals;
pub mod universe;

pub use config::{ConfigError, RunConfig, RunId};
pub use data_loader::{load_bars, LoadError, LoadOptions, LoadedData};
pub use metrics::PerformanceMetrics;
pub use notify::{LogNotifier, Notifier};
pub use runner::{run_scan, run_single, AnalysisResult, RunError, ScanReport};
pub use signals::{JsonlSignalSink, SignalRecord, SignalSink};
pub use universe::{rank_by_trading_value, Candidate, RankedTicker};
