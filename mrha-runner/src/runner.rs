//! Run orchestration: wires data loading, the MRHA analysis and metrics.
//!
//! Two entry points:
//! - `run_single()`: one symbol from the config's `[analysis]` section. Used by `mrha run`.
//! - `run_scan()`: rank the `[scan]` universe by trading value, analyse the
//!   selection in parallel and emit one signal record per ticker. Used by `mrha scan`.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use mrha_core::backtest::PortfolioState;
use mrha_core::data::{DataProvider, DataSource, Interval, ParquetCache};
use mrha_core::domain::{SignalAction, Trade};
use mrha_core::{AnalysisError, AnalysisParams, AnalysisRow, MrhaAnalysis, RECENT_SIGNAL_WINDOW};

use crate::config::{ConfigError, RunConfig};
use crate::data_loader::{load_bars, LoadError, LoadedData};
use crate::metrics::PerformanceMetrics;
use crate::notify::{format_error, format_run_completed, format_run_started, format_selection, Notifier};
use crate::signals::SignalRecord;
use crate::universe::{rank_by_trading_value, Candidate, RankedTicker};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("analysis error: {0}")]
    Analysis(#[from] AnalysisError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of one symbol's analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub symbol: String,
    pub interval: Interval,
    pub source: DataSource,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    /// First and last MRHA dates.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Raw bars fed to the pipeline.
    pub bar_count: usize,
    pub params: AnalysisParams,
    pub metrics: PerformanceMetrics,
    pub trading_value: f64,
    pub latest_action: SignalAction,
    /// Most recent first.
    pub recent_actions: Vec<SignalAction>,
    pub trades: Vec<Trade>,
    pub portfolio: Vec<PortfolioState>,
    pub rows: Vec<AnalysisRow>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl AnalysisResult {
    pub fn from_analysis(
        analysis: &MrhaAnalysis,
        loaded: &LoadedData,
        interval: Interval,
        run_id: &str,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            run_id: run_id.to_string(),
            symbol: analysis.symbol().to_string(),
            interval,
            source: loaded.source,
            dataset_hash: loaded.dataset_hash.clone(),
            has_synthetic: loaded.is_synthetic(),
            start_date: analysis.mrha().first().map(|m| m.date),
            end_date: analysis.last_date(),
            bar_count: analysis.bars().len(),
            params: *analysis.params(),
            metrics: PerformanceMetrics::compute(analysis.backtest()),
            trading_value: analysis.latest_trading_value(),
            latest_action: analysis.latest_action(),
            recent_actions: analysis.recent_actions(RECENT_SIGNAL_WINDOW),
            trades: analysis.trades().to_vec(),
            portfolio: analysis.portfolio().to_vec(),
            rows: analysis.rows(),
        }
    }
}

/// Run the analysis over already-loaded bars. No I/O.
pub fn analyze_loaded(
    loaded: &LoadedData,
    params: &AnalysisParams,
    interval: Interval,
    run_id: &str,
) -> Result<AnalysisResult, RunError> {
    let analysis = MrhaAnalysis::run(loaded.symbol.as_str(), loaded.bars.clone(), params)?;
    debug!(
        symbol = %loaded.symbol,
        trades = analysis.trades().len(),
        "analysis complete"
    );
    Ok(AnalysisResult::from_analysis(&analysis, loaded, interval, run_id))
}

/// Load and analyse the config's `[analysis]` symbol.
pub fn run_single(
    config: &RunConfig,
    cache: &ParquetCache,
    provider: Option<&dyn DataProvider>,
) -> Result<AnalysisResult, RunError> {
    config.validate()?;
    let run_id = config.run_id()?;
    let symbol = config.analysis.symbol.as_str();
    let loaded = load_bars(symbol, cache, provider, &config.load_options())?;
    info!(symbol, bars = loaded.bars.len(), source = loaded.source.as_str(), "running analysis");
    analyze_loaded(&loaded, &config.analysis_params(), config.analysis.interval, &run_id)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanFailure {
    pub ticker: String,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Rank order.
    pub records: Vec<SignalRecord>,
    pub results: Vec<AnalysisResult>,
    pub failures: Vec<ScanFailure>,
}

/// Tickers to load for a scan: the universe then owned tickers, deduplicated.
/// An empty universe falls back to the `[analysis]` symbol.
pub fn scan_tickers(config: &RunConfig) -> Vec<String> {
    let mut tickers: Vec<String> = Vec::new();
    let base = if config.scan.universe.is_empty() {
        std::slice::from_ref(&config.analysis.symbol)
    } else {
        config.scan.universe.as_slice()
    };
    for ticker in base.iter().chain(&config.scan.owned) {
        if !tickers.contains(ticker) {
            tickers.push(ticker.clone());
        }
    }
    tickers
}

/// Batch scan over the configured universe.
///
/// Data is loaded sequentially (providers share one circuit breaker), then
/// the selected tickers are analysed in parallel. A ticker that fails to load
/// or analyse is reported and skipped.
pub fn run_scan(
    config: &RunConfig,
    cache: &ParquetCache,
    provider: Option<&dyn DataProvider>,
    notifier: &dyn Notifier,
) -> Result<ScanReport, RunError> {
    config.validate()?;
    let run_id = config.run_id()?;
    let tickers = scan_tickers(config);
    let opts = config.load_options();
    notifier.notify(&format_run_started(config.analysis.interval.as_str(), tickers.len()));

    let mut failures = Vec::new();
    let mut loaded: Vec<LoadedData> = Vec::with_capacity(tickers.len());
    for ticker in &tickers {
        match load_bars(ticker, cache, provider, &opts) {
            Ok(data) => loaded.push(data),
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "load failed");
                notifier.notify(&format_error(ticker, &e));
                failures.push(ScanFailure {
                    ticker: ticker.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    let candidates: Vec<Candidate> = loaded
        .iter()
        .map(|d| {
            let value = d.bars.last().map(|b| b.trading_value()).unwrap_or(0.0);
            Candidate::new(d.symbol.clone(), value)
        })
        .collect();
    let ranked = rank_by_trading_value(&candidates, config.scan.top_n, &config.scan.owned);
    notifier.notify(&format_selection(&ranked));

    let selected: Vec<(&RankedTicker, &LoadedData)> = ranked
        .iter()
        .filter_map(|r| loaded.iter().find(|d| d.symbol == r.ticker).map(|d| (r, d)))
        .collect();

    let params = config.analysis_params();
    let interval = config.analysis.interval;
    let outcomes: Vec<(&RankedTicker, Result<AnalysisResult, RunError>)> = selected
        .par_iter()
        .map(|&(rank, data)| (rank, analyze_loaded(data, &params, interval, &run_id)))
        .collect();

    let mut report = ScanReport {
        failures,
        ..ScanReport::default()
    };
    for (rank, outcome) in outcomes {
        match outcome {
            Ok(result) => {
                report.records.push(SignalRecord {
                    ticker: rank.ticker.clone(),
                    rank: rank.rank,
                    trading_value: rank.trading_value,
                    signal: result.latest_action,
                });
                report.results.push(result);
            }
            Err(e) => {
                warn!(ticker = %rank.ticker, error = %e, "analysis failed");
                notifier.notify(&format_error(&rank.ticker, &e));
                report.failures.push(ScanFailure {
                    ticker: rank.ticker.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    notifier.notify(&format_run_completed(&report.records, report.failures.len()));
    info!(
        signals = report.records.len(),
        failed = report.failures.len(),
        "scan complete"
    );
    Ok(report)
}
