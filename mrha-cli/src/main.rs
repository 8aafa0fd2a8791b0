//! MRHA CLI: download, run, scan and cache commands.
//!
//! Commands:
//! - `download`: fetch candles from Upbit and cache as Parquet
//! - `run`: analyse one symbol from a TOML config or `--symbol`
//! - `scan`: rank a universe by trading value and emit signal records
//! - `cache status`: report cached symbols, intervals and date ranges

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use mrha_core::data::{
    download_symbols, CircuitBreaker, CsvProvider, DataProvider, Interval, ParquetCache,
    StdoutProgress, UpbitProvider,
};
use mrha_runner::export::save_artifacts;
use mrha_runner::notify::{format_signal_counts, LogNotifier};
use mrha_runner::signals::{JsonlSignalSink, SignalSink};
use mrha_runner::{run_scan, run_single, AnalysisResult, RunConfig};

#[derive(Parser)]
#[command(name = "mrha", about = "MRHA: modified revised Heikin-Ashi signals and backtests")]
struct Cli {
    /// Log at DEBUG instead of INFO.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download candles from Upbit and cache as Parquet.
    Download {
        /// Markets to download (e.g., KRW-BTC KRW-ETH).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Candle interval: day, week or month.
        #[arg(long, default_value = "day")]
        interval: Interval,

        /// Trailing candles to fetch.
        #[arg(long, default_value_t = 365)]
        count: usize,

        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Analyse one symbol and save the artifact set.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Symbol to analyse (overrides the config).
        #[arg(long)]
        symbol: Option<String>,

        #[command(flatten)]
        data: DataArgs,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Rank the configured universe and emit one signal record per ticker.
    Scan {
        /// Path to a TOML config file with a [scan] section.
        #[arg(long)]
        config: PathBuf,

        /// JSONL file for signal records.
        #[arg(long, default_value = "results/signals.jsonl")]
        signals_out: PathBuf,

        #[command(flatten)]
        data: DataArgs,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Data options shared by `run` and `scan`; each overrides the config when set.
#[derive(clap::Args)]
struct DataArgs {
    /// Candle interval: day, week or month.
    #[arg(long)]
    interval: Option<Interval>,

    /// Raw bars to analyse.
    #[arg(long)]
    count: Option<usize>,

    /// Offline mode: no network access.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Use synthetic data as fallback.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Ignore cached bars and fetch again.
    #[arg(long, default_value_t = false)]
    refresh: bool,

    /// Read `{DIR}/{SYMBOL}.csv` instead of calling Upbit.
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Cache directory.
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

impl DataArgs {
    fn apply(self, config: &mut RunConfig) {
        if let Some(interval) = self.interval {
            config.analysis.interval = interval;
        }
        if let Some(count) = self.count {
            config.analysis.count = count;
        }
        config.data.offline |= self.offline;
        config.data.synthetic |= self.synthetic;
        config.data.refresh |= self.refresh;
        if self.csv_dir.is_some() {
            config.data.csv_dir = self.csv_dir;
        }
        if let Some(dir) = self.cache_dir {
            config.data.cache_dir = dir;
        }
    }
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached symbols, intervals and date ranges.
    Status {
        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Download {
            symbols,
            interval,
            count,
            cache_dir,
        } => run_download(symbols, interval, count, cache_dir),
        Commands::Run {
            config,
            symbol,
            data,
            output_dir,
        } => run_analysis_cmd(config, symbol, data, &output_dir),
        Commands::Scan {
            config,
            signals_out,
            data,
        } => run_scan_cmd(&config, data, &signals_out),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
        },
    }
}

fn run_download(
    symbols: Vec<String>,
    interval: Interval,
    count: usize,
    cache_dir: PathBuf,
) -> Result<()> {
    let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
    let provider = UpbitProvider::new(circuit_breaker)?;
    let cache = ParquetCache::new(cache_dir);
    let progress = StdoutProgress;

    let sym_refs: Vec<&str> = symbols.iter().map(|s| s.as_str()).collect();
    let summary = download_symbols(&provider, &cache, &sym_refs, interval, count, &progress);

    if !summary.all_succeeded() {
        for (sym, err) in &summary.errors {
            eprintln!("Error for {sym}: {err}");
        }
        std::process::exit(1);
    }
    Ok(())
}

/// CSV directory when configured, else Upbit. `None` offline.
fn build_provider(config: &RunConfig) -> Result<Option<Box<dyn DataProvider>>> {
    if config.data.offline {
        return Ok(None);
    }
    if let Some(dir) = &config.data.csv_dir {
        return Ok(Some(Box::new(CsvProvider::new(dir))));
    }
    let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
    Ok(Some(Box::new(UpbitProvider::new(circuit_breaker)?)))
}

fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    match path {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(RunConfig::default()),
    }
}

fn run_analysis_cmd(
    config_path: Option<PathBuf>,
    symbol: Option<String>,
    data: DataArgs,
    output_dir: &Path,
) -> Result<()> {
    if config_path.is_none() && symbol.is_none() {
        bail!("one of --config or --symbol is required");
    }

    let mut config = load_config(config_path.as_deref())?;
    if let Some(symbol) = symbol {
        config.analysis.symbol = symbol;
    }
    data.apply(&mut config);
    config.validate()?;

    let cache = ParquetCache::new(&config.data.cache_dir);
    let provider = build_provider(&config)?;
    let result = run_single(&config, &cache, provider.as_deref())?;

    print_summary(&result);

    let run_dir = save_artifacts(&result, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn run_scan_cmd(config_path: &Path, data: DataArgs, signals_out: &Path) -> Result<()> {
    let mut config = load_config(Some(config_path))?;
    data.apply(&mut config);
    config.validate()?;

    let cache = ParquetCache::new(&config.data.cache_dir);
    let provider = build_provider(&config)?;
    let report = run_scan(&config, &cache, provider.as_deref(), &LogNotifier)?;

    let mut sink = JsonlSignalSink::create(signals_out)
        .with_context(|| format!("failed to open {}", signals_out.display()))?;
    sink.publish_all(&report.records)?;
    info!(path = %signals_out.display(), records = report.records.len(), "signal records written");

    println!();
    println!("=== Scan Result ===");
    println!("{:<4} {:<12} {:>20} {:<6}", "Rank", "Ticker", "Trading Value", "Signal");
    println!("{}", "-".repeat(45));
    for r in &report.records {
        println!(
            "{:<4} {:<12} {:>20.0} {:<6}",
            r.rank, r.ticker, r.trading_value, r.signal
        );
    }
    println!();
    println!("{}", format_signal_counts(&report.records));
    for failure in &report.failures {
        println!("FAILED: {} ({})", failure.ticker, failure.error);
    }
    Ok(())
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let cache = ParquetCache::new(cache_dir);
    let symbols = cache.cached_symbols();
    if symbols.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    let sym_refs: Vec<&str> = symbols.iter().map(|s| s.as_str()).collect();
    let rows = cache.status(&sym_refs);

    println!("Cache: {}", cache_dir.display());
    println!("Symbols: {}", rows.len());
    println!();
    println!("{:<12} {:<8} {:<25} {:>8}", "Symbol", "Interval", "Date Range", "Bars");
    println!("{}", "-".repeat(56));
    for row in &rows {
        let interval = row.interval.map(|i| i.as_str()).unwrap_or("-");
        let range = match (row.start_date, row.end_date) {
            (Some(start), Some(end)) => format!("{start} to {end}"),
            _ => "(no meta)".to_string(),
        };
        let bars = row.bar_count.map(|n| n.to_string()).unwrap_or_default();
        println!("{:<12} {:<8} {:<25} {:>8}", row.symbol, interval, range, bars);
    }
    Ok(())
}

fn print_summary(result: &AnalysisResult) {
    let m = &result.metrics;
    println!();
    println!("=== MRHA Result ===");
    println!("Symbol:         {} ({})", result.symbol, result.interval);
    match (result.start_date, result.end_date) {
        (Some(start), Some(end)) => println!("Period:         {start} to {end}"),
        _ => println!("Period:         (empty)"),
    }
    println!("Bars:           {} raw, {} MRHA", result.bar_count, result.rows.len());
    println!("Source:         {}", result.source.as_str());
    println!();
    println!("--- Performance ---");
    println!("Final Value:    {:.0}", m.final_value);
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("Annualized:     {:.2}%", m.annualized_return * 100.0);
    println!("Sharpe:         {:.3}", m.sharpe_ratio);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("Trades:         {}", m.trade_count);
    println!("Commission:     {:.0}", m.total_commission);
    println!();
    let recent: Vec<&str> = result.recent_actions.iter().map(|a| a.as_str()).collect();
    println!("Latest Signal:  {}", result.latest_action);
    println!("Recent Signals: {}", recent.join(", "));
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}
