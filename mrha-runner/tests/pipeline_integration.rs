//! Integration tests for the runner pipeline.
//!
//! CSV provider → Parquet cache → analysis → metrics → artifacts and signal records.

use std::path::Path;

use chrono::NaiveDate;
use mrha_core::data::{CsvProvider, DataSource, Interval, ParquetCache};
use mrha_core::domain::{SignalAction, TradeSide};
use mrha_runner::data_loader::{load_bars, LoadOptions};
use mrha_runner::export::{load_artifacts, save_artifacts};
use mrha_runner::notify::CollectingNotifier;
use mrha_runner::signals::read_signal_records;
use mrha_runner::{run_scan, run_single, JsonlSignalSink, RunConfig, RunError, SignalSink};

/// `date,open,high,low,close,volume` rows, open = previous close.
fn write_csv(dir: &Path, symbol: &str, closes: &[f64], volume: f64) {
    let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut text = String::from("date,open,high,low,close,volume\n");
    for (i, &close) in closes.iter().enumerate() {
        let open = if i == 0 { close } else { closes[i - 1] };
        let date = base + chrono::Duration::days(i as i64);
        text.push_str(&format!(
            "{date},{open},{},{},{close},{volume}\n",
            open.max(close) + 1.0,
            open.min(close) - 1.0
        ));
    }
    std::fs::write(dir.join(format!("{symbol}.csv")), text).unwrap();
}

fn geometric(n: usize, start: f64, step: f64) -> Vec<f64> {
    (0..n).map(|i| start * step.powi(i as i32)).collect()
}

fn csv_config(csv_dir: &Path, cache_dir: &Path) -> RunConfig {
    let mut config = RunConfig::default();
    config.analysis.count = 40;
    config.data.csv_dir = Some(csv_dir.to_path_buf());
    config.data.cache_dir = cache_dir.to_path_buf();
    config
}

#[test]
fn csv_fetch_is_cached_then_reused_offline() {
    let csv_dir = tempfile::tempdir().unwrap();
    let cache_dir = tempfile::tempdir().unwrap();
    write_csv(csv_dir.path(), "KRW-BTC", &geometric(40, 100.0, 1.01), 10.0);

    let cache = ParquetCache::new(cache_dir.path());
    let provider = CsvProvider::new(csv_dir.path());
    let opts = LoadOptions {
        count: 40,
        ..LoadOptions::default()
    };

    let first = load_bars("KRW-BTC", &cache, Some(&provider), &opts).unwrap();
    assert_eq!(first.source, DataSource::CsvImport);
    assert_eq!(first.bars.len(), 40);

    let offline = LoadOptions {
        offline: true,
        ..opts
    };
    let second = load_bars("KRW-BTC", &cache, None, &offline).unwrap();
    assert_eq!(second.source, DataSource::Cache);
    assert_eq!(second.bars.len(), 40);
    assert_eq!(second.bars[0].date, first.bars[0].date);
}

#[test]
fn uptrend_run_buys_once_and_saves_artifacts() {
    let csv_dir = tempfile::tempdir().unwrap();
    let cache_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    write_csv(csv_dir.path(), "KRW-BTC", &geometric(40, 100.0, 1.01), 10.0);

    let config = csv_config(csv_dir.path(), cache_dir.path());
    let cache = ParquetCache::new(cache_dir.path());
    let provider = CsvProvider::new(csv_dir.path());
    let result = run_single(&config, &cache, Some(&provider)).unwrap();

    assert_eq!(result.rows.len(), 36);
    let buys = result
        .trades
        .iter()
        .filter(|t| t.side == TradeSide::Buy)
        .count();
    assert!(buys <= 1);
    assert_eq!(result.metrics.trade_count, result.trades.len());
    assert_eq!(result.metrics.final_value, result.portfolio.last().unwrap().total_value);

    let run_dir = save_artifacts(&result, out_dir.path()).unwrap();
    let loaded = load_artifacts(&run_dir).unwrap();
    assert_eq!(loaded.symbol, "KRW-BTC");
    assert_eq!(loaded.rows.len(), 36);
}

#[test]
fn duplicate_dates_in_source_fail_the_run() {
    let csv_dir = tempfile::tempdir().unwrap();
    let cache_dir = tempfile::tempdir().unwrap();
    write_csv(csv_dir.path(), "KRW-BTC", &geometric(40, 100.0, 1.01), 10.0);

    // repeat the 20th row
    let path = csv_dir.path().join("KRW-BTC.csv");
    let text = std::fs::read_to_string(&path).unwrap();
    let mut lines: Vec<&str> = text.lines().collect();
    let dup = lines[20];
    lines.insert(21, dup);
    std::fs::write(&path, lines.join("\n")).unwrap();

    let mut config = csv_config(csv_dir.path(), cache_dir.path());
    config.analysis.count = 41;
    let cache = ParquetCache::new(cache_dir.path());
    let provider = CsvProvider::new(csv_dir.path());
    let err = run_single(&config, &cache, Some(&provider)).unwrap_err();
    assert!(matches!(err, RunError::Analysis(_)));
    assert!(err.to_string().contains("duplicate"));
}

#[test]
fn scan_ranks_by_trading_value_and_writes_records() {
    let csv_dir = tempfile::tempdir().unwrap();
    let cache_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    write_csv(csv_dir.path(), "KRW-BTC", &geometric(40, 100.0, 1.01), 1_000.0);
    write_csv(csv_dir.path(), "KRW-ETH", &geometric(40, 100.0, 0.99), 50.0);
    write_csv(csv_dir.path(), "KRW-XRP", &[250.0; 40], 100.0);
    write_csv(csv_dir.path(), "KRW-DOGE", &[1.0; 40], 1.0);

    let mut config = csv_config(csv_dir.path(), cache_dir.path());
    config.scan.universe = ["KRW-DOGE", "KRW-XRP", "KRW-ETH", "KRW-BTC"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    config.scan.top_n = 2;
    config.scan.owned = vec!["KRW-DOGE".into(), "KRW-SOL".into()];

    let cache = ParquetCache::new(cache_dir.path());
    let provider = CsvProvider::new(csv_dir.path());
    let notifier = CollectingNotifier::default();
    let report = run_scan(&config, &cache, Some(&provider), &notifier).unwrap();

    let tickers: Vec<&str> = report.records.iter().map(|r| r.ticker.as_str()).collect();
    assert_eq!(tickers, ["KRW-BTC", "KRW-XRP", "KRW-DOGE"]);
    let ranks: Vec<usize> = report.records.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, [1, 2, 3]);

    // KRW-SOL has no CSV
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].ticker, "KRW-SOL");

    // flat prices never trade
    assert_eq!(report.records[1].signal, SignalAction::Hold);
    assert_eq!(report.records[2].signal, SignalAction::Hold);

    let path = out_dir.path().join("signals.jsonl");
    let mut sink = JsonlSignalSink::create(&path).unwrap();
    sink.publish_all(&report.records).unwrap();
    drop(sink);
    let back = read_signal_records(&path).unwrap();
    assert_eq!(back.len(), report.records.len());
    for (a, b) in back.iter().zip(&report.records) {
        assert_eq!((a.ticker.as_str(), a.rank, a.signal), (b.ticker.as_str(), b.rank, b.signal));
    }

    let messages = notifier.messages();
    assert!(messages.iter().any(|m| m.starts_with("Selected 3 tickers")));
    assert!(messages.iter().any(|m| m.starts_with("Error processing KRW-SOL")));
}

#[test]
fn config_file_round_trip_drives_a_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.toml");
    std::fs::write(
        &path,
        format!(
            "[analysis]\nsymbol = \"KRW-ETH\"\ncount = 60\ninterval = \"week\"\n\n[data]\ncache_dir = {:?}\noffline = true\nsynthetic = true\n",
            dir.path().join("cache").display().to_string()
        ),
    )
    .unwrap();

    let config = RunConfig::from_file(&path).unwrap();
    assert_eq!(config.analysis.interval, Interval::Week);
    let cache = ParquetCache::new(&config.data.cache_dir);
    let result = run_single(&config, &cache, None).unwrap();
    assert_eq!(result.symbol, "KRW-ETH");
    assert_eq!(result.interval, Interval::Week);
    assert!(result.has_synthetic);
    assert_eq!(result.bar_count, 60);
}
