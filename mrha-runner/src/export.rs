//! Artifact export: JSON manifest plus CSV trade tape and portfolio series.
//!
//! All persisted manifests carry a `schema_version`. Unknown versions are
//! rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use mrha_core::domain::Trade;
use mrha_core::AnalysisRow;

use crate::runner::{AnalysisResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(result: &AnalysisResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize AnalysisResult to JSON")
}

/// Deserialize an `AnalysisResult`, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<AnalysisResult> {
    let result: AnalysisResult =
        serde_json::from_str(json).context("failed to deserialize AnalysisResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns: bar_index, date, side, price, shares, notional
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["bar_index", "date", "side", "price", "shares", "notional"])?;
    for t in trades {
        wtr.write_record([
            &t.bar_index.to_string(),
            &t.date.to_string(),
            &format!("{:?}", t.side),
            &format!("{:.6}", t.price),
            &format!("{}", t.shares),
            &format!("{:.2}", t.notional()),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// One row per MRHA bar.
///
/// Columns: date, mh_close, signal, position, holdings, cash, total_value, returns
pub fn export_portfolio_csv(rows: &[AnalysisRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "mh_close",
        "signal",
        "position",
        "holdings",
        "cash",
        "total_value",
        "returns",
    ])?;
    for row in rows {
        let signal = row.signal.map(|s| s.value().to_string()).unwrap_or_default();
        wtr.write_record([
            &row.date.to_string(),
            &format!("{:.6}", row.mrha.mh_close),
            &signal,
            &row.position.value().to_string(),
            &format!("{}", row.portfolio.holdings),
            &format!("{:.2}", row.portfolio.cash),
            &format!("{:.2}", row.portfolio.total_value),
            &format!("{:.8}", row.portfolio.returns),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for one analysis run.
///
/// Creates `{symbol}_{timestamp}/` under `output_dir` containing:
/// - `manifest.json`: the full `AnalysisResult`
/// - `trades.csv`: the trade ledger
/// - `portfolio.csv`: per-bar signal, position and portfolio state
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &AnalysisResult, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "{}_{}",
        result.symbol,
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("manifest.json"), export_json(result)?)?;
    std::fs::write(run_dir.join("trades.csv"), export_trades_csv(&result.trades)?)?;
    std::fs::write(run_dir.join("portfolio.csv"), export_portfolio_csv(&result.rows)?)?;

    Ok(run_dir)
}

/// Load an `AnalysisResult` from an artifact directory's manifest.json.
pub fn load_artifacts(dir: &Path) -> Result<AnalysisResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mrha_core::data::{DataSource, Interval};
    use mrha_core::domain::TradeSide;

    use crate::data_loader::{generate_synthetic_bars, LoadedData};
    use crate::runner::analyze_loaded;

    fn sample_result() -> AnalysisResult {
        let bars = generate_synthetic_bars("KRW-BTC", Interval::Day, 60);
        let loaded = LoadedData {
            symbol: "KRW-BTC".into(),
            bars,
            source: DataSource::Synthetic,
            dataset_hash: "abc123".into(),
        };
        analyze_loaded(&loaded, &Default::default(), Interval::Day, "run-1").unwrap()
    }

    #[test]
    fn json_round_trip_keeps_series() {
        let result = sample_result();
        let back = import_json(&export_json(&result).unwrap()).unwrap();
        assert_eq!(back.symbol, result.symbol);
        assert_eq!(back.trades.len(), result.trades.len());
        assert_eq!(back.rows.len(), result.rows.len());
        assert_eq!(back.metrics.trade_count, result.metrics.trade_count);
        assert_eq!(back.recent_actions, result.recent_actions);
    }

    #[test]
    fn import_rejects_future_schema() {
        let mut result = sample_result();
        result.schema_version = SCHEMA_VERSION + 1;
        let json = serde_json::to_string(&result).unwrap();
        let err = import_json(&json).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version"));
    }

    #[test]
    fn missing_schema_version_defaults_to_current() {
        let result = sample_result();
        let mut value = serde_json::to_value(&result).unwrap();
        value.as_object_mut().unwrap().remove("schema_version");
        let back = import_json(&value.to_string()).unwrap();
        assert_eq!(back.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn trades_csv_has_header_and_rows() {
        let trades = vec![Trade {
            bar_index: 3,
            date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            side: TradeSide::Buy,
            price: 100.0,
            shares: 99.0,
        }];
        let csv = export_trades_csv(&trades).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "bar_index,date,side,price,shares,notional");
        assert_eq!(lines[1], "3,2024-03-15,Buy,100.000000,99,9900.00");
    }

    #[test]
    fn portfolio_csv_has_one_row_per_bar() {
        let result = sample_result();
        let csv = export_portfolio_csv(&result.rows).unwrap();
        assert_eq!(csv.lines().count(), result.rows.len() + 1);
        assert!(csv.starts_with("date,mh_close,signal,position,"));
    }

    #[test]
    fn save_and_load_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let result = sample_result();
        let run_dir = save_artifacts(&result, dir.path()).unwrap();

        assert!(run_dir.join("manifest.json").exists());
        assert!(run_dir.join("trades.csv").exists());
        assert!(run_dir.join("portfolio.csv").exists());

        let loaded = load_artifacts(&run_dir).unwrap();
        assert_eq!(loaded.dataset_hash, "abc123");
        assert_eq!(loaded.portfolio.len(), result.portfolio.len());
        for (a, b) in loaded.portfolio.iter().zip(&result.portfolio) {
            assert!((a.total_value - b.total_value).abs() <= 1e-6 * b.total_value.abs());
        }
    }
}
