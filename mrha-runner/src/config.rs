//! TOML run configuration.
//!
//! ```toml
//! [analysis]
//! symbol = "KRW-BTC"
//! interval = "day"
//! count = 365
//!
//! [data]
//! cache_dir = "data"
//! offline = false
//!
//! [scan]
//! universe = ["KRW-BTC", "KRW-ETH"]
//! top_n = 10
//! owned = ["KRW-XRP"]
//! ```
//!
//! Every field has a default, so an empty file is a valid config.

use std::path::{Path, PathBuf};

use mrha_core::backtest::{DEFAULT_COMMISSION, DEFAULT_INITIAL_CAPITAL};
use mrha_core::data::Interval;
use mrha_core::indicators::OpenSeed;
use mrha_core::{AnalysisParams, BacktestConfig, MIN_BARS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data_loader::LoadOptions;

/// Content hash of a config.
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub analysis: AnalysisConfig,
    pub data: DataConfig,
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub symbol: String,
    pub interval: Interval,
    /// Raw bars requested from the provider.
    pub count: usize,
    pub initial_capital: f64,
    pub commission: f64,
    pub open_seed: OpenSeed,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            symbol: "KRW-BTC".to_string(),
            interval: Interval::Day,
            count: 365,
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            commission: DEFAULT_COMMISSION,
            open_seed: OpenSeed::SourceOpen,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub cache_dir: PathBuf,
    /// Never touch the network.
    pub offline: bool,
    /// Fall back to a seeded random walk when no real data is available.
    pub synthetic: bool,
    /// Read `{csv_dir}/{SYMBOL}.csv` instead of calling Upbit.
    pub csv_dir: Option<PathBuf>,
    /// Ignore cached bars and fetch again.
    pub refresh: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("data"),
            offline: false,
            synthetic: false,
            csv_dir: None,
            refresh: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub universe: Vec<String>,
    pub top_n: usize,
    /// Always analysed, whatever their trading value.
    pub owned: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            universe: Vec::new(),
            top_n: 10,
            owned: Vec::new(),
        }
    }
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.analysis;
        if a.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("analysis.symbol is empty".into()));
        }
        if !(a.initial_capital.is_finite() && a.initial_capital > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "analysis.initial_capital must be positive, got {}",
                a.initial_capital
            )));
        }
        if !(0.0..1.0).contains(&a.commission) {
            return Err(ConfigError::Invalid(format!(
                "analysis.commission must be in [0, 1), got {}",
                a.commission
            )));
        }
        if a.count < MIN_BARS {
            return Err(ConfigError::Invalid(format!(
                "analysis.count must be at least {MIN_BARS}, got {}",
                a.count
            )));
        }
        if self.scan.top_n == 0 && self.scan.owned.is_empty() && !self.scan.universe.is_empty() {
            return Err(ConfigError::Invalid(
                "scan.top_n is 0 and no owned tickers: nothing would be analysed".into(),
            ));
        }
        Ok(())
    }

    pub fn analysis_params(&self) -> AnalysisParams {
        AnalysisParams {
            open_seed: self.analysis.open_seed,
            backtest: BacktestConfig {
                initial_capital: self.analysis.initial_capital,
                commission: self.analysis.commission,
            },
        }
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            interval: self.analysis.interval,
            count: self.analysis.count,
            offline: self.data.offline,
            synthetic: self.data.synthetic,
            force: self.data.refresh,
        }
    }

    /// Deterministic BLAKE3 hash of the serialized config.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json =
            serde_json::to_string(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
