//! Sweep configuration loaded from TOML.
//!
//! ```toml
//! [data]
//! symbols = ["BTC-USD", "ETH-USD"]
//! lookback = "2y"
//! interval = "1h"
//!
//! [data.source]
//! kind = "csv"
//! dir = "data"
//!
//! [simulation]
//! initial_balance = 10000.0
//!
//! [grid]
//! rsi_period = { start = 5, end = 15, step = 1 }
//! sar_step = [0.02, 0.03]
//!
//! [pool]
//! workers = 4
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use confluence_core::data::{
    BarSource, CsvSource, HistoryKey, Interval, Lookback, ParquetSource, SyntheticSource,
};
use confluence_core::engine::{SimulationConfig, SimulationError};

use crate::grid::{GridConfig, ParameterGrid};

/// Errors raised while loading or validating a sweep configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Where bar history comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    Csv { dir: PathBuf },
    Parquet { dir: PathBuf },
    Synthetic {
        #[serde(default)]
        seed: u64,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Synthetic { seed: 0 }
    }
}

impl SourceConfig {
    pub fn build(&self) -> Box<dyn BarSource> {
        match self {
            SourceConfig::Csv { dir } => Box::new(CsvSource::new(dir)),
            SourceConfig::Parquet { dir } => Box::new(ParquetSource::new(dir)),
            SourceConfig::Synthetic { seed } => Box::new(SyntheticSource::new(*seed)),
        }
    }
}

fn default_symbols() -> Vec<String> {
    ["BTC-USD", "ETH-USD", "SOL-USD", "ADA-USD"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_lookback() -> Lookback {
    Lookback::Years(2)
}

fn default_interval() -> Interval {
    Interval::Hour1
}

/// The `[data]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
    #[serde(default = "default_lookback")]
    pub lookback: Lookback,
    #[serde(default = "default_interval")]
    pub interval: Interval,
    #[serde(default)]
    pub source: SourceConfig,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            lookback: default_lookback(),
            interval: default_interval(),
            source: SourceConfig::default(),
        }
    }
}

impl DataConfig {
    /// One history key per configured symbol, in configuration order.
    pub fn keys(&self) -> Vec<HistoryKey> {
        self.symbols
            .iter()
            .map(|s| HistoryKey::new(s.clone(), self.lookback, self.interval))
            .collect()
    }
}

/// The `[pool]` table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    /// Worker threads; `None` uses the available parallelism.
    pub workers: Option<usize>,
}

impl PoolConfig {
    pub fn resolved_workers(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// A complete sweep description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub pool: PoolConfig,
}

impl SweepConfig {
    /// Load and validate a sweep file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a sweep document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Everything is checked once here so the sweep itself never sees a
    /// malformed config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data.symbols.is_empty() {
            return Err(ConfigError::invalid("data.symbols", "at least one symbol is required"));
        }
        if let Some(blank) = self.data.symbols.iter().find(|s| s.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "data.symbols",
                format!("blank symbol '{blank}'"),
            ));
        }
        if self.pool.workers == Some(0) {
            return Err(ConfigError::invalid("pool.workers", "must be >= 1"));
        }
        self.simulation.validate()?;
        self.grid.build()?;
        Ok(())
    }

    pub fn parameter_grid(&self) -> Result<ParameterGrid, ConfigError> {
        self.grid.build()
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = SweepConfig::from_toml("").unwrap();
        assert_eq!(config.data.symbols.len(), 4);
        assert_eq!(config.data.lookback, Lookback::Years(2));
        assert_eq!(config.data.interval, Interval::Hour1);
        assert_eq!(config.simulation, SimulationConfig::default());
        assert_eq!(config.parameter_grid().unwrap().len(), 300_000);
    }

    #[test]
    fn parses_full_document() {
        let config = SweepConfig::from_toml(
            r#"
            [data]
            symbols = ["BTC-USD"]
            lookback = "6mo"
            interval = "1d"

            [data.source]
            kind = "csv"
            dir = "history"

            [simulation]
            initial_balance = 5000.0
            monthly_injection = 0.0

            [grid]
            ichimoku_short = [2, 3]
            rsi_period = { start = 10, end = 13, step = 1 }
            sar_max_step = [0.2]

            [pool]
            workers = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.data.lookback, Lookback::Months(6));
        assert_eq!(
            config.data.source,
            SourceConfig::Csv {
                dir: PathBuf::from("history")
            }
        );
        assert_eq!(config.simulation.initial_balance, 5000.0);
        assert_eq!(config.simulation.trade_size, 1.0);
        assert_eq!(config.pool.resolved_workers(), 2);

        let grid = config.parameter_grid().unwrap();
        assert_eq!(grid.ichimoku_short, vec![2, 3]);
        assert_eq!(grid.rsi_period, vec![10, 11, 12]);
        assert_eq!(grid.sar_max_step, vec![0.2]);
        // Untouched axes keep their defaults.
        assert_eq!(grid.macd_signal, vec![5, 6, 7]);
    }

    #[test]
    fn rejects_invalid_documents() {
        let cases = [
            ("[data]\nsymbols = []", "data.symbols"),
            ("[simulation]\ntrade_size = 1.5", "trade_size"),
            ("[grid]\nrsi_period = []", "grid.rsi_period"),
            ("[pool]\nworkers = 0", "pool.workers"),
        ];
        for (doc, needle) in cases {
            let err = SweepConfig::from_toml(doc).unwrap_err();
            assert!(err.to_string().contains(needle), "{doc}: {err}");
        }
        assert!(matches!(
            SweepConfig::from_toml("[data]\ninterval = \"2h\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            SweepConfig::from_toml("[grid]\nbogus = [1]"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn toml_round_trip() {
        let mut config = SweepConfig::default();
        config.data.source = SourceConfig::Parquet {
            dir: PathBuf::from("bars"),
        };
        config.pool.workers = Some(3);
        let text = config.to_toml().unwrap();
        let back = SweepConfig::from_toml(&text).unwrap();
        assert_eq!(back, config);
    }
}
