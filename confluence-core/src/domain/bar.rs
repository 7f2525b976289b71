//! Bar and BarTable — the time-indexed market data the engine consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    fn non_finite_field(&self) -> Option<&'static str> {
        [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
        .map(|(name, _)| name)
    }
}

/// Errors raised when a bar sequence does not form a valid timeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("bar {index}: field '{field}' is not finite")]
    NonFinite { index: usize, field: &'static str },

    #[error("bar {index}: negative volume {volume}")]
    NegativeVolume { index: usize, volume: f64 },

    #[error("bar {index}: timestamp {timestamp} does not follow the previous bar")]
    NotIncreasing {
        index: usize,
        timestamp: DateTime<Utc>,
    },
}

/// An ordered, immutable sequence of bars for one symbol.
///
/// Timestamps are strictly increasing; the order is the timeline and is
/// never changed after construction. Indicator series are aligned 1:1 with
/// this sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarTable {
    symbol: String,
    bars: Vec<Bar>,
}

impl BarTable {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, BarError> {
        for (index, bar) in bars.iter().enumerate() {
            if let Some(field) = bar.non_finite_field() {
                return Err(BarError::NonFinite { index, field });
            }
            if bar.volume < 0.0 {
                return Err(BarError::NegativeVolume {
                    index,
                    volume: bar.volume,
                });
            }
            if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
                return Err(BarError::NotIncreasing {
                    index,
                    timestamp: bar.timestamp,
                });
            }
        }
        Ok(Self {
            symbol: symbol.into(),
            bars,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.bars.iter().map(|b| b.timestamp).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// The trailing part of the table starting at `from`.
    ///
    /// Used by sources to trim a history to a requested lookback.
    pub fn tail_from(&self, from: usize) -> Self {
        Self {
            symbol: self.symbol.clone(),
            bars: self.bars[from.min(self.bars.len())..].to_vec(),
        }
    }
}
