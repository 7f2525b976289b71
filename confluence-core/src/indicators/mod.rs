//! Indicator engine.
//!
//! Every indicator is a pure function of a `BarTable` plus its own parameters
//! and returns a fresh `IndicatorSeries` aligned 1:1 with the table. Nothing
//! is written back onto the input. Undefined values are `f64::NAN`; every
//! comparison against NaN is false, so warm-up bars never confirm.
//!
//! Parameter structs validate at construction and implement `Indicator`; the
//! free functions (`macd`, `rsi`, ...) are the one-call form.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::domain::BarTable;

pub mod didi;
pub mod ema_trend;
pub mod ichimoku;
pub mod macd;
pub mod mav;
pub mod obv;
pub mod parabolic_sar;
pub mod rolling;
pub mod rsi;
pub mod sma;
pub mod trix;
pub mod vwap;

pub use didi::{didi, Didi};
pub use ema_trend::{ema_trend, EmaTrend};
pub use ichimoku::{ichimoku, Ichimoku};
pub use macd::{macd, Macd};
pub use mav::{mav, Mav};
pub use obv::{obv, Obv};
pub use parabolic_sar::{parabolic_sar, ParabolicSar};
pub use rsi::{rsi, Rsi};
pub use sma::{sma, Sma};
pub use trix::{trix, Trix};
pub use vwap::{vwap, Vwap};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndicatorError {
    #[error("{indicator}: invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        indicator: &'static str,
        parameter: &'static str,
        reason: String,
    },
}

impl IndicatorError {
    pub(crate) fn invalid(
        indicator: &'static str,
        parameter: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            indicator,
            parameter,
            reason: reason.into(),
        }
    }
}

/// Reject zero-length windows.
pub(crate) fn require_window(
    indicator: &'static str,
    parameter: &'static str,
    window: usize,
) -> Result<(), IndicatorError> {
    if window == 0 {
        return Err(IndicatorError::invalid(indicator, parameter, "must be >= 1"));
    }
    Ok(())
}

/// Which way a confirmation column points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    Buy,
    Sell,
}

/// Trait for indicator families.
///
/// `compute` must return a series of exactly `table.len()` rows. No value or
/// confirmation at bar t may depend on bars after t, with the single
/// documented exception of Ichimoku's Chikou span.
pub trait Indicator: Send + Sync {
    /// Display name including parameters, e.g. `RSI(14)`.
    fn name(&self) -> String;

    /// Bars needed before the primary column is defined.
    fn lookback(&self) -> usize;

    fn compute(&self, table: &BarTable) -> IndicatorSeries;
}

/// Named numeric columns plus boolean confirmation columns, aligned to the
/// timeline of the table they were computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSeries {
    name: String,
    timestamps: Vec<DateTime<Utc>>,
    columns: BTreeMap<&'static str, Vec<f64>>,
    confirmations: BTreeMap<Confirmation, Vec<bool>>,
}

impl IndicatorSeries {
    pub fn new(name: impl Into<String>, table: &BarTable) -> Self {
        Self {
            name: name.into(),
            timestamps: table.timestamps(),
            columns: BTreeMap::new(),
            confirmations: BTreeMap::new(),
        }
    }

    pub fn with_column(mut self, column: &'static str, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), self.timestamps.len(), "column {column} misaligned");
        self.columns.insert(column, values);
        self
    }

    pub fn with_confirmation(mut self, kind: Confirmation, flags: Vec<bool>) -> Self {
        debug_assert_eq!(flags.len(), self.timestamps.len(), "{kind:?} flags misaligned");
        self.confirmations.insert(kind, flags);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.keys().copied()
    }

    pub fn column(&self, column: &str) -> Option<&[f64]> {
        self.columns.get(column).map(Vec::as_slice)
    }

    /// Value at bar `index`, `None` when undefined or out of range.
    pub fn value(&self, column: &str, index: usize) -> Option<f64> {
        self.column(column)
            .and_then(|values| values.get(index).copied())
            .filter(|v| !v.is_nan())
    }

    pub fn confirmations(&self, kind: Confirmation) -> Option<&[bool]> {
        self.confirmations.get(&kind).map(Vec::as_slice)
    }

    /// Whether `kind` is confirmed at bar `index`. Missing columns and
    /// out-of-range positions read as false.
    pub fn confirmed(&self, kind: Confirmation, index: usize) -> bool {
        self.confirmations(kind)
            .and_then(|flags| flags.get(index).copied())
            .unwrap_or(false)
    }

    /// Whether `kind` is confirmed at any of `index - offset` for the given
    /// offsets. Offsets reaching before the first bar read as false.
    pub fn confirmed_within(&self, kind: Confirmation, index: usize, offsets: &[usize]) -> bool {
        offsets.iter().any(|&offset| {
            index
                .checked_sub(offset)
                .is_some_and(|at| self.confirmed(kind, at))
        })
    }
}

/// `values[i] > values[i - 1]`; false at bar 0 and wherever either side is NaN.
pub(crate) fn rising(values: &[f64]) -> Vec<bool> {
    (0..values.len())
        .map(|i| i > 0 && values[i] > values[i - 1])
        .collect()
}

/// `values[i] < values[i - 1]`; false at bar 0 and wherever either side is NaN.
pub(crate) fn falling(values: &[f64]) -> Vec<bool> {
    (0..values.len())
        .map(|i| i > 0 && values[i] < values[i - 1])
        .collect()
}

/// Build a table from close prices for testing.
///
/// Hourly timestamps from 2024-01-02; open = previous close,
/// high = max(open, close) + 1, low = min(open, close) - 1, volume = 1000.
#[cfg(test)]
pub fn make_table(closes: &[f64]) -> BarTable {
    let volumes = vec![1000.0; closes.len()];
    make_table_with_volume(closes, &volumes)
}

#[cfg(test)]
pub fn make_table_with_volume(closes: &[f64], volumes: &[f64]) -> BarTable {
    use crate::domain::Bar;
    use chrono::TimeZone;

    let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let bars = closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&close, &volume))| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: start + chrono::Duration::hours(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume,
            }
        })
        .collect();
    BarTable::new("TEST", bars).unwrap()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
