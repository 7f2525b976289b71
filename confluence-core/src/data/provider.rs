//! Bar source trait, history keys and structured data errors.
//!
//! The `BarSource` trait abstracts over where history comes from (CSV files,
//! Parquet files, a synthetic generator) so the optimizer can swap them and
//! tests can mock them. Caching sits above this trait.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{BarError, BarTable};

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no data file for '{symbol}' in {}", dir.display())]
    NotFound { symbol: String, dir: PathBuf },

    #[error("{path}: missing required column '{column}'")]
    MissingColumn { path: String, column: &'static str },

    #[error("{path}: row {row}: {reason}")]
    Parse {
        path: String,
        row: usize,
        reason: String,
    },

    #[error("no bars for '{symbol}'")]
    Empty { symbol: String },

    #[error("invalid bar data: {0}")]
    InvalidBars(#[from] BarError),

    #[error("invalid history key: {0}")]
    InvalidKey(String),

    #[error("csv error: {0}")]
    Csv(String),

    #[error("parquet error: {0}")]
    Parquet(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bar width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Interval {
    Minute1,
    Minute5,
    Minute15,
    Minute30,
    Hour1,
    Day1,
    Week1,
    Month1,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Minute1 => "1m",
            Interval::Minute5 => "5m",
            Interval::Minute15 => "15m",
            Interval::Minute30 => "30m",
            Interval::Hour1 => "1h",
            Interval::Day1 => "1d",
            Interval::Week1 => "1wk",
            Interval::Month1 => "1mo",
        }
    }

    /// Nominal bar width; a month counts as 30 days.
    pub fn duration(&self) -> Duration {
        match self {
            Interval::Minute1 => Duration::minutes(1),
            Interval::Minute5 => Duration::minutes(5),
            Interval::Minute15 => Duration::minutes(15),
            Interval::Minute30 => Duration::minutes(30),
            Interval::Hour1 => Duration::hours(1),
            Interval::Day1 => Duration::days(1),
            Interval::Week1 => Duration::weeks(1),
            Interval::Month1 => Duration::days(30),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "1m" => Interval::Minute1,
            "5m" => Interval::Minute5,
            "15m" => Interval::Minute15,
            "30m" => Interval::Minute30,
            "1h" | "60m" => Interval::Hour1,
            "1d" => Interval::Day1,
            "1wk" | "1w" => Interval::Week1,
            "1mo" => Interval::Month1,
            other => return Err(DataError::InvalidKey(format!("unknown interval '{other}'"))),
        })
    }
}

impl TryFrom<String> for Interval {
    type Error = DataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Interval> for String {
    fn from(value: Interval) -> Self {
        value.as_str().to_string()
    }
}

/// How much history to request, measured back from the most recent bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Lookback {
    Days(u32),
    Months(u32),
    Years(u32),
    Max,
}

impl Lookback {
    /// Earliest timestamp inside the lookback ending at `end`; `None` for `Max`.
    pub fn start_from(&self, end: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match *self {
            Lookback::Days(d) => end.checked_sub_signed(Duration::days(i64::from(d))),
            Lookback::Months(m) => end.checked_sub_months(Months::new(m)),
            Lookback::Years(y) => end.checked_sub_months(Months::new(y.saturating_mul(12))),
            Lookback::Max => None,
        }
    }

    /// Nominal span in days, months as 30 and years as 365.
    pub fn approx_days(&self) -> Option<i64> {
        match *self {
            Lookback::Days(d) => Some(i64::from(d)),
            Lookback::Months(m) => Some(i64::from(m) * 30),
            Lookback::Years(y) => Some(i64::from(y) * 365),
            Lookback::Max => None,
        }
    }
}

impl fmt::Display for Lookback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookback::Days(d) => write!(f, "{d}d"),
            Lookback::Months(m) => write!(f, "{m}mo"),
            Lookback::Years(y) => write!(f, "{y}y"),
            Lookback::Max => f.write_str("max"),
        }
    }
}

impl FromStr for Lookback {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "max" {
            return Ok(Lookback::Max);
        }
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (digits, unit) = s.split_at(split);
        let n: u32 = digits
            .parse()
            .map_err(|_| DataError::InvalidKey(format!("invalid lookback '{s}'")))?;
        match unit {
            "d" => Ok(Lookback::Days(n)),
            "mo" => Ok(Lookback::Months(n)),
            "y" => Ok(Lookback::Years(n)),
            _ => Err(DataError::InvalidKey(format!("invalid lookback unit in '{s}'"))),
        }
    }
}

impl TryFrom<String> for Lookback {
    type Error = DataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Lookback> for String {
    fn from(value: Lookback) -> Self {
        value.to_string()
    }
}

/// Identity of one history request; also the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryKey {
    pub symbol: String,
    pub lookback: Lookback,
    pub interval: Interval,
}

impl HistoryKey {
    pub fn new(symbol: impl Into<String>, lookback: Lookback, interval: Interval) -> Self {
        Self {
            symbol: symbol.into(),
            lookback,
            interval,
        }
    }
}

impl fmt::Display for HistoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.symbol, self.lookback, self.interval)
    }
}

/// A source of bar history.
///
/// A failure or an empty table means "no data for this symbol"; callers
/// skip the symbol rather than abort.
pub trait BarSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    fn fetch(&self, key: &HistoryKey) -> Result<BarTable, DataError>;
}

impl<S: BarSource + ?Sized> BarSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(&self, key: &HistoryKey) -> Result<BarTable, DataError> {
        (**self).fetch(key)
    }
}

/// Keep only the bars inside `lookback`, measured back from the last bar.
pub fn trim_to_lookback(table: BarTable, lookback: Lookback) -> BarTable {
    let Some(last) = table.bars().last().map(|b| b.timestamp) else {
        return table;
    };
    match lookback.start_from(last) {
        Some(start) => {
            let from = table.bars().partition_point(|b| b.timestamp < start);
            table.tail_from(from)
        }
        None => table,
    }
}
