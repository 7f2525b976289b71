//! CSV bar source.
//!
//! Layout: `{dir}/{SYMBOL}_{interval}.csv`, falling back to `{dir}/{SYMBOL}.csv`.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::provider::{trim_to_lookback, BarSource, DataError, HistoryKey};
use super::schema::{parse_timestamp, ColumnMap};
use crate::domain::{Bar, BarTable};

/// Reads exported price history from a directory of CSV files.
#[derive(Debug, Clone)]
pub struct CsvSource {
    dir: PathBuf,
}

impl CsvSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// First existing candidate file for `key`.
    pub fn locate(&self, key: &HistoryKey) -> Option<PathBuf> {
        locate(&self.dir, key, "csv")
    }
}

/// `{SYMBOL}_{interval}.{ext}` if present, else `{SYMBOL}.{ext}`.
pub(crate) fn locate(dir: &Path, key: &HistoryKey, ext: &str) -> Option<PathBuf> {
    [
        dir.join(format!("{}_{}.{ext}", key.symbol, key.interval)),
        dir.join(format!("{}.{ext}", key.symbol)),
    ]
    .into_iter()
    .find(|p| p.is_file())
}

/// Sort rows by time and drop repeated timestamps (first row wins).
pub(crate) fn finish_bars(
    symbol: &str,
    mut bars: Vec<Bar>,
    key: &HistoryKey,
) -> Result<BarTable, DataError> {
    if bars.is_empty() {
        return Err(DataError::Empty {
            symbol: symbol.to_string(),
        });
    }
    bars.sort_by_key(|b| b.timestamp);
    bars.dedup_by_key(|b| b.timestamp);
    let table = BarTable::new(symbol, bars)?;
    Ok(trim_to_lookback(table, key.lookback))
}

fn read_csv(path: &Path, symbol: &str) -> Result<Vec<Bar>, DataError> {
    let display = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| DataError::Csv(format!("{display}: {e}")))?;

    let headers = reader
        .headers()
        .map_err(|e| DataError::Csv(format!("{display}: {e}")))?
        .clone();
    let columns = ColumnMap::resolve(headers.iter(), &display)?;

    let mut bars = Vec::new();
    let mut skipped = 0usize;
    for (i, record) in reader.records().enumerate() {
        // Header is line 1.
        let row = i + 2;
        let record = record.map_err(|e| DataError::Csv(format!("{display}: {e}")))?;
        let field = |idx: usize| record.get(idx).unwrap_or("");

        let raw_ts = field(columns.timestamp);
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| DataError::Parse {
            path: display.clone(),
            row,
            reason: format!("unrecognised timestamp '{raw_ts}'"),
        })?;

        // Gaps in exported history show up as empty price cells.
        let raw = [
            field(columns.open),
            field(columns.high),
            field(columns.low),
            field(columns.close),
            field(columns.volume),
        ];
        if raw.iter().any(|v| v.is_empty()) {
            skipped += 1;
            continue;
        }
        let mut values = [0.0f64; 5];
        for (slot, text) in values.iter_mut().zip(raw) {
            *slot = text.parse().map_err(|_| DataError::Parse {
                path: display.clone(),
                row,
                reason: format!("'{text}' is not a number"),
            })?;
        }
        let [open, high, low, close, volume] = values;
        bars.push(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        });
    }
    if skipped > 0 {
        let path = &display;
        debug!(symbol, path = %path, skipped, "dropped rows with empty fields");
    }
    Ok(bars)
}

impl BarSource for CsvSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(&self, key: &HistoryKey) -> Result<BarTable, DataError> {
        let path = self.locate(key).ok_or_else(|| DataError::NotFound {
            symbol: key.symbol.clone(),
            dir: self.dir.clone(),
        })?;
        let bars = read_csv(&path, &key.symbol)?;
        finish_bars(&key.symbol, bars, key)
    }
}
