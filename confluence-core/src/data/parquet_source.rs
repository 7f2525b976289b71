//! Parquet bar source.
//!
//! Layout: `{dir}/{SYMBOL}_{interval}.parquet`, falling back to
//! `{dir}/{SYMBOL}.parquet`. The time column may be a datetime, a date, an
//! integer epoch or text.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use polars::prelude::*;
use tracing::debug;

use super::csv_source::{finish_bars, locate};
use super::provider::{BarSource, DataError, HistoryKey};
use super::schema::{epoch_to_utc, parse_timestamp, ColumnMap};
use crate::domain::{Bar, BarTable};

/// Reads price history from a directory of Parquet files.
#[derive(Debug, Clone)]
pub struct ParquetSource {
    dir: PathBuf,
}

impl ParquetSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn locate(&self, key: &HistoryKey) -> Option<PathBuf> {
        locate(&self.dir, key, "parquet")
    }
}

fn polars_err(path: &str, what: &str) -> impl Fn(PolarsError) -> DataError {
    let context = format!("{path}: {what}");
    move |e| DataError::Parquet(format!("{context}: {e}"))
}

/// Decode the time column into UTC instants; `None` marks a null cell.
fn timestamps(column: &Column, path: &str) -> Result<Vec<Option<DateTime<Utc>>>, DataError> {
    let parse_failure = |row: usize, raw: String| DataError::Parse {
        path: path.to_string(),
        row,
        reason: format!("unrecognised timestamp '{raw}'"),
    };

    match column.dtype() {
        DataType::Datetime(unit, _) => {
            let unit = *unit;
            let ints = column
                .cast(&DataType::Int64)
                .map_err(polars_err(path, "timestamp cast"))?;
            let ca = ints.i64().map_err(polars_err(path, "timestamp column"))?;
            Ok(ca
                .into_iter()
                .map(|v| {
                    v.and_then(|v| match unit {
                        TimeUnit::Nanoseconds => Some(Utc.timestamp_nanos(v)),
                        TimeUnit::Microseconds => DateTime::from_timestamp_micros(v),
                        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(v),
                    })
                })
                .collect())
        }
        DataType::Date => {
            let days = column
                .cast(&DataType::Int32)
                .map_err(polars_err(path, "date cast"))?;
            let ca = days.i32().map_err(polars_err(path, "date column"))?;
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
                .ok_or_else(|| DataError::Parquet("epoch out of range".into()))?;
            Ok(ca
                .into_iter()
                .map(|v| v.map(|d| epoch + Duration::days(i64::from(d))))
                .collect())
        }
        DataType::String => {
            let ca = column.str().map_err(polars_err(path, "timestamp column"))?;
            ca.into_iter()
                .enumerate()
                .map(|(row, v)| match v {
                    None => Ok(None),
                    Some(raw) => parse_timestamp(raw)
                        .map(Some)
                        .ok_or_else(|| parse_failure(row, raw.to_string())),
                })
                .collect()
        }
        dtype if dtype.is_integer() => {
            let ints = column
                .cast(&DataType::Int64)
                .map_err(polars_err(path, "timestamp cast"))?;
            let ca = ints.i64().map_err(polars_err(path, "timestamp column"))?;
            ca.into_iter()
                .enumerate()
                .map(|(row, v)| match v {
                    None => Ok(None),
                    Some(v) => epoch_to_utc(v)
                        .map(Some)
                        .ok_or_else(|| parse_failure(row, v.to_string())),
                })
                .collect()
        }
        other => Err(DataError::Parquet(format!(
            "{path}: unsupported timestamp type {other}"
        ))),
    }
}

/// Cast a numeric column to f64; nulls stay `None`.
fn floats(column: &Column, path: &str, name: &str) -> Result<Vec<Option<f64>>, DataError> {
    let cast = column
        .cast(&DataType::Float64)
        .map_err(polars_err(path, name))?;
    let ca = cast.f64().map_err(polars_err(path, name))?;
    Ok(ca.into_iter().collect())
}

fn read_parquet(path: &Path, symbol: &str) -> Result<Vec<Bar>, DataError> {
    let display = path.display().to_string();
    let file = fs::File::open(path)?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(polars_err(&display, "read"))?;

    let columns = ColumnMap::resolve(
        df.get_column_names().into_iter().map(|name| name.as_str()),
        &display,
    )?;
    let all = df.get_columns();

    let ts = timestamps(&all[columns.timestamp], &display)?;
    let open = floats(&all[columns.open], &display, "open")?;
    let high = floats(&all[columns.high], &display, "high")?;
    let low = floats(&all[columns.low], &display, "low")?;
    let close = floats(&all[columns.close], &display, "close")?;
    let volume = floats(&all[columns.volume], &display, "volume")?;

    let mut bars = Vec::with_capacity(df.height());
    let mut skipped = 0usize;
    for i in 0..df.height() {
        match (ts[i], open[i], high[i], low[i], close[i], volume[i]) {
            (Some(timestamp), Some(open), Some(high), Some(low), Some(close), Some(volume)) => {
                bars.push(Bar {
                    timestamp,
                    open,
                    high,
                    low,
                    close,
                    volume,
                })
            }
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        let path = &display;
        debug!(symbol, path = %path, skipped, "dropped rows with null fields");
    }
    Ok(bars)
}

impl BarSource for ParquetSource {
    fn name(&self) -> &str {
        "parquet"
    }

    fn fetch(&self, key: &HistoryKey) -> Result<BarTable, DataError> {
        let path = self.locate(key).ok_or_else(|| DataError::NotFound {
            symbol: key.symbol.clone(),
            dir: self.dir.clone(),
        })?;
        let bars = read_parquet(&path, &key.symbol)?;
        finish_bars(&key.symbol, bars, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::{Interval, Lookback};

    fn write(path: &Path, mut df: DataFrame) {
        let file = fs::File::create(path).unwrap();
        ParquetWriter::new(file).finish(&mut df).unwrap();
    }

    fn key(symbol: &str) -> HistoryKey {
        HistoryKey::new(symbol, Lookback::Max, Interval::Day1)
    }

    #[test]
    fn reads_date_typed_file() {
        let dir = tempfile::tempdir().unwrap();
        // 19723 = 2024-01-01
        let df = DataFrame::new(vec![
            Column::new("Date".into(), vec![19724i32, 19723])
                .cast(&DataType::Date)
                .unwrap(),
            Column::new("Open".into(), vec![2.0, 1.0]),
            Column::new("High".into(), vec![3.0, 2.0]),
            Column::new("Low".into(), vec![1.0, 0.5]),
            Column::new("Close".into(), vec![2.5, 1.5]),
            Column::new("Volume".into(), vec![10u64, 20]),
        ])
        .unwrap();
        write(&dir.path().join("SPY_1d.parquet"), df);

        let table = ParquetSource::new(dir.path()).fetch(&key("SPY")).unwrap();
        assert_eq!(table.closes(), vec![1.5, 2.5]);
        assert_eq!(table.volumes(), vec![20.0, 10.0]);
        assert_eq!(
            table.bars()[0].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn reads_text_timestamps_and_skips_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let df = DataFrame::new(vec![
            Column::new(
                "timestamp".into(),
                vec!["2024-01-01T00:00:00Z", "2024-01-01T01:00:00Z", "2024-01-01T02:00:00Z"],
            ),
            Column::new("open".into(), vec![1.0, 1.0, 1.0]),
            Column::new("high".into(), vec![1.0, 1.0, 1.0]),
            Column::new("low".into(), vec![1.0, 1.0, 1.0]),
            Column::new("close".into(), vec![Some(1.0), None, Some(3.0)]),
            Column::new("volume".into(), vec![1.0, 1.0, 1.0]),
        ])
        .unwrap();
        write(&dir.path().join("BTC.parquet"), df);

        let table = ParquetSource::new(dir.path()).fetch(&key("BTC")).unwrap();
        assert_eq!(table.closes(), vec![1.0, 3.0]);
    }

    #[test]
    fn missing_volume_is_shape_error() {
        let dir = tempfile::tempdir().unwrap();
        let df = DataFrame::new(vec![
            Column::new("date".into(), vec!["2024-01-01"]),
            Column::new("open".into(), vec![1.0]),
            Column::new("high".into(), vec![1.0]),
            Column::new("low".into(), vec![1.0]),
            Column::new("close".into(), vec![1.0]),
        ])
        .unwrap();
        write(&dir.path().join("X.parquet"), df);

        let err = ParquetSource::new(dir.path()).fetch(&key("X")).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn { column: "volume", .. }));
    }
}
