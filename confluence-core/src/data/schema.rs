//! Required bar columns and timestamp parsing shared by the file sources.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::provider::DataError;

/// Accepted names for the time column, in priority order. `open time` is
/// the Binance kline export header (epoch milliseconds).
pub const TIMESTAMP_ALIASES: [&str; 4] = ["timestamp", "datetime", "date", "open time"];

/// Column positions of the required fields in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub timestamp: usize,
    pub open: usize,
    pub high: usize,
    pub low: usize,
    pub close: usize,
    pub volume: usize,
}

impl ColumnMap {
    /// Locate every required column by name, ignoring case and surrounding
    /// whitespace. A missing column is a data-shape error.
    pub fn resolve<'a, I>(headers: I, path: &str) -> Result<Self, DataError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let normalized: Vec<String> = headers
            .into_iter()
            .map(|h| h.trim().to_ascii_lowercase())
            .collect();
        let find = |name: &str| normalized.iter().position(|h| h == name);
        let require = |column: &'static str| {
            find(column).ok_or_else(|| DataError::MissingColumn {
                path: path.to_string(),
                column,
            })
        };

        let timestamp = TIMESTAMP_ALIASES
            .iter()
            .copied()
            .find_map(|alias| find(alias))
            .ok_or_else(|| DataError::MissingColumn {
                path: path.to_string(),
                column: "timestamp",
            })?;

        Ok(Self {
            timestamp,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: require("volume")?,
        })
    }
}

/// Interpret an integer epoch: seconds below 1e11, milliseconds above.
pub fn epoch_to_utc(value: i64) -> Option<DateTime<Utc>> {
    if value.abs() < 100_000_000_000 {
        Utc.timestamp_opt(value, 0).single()
    } else {
        Utc.timestamp_millis_opt(value).single()
    }
}

/// Parse the timestamp formats seen in exported price history: RFC 3339,
/// `YYYY-MM-DD HH:MM:SS[+zz:zz]`, a bare date (midnight UTC) or an integer
/// epoch.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    raw.parse::<i64>().ok().and_then(epoch_to_utc)
}
