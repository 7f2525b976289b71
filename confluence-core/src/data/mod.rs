//! Bar sources and the per-worker bar cache.

pub mod cache;
pub mod csv_source;
pub mod parquet_source;
pub mod provider;
pub mod schema;
pub mod synthetic;

pub use cache::BarCache;
pub use csv_source::CsvSource;
pub use parquet_source::ParquetSource;
pub use provider::{trim_to_lookback, BarSource, DataError, HistoryKey, Interval, Lookback};
pub use schema::ColumnMap;
pub use synthetic::SyntheticSource;
