//! Per-worker read-through cache of bar tables.
//!
//! A sweep evaluates the same few (symbol, lookback, interval) keys for
//! every candidate. Each worker owns one `BarCache`, so the source is hit at
//! most once per key per worker and no locking is needed. Failed fetches are
//! not cached; the next candidate retries them.

use std::collections::HashMap;

use tracing::debug;

use super::provider::{BarSource, DataError, HistoryKey};
use crate::domain::BarTable;

pub struct BarCache<'a, S: BarSource + ?Sized> {
    source: &'a S,
    tables: HashMap<HistoryKey, BarTable>,
    fetches: usize,
}

impl<'a, S: BarSource + ?Sized> BarCache<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            tables: HashMap::new(),
            fetches: 0,
        }
    }

    /// Cached table for `key`, fetching it on first use.
    pub fn get(&mut self, key: &HistoryKey) -> Result<&BarTable, DataError> {
        if !self.tables.contains_key(key) {
            self.fetches += 1;
            let table = self.source.fetch(key)?;
            debug!(source = self.source.name(), key = %key, bars = table.len(), "cached bars");
            self.tables.insert(key.clone(), table);
        }
        self.tables
            .get(key)
            .ok_or_else(|| DataError::InvalidKey(key.to_string()))
    }

    /// Calls made to the underlying source, successful or not.
    pub fn fetches(&self) -> usize {
        self.fetches
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
