//! Deterministic synthetic bar source for demos, tests and benchmarks.
//!
//! Each (seed, symbol, interval) triple maps to one fixed random walk, so a
//! sweep over synthetic data is reproducible across runs and machines.

use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{BarSource, DataError, HistoryKey, Interval, Lookback};
use crate::domain::{Bar, BarTable};

/// Upper bound on generated bars per request.
pub const MAX_BARS: usize = 5_000;

/// Bars produced for `Lookback::Max`.
pub const MAX_LOOKBACK_BARS: usize = 2_000;

/// Random-walk bar generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticSource {
    seed: u64,
}

impl SyntheticSource {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of bars covering `lookback` at `interval`.
    pub fn bar_count(lookback: Lookback, interval: Interval) -> usize {
        match lookback.approx_days() {
            None => MAX_LOOKBACK_BARS,
            Some(days) => {
                let width = interval.duration().num_seconds().max(1);
                let n = days.saturating_mul(86_400) / width;
                (n.max(1) as usize).min(MAX_BARS)
            }
        }
    }

    fn rng(&self, key: &HistoryKey) -> StdRng {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(key.symbol.as_bytes());
        hasher.update(key.interval.as_str().as_bytes());
        StdRng::from_seed(*hasher.finalize().as_bytes())
    }

    /// Fixed end of every generated history.
    fn anchor() -> DateTime<Utc> {
        Utc.timestamp_opt(1_735_603_200, 0) // 2024-12-31T00:00:00Z
            .single()
            .unwrap_or_default()
    }

    /// Generate the walk for `key` without going through the trait.
    pub fn generate(&self, key: &HistoryKey) -> Result<BarTable, DataError> {
        let n = Self::bar_count(key.lookback, key.interval);
        let width = key.interval.duration();
        let start = Self::anchor() - width * (n as i32 - 1);
        let mut rng = self.rng(key);

        let mut price = 100.0_f64;
        let mut bars = Vec::with_capacity(n);
        for i in 0..n {
            let step: f64 = rng.gen_range(-0.03..0.03);
            let open = price;
            let close = price * (1.0 + step);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            let volume = rng.gen_range(500_000..5_000_000u64) as f64;

            bars.push(Bar {
                timestamp: start + width * i as i32,
                open,
                high,
                low,
                close,
                volume,
            });
            price = close;
        }

        Ok(BarTable::new(key.symbol.clone(), bars)?)
    }
}

impl BarSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&self, key: &HistoryKey) -> Result<BarTable, DataError> {
        self.generate(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(symbol: &str) -> HistoryKey {
        HistoryKey::new(symbol, Lookback::Days(30), Interval::Hour1)
    }

    #[test]
    fn same_key_same_walk() {
        let source = SyntheticSource::new(7);
        let a = source.fetch(&key("BTC-USD")).unwrap();
        let b = source.fetch(&key("BTC-USD")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 720);
    }

    #[test]
    fn seed_and_symbol_change_the_walk() {
        let a = SyntheticSource::new(7).fetch(&key("BTC-USD")).unwrap();
        let b = SyntheticSource::new(8).fetch(&key("BTC-USD")).unwrap();
        let c = SyntheticSource::new(7).fetch(&key("ETH-USD")).unwrap();
        assert_ne!(a.closes(), b.closes());
        assert_ne!(a.closes(), c.closes());
    }

    #[test]
    fn bars_are_well_formed() {
        let table = SyntheticSource::new(1).fetch(&key("X")).unwrap();
        for bar in table.bars() {
            assert!(bar.low <= bar.open.min(bar.close));
            assert!(bar.high >= bar.open.max(bar.close));
            assert!(bar.close > 0.0);
        }
        assert_eq!(
            table.bars().last().unwrap().timestamp,
            Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn bar_count_is_capped() {
        assert_eq!(SyntheticSource::bar_count(Lookback::Years(10), Interval::Minute1), MAX_BARS);
        assert_eq!(SyntheticSource::bar_count(Lookback::Max, Interval::Day1), MAX_LOOKBACK_BARS);
        assert_eq!(SyntheticSource::bar_count(Lookback::Days(1), Interval::Week1), 1);
    }
}
