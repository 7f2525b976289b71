//! Didi index: three close SMAs (short, long, reference).
//!
//! Buy: short rising, long falling, short above reference.
//! Sell: long rising, long above short, long below reference.

use super::rolling::rolling_mean;
use super::{falling, require_window, rising, Confirmation, Indicator, IndicatorError, IndicatorSeries};
use crate::domain::BarTable;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Didi {
    short: usize,
    long: usize,
    reference: usize,
}

impl Didi {
    pub fn new(short: usize, long: usize, reference: usize) -> Result<Self, IndicatorError> {
        require_window("Didi", "short", short)?;
        require_window("Didi", "long", long)?;
        require_window("Didi", "reference", reference)?;
        Ok(Self {
            short,
            long,
            reference,
        })
    }
}

impl Indicator for Didi {
    fn name(&self) -> String {
        format!("Didi({},{},{})", self.short, self.long, self.reference)
    }

    fn lookback(&self) -> usize {
        self.short.max(self.long).max(self.reference) - 1
    }

    fn compute(&self, table: &BarTable) -> IndicatorSeries {
        let closes = table.closes();
        let short = rolling_mean(&closes, self.short);
        let long = rolling_mean(&closes, self.long);
        let reference = rolling_mean(&closes, self.reference);

        let short_up = rising(&short);
        let long_up = rising(&long);
        let long_down = falling(&long);

        let n = closes.len();
        let buy = (0..n)
            .map(|i| short_up[i] && long_down[i] && short[i] > reference[i])
            .collect();
        let sell = (0..n)
            .map(|i| long_up[i] && long[i] > short[i] && long[i] < reference[i])
            .collect();

        IndicatorSeries::new(self.name(), table)
            .with_column("short", short)
            .with_column("long", long)
            .with_column("reference", reference)
            .with_confirmation(Confirmation::Buy, buy)
            .with_confirmation(Confirmation::Sell, sell)
    }
}

pub fn didi(
    table: &BarTable,
    short: usize,
    long: usize,
    reference: usize,
) -> Result<IndicatorSeries, IndicatorError> {
    Ok(Didi::new(short, long, reference)?.compute(table))
}
