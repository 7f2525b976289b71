//! Simple moving averages of close over three windows. No confirmations.

use super::rolling::rolling_mean;
use super::{require_window, Indicator, IndicatorError, IndicatorSeries};
use crate::domain::BarTable;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sma {
    short: usize,
    medium: usize,
    long: usize,
}

impl Sma {
    pub fn new(short: usize, medium: usize, long: usize) -> Result<Self, IndicatorError> {
        require_window("SMA", "short", short)?;
        require_window("SMA", "medium", medium)?;
        require_window("SMA", "long", long)?;
        Ok(Self {
            short,
            medium,
            long,
        })
    }
}

/// 9 / 21 / 200
impl Default for Sma {
    fn default() -> Self {
        Self {
            short: 9,
            medium: 21,
            long: 200,
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> String {
        format!("SMA({},{},{})", self.short, self.medium, self.long)
    }

    fn lookback(&self) -> usize {
        self.short - 1
    }

    fn compute(&self, table: &BarTable) -> IndicatorSeries {
        let closes = table.closes();
        IndicatorSeries::new(self.name(), table)
            .with_column("sma_short", rolling_mean(&closes, self.short))
            .with_column("sma_medium", rolling_mean(&closes, self.medium))
            .with_column("sma_long", rolling_mean(&closes, self.long))
    }
}

pub fn sma(
    table: &BarTable,
    short: usize,
    medium: usize,
    long: usize,
) -> Result<IndicatorSeries, IndicatorError> {
    Ok(Sma::new(short, medium, long)?.compute(table))
}
