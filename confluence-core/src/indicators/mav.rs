//! Moving-average crossover over the most recent `period` bars only.
//!
//! Bars before the window are undefined. Buy: short crosses above long.
//! Sell: short crosses below long.

use super::rolling::rolling_mean;
use super::{require_window, Confirmation, Indicator, IndicatorError, IndicatorSeries};
use crate::domain::BarTable;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mav {
    period: usize,
    short: usize,
    long: usize,
}

impl Mav {
    pub fn new(period: usize, short: usize, long: usize) -> Result<Self, IndicatorError> {
        require_window("MAV", "period", period)?;
        require_window("MAV", "short", short)?;
        require_window("MAV", "long", long)?;
        Ok(Self {
            period,
            short,
            long,
        })
    }
}

impl Indicator for Mav {
    fn name(&self) -> String {
        format!("MAV({},{},{})", self.period, self.short, self.long)
    }

    fn lookback(&self) -> usize {
        self.short.max(self.long) - 1
    }

    fn compute(&self, table: &BarTable) -> IndicatorSeries {
        let closes = table.closes();
        let n = closes.len();
        let start = n.saturating_sub(self.period);

        let mut short = vec![f64::NAN; n];
        let mut long = vec![f64::NAN; n];
        short[start..].copy_from_slice(&rolling_mean(&closes[start..], self.short));
        long[start..].copy_from_slice(&rolling_mean(&closes[start..], self.long));

        let buy = (0..n)
            .map(|i| i > 0 && short[i] > long[i] && short[i - 1] <= long[i - 1])
            .collect();
        let sell = (0..n)
            .map(|i| i > 0 && short[i] < long[i] && short[i - 1] >= long[i - 1])
            .collect();

        IndicatorSeries::new(self.name(), table)
            .with_column("short", short)
            .with_column("long", long)
            .with_confirmation(Confirmation::Buy, buy)
            .with_confirmation(Confirmation::Sell, sell)
    }
}

pub fn mav(
    table: &BarTable,
    period: usize,
    short: usize,
    long: usize,
) -> Result<IndicatorSeries, IndicatorError> {
    Ok(Mav::new(period, short, long)?.compute(table))
}
