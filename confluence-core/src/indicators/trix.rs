//! TRIX: percent rate of change of a triple-smoothed EMA of close.
//!
//! trix = 100 * pct_change(EMA(EMA(EMA(close, long), long), long)),
//! trix_sma = rolling mean of trix over `short`.
//! Buy: trix above trix_sma. Sell: trix below.

use super::rolling::{ema, pct_change, rolling_mean, span_alpha};
use super::{require_window, Confirmation, Indicator, IndicatorError, IndicatorSeries};
use crate::domain::BarTable;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trix {
    short: usize,
    long: usize,
}

impl Trix {
    pub fn new(short: usize, long: usize) -> Result<Self, IndicatorError> {
        require_window("Trix", "short", short)?;
        require_window("Trix", "long", long)?;
        Ok(Self { short, long })
    }
}

impl Indicator for Trix {
    fn name(&self) -> String {
        format!("Trix({},{})", self.short, self.long)
    }

    /// pct_change drops bar 0, then `trix_sma` needs `short` defined values.
    fn lookback(&self) -> usize {
        self.short
    }

    fn compute(&self, table: &BarTable) -> IndicatorSeries {
        let alpha = span_alpha(self.long);
        let triple = ema(&ema(&ema(&table.closes(), alpha), alpha), alpha);
        let trix: Vec<f64> = pct_change(&triple).iter().map(|p| 100.0 * p).collect();
        let trix_sma = rolling_mean(&trix, self.short);

        let buy = trix.iter().zip(&trix_sma).map(|(t, s)| t > s).collect();
        let sell = trix.iter().zip(&trix_sma).map(|(t, s)| t < s).collect();

        IndicatorSeries::new(self.name(), table)
            .with_column("trix", trix)
            .with_column("trix_sma", trix_sma)
            .with_confirmation(Confirmation::Buy, buy)
            .with_confirmation(Confirmation::Sell, sell)
    }
}

pub fn trix(table: &BarTable, short: usize, long: usize) -> Result<IndicatorSeries, IndicatorError> {
    Ok(Trix::new(short, long)?.compute(table))
}
