//! Volume-weighted average price, cumulative from the first bar (no session
//! reset).
//!
//! Buy: close below VWAP and rising vs the prior bar.

use super::{rising, Confirmation, Indicator, IndicatorError, IndicatorSeries};
use crate::domain::BarTable;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vwap;

impl Indicator for Vwap {
    fn name(&self) -> String {
        "VWAP".to_string()
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, table: &BarTable) -> IndicatorSeries {
        let mut pv = 0.0;
        let mut volume = 0.0;
        let vwap: Vec<f64> = table
            .bars()
            .iter()
            .map(|bar| {
                pv += bar.typical_price() * bar.volume;
                volume += bar.volume;
                pv / volume
            })
            .collect();

        let closes = table.closes();
        let buy = rising(&closes)
            .into_iter()
            .enumerate()
            .map(|(i, up)| up && closes[i] < vwap[i])
            .collect();

        IndicatorSeries::new(self.name(), table)
            .with_column("vwap", vwap)
            .with_confirmation(Confirmation::Buy, buy)
    }
}

pub fn vwap(table: &BarTable) -> Result<IndicatorSeries, IndicatorError> {
    Ok(Vwap.compute(table))
}
