//! On-Balance Volume.
//!
//! Sequential: obv[0] = 0, then each bar adds its volume when close rose,
//! subtracts it when close fell, and carries the previous value otherwise.
//!
//! Buy: OBV and close both rose vs the prior bar.
//! Sell: OBV and close both fell vs the prior bar.

use super::{falling, rising, Confirmation, Indicator, IndicatorError, IndicatorSeries};
use crate::domain::BarTable;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Obv;

impl Indicator for Obv {
    fn name(&self) -> String {
        "OBV".to_string()
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, table: &BarTable) -> IndicatorSeries {
        let bars = table.bars();
        let mut obv = Vec::with_capacity(bars.len());
        let mut acc = 0.0;
        for (i, bar) in bars.iter().enumerate() {
            if i > 0 {
                let prev_close = bars[i - 1].close;
                if bar.close > prev_close {
                    acc += bar.volume;
                } else if bar.close < prev_close {
                    acc -= bar.volume;
                }
            }
            obv.push(acc);
        }

        let closes = table.closes();
        let close_up = rising(&closes);
        let close_down = falling(&closes);
        let buy = rising(&obv)
            .into_iter()
            .zip(close_up)
            .map(|(o, c)| o && c)
            .collect();
        let sell = falling(&obv)
            .into_iter()
            .zip(close_down)
            .map(|(o, c)| o && c)
            .collect();

        IndicatorSeries::new(self.name(), table)
            .with_column("obv", obv)
            .with_confirmation(Confirmation::Buy, buy)
            .with_confirmation(Confirmation::Sell, sell)
    }
}

/// OBV has no parameters; the `Result` keeps the family signatures uniform.
pub fn obv(table: &BarTable) -> Result<IndicatorSeries, IndicatorError> {
    Ok(Obv.compute(table))
}
