//! MACD — difference of a fast and a slow EMA of close.
//!
//! Columns: `macd`, `signal` (EMA of macd), `histogram`, `macd_mean`
//! (rolling mean of macd over the slow window).
//! Buy: macd above both its signal line and its own rolling mean.
//! Sell: macd below both.
//! Lookback: slow - 1.

use super::rolling::{ema, mask_warmup, rolling_mean, span_alpha};
use super::{require_window, Confirmation, Indicator, IndicatorError, IndicatorSeries};
use crate::domain::BarTable;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Result<Self, IndicatorError> {
        require_window("MACD", "fast", fast)?;
        require_window("MACD", "slow", slow)?;
        require_window("MACD", "signal", signal)?;
        Ok(Self { fast, slow, signal })
    }
}

impl Indicator for Macd {
    fn name(&self) -> String {
        format!("MACD({},{},{})", self.fast, self.slow, self.signal)
    }

    fn lookback(&self) -> usize {
        self.slow - 1
    }

    fn compute(&self, table: &BarTable) -> IndicatorSeries {
        let closes = table.closes();
        let fast = ema(&closes, span_alpha(self.fast));
        let slow = ema(&closes, span_alpha(self.slow));

        // The signal line and the mean run over the unmasked recurrence.
        let raw: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let mut signal = ema(&raw, span_alpha(self.signal));
        let mean = rolling_mean(&raw, self.slow);

        let mut line = raw;
        mask_warmup(&mut line, self.lookback());
        mask_warmup(&mut signal, self.lookback());
        let histogram: Vec<f64> = line.iter().zip(&signal).map(|(m, s)| m - s).collect();

        let buy = (0..line.len())
            .map(|i| line[i] > signal[i] && line[i] > mean[i])
            .collect();
        let sell = (0..line.len())
            .map(|i| line[i] < signal[i] && line[i] < mean[i])
            .collect();

        IndicatorSeries::new(self.name(), table)
            .with_column("macd", line)
            .with_column("signal", signal)
            .with_column("histogram", histogram)
            .with_column("macd_mean", mean)
            .with_confirmation(Confirmation::Buy, buy)
            .with_confirmation(Confirmation::Sell, sell)
    }
}

pub fn macd(
    table: &BarTable,
    fast: usize,
    slow: usize,
    signal: usize,
) -> Result<IndicatorSeries, IndicatorError> {
    Ok(Macd::new(fast, slow, signal)?.compute(table))
}
