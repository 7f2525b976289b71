//! Relative Strength Index, exponentially smoothed.
//!
//! avg_gain / avg_loss are EMAs of the positive / negative close deltas in
//! center-of-mass form with com = period - 1 (alpha = 1 / period).
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss). Division follows IEEE rules:
//! a zero average loss saturates RSI at 100, 0/0 leaves it undefined.
//! `signal` is the 3-bar rolling mean of RSI.
//!
//! Buy: RSI > 30, rising, and above its signal.
//! Sell: RSI crosses below 70 (previous >= 70, current < 70).
//! Lookback: period - 1.

use super::rolling::{com_alpha, diff, ema, mask_warmup, rolling_mean};
use super::{require_window, Confirmation, Indicator, IndicatorError, IndicatorSeries};
use crate::domain::BarTable;

const OVERSOLD: f64 = 30.0;
const OVERBOUGHT: f64 = 70.0;
const SIGNAL_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rsi {
    period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        require_window("RSI", "period", period)?;
        Ok(Self { period })
    }
}

impl Indicator for Rsi {
    fn name(&self) -> String {
        format!("RSI({})", self.period)
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, table: &BarTable) -> IndicatorSeries {
        let delta = diff(&table.closes());
        // Bar 0 has no delta and contributes zero to both sides.
        let gains: Vec<f64> = delta.iter().map(|&d| if d > 0.0 { d } else { 0.0 }).collect();
        let losses: Vec<f64> = delta.iter().map(|&d| if d < 0.0 { -d } else { 0.0 }).collect();

        let alpha = com_alpha((self.period - 1) as f64);
        let mut avg_gain = ema(&gains, alpha);
        let mut avg_loss = ema(&losses, alpha);
        mask_warmup(&mut avg_gain, self.lookback());
        mask_warmup(&mut avg_loss, self.lookback());

        let rsi: Vec<f64> = avg_gain
            .iter()
            .zip(&avg_loss)
            .map(|(g, l)| 100.0 - 100.0 / (1.0 + g / l))
            .collect();
        let signal = rolling_mean(&rsi, SIGNAL_WINDOW);

        let buy = (0..rsi.len())
            .map(|i| i > 0 && rsi[i] > OVERSOLD && rsi[i] > rsi[i - 1] && rsi[i] > signal[i])
            .collect();
        let sell = (0..rsi.len())
            .map(|i| i > 0 && rsi[i - 1] >= OVERBOUGHT && rsi[i] < OVERBOUGHT)
            .collect();

        IndicatorSeries::new(self.name(), table)
            .with_column("rsi", rsi)
            .with_column("signal", signal)
            .with_column("avg_gain", avg_gain)
            .with_column("avg_loss", avg_loss)
            .with_confirmation(Confirmation::Buy, buy)
            .with_confirmation(Confirmation::Sell, sell)
    }
}

pub fn rsi(table: &BarTable, period: usize) -> Result<IndicatorSeries, IndicatorError> {
    Ok(Rsi::new(period)?.compute(table))
}
