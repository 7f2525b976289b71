//! Parabolic SAR with trend, volume and momentum filters.
//!
//! Inherently sequential: carries SAR, extreme price (EP), acceleration
//! factor (AF) and trend direction from bar to bar. Seed at bar 0:
//! SAR = low, EP = high, AF = step, trend long.
//!
//! Each step projects SAR toward EP by AF and clamps it below the prior two
//! lows (long) or above the prior two highs (short). A close beyond the
//! projection flips the trend: SAR jumps to the previous EP, EP resets to
//! the current low/high and AF to `step`. Otherwise a new extreme moves EP
//! and raises AF by `step` up to `max_step`.
//!
//! Filters: 20-bar close SMA, volume up more than 20% on the prior bar, and
//! a simple-average RSI(14).
//! Buy: long, close > SAR, close > SMA, volume spike, RSI < 70.
//! Sell: short, close < SAR, RSI > 30, RSI rising.

use super::rolling::{diff, pct_change, rolling_mean};
use super::{Confirmation, Indicator, IndicatorError, IndicatorSeries};
use crate::domain::{Bar, BarTable};

const MA_PERIOD: usize = 20;
const RSI_PERIOD: usize = 14;
const VOLUME_SPIKE: f64 = 0.2;
const RSI_OVERSOLD: f64 = 30.0;
const RSI_OVERBOUGHT: f64 = 70.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ParabolicSar {
    step: f64,
    max_step: f64,
}

impl ParabolicSar {
    pub fn new(step: f64, max_step: f64) -> Result<Self, IndicatorError> {
        if !(step.is_finite() && step > 0.0) {
            return Err(IndicatorError::invalid(
                "ParabolicSAR",
                "step",
                format!("must be finite and > 0, got {step}"),
            ));
        }
        if !(max_step.is_finite() && max_step >= step) {
            return Err(IndicatorError::invalid(
                "ParabolicSAR",
                "max_step",
                format!("must be finite and >= step ({step}), got {max_step}"),
            ));
        }
        Ok(Self { step, max_step })
    }
}

/// SAR state after processing one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SarPoint {
    /// SAR value reported for the bar.
    pub sar: f64,
    /// Clamped projection the close was tested against; equals `sar` at bar 0.
    pub projected: f64,
    pub extreme: f64,
    pub af: f64,
    pub long: bool,
}

/// Run the SAR recurrence over `bars`.
pub fn sar_path(bars: &[Bar], step: f64, max_step: f64) -> Vec<SarPoint> {
    let mut path: Vec<SarPoint> = Vec::with_capacity(bars.len());
    let Some(first) = bars.first() else {
        return path;
    };
    path.push(SarPoint {
        sar: first.low,
        projected: first.low,
        extreme: first.high,
        af: step,
        long: true,
    });

    for i in 1..bars.len() {
        let prev = path[i - 1];
        let bar = &bars[i];
        let prior = &bars[i.saturating_sub(2)..i];

        let mut projected = prev.sar + prev.af * (prev.extreme - prev.sar);
        if prev.long {
            projected = prior.iter().fold(projected, |s, b| s.min(b.low));
        } else {
            projected = prior.iter().fold(projected, |s, b| s.max(b.high));
        }

        let mut next = SarPoint {
            sar: projected,
            projected,
            ..prev
        };
        if prev.long && bar.close < projected {
            next.long = false;
            next.sar = prev.extreme;
            next.extreme = bar.low;
            next.af = step;
        } else if !prev.long && bar.close > projected {
            next.long = true;
            next.sar = prev.extreme;
            next.extreme = bar.high;
            next.af = step;
        } else if prev.long && bar.high > prev.extreme {
            next.extreme = bar.high;
            next.af = (prev.af + step).min(max_step);
        } else if !prev.long && bar.low < prev.extreme {
            next.extreme = bar.low;
            next.af = (prev.af + step).min(max_step);
        }
        path.push(next);
    }
    path
}

/// RSI from plain rolling means of gains and losses.
fn simple_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let delta = diff(closes);
    let gains: Vec<f64> = delta.iter().map(|&d| if d > 0.0 { d } else { 0.0 }).collect();
    let losses: Vec<f64> = delta.iter().map(|&d| if d < 0.0 { -d } else { 0.0 }).collect();
    rolling_mean(&gains, period)
        .iter()
        .zip(rolling_mean(&losses, period))
        .map(|(g, l)| 100.0 - 100.0 / (1.0 + g / l))
        .collect()
}

impl Indicator for ParabolicSar {
    fn name(&self) -> String {
        format!("ParabolicSAR({},{})", self.step, self.max_step)
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, table: &BarTable) -> IndicatorSeries {
        let path = sar_path(table.bars(), self.step, self.max_step);
        let closes = table.closes();
        let ma = rolling_mean(&closes, MA_PERIOD);
        let rsi = simple_rsi(&closes, RSI_PERIOD);
        let volume_change = pct_change(&table.volumes());

        let n = closes.len();
        let buy = (0..n)
            .map(|i| {
                let p = &path[i];
                i > 0
                    && p.long
                    && closes[i] > p.sar
                    && closes[i] > ma[i]
                    && volume_change[i] > VOLUME_SPIKE
                    && rsi[i] < RSI_OVERBOUGHT
            })
            .collect();
        let sell = (0..n)
            .map(|i| {
                let p = &path[i];
                i > 0
                    && !p.long
                    && closes[i] < p.sar
                    && rsi[i] > RSI_OVERSOLD
                    && rsi[i] > rsi[i - 1]
            })
            .collect();

        IndicatorSeries::new(self.name(), table)
            .with_column("sar", path.iter().map(|p| p.sar).collect())
            .with_column(
                "trend",
                path.iter().map(|p| if p.long { 1.0 } else { -1.0 }).collect(),
            )
            .with_column("extreme", path.iter().map(|p| p.extreme).collect())
            .with_column("af", path.iter().map(|p| p.af).collect())
            .with_column("ma", ma)
            .with_column("rsi", rsi)
            .with_confirmation(Confirmation::Buy, buy)
            .with_confirmation(Confirmation::Sell, sell)
    }
}

pub fn parabolic_sar(
    table: &BarTable,
    step: f64,
    max_step: f64,
) -> Result<IndicatorSeries, IndicatorError> {
    Ok(ParabolicSar::new(step, max_step)?.compute(table))
}
