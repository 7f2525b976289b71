//! ParameterSet — one assignment of every tunable indicator parameter.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::indicators::{Ichimoku, IndicatorError, Macd, ParabolicSar, Rsi};

/// Indicator parameters driving one simulation.
///
/// Field order is the sweep's axis order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub ichimoku_short: usize,
    pub ichimoku_medium: usize,
    pub ichimoku_long: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub sar_step: f64,
    pub sar_max_step: f64,
}

impl ParameterSet {
    /// Build and validate. Each group is checked by its indicator's constructor.
    pub fn new(
        ichimoku: (usize, usize, usize),
        rsi_period: usize,
        macd: (usize, usize, usize),
        sar: (f64, f64),
    ) -> Result<Self, IndicatorError> {
        let params = Self {
            ichimoku_short: ichimoku.0,
            ichimoku_medium: ichimoku.1,
            ichimoku_long: ichimoku.2,
            rsi_period,
            macd_fast: macd.0,
            macd_slow: macd.1,
            macd_signal: macd.2,
            sar_step: sar.0,
            sar_max_step: sar.1,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), IndicatorError> {
        self.ichimoku()?;
        self.rsi()?;
        self.macd()?;
        self.parabolic_sar()?;
        Ok(())
    }

    pub fn ichimoku(&self) -> Result<Ichimoku, IndicatorError> {
        Ichimoku::new(self.ichimoku_short, self.ichimoku_medium, self.ichimoku_long)
    }

    pub fn rsi(&self) -> Result<Rsi, IndicatorError> {
        Rsi::new(self.rsi_period)
    }

    pub fn macd(&self) -> Result<Macd, IndicatorError> {
        Macd::new(self.macd_fast, self.macd_slow, self.macd_signal)
    }

    pub fn parabolic_sar(&self) -> Result<ParabolicSar, IndicatorError> {
        ParabolicSar::new(self.sar_step, self.sar_max_step)
    }

    /// Short BLAKE3 digest of the canonical text form, for log correlation.
    pub fn fingerprint(&self) -> String {
        let hash = blake3::hash(self.to_string().as_bytes());
        hash.to_hex()[..16].to_string()
    }
}

/// The live bot's settings: Ichimoku 8/24/50, RSI 12, MACD 12/21/9, SAR 0.02/0.2.
impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            ichimoku_short: 8,
            ichimoku_medium: 24,
            ichimoku_long: 50,
            rsi_period: 12,
            macd_fast: 12,
            macd_slow: 21,
            macd_signal: 9,
            sar_step: 0.02,
            sar_max_step: 0.2,
        }
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ichimoku={}/{}/{} rsi={} macd={}/{}/{} sar={}/{}",
            self.ichimoku_short,
            self.ichimoku_medium,
            self.ichimoku_long,
            self.rsi_period,
            self.macd_fast,
            self.macd_slow,
            self.macd_signal,
            self.sar_step,
            self.sar_max_step
        )
    }
}
