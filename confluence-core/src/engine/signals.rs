//! SignalSet — the five indicator series the confirmation aggregator reads.

use serde::Serialize;

use super::params::ParameterSet;
use super::simulator::SimulationError;
use crate::domain::BarTable;
use crate::indicators::{Confirmation, Indicator, IndicatorError, IndicatorSeries, Obv};

/// Bars back from the current one at which an OBV buy still counts.
///
/// The repeated 2 reproduces the live bot's rule; it reads like a typo for
/// [0, 1, 2, 3] and is kept pending review.
pub const OBV_WINDOW: [usize; 4] = [0, 1, 2, 2];

/// Bars back from the current one at which a SAR buy still counts.
pub const SAR_WINDOW: [usize; 3] = [0, 1, 2];

#[derive(Debug, Clone, Serialize)]
pub struct SignalSet {
    pub ichimoku: IndicatorSeries,
    pub obv: IndicatorSeries,
    pub sar: IndicatorSeries,
    pub rsi: IndicatorSeries,
    pub macd: IndicatorSeries,
}

impl SignalSet {
    /// Compute every series for `table` under `params`.
    pub fn compute(table: &BarTable, params: &ParameterSet) -> Result<Self, IndicatorError> {
        Ok(Self {
            ichimoku: params.ichimoku()?.compute(table),
            obv: Obv.compute(table),
            sar: params.parabolic_sar()?.compute(table),
            rsi: params.rsi()?.compute(table),
            macd: params.macd()?.compute(table),
        })
    }

    fn iter(&self) -> impl Iterator<Item = &IndicatorSeries> {
        [&self.ichimoku, &self.obv, &self.sar, &self.rsi, &self.macd].into_iter()
    }

    /// Every series must have exactly `len` rows.
    pub fn check_alignment(&self, len: usize) -> Result<(), SimulationError> {
        match self.iter().find(|s| s.len() != len) {
            Some(series) => Err(SimulationError::Misaligned {
                indicator: series.name().to_string(),
                expected: len,
                actual: series.len(),
            }),
            None => Ok(()),
        }
    }

    /// Flat -> Long condition at bar `i`.
    pub fn entry_confirmed(&self, i: usize) -> bool {
        self.ichimoku.confirmed(Confirmation::Buy, i)
            && self.obv.confirmed_within(Confirmation::Buy, i, &OBV_WINDOW)
            && self.sar.confirmed_within(Confirmation::Buy, i, &SAR_WINDOW)
            && self.rsi.confirmed(Confirmation::Buy, i)
            && self.macd.confirmed(Confirmation::Buy, i)
    }

    /// Long -> Flat condition at bar `i`: Ichimoku alone decides.
    pub fn exit_confirmed(&self, i: usize) -> bool {
        self.ichimoku.confirmed(Confirmation::Sell, i)
    }
}
