//! Backtest engine — parameter sets, the aggregated signal set and the
//! bar-by-bar position state machine.
//!
//! Indicators are computed once per (table, parameters) pair into a
//! `SignalSet`; the simulator then only reads confirmation flags.

pub mod params;
pub mod signals;
pub mod simulator;

pub use params::ParameterSet;
pub use signals::{SignalSet, OBV_WINDOW, SAR_WINDOW};
pub use simulator::{simulate, BacktestResult, BacktestSummary, SimulationConfig, SimulationError};

use crate::domain::BarTable;
use crate::indicators::IndicatorError;
use thiserror::Error;

/// Failure of the compute-then-simulate pipeline for one table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    #[error(transparent)]
    Indicator(#[from] IndicatorError),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

/// Compute every indicator for `params` and simulate.
pub fn run_backtest(
    table: &BarTable,
    params: &ParameterSet,
    config: &SimulationConfig,
) -> Result<BacktestResult, BacktestError> {
    let signals = SignalSet::compute(table, params)?;
    Ok(simulate(table, &signals, config)?)
}
