//! Backtest simulator — the confirmation aggregator's position state machine.
//!
//! Walks the table once, from the second bar, in timeline order. Per bar:
//! 1. Monthly injection: a new calendar month credits the configured amount.
//! 2. Flat: every entry confirmation holds -> buy `trade_size` of the balance.
//! 3. Long: Ichimoku sell -> sell the whole position.
//!
//! Undefined indicator values are never errors; they just never confirm.
//! An open position at the end is reported but not folded into the balance.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::signals::SignalSet;
use crate::domain::{Account, BarTable, Position, TradeRecord};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("invalid simulation config: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("indicator '{indicator}' has {actual} rows, table has {expected}")]
    Misaligned {
        indicator: String,
        expected: usize,
        actual: usize,
    },
}

/// Account parameters for one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub initial_balance: f64,
    /// Fraction of the balance spent per entry, in (0, 1].
    pub trade_size: f64,
    /// Credited on the first bar of every new calendar month.
    pub monthly_injection: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_balance: 10_000.0,
            trade_size: 1.0,
            monthly_injection: 500.0,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !(self.initial_balance.is_finite() && self.initial_balance >= 0.0) {
            return Err(SimulationError::InvalidConfig {
                field: "initial_balance",
                reason: format!("must be finite and >= 0, got {}", self.initial_balance),
            });
        }
        if !(self.trade_size > 0.0 && self.trade_size <= 1.0) {
            return Err(SimulationError::InvalidConfig {
                field: "trade_size",
                reason: format!("must be in (0, 1], got {}", self.trade_size),
            });
        }
        if !(self.monthly_injection.is_finite() && self.monthly_injection >= 0.0) {
            return Err(SimulationError::InvalidConfig {
                field: "monthly_injection",
                reason: format!("must be finite and >= 0, got {}", self.monthly_injection),
            });
        }
        Ok(())
    }
}

/// Outcome of one simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub final_balance: f64,
    pub total_profit: f64,
    /// Completed round trips.
    pub trade_count: usize,
    pub win_count: usize,
    pub losing_count: usize,
    /// 0 when there were no round trips.
    pub win_percentage: f64,
    pub trades: Vec<TradeRecord>,
    /// Realized P&L per round trip.
    pub profits: Vec<f64>,
    pub total_injected: f64,
    pub injection_count: usize,
    /// Position still open after the last bar, unrealized.
    pub open_position: Position,
}

impl BacktestResult {
    fn from_account(symbol: &str, account: Account) -> Self {
        let trade_count = account.realized.len();
        let win_count = account.realized.iter().filter(|&&p| p > 0.0).count();
        let win_percentage = if trade_count > 0 {
            win_count as f64 / trade_count as f64 * 100.0
        } else {
            0.0
        };
        Self {
            symbol: symbol.to_string(),
            final_balance: account.balance,
            total_profit: account.realized.iter().sum(),
            trade_count,
            win_count,
            losing_count: trade_count - win_count,
            win_percentage,
            trades: account.trades,
            profits: account.realized,
            total_injected: account.total_injected,
            injection_count: account.injection_count,
            open_position: account.position,
        }
    }

    pub fn summary(&self) -> BacktestSummary {
        BacktestSummary {
            symbol: self.symbol.clone(),
            final_balance: self.final_balance,
            total_profit: self.total_profit,
            trade_count: self.trade_count,
            win_count: self.win_count,
            losing_count: self.losing_count,
            win_percentage: self.win_percentage,
        }
    }
}

/// Plain-text reporting view of a `BacktestResult`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestSummary {
    pub symbol: String,
    pub final_balance: f64,
    pub total_profit: f64,
    pub trade_count: usize,
    pub win_count: usize,
    pub losing_count: usize,
    pub win_percentage: f64,
}

impl fmt::Display for BacktestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Symbol:         {}", self.symbol)?;
        writeln!(f, "Total Gain:     {:.2}", self.total_profit)?;
        writeln!(f, "Final Balance:  {:.2}", self.final_balance)?;
        writeln!(f, "Total Trades:   {}", self.trade_count)?;
        writeln!(f, "Winning Trades: {}", self.win_count)?;
        writeln!(f, "Losing Trades:  {}", self.losing_count)?;
        write!(f, "Win Percentage: {:.2}%", self.win_percentage)
    }
}

/// Run the state machine over `table` with precomputed `signals`.
pub fn simulate(
    table: &BarTable,
    signals: &SignalSet,
    config: &SimulationConfig,
) -> Result<BacktestResult, SimulationError> {
    config.validate()?;
    signals.check_alignment(table.len())?;

    let bars = table.bars();
    let first = bars.first().map(|b| b.timestamp).unwrap_or_default();
    let mut account = Account::new(config.initial_balance, first);

    for i in 1..bars.len() {
        let bar = &bars[i];

        if account.roll_month(bar.timestamp, config.monthly_injection) {
            debug!(
                "Monthly addition: {} added on {}. New balance: {:.2}",
                config.monthly_injection, bar.timestamp, account.balance
            );
        }

        match account.position {
            Position::Flat => {
                if !signals.entry_confirmed(i) {
                    continue;
                }
                if bar.close <= 0.0 {
                    debug!("Skipping entry at {}: close {} is not positive", bar.timestamp, bar.close);
                    continue;
                }
                let buy = account.open_long(i, bar.timestamp, bar.close, config.trade_size);
                debug!(
                    "Buy order: {}, price: {}, quantity: {} {}",
                    buy.timestamp,
                    buy.price,
                    buy.quantity,
                    table.symbol()
                );
            }
            Position::Long { .. } => {
                if !signals.exit_confirmed(i) {
                    continue;
                }
                if let Some(sell) = account.close_long(i, bar.timestamp, bar.close) {
                    debug!(
                        "Sell order: {}, price: {}, gain/loss: {:.2}",
                        sell.timestamp,
                        sell.price,
                        sell.profit.unwrap_or_default()
                    );
                }
            }
        }
    }

    Ok(BacktestResult::from_account(table.symbol(), account))
}
