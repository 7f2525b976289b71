//! Position — the simulated account's holding state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Two-state holding: nothing open, or one long position.
///
/// Entry data only exists while long, so a flat account cannot carry a stale
/// entry price.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Position {
    #[default]
    Flat,
    Long {
        entry_price: f64,
        quantity: f64,
        entry_index: usize,
        entry_timestamp: DateTime<Utc>,
    },
}

impl Position {
    pub fn is_flat(&self) -> bool {
        matches!(self, Position::Flat)
    }

    pub fn is_long(&self) -> bool {
        matches!(self, Position::Long { .. })
    }

    /// Market value at `price`; zero when flat.
    pub fn market_value(&self, price: f64) -> f64 {
        match self {
            Position::Flat => 0.0,
            Position::Long { quantity, .. } => quantity * price,
        }
    }

    /// Unrealized P&L at `price`; zero when flat.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        match self {
            Position::Flat => 0.0,
            Position::Long {
                entry_price,
                quantity,
                ..
            } => (price - entry_price) * quantity,
        }
    }
}
