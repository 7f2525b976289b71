//! TradeRecord — one executed fill in the simulated account's log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

/// A single buy or sell executed by the simulator.
///
/// `profit` is only set on sells: (sell_price - buy_price) * quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub side: Side,
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub quantity: f64,
    pub profit: Option<f64>,
}

impl TradeRecord {
    pub fn buy(bar_index: usize, timestamp: DateTime<Utc>, price: f64, quantity: f64) -> Self {
        Self {
            side: Side::Buy,
            bar_index,
            timestamp,
            price,
            quantity,
            profit: None,
        }
    }

    pub fn sell(
        bar_index: usize,
        timestamp: DateTime<Utc>,
        price: f64,
        quantity: f64,
        profit: f64,
    ) -> Self {
        Self {
            side: Side::Sell,
            bar_index,
            timestamp,
            price,
            quantity,
            profit: Some(profit),
        }
    }

    /// Notional value of the fill.
    pub fn value(&self) -> f64 {
        self.price * self.quantity
    }

    pub fn is_winner(&self) -> bool {
        self.profit.is_some_and(|p| p > 0.0)
    }
}
