//! Account — running balance, position and trade log of one simulation.

use chrono::{DateTime, Datelike, Utc};

use super::position::Position;
use super::trade::TradeRecord;

/// Mutable simulation state. Only the simulator loop touches it, once per bar.
#[derive(Debug, Clone)]
pub struct Account {
    pub balance: f64,
    pub position: Position,
    /// (year, month) of the last bar seen, for scheduled cash injection.
    pub last_month: (i32, u32),
    pub trades: Vec<TradeRecord>,
    /// Realized P&L of each completed round trip, in order.
    pub realized: Vec<f64>,
    pub total_injected: f64,
    pub injection_count: usize,
}

impl Account {
    pub fn new(initial_balance: f64, first_timestamp: DateTime<Utc>) -> Self {
        Self {
            balance: initial_balance,
            position: Position::Flat,
            last_month: month_key(first_timestamp),
            trades: Vec::new(),
            realized: Vec::new(),
            total_injected: 0.0,
            injection_count: 0,
        }
    }

    /// Credit `amount` if `timestamp` falls in a different calendar month than
    /// the last bar seen. Returns whether an injection happened.
    pub fn roll_month(&mut self, timestamp: DateTime<Utc>, amount: f64) -> bool {
        let month = month_key(timestamp);
        if month == self.last_month {
            return false;
        }
        self.last_month = month;
        self.balance += amount;
        self.total_injected += amount;
        self.injection_count += 1;
        true
    }

    /// Spend `fraction` of the balance on a long position at `price`.
    ///
    /// Caller guarantees the account is flat and `price > 0`.
    pub fn open_long(
        &mut self,
        bar_index: usize,
        timestamp: DateTime<Utc>,
        price: f64,
        fraction: f64,
    ) -> &TradeRecord {
        let trade_value = self.balance * fraction;
        let quantity = trade_value / price;
        self.balance -= trade_value;
        self.position = Position::Long {
            entry_price: price,
            quantity,
            entry_index: bar_index,
            entry_timestamp: timestamp,
        };
        self.trades
            .push(TradeRecord::buy(bar_index, timestamp, price, quantity));
        &self.trades[self.trades.len() - 1]
    }

    /// Sell the whole open position at `price`. Returns `None` when flat.
    pub fn close_long(
        &mut self,
        bar_index: usize,
        timestamp: DateTime<Utc>,
        price: f64,
    ) -> Option<&TradeRecord> {
        let Position::Long {
            entry_price,
            quantity,
            ..
        } = self.position
        else {
            return None;
        };
        let profit = (price - entry_price) * quantity;
        self.balance += quantity * price;
        self.position = Position::Flat;
        self.realized.push(profit);
        self.trades.push(TradeRecord::sell(
            bar_index, timestamp, price, quantity, profit,
        ));
        self.trades.last()
    }
}

fn month_key(timestamp: DateTime<Utc>) -> (i32, u32) {
    (timestamp.year(), timestamp.month())
}
