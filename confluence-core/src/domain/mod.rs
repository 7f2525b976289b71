//! Domain types: bars, positions, trades and the simulated account.

pub mod account;
pub mod bar;
pub mod position;
pub mod trade;

pub use account::Account;
pub use bar::{Bar, BarError, BarTable};
pub use position::Position;
pub use trade::{Side, TradeRecord};

/// Symbol type alias
pub type Symbol = String;
