//! Log-price trend: short vs long rolling mean of ln(close).
//!
//! Buy: short above long. Sell: short below long.

use super::rolling::rolling_mean;
use super::{require_window, Confirmation, Indicator, IndicatorError, IndicatorSeries};
use crate::domain::BarTable;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmaTrend {
    short: usize,
    long: usize,
}

impl EmaTrend {
    pub fn new(short: usize, long: usize) -> Result<Self, IndicatorError> {
        require_window("EmaTrend", "short", short)?;
        require_window("EmaTrend", "long", long)?;
        Ok(Self { short, long })
    }
}

impl Indicator for EmaTrend {
    fn name(&self) -> String {
        format!("EmaTrend({},{})", self.short, self.long)
    }

    fn lookback(&self) -> usize {
        self.short.max(self.long) - 1
    }

    fn compute(&self, table: &BarTable) -> IndicatorSeries {
        let log_close: Vec<f64> = table.closes().iter().map(|c| c.ln()).collect();
        let short = rolling_mean(&log_close, self.short);
        let long = rolling_mean(&log_close, self.long);

        let buy = short.iter().zip(&long).map(|(s, l)| s > l).collect();
        let sell = short.iter().zip(&long).map(|(s, l)| s < l).collect();

        IndicatorSeries::new(self.name(), table)
            .with_column("short", short)
            .with_column("long", long)
            .with_confirmation(Confirmation::Buy, buy)
            .with_confirmation(Confirmation::Sell, sell)
    }
}

pub fn ema_trend(
    table: &BarTable,
    short: usize,
    long: usize,
) -> Result<IndicatorSeries, IndicatorError> {
    Ok(EmaTrend::new(short, long)?.compute(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_table};

    #[test]
    fn log_means() {
        let e = std::f64::consts::E;
        let table = make_table(&[1.0, e, e * e]);
        let s = ema_trend(&table, 1, 3).unwrap();
        assert_approx(s.value("short", 2).unwrap(), 2.0, 1e-12);
        assert_approx(s.value("long", 2).unwrap(), 1.0, 1e-12);
        assert!(s.confirmed(Confirmation::Buy, 2));
        assert!(!s.confirmed(Confirmation::Buy, 1));
    }

    #[test]
    fn downtrend_sells() {
        let table = make_table(&[40.0, 30.0, 20.0, 10.0]);
        let s = ema_trend(&table, 2, 4).unwrap();
        assert!(s.confirmed(Confirmation::Sell, 3));
        assert!(!s.confirmed(Confirmation::Sell, 2));
    }
}
