//! Ichimoku Cloud.
//!
//! tenkan / kijun: rolling high-low midpoints over the short / medium window.
//! senkou_a: midpoint(tenkan, kijun) projected forward by `medium` bars.
//! senkou_b: long-window high-low midpoint projected forward by `medium` bars.
//! chikou: close `medium` bars LATER, aligned to the current bar.
//!
//! Buy: close above both spans, tenkan above kijun, close above kijun, and
//! chikou above the close `medium` bars earlier. Sell mirrors every test.
//!
//! Look-ahead: chikou reads a future close, so a confirmation at bar t uses
//! bar t + medium. This is kept as is; the last `medium` bars never confirm.

use super::rolling::{rolling_max, rolling_min, shift};
use super::{require_window, Confirmation, Indicator, IndicatorError, IndicatorSeries};
use crate::domain::BarTable;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ichimoku {
    short: usize,
    medium: usize,
    long: usize,
}

impl Ichimoku {
    pub fn new(short: usize, medium: usize, long: usize) -> Result<Self, IndicatorError> {
        require_window("Ichimoku", "short", short)?;
        require_window("Ichimoku", "medium", medium)?;
        require_window("Ichimoku", "long", long)?;
        Ok(Self {
            short,
            medium,
            long,
        })
    }
}

fn midpoint(highs: &[f64], lows: &[f64], window: usize) -> Vec<f64> {
    rolling_max(highs, window)
        .iter()
        .zip(rolling_min(lows, window))
        .map(|(h, l)| (h + l) / 2.0)
        .collect()
}

impl Indicator for Ichimoku {
    fn name(&self) -> String {
        format!("Ichimoku({},{},{})", self.short, self.medium, self.long)
    }

    fn lookback(&self) -> usize {
        self.short.max(self.medium).max(self.long) - 1 + self.medium
    }

    fn compute(&self, table: &BarTable) -> IndicatorSeries {
        let highs = table.highs();
        let lows = table.lows();
        let closes = table.closes();
        let medium = self.medium as isize;

        let tenkan = midpoint(&highs, &lows, self.short);
        let kijun = midpoint(&highs, &lows, self.medium);
        let center: Vec<f64> = tenkan.iter().zip(&kijun).map(|(t, k)| (t + k) / 2.0).collect();
        let senkou_a = shift(&center, medium);
        let senkou_b = shift(&midpoint(&highs, &lows, self.long), medium);
        let chikou = shift(&closes, -medium);
        let past_close = shift(&closes, medium);

        let n = closes.len();
        let buy = (0..n)
            .map(|i| {
                let c = closes[i];
                c > senkou_a[i]
                    && c > senkou_b[i]
                    && tenkan[i] > kijun[i]
                    && c > kijun[i]
                    && chikou[i] > past_close[i]
            })
            .collect();
        let sell = (0..n)
            .map(|i| {
                let c = closes[i];
                c < senkou_a[i]
                    && c < senkou_b[i]
                    && tenkan[i] < kijun[i]
                    && c < kijun[i]
                    && chikou[i] < past_close[i]
            })
            .collect();

        IndicatorSeries::new(self.name(), table)
            .with_column("tenkan", tenkan)
            .with_column("kijun", kijun)
            .with_column("senkou_a", senkou_a)
            .with_column("senkou_b", senkou_b)
            .with_column("chikou", chikou)
            .with_confirmation(Confirmation::Buy, buy)
            .with_confirmation(Confirmation::Sell, sell)
    }
}

pub fn ichimoku(
    table: &BarTable,
    short: usize,
    medium: usize,
    long: usize,
) -> Result<IndicatorSeries, IndicatorError> {
    Ok(Ichimoku::new(short, medium, long)?.compute(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_table, DEFAULT_EPSILON};

    fn rising(n: usize) -> Vec<f64> {
        (1..=n).map(|c| c as f64).collect()
    }

    #[test]
    fn components_on_rising_series() {
        // close c_i = i + 1, high = c + 1, low = previous close - 1
        let table = make_table(&rising(10));
        let s = ichimoku(&table, 1, 2, 3).unwrap();

        assert_approx(s.value("tenkan", 6).unwrap(), 6.5, DEFAULT_EPSILON);
        assert_approx(s.value("kijun", 6).unwrap(), 6.0, DEFAULT_EPSILON);
        assert_approx(s.value("senkou_a", 6).unwrap(), 4.25, DEFAULT_EPSILON);
        assert_approx(s.value("senkou_b", 6).unwrap(), 3.5, DEFAULT_EPSILON);
        assert_approx(s.value("chikou", 6).unwrap(), 9.0, DEFAULT_EPSILON);
        assert_eq!(s.value("chikou", 8), None);
    }

    #[test]
    fn rising_series_buys_between_warmup_and_chikou_horizon() {
        let table = make_table(&rising(10));
        let s = ichimoku(&table, 1, 2, 3).unwrap();
        let buys: Vec<usize> = (0..10).filter(|&i| s.confirmed(Confirmation::Buy, i)).collect();
        // senkou_b defined from bar 4, chikou undefined for the last 2 bars
        assert_eq!(buys, vec![4, 5, 6, 7]);
        assert!((0..10).all(|i| !s.confirmed(Confirmation::Sell, i)));
    }

    #[test]
    fn falling_series_sells() {
        let closes: Vec<f64> = (0..10).map(|i| 20.0 - i as f64).collect();
        let table = make_table(&closes);
        let s = ichimoku(&table, 1, 2, 3).unwrap();
        let sells: Vec<usize> = (0..10).filter(|&i| s.confirmed(Confirmation::Sell, i)).collect();
        assert_eq!(sells, vec![4, 5, 6, 7]);
    }

    #[test]
    fn chikou_reads_future_close() {
        // The confirmation at bar 7 disappears once the bars after it are cut.
        let full = make_table(&rising(10));
        let cut = BarTable::new("TEST", full.bars()[..8].to_vec()).unwrap();
        let on_full = ichimoku(&full, 1, 2, 3).unwrap();
        let on_cut = ichimoku(&cut, 1, 2, 3).unwrap();
        assert!(on_full.confirmed(Confirmation::Buy, 7));
        assert!(!on_cut.confirmed(Confirmation::Buy, 7));
    }

    #[test]
    fn lookback_covers_kijun_when_medium_is_longest() {
        // kijun(5) is defined from bar 4, so senkou_a only from bar 9.
        let table = make_table(&rising(20));
        let ind = Ichimoku::new(1, 5, 3).unwrap();
        assert_eq!(ind.lookback(), 9);
        let s = ind.compute(&table);
        assert_eq!(s.value("senkou_a", 8), None);
        assert!(s.value("senkou_a", 9).is_some());
        assert!(s.value("senkou_b", 9).is_some());
    }

    #[test]
    fn output_is_aligned() {
        let table = make_table(&rising(5));
        let s = ichimoku(&table, 9, 26, 52).unwrap();
        assert_eq!(s.len(), 5);
        assert!(s.column("senkou_b").unwrap().iter().all(|v| v.is_nan()));
    }
}
