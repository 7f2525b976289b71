//! Confluence Core — bar tables, indicator engine, confirmation aggregator
//! and backtest simulator.
//!
//! This crate contains:
//! - Domain types (bars, positions, trade records, the account)
//! - Pure indicator functions producing aligned `IndicatorSeries`
//! - The multi-indicator confirmation rule and the long-only simulator
//! - Bar sources (CSV, Parquet, synthetic) and a read-through bar cache

pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;

pub use domain::{Bar, BarTable};
pub use engine::{run_backtest, BacktestResult, ParameterSet, SignalSet, SimulationConfig};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything a sweep worker touches is Send + Sync.
    ///
    /// The optimizer shares tables, parameters and sources across a rayon
    /// pool; a non-thread-safe field anywhere in these types breaks the
    /// build here first.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::BarTable>();
        require_sync::<domain::BarTable>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::TradeRecord>();
        require_sync::<domain::TradeRecord>();
        require_send::<domain::Account>();
        require_sync::<domain::Account>();

        // Indicator types
        require_send::<indicators::IndicatorSeries>();
        require_sync::<indicators::IndicatorSeries>();
        require_send::<indicators::Macd>();
        require_sync::<indicators::Macd>();
        require_send::<indicators::Rsi>();
        require_sync::<indicators::Rsi>();
        require_send::<indicators::Ichimoku>();
        require_sync::<indicators::Ichimoku>();
        require_send::<indicators::ParabolicSar>();
        require_sync::<indicators::ParabolicSar>();
        require_send::<indicators::IndicatorError>();
        require_sync::<indicators::IndicatorError>();

        // Engine types
        require_send::<engine::ParameterSet>();
        require_sync::<engine::ParameterSet>();
        require_send::<engine::SignalSet>();
        require_sync::<engine::SignalSet>();
        require_send::<engine::SimulationConfig>();
        require_sync::<engine::SimulationConfig>();
        require_send::<engine::BacktestResult>();
        require_sync::<engine::BacktestResult>();

        // Sources
        require_send::<data::CsvSource>();
        require_sync::<data::CsvSource>();
        require_send::<data::ParquetSource>();
        require_sync::<data::ParquetSource>();
        require_send::<data::SyntheticSource>();
        require_sync::<data::SyntheticSource>();
        require_send::<data::HistoryKey>();
        require_sync::<data::HistoryKey>();
        require_send::<data::DataError>();
        require_sync::<data::DataError>();
        require_send::<Box<dyn data::BarSource>>();
        require_sync::<Box<dyn data::BarSource>>();
    }

    /// Architecture contract: indicators see only the table.
    ///
    /// `Indicator::compute` takes `&BarTable` and nothing else, so an
    /// indicator cannot observe account or position state.
    #[test]
    fn indicator_trait_has_no_account_parameter() {
        fn _check_trait_object_builds(
            indicator: &dyn indicators::Indicator,
            table: &BarTable,
        ) -> indicators::IndicatorSeries {
            indicator.compute(table)
        }
    }

    #[test]
    fn default_pipeline_runs_end_to_end() {
        use data::BarSource;

        let key = data::HistoryKey::new("DEMO", data::Lookback::Days(60), data::Interval::Hour1);
        let table = data::SyntheticSource::new(42).fetch(&key).unwrap();
        let config = SimulationConfig::default();
        let result = run_backtest(&table, &ParameterSet::default(), &config).unwrap();

        assert_eq!(result.symbol, "DEMO");
        assert_eq!(result.trade_count, result.profits.len());
        assert!(result.final_balance >= 0.0);
        assert_eq!(result.win_count + result.losing_count, result.trade_count);
    }
}
