//! Candidate evaluation — one `ParameterSet` against every configured symbol.

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use confluence_core::data::{BarCache, BarSource, HistoryKey};
use confluence_core::engine::{simulate, BacktestResult, ParameterSet, SignalSet, SimulationConfig, SimulationError};
use confluence_core::indicators::IndicatorError;

/// Failure of a whole candidate. Per-symbol data problems are not errors;
/// they are skipped and scored neutral inside `Evaluation`.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("invalid parameters [{params}]: {source}")]
    Parameters {
        params: ParameterSet,
        #[source]
        source: IndicatorError,
    },

    #[error("{symbol}: {source}")]
    Simulation {
        symbol: String,
        #[source]
        source: SimulationError,
    },
}

/// What happened to one symbol under one candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SymbolOutcome {
    Evaluated(BacktestResult),
    Skipped { symbol: String, reason: String },
}

impl SymbolOutcome {
    pub fn symbol(&self) -> &str {
        match self {
            SymbolOutcome::Evaluated(result) => &result.symbol,
            SymbolOutcome::Skipped { symbol, .. } => symbol,
        }
    }

    /// Contribution to the candidate's fitness.
    pub fn final_balance(&self, initial_balance: f64) -> f64 {
        match self {
            SymbolOutcome::Evaluated(result) => result.final_balance,
            SymbolOutcome::Skipped { .. } => initial_balance,
        }
    }
}

/// Full evaluation of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    /// Sum of final balances; skipped symbols count as the starting balance.
    pub fitness: f64,
    pub outcomes: Vec<SymbolOutcome>,
    pub skipped: usize,
}

/// Run `params` over every key, reading bars through `cache`.
pub fn evaluate<S: BarSource + ?Sized>(
    params: &ParameterSet,
    keys: &[HistoryKey],
    simulation: &SimulationConfig,
    cache: &mut BarCache<'_, S>,
) -> Result<Evaluation, EvaluationError> {
    params
        .validate()
        .map_err(|source| EvaluationError::Parameters {
            params: *params,
            source,
        })?;

    let mut outcomes = Vec::with_capacity(keys.len());
    for key in keys {
        let table = match cache.get(key) {
            Ok(table) if !table.is_empty() => table,
            Ok(_) => {
                warn!(symbol = %key.symbol, "skipping symbol: no bars");
                outcomes.push(SymbolOutcome::Skipped {
                    symbol: key.symbol.clone(),
                    reason: "no bars".to_string(),
                });
                continue;
            }
            Err(e) => {
                warn!(symbol = %key.symbol, error = %e, "skipping symbol: data unavailable");
                outcomes.push(SymbolOutcome::Skipped {
                    symbol: key.symbol.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let signals =
            SignalSet::compute(table, params).map_err(|source| EvaluationError::Parameters {
                params: *params,
                source,
            })?;
        let result =
            simulate(table, &signals, simulation).map_err(|source| EvaluationError::Simulation {
                symbol: key.symbol.clone(),
                source,
            })?;
        outcomes.push(SymbolOutcome::Evaluated(result));
    }

    let fitness = outcomes
        .iter()
        .map(|o| o.final_balance(simulation.initial_balance))
        .sum();
    let skipped = outcomes
        .iter()
        .filter(|o| matches!(o, SymbolOutcome::Skipped { .. }))
        .count();
    Ok(Evaluation {
        fitness,
        outcomes,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use confluence_core::data::{Interval, Lookback, SyntheticSource};
    use confluence_core::domain::BarTable;
    use confluence_core::data::DataError;

    /// Synthetic bars for every symbol except "MISSING".
    struct Partial(SyntheticSource);

    impl BarSource for Partial {
        fn name(&self) -> &str {
            "partial"
        }

        fn fetch(&self, key: &HistoryKey) -> Result<BarTable, DataError> {
            if key.symbol == "MISSING" {
                return Err(DataError::Empty {
                    symbol: key.symbol.clone(),
                });
            }
            self.0.fetch(key)
        }
    }

    fn keys(symbols: &[&str]) -> Vec<HistoryKey> {
        symbols
            .iter()
            .map(|s| HistoryKey::new(*s, Lookback::Days(30), Interval::Hour1))
            .collect()
    }

    #[test]
    fn missing_symbol_scores_starting_balance() {
        let source = Partial(SyntheticSource::new(9));
        let mut cache = BarCache::new(&source);
        let sim = SimulationConfig::default();
        let eval = evaluate(
            &ParameterSet::default(),
            &keys(&["BTC-USD", "MISSING"]),
            &sim,
            &mut cache,
        )
        .unwrap();

        assert_eq!(eval.skipped, 1);
        assert_eq!(eval.outcomes[1].symbol(), "MISSING");
        let btc = match &eval.outcomes[0] {
            SymbolOutcome::Evaluated(result) => result.final_balance,
            other => panic!("expected evaluation, got {other:?}"),
        };
        assert!((eval.fitness - (btc + sim.initial_balance)).abs() < 1e-9);
    }

    #[test]
    fn invalid_parameters_fail_the_candidate() {
        let source = SyntheticSource::new(1);
        let mut cache = BarCache::new(&source);
        let params = ParameterSet {
            rsi_period: 0,
            ..ParameterSet::default()
        };
        let err = evaluate(&params, &keys(&["BTC-USD"]), &SimulationConfig::default(), &mut cache)
            .unwrap_err();
        assert!(matches!(err, EvaluationError::Parameters { .. }));
        // Rejected before any fetch.
        assert_eq!(cache.fetches(), 0);
    }

    #[test]
    fn repeated_candidates_reuse_the_cache() {
        let source = SyntheticSource::new(2);
        let mut cache = BarCache::new(&source);
        let sim = SimulationConfig::default();
        let k = keys(&["A", "B"]);
        let first = evaluate(&ParameterSet::default(), &k, &sim, &mut cache).unwrap();
        let second = evaluate(&ParameterSet::default(), &k, &sim, &mut cache).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.fetches(), 2);
    }
}
