//! End-to-end sweep tests: determinism, neutral scoring, tie-break,
//! cancellation and configuration from TOML.

use std::fmt::Write as _;
use std::fs;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use confluence_core::data::{
    BarSource, DataError, HistoryKey, Interval, Lookback, SyntheticSource,
};
use confluence_core::domain::BarTable;
use confluence_core::engine::{ParameterSet, SimulationConfig};
use confluence_runner::{
    GridConfig, Optimizer, ParameterGrid, RangeSpec, SweepConfig, SweepError, SymbolOutcome,
};

/// Synthetic bars, counting every fetch.
struct CountingSource {
    inner: SyntheticSource,
    calls: Arc<AtomicUsize>,
}

impl BarSource for CountingSource {
    fn name(&self) -> &str {
        "counting"
    }

    fn fetch(&self, key: &HistoryKey) -> Result<BarTable, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(key)
    }
}

/// Fails the very first fetch, then serves synthetic bars.
struct FlakySource {
    inner: SyntheticSource,
    failed_once: AtomicBool,
}

impl BarSource for FlakySource {
    fn name(&self) -> &str {
        "flaky"
    }

    fn fetch(&self, key: &HistoryKey) -> Result<BarTable, DataError> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            return Err(DataError::Empty {
                symbol: key.symbol.clone(),
            });
        }
        self.inner.fetch(key)
    }
}

fn keys(symbols: &[&str]) -> Vec<HistoryKey> {
    symbols
        .iter()
        .map(|s| HistoryKey::new(*s, Lookback::Days(30), Interval::Hour1))
        .collect()
}

/// 2 x 2 x 2 = 8 candidates around the live defaults.
fn small_grid() -> ParameterGrid {
    GridConfig {
        ichimoku_short: RangeSpec::List(vec![6, 8]),
        ichimoku_medium: RangeSpec::List(vec![24]),
        ichimoku_long: RangeSpec::List(vec![50]),
        rsi_period: RangeSpec::List(vec![10, 12]),
        macd_fast: RangeSpec::List(vec![12]),
        macd_slow: RangeSpec::List(vec![21]),
        macd_signal: RangeSpec::List(vec![9]),
        sar_step: RangeSpec::List(vec![0.02]),
        sar_max_step: RangeSpec::List(vec![0.2, 0.3]),
    }
    .build()
    .unwrap()
}

fn synthetic_optimizer(workers: usize) -> Optimizer {
    Optimizer::new(
        Box::new(SyntheticSource::new(21)),
        keys(&["BTC-USD", "ETH-USD"]),
        SimulationConfig::default(),
    )
    .with_workers(workers)
}

#[test]
fn sweep_is_deterministic_across_pool_sizes() {
    let grid = small_grid();
    let single = synthetic_optimizer(1).run(&grid).unwrap();
    let pooled = synthetic_optimizer(4).run(&grid).unwrap();
    let again = synthetic_optimizer(4).run(&grid).unwrap();

    assert_eq!(single.best, pooled.best);
    assert_eq!(single.best_index, pooled.best_index);
    assert_eq!(single.fitness, pooled.fitness);
    assert_eq!(pooled, again);
    assert_eq!(pooled.evaluated, 8);
    assert!(!pooled.cancelled);
}

#[test]
fn best_candidate_is_the_maximum() {
    let grid = small_grid();
    let sim = SimulationConfig::default();
    let result = synthetic_optimizer(2).run(&grid).unwrap();

    let source = SyntheticSource::new(21);
    let mut cache = confluence_core::data::BarCache::new(&source);
    let ks = keys(&["BTC-USD", "ETH-USD"]);
    for (k, params) in grid.iter().enumerate() {
        let fitness = confluence_runner::evaluate(&params, &ks, &sim, &mut cache)
            .unwrap()
            .fitness;
        assert!(fitness <= result.fitness, "candidate {k} beats the winner");
        if k < result.best_index {
            assert!(fitness < result.fitness, "earlier candidate {k} ties the winner");
        }
    }
    // The per-symbol results add up to the winning fitness.
    let sum: f64 = result
        .per_symbol
        .iter()
        .map(|o| o.final_balance(sim.initial_balance))
        .sum();
    assert!((sum - result.fitness).abs() < 1e-9);
}

#[test]
fn each_worker_fetches_a_symbol_once() {
    // 2 x 10 x 2 = 40 candidates over one symbol.
    let grid = GridConfig {
        ichimoku_short: RangeSpec::List(vec![6, 8]),
        ichimoku_medium: RangeSpec::List(vec![24]),
        ichimoku_long: RangeSpec::List(vec![50]),
        rsi_period: RangeSpec::Range {
            start: 5,
            end: 15,
            step: 1,
        },
        macd_fast: RangeSpec::List(vec![12]),
        macd_slow: RangeSpec::List(vec![21]),
        macd_signal: RangeSpec::List(vec![9]),
        sar_step: RangeSpec::List(vec![0.02]),
        sar_max_step: RangeSpec::List(vec![0.2, 0.3]),
    }
    .build()
    .unwrap();
    assert_eq!(grid.len(), 40);

    let calls = Arc::new(AtomicUsize::new(0));
    let workers = 4;
    let result = Optimizer::new(
        Box::new(CountingSource {
            inner: SyntheticSource::new(3),
            calls: calls.clone(),
        }),
        keys(&["BTC-USD"]),
        SimulationConfig::default(),
    )
    .with_workers(workers)
    .run(&grid)
    .unwrap();

    assert_eq!(result.evaluated, 40);
    let fetches = calls.load(Ordering::SeqCst);
    assert!(fetches >= 1 && fetches <= workers, "fetches = {fetches}");
}

#[test]
fn per_symbol_results_are_the_ones_that_scored_the_winner() {
    let source = FlakySource {
        inner: SyntheticSource::new(5),
        failed_once: AtomicBool::new(false),
    };
    let sim = SimulationConfig::default();
    let result = Optimizer::new(Box::new(source), keys(&["BTC-USD"]), sim)
        .with_workers(1)
        .run(&ParameterGrid::single(ParameterSet::default()))
        .unwrap();

    // The only evaluation saw the failed fetch.
    assert_eq!(result.skipped, 1);
    assert_eq!(result.fitness, sim.initial_balance);
    assert_eq!(result.per_symbol.len(), 1);
    assert!(matches!(result.per_symbol[0], SymbolOutcome::Skipped { .. }));
    let sum: f64 = result
        .per_symbol
        .iter()
        .map(|o| o.final_balance(sim.initial_balance))
        .sum();
    assert_eq!(sum, result.fitness);
}

#[test]
fn oversized_grid_is_an_error() {
    let wide: Vec<usize> = (1..=100).collect();
    let grid = ParameterGrid {
        ichimoku_short: wide.clone(),
        ichimoku_medium: wide.clone(),
        ichimoku_long: wide.clone(),
        rsi_period: wide.clone(),
        macd_fast: wide.clone(),
        macd_slow: wide.clone(),
        macd_signal: wide,
        sar_step: vec![0.02],
        sar_max_step: vec![0.2],
    };
    assert!(matches!(
        synthetic_optimizer(2).run(&grid),
        Err(SweepError::GridTooLarge { .. })
    ));
}

#[test]
fn missing_data_scores_neutral_and_ties_resolve_to_first() {
    let dir = tempfile::tempdir().unwrap();
    let optimizer = Optimizer::new(
        Box::new(confluence_core::data::CsvSource::new(dir.path())),
        keys(&["BTC-USD", "ETH-USD", "SOL-USD"]),
        SimulationConfig::default(),
    )
    .with_workers(2);

    let result = optimizer.run(&small_grid()).unwrap();
    assert_eq!(result.fitness, 30_000.0);
    assert_eq!(result.fitness, optimizer.neutral_fitness());
    assert_eq!(result.best_index, 0);
    assert_eq!(result.best, small_grid().candidate(0).unwrap());
    assert_eq!(result.skipped, 8 * 3);
    assert_eq!(result.failed, 0);
    assert!(result
        .per_symbol
        .iter()
        .all(|o| matches!(o, SymbolOutcome::Skipped { .. })));
}

#[test]
fn failed_candidates_score_the_neutral_baseline() {
    let mut grid = small_grid();
    // Every candidate now has an invalid RSI window.
    grid.rsi_period = vec![0];
    let optimizer = synthetic_optimizer(2);
    let result = optimizer.run(&grid).unwrap();

    assert_eq!(result.evaluated, 4);
    assert_eq!(result.failed, 4);
    assert_eq!(result.fitness, optimizer.neutral_fitness());
    assert_eq!(result.best_index, 0);
    assert!(result.per_symbol.is_empty());
}

#[test]
fn progress_reports_every_candidate() {
    let seen = Arc::new(AtomicUsize::new(0));
    let last_total = Arc::new(AtomicUsize::new(0));
    let (s, t) = (seen.clone(), last_total.clone());
    let result = synthetic_optimizer(3)
        .with_progress(move |p| {
            s.fetch_add(1, Ordering::SeqCst);
            t.store(p.total, Ordering::SeqCst);
        })
        .run(&small_grid())
        .unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), result.evaluated);
    assert_eq!(last_total.load(Ordering::SeqCst), 8);
}

#[test]
fn cancelled_before_start_is_an_error() {
    let flag = Arc::new(AtomicBool::new(true));
    let err = synthetic_optimizer(2)
        .with_cancel_flag(flag)
        .run(&small_grid())
        .unwrap_err();
    assert!(matches!(err, SweepError::Cancelled));
}

#[test]
fn empty_inputs_are_rejected() {
    let mut grid = small_grid();
    grid.sar_step.clear();
    assert!(matches!(
        synthetic_optimizer(1).run(&grid),
        Err(SweepError::EmptyGrid)
    ));

    let no_symbols = Optimizer::new(
        Box::new(SyntheticSource::new(1)),
        Vec::new(),
        SimulationConfig::default(),
    );
    assert!(matches!(no_symbols.run(&small_grid()), Err(SweepError::NoSymbols)));
}

#[test]
fn sweep_from_toml_over_csv_files() {
    let dir = tempfile::tempdir().unwrap();
    // Export two synthetic histories as CSV; the third symbol has no file.
    for symbol in ["BTC-USD", "ETH-USD"] {
        let key = HistoryKey::new(symbol, Lookback::Days(30), Interval::Hour1);
        let table = SyntheticSource::new(4).fetch(&key).unwrap();
        let mut text = String::from("timestamp,open,high,low,close,volume\n");
        for bar in table.bars() {
            writeln!(
                text,
                "{},{},{},{},{},{}",
                bar.timestamp.timestamp(),
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.volume
            )
            .unwrap();
        }
        fs::write(dir.path().join(format!("{symbol}_1h.csv")), text).unwrap();
    }

    let doc = format!(
        r#"
        [data]
        symbols = ["BTC-USD", "ETH-USD", "DOGE-USD"]
        lookback = "30d"
        interval = "1h"

        [data.source]
        kind = "csv"
        dir = "{}"

        [simulation]
        monthly_injection = 0.0

        [grid]
        ichimoku_short = [8]
        ichimoku_medium = [24]
        ichimoku_long = [50]
        rsi_period = {{ start = 10, end = 14, step = 2 }}
        macd_fast = [12]
        macd_slow = [21]
        macd_signal = [9]
        sar_step = [0.02]
        sar_max_step = [0.2]

        [pool]
        workers = 2
        "#,
        dir.path().display().to_string().replace('\\', "/")
    );
    let path = dir.path().join("sweep.toml");
    fs::write(&path, doc).unwrap();

    let config = SweepConfig::from_file(&path).unwrap();
    let grid = config.parameter_grid().unwrap();
    assert_eq!(grid.len(), 2);

    let result = Optimizer::from_config(&config).run(&grid).unwrap();
    assert_eq!(result.evaluated, 2);
    assert_eq!(result.skipped, 2);
    assert_eq!(result.per_symbol.len(), 3);
    assert_eq!(result.per_symbol[2].symbol(), "DOGE-USD");
    assert!(matches!(result.per_symbol[2], SymbolOutcome::Skipped { .. }));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["per_symbol"][2]["status"], "skipped");
    assert_eq!(json["per_symbol"][0]["status"], "evaluated");
    assert_eq!(json["per_symbol"][0]["symbol"], "BTC-USD");
}
