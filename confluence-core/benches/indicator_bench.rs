//! Criterion benchmarks for the backtest hot paths.
//!
//! Benchmarks:
//! 1. Indicator computation (each family the aggregator reads)
//! 2. SignalSet build for the default parameters
//! 3. Simulator walk over a precomputed SignalSet

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use confluence_core::data::{BarSource, HistoryKey, Interval, Lookback, SyntheticSource};
use confluence_core::domain::BarTable;
use confluence_core::engine::{simulate, ParameterSet, SignalSet, SimulationConfig};
use confluence_core::indicators::{Ichimoku, Indicator, Macd, Obv, ParabolicSar, Rsi};

// ── Helpers ──────────────────────────────────────────────────────────

/// Hourly synthetic history of roughly `days` days.
fn make_table(days: u32) -> BarTable {
    let key = HistoryKey::new("BENCH", Lookback::Days(days), Interval::Hour1);
    SyntheticSource::new(7).fetch(&key).unwrap()
}

// ── 1. Indicators ────────────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicators");
    let table = make_table(180);

    let families: Vec<(&str, Box<dyn Indicator>)> = vec![
        ("macd", Box::new(Macd::new(12, 21, 9).unwrap())),
        ("rsi", Box::new(Rsi::new(12).unwrap())),
        ("ichimoku", Box::new(Ichimoku::new(8, 24, 50).unwrap())),
        ("obv", Box::new(Obv)),
        ("parabolic_sar", Box::new(ParabolicSar::new(0.02, 0.2).unwrap())),
    ];
    for (name, indicator) in &families {
        group.bench_function(*name, |b| {
            b.iter(|| indicator.compute(black_box(&table)));
        });
    }

    group.finish();
}

// ── 2. SignalSet ─────────────────────────────────────────────────────

fn bench_signal_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("signal_set");
    let params = ParameterSet::default();

    for days in [30u32, 180, 720] {
        let table = make_table(days);
        group.bench_with_input(BenchmarkId::from_parameter(table.len()), &table, |b, table| {
            b.iter(|| SignalSet::compute(black_box(table), &params).unwrap());
        });
    }

    group.finish();
}

// ── 3. Simulator ─────────────────────────────────────────────────────

fn bench_simulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulate");
    let config = SimulationConfig::default();
    let table = make_table(180);
    let signals = SignalSet::compute(&table, &ParameterSet::default()).unwrap();

    group.bench_function("default_params_4320_bars", |b| {
        b.iter(|| simulate(black_box(&table), black_box(&signals), &config).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_indicators, bench_signal_set, bench_simulate);
criterion_main!(benches);
