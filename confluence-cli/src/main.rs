//! Confluence CLI — single backtests and parameter sweeps.
//!
//! Commands:
//! - `backtest` — run the confirmation strategy once over one symbol
//! - `sweep` — search a parameter grid from a TOML sweep file
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`).

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use confluence_core::data::{
    BarSource, CsvSource, HistoryKey, Interval, Lookback, ParquetSource, SyntheticSource,
};
use confluence_core::engine::{run_backtest, ParameterSet, SimulationConfig};
use confluence_runner::{Optimizer, SweepConfig};

#[derive(Parser)]
#[command(
    name = "confluence",
    about = "Confluence CLI — indicator confirmation backtests and parameter sweeps"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceKind {
    Csv,
    Parquet,
    Synthetic,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one backtest with explicit indicator parameters.
    Backtest {
        /// Symbol to simulate (e.g., BTC-USD).
        #[arg(long)]
        symbol: String,

        /// Directory holding `{SYMBOL}_{interval}` or `{SYMBOL}` files.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Where bars come from.
        #[arg(long, value_enum, default_value_t = SourceKind::Csv)]
        source: SourceKind,

        /// Seed for the synthetic source.
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// History to use, measured back from the last bar (30d, 6mo, 2y, max).
        #[arg(long, default_value = "2y")]
        lookback: Lookback,

        /// Bar interval (1m 5m 15m 30m 1h 1d 1wk 1mo).
        #[arg(long, default_value = "1h")]
        interval: Interval,

        #[command(flatten)]
        params: ParamArgs,

        #[command(flatten)]
        simulation: SimulationArgs,

        /// Print the full result as JSON instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Search the parameter grid described by a sweep file.
    Sweep {
        /// Path to a TOML sweep file.
        #[arg(long)]
        config: PathBuf,

        /// Worker threads (overrides `[pool] workers`).
        #[arg(long)]
        workers: Option<usize>,

        /// Print the sweep result as JSON instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

/// Indicator settings; defaults are the live bot's.
#[derive(clap::Args)]
struct ParamArgs {
    #[arg(long, default_value_t = 8)]
    ichimoku_short: usize,
    #[arg(long, default_value_t = 24)]
    ichimoku_medium: usize,
    #[arg(long, default_value_t = 50)]
    ichimoku_long: usize,
    #[arg(long, default_value_t = 12)]
    rsi_period: usize,
    #[arg(long, default_value_t = 12)]
    macd_fast: usize,
    #[arg(long, default_value_t = 21)]
    macd_slow: usize,
    #[arg(long, default_value_t = 9)]
    macd_signal: usize,
    #[arg(long, default_value_t = 0.02)]
    sar_step: f64,
    #[arg(long, default_value_t = 0.2)]
    sar_max_step: f64,
}

#[derive(clap::Args)]
struct SimulationArgs {
    #[arg(long, default_value_t = 10_000.0)]
    initial_balance: f64,
    /// Fraction of the balance committed per entry, in (0, 1].
    #[arg(long, default_value_t = 1.0)]
    trade_size: f64,
    /// Cash added at the first bar of each new calendar month.
    #[arg(long, default_value_t = 500.0)]
    monthly_injection: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Backtest {
            symbol,
            data_dir,
            source,
            seed,
            lookback,
            interval,
            params,
            simulation,
            json,
        } => run_backtest_cmd(
            HistoryKey::new(symbol, lookback, interval),
            build_source(source, data_dir, seed),
            params,
            simulation,
            json,
        ),
        Commands::Sweep {
            config,
            workers,
            json,
        } => run_sweep_cmd(config, workers, json),
    }
}

fn build_source(kind: SourceKind, dir: PathBuf, seed: u64) -> Box<dyn BarSource> {
    match kind {
        SourceKind::Csv => Box::new(CsvSource::new(dir)),
        SourceKind::Parquet => Box::new(ParquetSource::new(dir)),
        SourceKind::Synthetic => Box::new(SyntheticSource::new(seed)),
    }
}

fn run_backtest_cmd(
    key: HistoryKey,
    source: Box<dyn BarSource>,
    params: ParamArgs,
    simulation: SimulationArgs,
    json: bool,
) -> Result<()> {
    let params = ParameterSet::new(
        (params.ichimoku_short, params.ichimoku_medium, params.ichimoku_long),
        params.rsi_period,
        (params.macd_fast, params.macd_slow, params.macd_signal),
        (params.sar_step, params.sar_max_step),
    )
    .context("invalid indicator parameters")?;
    let config = SimulationConfig {
        initial_balance: simulation.initial_balance,
        trade_size: simulation.trade_size,
        monthly_injection: simulation.monthly_injection,
    };
    config.validate().context("invalid simulation settings")?;

    let table = source
        .fetch(&key)
        .with_context(|| format!("loading {} from {} source", key.symbol, source.name()))?;
    info!(symbol = %key.symbol, bars = table.len(), params = %params, "running backtest");

    let result = run_backtest(&table, &params, &config)
        .with_context(|| format!("backtest failed for {}", key.symbol))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!();
        println!("=== Backtest Result ===");
        println!("Parameters:     {params}");
        println!("{}", result.summary());
        println!();
    }
    Ok(())
}

fn run_sweep_cmd(config_path: PathBuf, workers: Option<usize>, json: bool) -> Result<()> {
    let mut config = SweepConfig::from_file(&config_path)
        .with_context(|| format!("loading sweep config {}", config_path.display()))?;
    if let Some(n) = workers {
        if n == 0 {
            bail!("--workers must be at least 1");
        }
        config.pool.workers = Some(n);
    }
    let grid = config.parameter_grid()?;

    // Log roughly every tenth of the grid.
    let total = grid.len();
    let step = (total / 10).max(1);
    let optimizer = Optimizer::from_config(&config).with_progress(move |p| {
        if p.completed % step == 0 || p.completed == p.total {
            info!(completed = p.completed, total = p.total, "sweep progress");
        }
    });

    let result = optimizer.run(&grid).context("parameter sweep failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!();
        println!("=== Sweep Result ===");
        print!("{}", result.summary());
        println!();
    }
    Ok(())
}
