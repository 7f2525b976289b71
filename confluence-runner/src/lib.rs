//! Confluence Runner — parameter sweep optimizer.
//!
//! This crate builds on `confluence-core` to provide:
//! - TOML sweep configuration (symbols, bar source, simulation, grid, pool)
//! - The Cartesian `ParameterGrid` with a fixed candidate order
//! - Per-candidate evaluation with neutral scoring of missing data
//! - A fixed-size worker pool with deterministic best-candidate selection

pub mod config;
pub mod evaluate;
pub mod grid;
pub mod report;
pub mod sweep;

pub use config::{ConfigError, DataConfig, PoolConfig, SourceConfig, SweepConfig};
pub use evaluate::{evaluate, Evaluation, EvaluationError, SymbolOutcome};
pub use grid::{GridConfig, ParameterGrid, RangeSpec, MAX_AXIS_VALUES, MAX_CANDIDATES};
pub use report::{SweepResult, SweepSummary};
pub use sweep::{stable_argmax, CandidateScore, Optimizer, SweepError, SweepProgress};
