//! Parameter sweep optimizer.
//!
//! The grid is split into one contiguous block of candidates per worker and
//! the blocks run on a fixed-size rayon pool. Each block owns a private
//! `BarCache`, so bars are fetched at most once per key per worker and
//! nothing mutable is shared. Scores are collected in grid order and reduced
//! afterwards, which makes the winner independent of scheduling: highest
//! fitness, earliest index on ties. Each block also keeps the outcomes of its
//! own best candidate, so the winner's per-symbol results are the ones that
//! produced its fitness.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use confluence_core::data::{BarCache, BarSource, HistoryKey};
use confluence_core::engine::{ParameterSet, SimulationConfig};

use crate::config::{ConfigError, SweepConfig};
use crate::evaluate::{evaluate, SymbolOutcome};
use crate::grid::{ParameterGrid, MAX_CANDIDATES};
use crate::report::SweepResult;

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("parameter grid is empty")]
    EmptyGrid,

    #[error("no symbols to evaluate")]
    NoSymbols,

    #[error("parameter grid has {len} candidates; at most {MAX_CANDIDATES} are allowed")]
    GridTooLarge { len: usize },

    #[error("sweep cancelled before any candidate completed")]
    Cancelled,

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Light per-candidate record kept for the reduction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandidateScore {
    pub index: usize,
    pub params: ParameterSet,
    pub fitness: f64,
    /// Symbols scored neutral because their data was unavailable.
    pub skipped: usize,
    /// The candidate itself failed and was scored as the neutral baseline.
    pub failed: bool,
}

/// Progress snapshot passed to the callback after each candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepProgress {
    pub completed: usize,
    pub total: usize,
}

type ProgressFn = Box<dyn Fn(SweepProgress) + Send + Sync>;

/// Best candidate of one block with the outcomes behind its fitness.
struct BlockBest {
    score: CandidateScore,
    outcomes: Vec<SymbolOutcome>,
}

/// Everything one worker hands back: its scores in grid order and its best.
struct BlockResult {
    scores: Vec<CandidateScore>,
    best: Option<BlockBest>,
}

/// Highest fitness wins; on ties the first (lowest index) score is kept.
pub fn stable_argmax(scores: &[CandidateScore]) -> Option<&CandidateScore> {
    scores.iter().fold(None, |best, score| match best {
        Some(b) if score.fitness > b.fitness => Some(score),
        Some(b) => Some(b),
        None => Some(score),
    })
}

pub struct Optimizer {
    source: Box<dyn BarSource>,
    keys: Vec<HistoryKey>,
    simulation: SimulationConfig,
    workers: usize,
    cancel: Option<Arc<AtomicBool>>,
    progress: Option<ProgressFn>,
}

impl Optimizer {
    pub fn new(source: Box<dyn BarSource>, keys: Vec<HistoryKey>, simulation: SimulationConfig) -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            source,
            keys,
            simulation,
            workers,
            cancel: None,
            progress: None,
        }
    }

    /// Source, symbols, simulation settings and pool size from a sweep file.
    pub fn from_config(config: &SweepConfig) -> Self {
        Self::new(config.data.source.build(), config.data.keys(), config.simulation)
            .with_workers(config.pool.resolved_workers())
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Checked before each candidate; set it to stop the sweep early.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Called from worker threads after every completed candidate.
    pub fn with_progress(mut self, callback: impl Fn(SweepProgress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Fitness of a candidate that never traded: every symbol keeps its
    /// starting balance.
    pub fn neutral_fitness(&self) -> f64 {
        self.keys.len() as f64 * self.simulation.initial_balance
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn score<S: BarSource + ?Sized>(
        &self,
        index: usize,
        params: ParameterSet,
        cache: &mut BarCache<'_, S>,
    ) -> (CandidateScore, Vec<SymbolOutcome>) {
        match evaluate(&params, &self.keys, &self.simulation, cache) {
            Ok(evaluation) => (
                CandidateScore {
                    index,
                    params,
                    fitness: evaluation.fitness,
                    skipped: evaluation.skipped,
                    failed: false,
                },
                evaluation.outcomes,
            ),
            Err(e) => {
                warn!(candidate = index, params = %params, error = %e, "candidate failed; scoring neutral baseline");
                (
                    CandidateScore {
                        index,
                        params,
                        fitness: self.neutral_fitness(),
                        skipped: 0,
                        failed: true,
                    },
                    Vec::new(),
                )
            }
        }
    }

    /// Score `range` in order with one cache, stopping early on cancellation.
    fn run_block(
        &self,
        grid: &ParameterGrid,
        range: Range<usize>,
        source: &dyn BarSource,
        completed: &AtomicUsize,
        total: usize,
    ) -> BlockResult {
        let mut cache = BarCache::new(source);
        let mut scores = Vec::with_capacity(range.len());
        let mut best: Option<BlockBest> = None;

        for index in range {
            if self.is_cancelled() {
                break;
            }
            let Some(params) = grid.candidate(index) else {
                break;
            };
            let (score, outcomes) = self.score(index, params, &mut cache);
            // Strict: within a block the earliest of equal scores stays.
            if best.as_ref().map_or(true, |b| score.fitness > b.score.fitness) {
                best = Some(BlockBest { score, outcomes });
            }
            scores.push(score);

            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(progress) = &self.progress {
                progress(SweepProgress { completed: done, total });
            }
        }
        debug!(fetches = cache.fetches(), scored = scores.len(), "worker block finished");
        BlockResult { scores, best }
    }

    /// Evaluate every candidate of `grid` and return the best one.
    pub fn run(&self, grid: &ParameterGrid) -> Result<SweepResult, SweepError> {
        let total = grid.len();
        if total == 0 {
            return Err(SweepError::EmptyGrid);
        }
        if total > MAX_CANDIDATES {
            return Err(SweepError::GridTooLarge { len: total });
        }
        if self.keys.is_empty() {
            return Err(SweepError::NoSymbols);
        }

        info!(
            candidates = total,
            symbols = self.keys.len(),
            workers = self.workers,
            source = self.source.name(),
            "starting parameter sweep"
        );
        let started = Instant::now();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()?;
        let completed = AtomicUsize::new(0);
        let source: &dyn BarSource = self.source.as_ref();

        let blocks = self.workers.min(total);
        let block_len = total.div_ceil(blocks);
        let results: Vec<BlockResult> = pool.install(|| {
            (0..blocks)
                .into_par_iter()
                .map(|b| {
                    let start = (b * block_len).min(total);
                    let end = (start + block_len).min(total);
                    self.run_block(grid, start..end, source, &completed, total)
                })
                .collect()
        });

        // Blocks are contiguous and collected in order, so this is grid order.
        let scores: Vec<CandidateScore> = results
            .iter()
            .flat_map(|block| block.scores.iter().copied())
            .collect();
        let cancelled = scores.len() < total;
        let best = *stable_argmax(&scores).ok_or(SweepError::Cancelled)?;
        if cancelled {
            warn!(completed = scores.len(), total, "sweep cancelled; reducing completed candidates");
        }

        // Every score before the winner in its block is strictly lower, so
        // that block's best is the winner.
        let per_symbol = results
            .into_iter()
            .filter_map(|block| block.best)
            .find(|block| block.score.index == best.index)
            .map(|block| block.outcomes)
            .unwrap_or_default();
        if best.failed {
            warn!("best candidate is the neutral baseline; no per-symbol results");
        }

        let result = SweepResult {
            best: best.params,
            best_index: best.index,
            fitness: best.fitness,
            per_symbol,
            total,
            evaluated: scores.len(),
            failed: scores.iter().filter(|s| s.failed).count(),
            skipped: scores.iter().map(|s| s.skipped).sum(),
            cancelled,
        };
        info!(
            best = %result.best,
            fingerprint = %result.best.fingerprint(),
            fitness = result.fitness,
            evaluated = result.evaluated,
            failed = result.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "parameter sweep finished"
        );
        Ok(result)
    }
}
