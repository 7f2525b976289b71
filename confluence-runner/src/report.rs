//! Sweep result and its plain-text summary.

use std::fmt;

use serde::Serialize;

use confluence_core::engine::ParameterSet;

use crate::evaluate::SymbolOutcome;

/// Outcome of a parameter sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepResult {
    pub best: ParameterSet,
    /// Position of `best` in grid order.
    pub best_index: usize,
    pub fitness: f64,
    /// Per-symbol results of re-running `best`.
    pub per_symbol: Vec<SymbolOutcome>,
    /// Candidates in the grid.
    pub total: usize,
    /// Candidates actually scored (fewer than `total` after cancellation).
    pub evaluated: usize,
    /// Candidates scored as the neutral baseline because they failed.
    pub failed: usize,
    /// Symbol evaluations skipped for missing data, summed over candidates.
    pub skipped: usize,
    pub cancelled: bool,
}

impl SweepResult {
    pub fn summary(&self) -> SweepSummary<'_> {
        SweepSummary { result: self }
    }
}

/// Printable view of a `SweepResult`.
pub struct SweepSummary<'a> {
    result: &'a SweepResult,
}

impl fmt::Display for SweepSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.result;
        writeln!(f, "Best Parameters: {}", r.best)?;
        writeln!(f, "Fingerprint:     {}", r.best.fingerprint())?;
        writeln!(f, "Fitness:         {:.2}", r.fitness)?;
        write!(f, "Candidates:      {}/{} evaluated", r.evaluated, r.total)?;
        if r.cancelled {
            write!(f, " (cancelled)")?;
        }
        writeln!(f)?;
        writeln!(f, "Failed:          {}", r.failed)?;
        writeln!(f, "Skipped Symbols: {}", r.skipped)?;
        for outcome in &r.per_symbol {
            match outcome {
                SymbolOutcome::Evaluated(result) => writeln!(
                    f,
                    "  {}: balance {:.2}, trades {}, win {:.2}%",
                    result.symbol, result.final_balance, result.trade_count, result.win_percentage
                )?,
                SymbolOutcome::Skipped { symbol, reason } => {
                    writeln!(f, "  {symbol}: skipped ({reason})")?
                }
            }
        }
        Ok(())
    }
}
