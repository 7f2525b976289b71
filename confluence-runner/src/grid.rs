//! Parameter grid — the Cartesian product of every tunable axis.
//!
//! Candidates are addressed by index. Index `k` decodes in mixed radix with
//! the last axis (SAR max step) varying fastest, so grid order is the same
//! as nested loops written in `ParameterSet` field order. The optimizer's
//! tie-break ("earliest candidate wins") is defined against this order.

use serde::{Deserialize, Serialize};

use confluence_core::engine::ParameterSet;

use crate::config::ConfigError;

/// Largest number of values one axis may expand to.
pub const MAX_AXIS_VALUES: usize = 10_000;

/// Largest grid a sweep accepts.
pub const MAX_CANDIDATES: usize = 100_000_000;

/// One axis as written in the sweep file: an explicit list, or a half-open
/// range `{ start, end, step }` with `end` excluded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RangeSpec<T> {
    List(Vec<T>),
    Range { start: T, end: T, step: T },
}

impl RangeSpec<usize> {
    pub fn expand(&self, axis: &'static str) -> Result<Vec<usize>, ConfigError> {
        let values = match self {
            RangeSpec::List(values) => values.clone(),
            RangeSpec::Range { start, end, step } => {
                if *step == 0 {
                    return Err(ConfigError::invalid(axis, "step must be >= 1"));
                }
                check_count(axis, end.saturating_sub(*start).div_ceil(*step))?;
                (*start..*end).step_by(*step).collect()
            }
        };
        check_axis(axis, &values, |&v| v > 0)?;
        Ok(values)
    }
}

impl RangeSpec<f64> {
    pub fn expand(&self, axis: &'static str) -> Result<Vec<f64>, ConfigError> {
        let values = match self {
            RangeSpec::List(values) => values.clone(),
            RangeSpec::Range { start, end, step } => {
                if !(step.is_finite() && *step > 0.0 && start.is_finite() && end.is_finite()) {
                    return Err(ConfigError::invalid(
                        axis,
                        "start, end and step must be finite with step > 0",
                    ));
                }
                // Count first; the tolerance keeps 0.05 - 0.02 from yielding a 4th point.
                let count = ((end - start) / step - 1e-9).ceil().max(0.0);
                if count > MAX_AXIS_VALUES as f64 {
                    return Err(too_many(axis));
                }
                (0..count as usize).map(|i| start + step * i as f64).collect()
            }
        };
        check_axis(axis, &values, |v| v.is_finite() && *v > 0.0)?;
        Ok(values)
    }
}

fn too_many(axis: &'static str) -> ConfigError {
    ConfigError::invalid(axis, format!("axis expands to more than {MAX_AXIS_VALUES} values"))
}

fn check_count(axis: &'static str, count: usize) -> Result<(), ConfigError> {
    if count > MAX_AXIS_VALUES {
        return Err(too_many(axis));
    }
    Ok(())
}

fn check_axis<T>(
    axis: &'static str,
    values: &[T],
    positive: impl Fn(&T) -> bool,
) -> Result<(), ConfigError> {
    if values.is_empty() {
        return Err(ConfigError::invalid(axis, "axis has no values"));
    }
    check_count(axis, values.len())?;
    if !values.iter().all(positive) {
        return Err(ConfigError::invalid(axis, "values must be strictly positive"));
    }
    Ok(())
}

/// The `[grid]` table. Omitted axes keep the original search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    pub ichimoku_short: RangeSpec<usize>,
    pub ichimoku_medium: RangeSpec<usize>,
    pub ichimoku_long: RangeSpec<usize>,
    pub rsi_period: RangeSpec<usize>,
    pub macd_fast: RangeSpec<usize>,
    pub macd_slow: RangeSpec<usize>,
    pub macd_signal: RangeSpec<usize>,
    pub sar_step: RangeSpec<f64>,
    pub sar_max_step: RangeSpec<f64>,
}

fn span(start: usize, end: usize) -> RangeSpec<usize> {
    RangeSpec::Range { start, end, step: 1 }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            ichimoku_short: span(1, 5),
            ichimoku_medium: span(5, 10),
            ichimoku_long: span(10, 15),
            rsi_period: span(5, 15),
            macd_fast: span(5, 10),
            macd_slow: span(10, 15),
            macd_signal: span(5, 8),
            sar_step: RangeSpec::List(vec![0.02, 0.03]),
            sar_max_step: RangeSpec::List(vec![0.2, 0.3]),
        }
    }
}

impl GridConfig {
    /// Expand every axis and build the grid.
    pub fn build(&self) -> Result<ParameterGrid, ConfigError> {
        let grid = ParameterGrid {
            ichimoku_short: self.ichimoku_short.expand("grid.ichimoku_short")?,
            ichimoku_medium: self.ichimoku_medium.expand("grid.ichimoku_medium")?,
            ichimoku_long: self.ichimoku_long.expand("grid.ichimoku_long")?,
            rsi_period: self.rsi_period.expand("grid.rsi_period")?,
            macd_fast: self.macd_fast.expand("grid.macd_fast")?,
            macd_slow: self.macd_slow.expand("grid.macd_slow")?,
            macd_signal: self.macd_signal.expand("grid.macd_signal")?,
            sar_step: self.sar_step.expand("grid.sar_step")?,
            sar_max_step: self.sar_max_step.expand("grid.sar_max_step")?,
        };
        if grid.len() > MAX_CANDIDATES {
            return Err(ConfigError::invalid(
                "grid",
                format!("more than {MAX_CANDIDATES} candidates"),
            ));
        }
        Ok(grid)
    }
}

/// Expanded axis values in `ParameterSet` field order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterGrid {
    pub ichimoku_short: Vec<usize>,
    pub ichimoku_medium: Vec<usize>,
    pub ichimoku_long: Vec<usize>,
    pub rsi_period: Vec<usize>,
    pub macd_fast: Vec<usize>,
    pub macd_slow: Vec<usize>,
    pub macd_signal: Vec<usize>,
    pub sar_step: Vec<f64>,
    pub sar_max_step: Vec<f64>,
}

impl Default for ParameterGrid {
    fn default() -> Self {
        // The default axes are non-empty and positive by construction.
        GridConfig::default()
            .build()
            .unwrap_or_else(|_| Self::single(ParameterSet::default()))
    }
}

impl ParameterGrid {
    /// A one-candidate grid.
    pub fn single(params: ParameterSet) -> Self {
        Self {
            ichimoku_short: vec![params.ichimoku_short],
            ichimoku_medium: vec![params.ichimoku_medium],
            ichimoku_long: vec![params.ichimoku_long],
            rsi_period: vec![params.rsi_period],
            macd_fast: vec![params.macd_fast],
            macd_slow: vec![params.macd_slow],
            macd_signal: vec![params.macd_signal],
            sar_step: vec![params.sar_step],
            sar_max_step: vec![params.sar_max_step],
        }
    }

    /// Axis lengths, slowest first.
    pub fn radices(&self) -> [usize; 9] {
        [
            self.ichimoku_short.len(),
            self.ichimoku_medium.len(),
            self.ichimoku_long.len(),
            self.rsi_period.len(),
            self.macd_fast.len(),
            self.macd_slow.len(),
            self.macd_signal.len(),
            self.sar_step.len(),
            self.sar_max_step.len(),
        ]
    }

    /// Number of candidates. Saturates rather than overflowing.
    pub fn len(&self) -> usize {
        self.radices()
            .iter()
            .try_fold(1usize, |acc, &r| acc.checked_mul(r))
            .unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Candidate `k` in grid order, `None` past the end.
    ///
    /// The result is not validated; a combination the indicators reject is
    /// scored as a failed candidate by the optimizer.
    pub fn candidate(&self, k: usize) -> Option<ParameterSet> {
        if k >= self.len() {
            return None;
        }
        let mut digits = [0usize; 9];
        let mut rest = k;
        for (digit, radix) in digits.iter_mut().zip(self.radices()).rev() {
            *digit = rest % radix;
            rest /= radix;
        }
        Some(ParameterSet {
            ichimoku_short: self.ichimoku_short[digits[0]],
            ichimoku_medium: self.ichimoku_medium[digits[1]],
            ichimoku_long: self.ichimoku_long[digits[2]],
            rsi_period: self.rsi_period[digits[3]],
            macd_fast: self.macd_fast[digits[4]],
            macd_slow: self.macd_slow[digits[5]],
            macd_signal: self.macd_signal[digits[6]],
            sar_step: self.sar_step[digits[7]],
            sar_max_step: self.sar_max_step[digits[8]],
        })
    }

    /// All candidates in grid order.
    pub fn iter(&self) -> impl Iterator<Item = ParameterSet> + '_ {
        (0..self.len()).filter_map(move |k| self.candidate(k))
    }
}
