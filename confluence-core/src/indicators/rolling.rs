//! Shared series primitives: exponential smoothing, windowed statistics,
//! shifts and differences.
//!
//! Windowed statistics are undefined (NaN) until the window is full and
//! whenever any value inside the window is NaN.

/// Smoothing factor for a span parameterization: 2 / (span + 1).
pub fn span_alpha(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// Smoothing factor for a center-of-mass parameterization: 1 / (com + 1).
pub fn com_alpha(com: f64) -> f64 {
    1.0 / (com + 1.0)
}

/// Exponential smoothing `ema[i] = ema[i-1] + alpha * (x[i] - ema[i-1])`.
///
/// Seeded with the first defined value. Leading NaNs stay NaN; a NaN after
/// the seed carries the previous average forward.
pub fn ema(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    let mut prev: Option<f64> = None;
    for (i, &x) in values.iter().enumerate() {
        let next = match (prev, x.is_nan()) {
            (None, true) => continue,
            (None, false) => x,
            (Some(p), true) => p,
            (Some(p), false) => p + alpha * (x - p),
        };
        out[i] = next;
        prev = Some(next);
    }
    out
}

/// Mean over a trailing window of `window` values.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if window == 0 || n < window {
        return out;
    }

    let mut sum = 0.0;
    let mut nan_count = 0usize;
    for i in 0..n {
        let incoming = values[i];
        if incoming.is_nan() {
            nan_count += 1;
        } else {
            sum += incoming;
        }
        if i >= window {
            let outgoing = values[i - window];
            if outgoing.is_nan() {
                nan_count -= 1;
            } else {
                sum -= outgoing;
            }
        }
        if i + 1 >= window && nan_count == 0 {
            out[i] = sum / window as f64;
        }
    }
    out
}

/// Maximum over a trailing window.
pub fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    rolling_extreme(values, window, f64::max)
}

/// Minimum over a trailing window.
pub fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    rolling_extreme(values, window, f64::min)
}

fn rolling_extreme(values: &[f64], window: usize, pick: fn(f64, f64) -> f64) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if window == 0 || n < window {
        return out;
    }
    for i in (window - 1)..n {
        let slice = &values[i + 1 - window..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        out[i] = slice.iter().copied().fold(slice[0], pick);
    }
    out
}

/// Shift a series along the timeline.
///
/// Positive `periods` lag the series (`out[i] = values[i - periods]`),
/// negative ones lead it (`out[i] = values[i + |periods|]`). Positions with
/// no source value are NaN.
pub fn shift(values: &[f64], periods: isize) -> Vec<f64> {
    let n = values.len() as isize;
    (0..n)
        .map(|i| {
            let src = i - periods;
            if (0..n).contains(&src) {
                values[src as usize]
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// First difference; NaN at bar 0.
pub fn diff(values: &[f64]) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if i == 0 {
                f64::NAN
            } else {
                values[i] - values[i - 1]
            }
        })
        .collect()
}

/// Fractional change `values[i] / values[i - 1] - 1`; NaN at bar 0.
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if i == 0 {
                f64::NAN
            } else {
                values[i] / values[i - 1] - 1.0
            }
        })
        .collect()
}

/// Overwrite the first `count` entries with NaN.
pub fn mask_warmup(values: &mut [f64], count: usize) {
    for v in values.iter_mut().take(count) {
        *v = f64::NAN;
    }
}
