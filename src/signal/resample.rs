//! Resampling onto an evenly spaced grid.
//!
//! Each target abscissa is evaluated on the parabola through the three original
//! samples around its nearest neighbour. Near the edges the three samples are
//! clamped to the first or last three of the signal.

use crate::error::{TreatError, TreatResult};
use crate::math::lagrange3;

/// Relative tolerance on the step for a grid to count as evenly spaced.
const UNIFORM_RTOL: f64 = 1e-9;

/// `n` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Whether `x` has a constant step.
pub fn is_uniform(x: &[f64]) -> bool {
    if x.len() < 3 {
        return true;
    }
    let step = (x[x.len() - 1] - x[0]) / (x.len() - 1) as f64;
    if step == 0.0 {
        return false;
    }
    x.windows(2)
        .all(|w| ((w[1] - w[0]) - step).abs() <= UNIFORM_RTOL * step.abs())
}

/// Resample `(x, y)` onto `target`, or onto an evenly spaced grid over
/// `[x[0], x[last]]` with the same number of samples.
pub fn resample(x: &[f64], y: &[f64], target: Option<&[f64]>) -> TreatResult<(Vec<f64>, Vec<f64>)> {
    if x.len() != y.len() {
        return Err(TreatError::configuration(format!(
            "Cannot resample arrays of different lengths ({} and {})",
            x.len(),
            y.len()
        )));
    }
    let n = x.len();
    if n < 3 {
        return Err(TreatError::insufficient_window(format!(
            "resampling needs at least 3 samples, got {n}"
        )));
    }

    let new_x = match target {
        Some(t) => t.to_vec(),
        None => linspace(x[0], x[n - 1], n),
    };
    let ascending = x.windows(2).all(|w| w[0] <= w[1]);

    let new_y = new_x
        .iter()
        .map(|&f| {
            let pos = nearest_index(x, f, ascending);
            let lo = if pos < 2 {
                0
            } else if pos > n - 3 {
                n - 3
            } else {
                pos - 1
            };
            lagrange3(
                [x[lo], x[lo + 1], x[lo + 2]],
                [y[lo], y[lo + 1], y[lo + 2]],
                f,
            )
        })
        .collect();

    Ok((new_x, new_y))
}

/// Index of the sample closest to `v`. Binary search on ascending grids.
pub(crate) fn nearest_index(x: &[f64], v: f64, ascending: bool) -> usize {
    if !ascending {
        return x
            .iter()
            .enumerate()
            .min_by(|a, b| (a.1 - v).abs().total_cmp(&(b.1 - v).abs()))
            .map(|(i, _)| i)
            .unwrap_or(0);
    }
    let i = x.partition_point(|&xi| xi < v);
    if i == 0 {
        0
    } else if i >= x.len() {
        x.len() - 1
    } else if (x[i] - v).abs() < (v - x[i - 1]).abs() {
        i
    } else {
        i - 1
    }
}
