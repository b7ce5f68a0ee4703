//! Amplitude normalization before fitting.

use crate::error::{TreatError, TreatResult};

/// Subtract the mean of the samples within `nb_points` of the global minimum.
pub fn remove_offset(y: &[f64], nb_points: usize) -> Vec<f64> {
    let Some(pos_min) = argmin(y) else {
        return Vec::new();
    };
    let lo = pos_min.saturating_sub(nb_points);
    let hi = (pos_min + nb_points).min(y.len()).max(lo + 1);
    let offset = y[lo..hi].iter().sum::<f64>() / (hi - lo) as f64;
    y.iter().map(|v| v - offset).collect()
}

/// Remove the offset, then scale so the maximum within `peak_points` of
/// `peak_pos` equals 1.
pub fn normalize(y: &[f64], peak_pos: usize, offset_points: usize, peak_points: usize) -> TreatResult<Vec<f64>> {
    let data = remove_offset(y, offset_points);
    if peak_pos >= data.len() {
        return Err(TreatError::configuration(format!(
            "peak index {peak_pos} is outside a signal of {} samples",
            data.len()
        )));
    }
    let lo = peak_pos.saturating_sub(peak_points);
    let hi = (peak_pos + peak_points).min(data.len()).max(lo + 1);
    let val = data[lo..hi].iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(val > 0.0 && val.is_finite()) {
        return Err(TreatError::insufficient_window(
            "no peak above the offset in the normalization window",
        ));
    }
    Ok(data.iter().map(|v| v / val).collect())
}

fn argmin(y: &[f64]) -> Option<usize> {
    y.iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
}
