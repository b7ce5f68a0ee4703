//! Instrument response extraction.
//!
//! The response is either cut from the working spectrum or supplied as an
//! external `(frequency, data)` reference that is resampled onto the working
//! grid. In both cases the offset is removed and the peak scaled to 1.

use serde::{Deserialize, Serialize};

use crate::domain::x_range;
use crate::error::{TreatError, TreatResult};
use crate::signal::resample;

/// Relative slack on the reference span when matching it to the working grid.
const OVERLAP_RTOL: f64 = 1e-9;

/// Where the instrument response comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ResponseSource {
    /// Samples with `start < x < end` of the spectrum being fitted.
    Window { start: f64, end: f64 },
    /// A measured reference, resampled on the part of the working grid it covers.
    /// Grid points within rounding of the reference ends count as covered; an
    /// odd number of covered points keeps the convolution centred.
    External { frequency: Vec<f64>, data: Vec<f64> },
}

/// Normalized response on the working grid, or `None` without a source.
pub fn extract_response(x: &[f64], y: &[f64], source: Option<&ResponseSource>) -> TreatResult<Option<Vec<f64>>> {
    let raw = match source {
        None => return Ok(None),
        Some(ResponseSource::Window { start, end }) => {
            let (lo, hi) = if start <= end { (*start, *end) } else { (*end, *start) };
            let cut: Vec<f64> = x
                .iter()
                .zip(y)
                .filter(|(xi, _)| **xi > lo && **xi < hi)
                .map(|(_, yi)| *yi)
                .collect();
            if cut.is_empty() {
                return Err(TreatError::insufficient_window(format!(
                    "no sample in the response window ({lo}, {hi})"
                )));
            }
            cut
        }
        Some(ResponseSource::External { frequency, data }) => {
            if frequency.len() != data.len() {
                return Err(TreatError::incompatible_response(format!(
                    "frequency and data have different sizes ({} and {})",
                    frequency.len(),
                    data.len()
                )));
            }
            let (lo, hi) = x_range(frequency);
            let tol = OVERLAP_RTOL * (hi - lo);
            let target: Vec<f64> = x
                .iter()
                .copied()
                .filter(|v| *v >= lo - tol && *v <= hi + tol)
                .collect();
            if target.is_empty() {
                return Err(TreatError::incompatible_response(
                    "the reference does not overlap the working grid",
                ));
            }
            resample(frequency, data, Some(&target))?.1
        }
    };
    normalize_response(raw).map(Some)
}

fn normalize_response(mut r: Vec<f64>) -> TreatResult<Vec<f64>> {
    let min = r.iter().copied().fold(f64::INFINITY, f64::min);
    r.iter_mut().for_each(|v| *v -= min);
    let max = r.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(max > 0.0 && max.is_finite()) {
        return Err(TreatError::incompatible_response("the response is flat"));
    }
    r.iter_mut().for_each(|v| *v /= max);
    Ok(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::linspace;

    #[test]
    fn no_source_means_no_deconvolution() {
        assert_eq!(extract_response(&[0.0], &[1.0], None).unwrap(), None);
    }

    #[test]
    fn window_source_is_cut_with_strict_bounds_and_normalized() {
        let x = linspace(0.0, 6.0, 7);
        let y = [9.0, 1.0, 3.0, 5.0, 3.0, 1.0, 9.0];
        let source = ResponseSource::Window { start: 0.0, end: 6.0 };
        let r = extract_response(&x, &y, Some(&source)).unwrap().unwrap();
        assert_eq!(r, vec![0.0, 0.5, 1.0, 0.5, 0.0]);
    }

    #[test]
    fn external_source_is_resampled_on_the_overlap() {
        let x = linspace(-2.0, 2.0, 9);
        let y = vec![0.0; 9];
        let frequency = linspace(-1.0, 1.0, 21);
        let data: Vec<f64> = frequency.iter().map(|f| 2.0 - f * f).collect();
        let source = ResponseSource::External { frequency, data };
        let r = extract_response(&x, &y, Some(&source)).unwrap().unwrap();
        // Overlap is x = -1, -0.5, 0, 0.5, 1.
        assert_eq!(r.len(), 5);
        assert!((r[2] - 1.0).abs() < 1e-9);
        assert!(r[0].abs() < 1e-9 && r[4].abs() < 1e-9);
        assert!((r[1] - 0.75).abs() < 1e-9);
    }

    #[test]
    fn reference_ends_off_by_rounding_still_cover_the_grid() {
        let x = linspace(-1.0, 1.0, 51);
        let y = vec![0.0; 51];
        let mut frequency = x[20..=30].to_vec();
        frequency[0] += 1e-15;
        frequency[10] -= 1e-15;
        let data: Vec<f64> = frequency.iter().map(|f| 1.0 - 10.0 * f * f).collect();
        let source = ResponseSource::External { frequency, data };
        let r = extract_response(&x, &y, Some(&source)).unwrap().unwrap();
        assert_eq!(r.len(), 11);
        assert!((r[5] - 1.0).abs() < 1e-9);
        assert!(r[0].abs() < 1e-9 && r[10].abs() < 1e-9);
    }

    #[test]
    fn mismatched_or_flat_references_are_incompatible() {
        let x = linspace(0.0, 1.0, 5);
        let y = vec![1.0; 5];
        let bad = ResponseSource::External { frequency: vec![0.0, 1.0], data: vec![1.0] };
        assert!(matches!(
            extract_response(&x, &y, Some(&bad)),
            Err(TreatError::IncompatibleResponse(_))
        ));
        let flat = ResponseSource::Window { start: -1.0, end: 2.0 };
        assert!(matches!(
            extract_response(&x, &y, Some(&flat)),
            Err(TreatError::IncompatibleResponse(_))
        ));
    }
}
