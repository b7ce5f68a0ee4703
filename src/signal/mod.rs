//! One-dimensional signal helpers shared by the fit engine and the calibrator.
//!
//! - evenly spaced resampling (`resample`)
//! - sub-sample peak localization (`peak`)
//! - instrument response extraction (`response`)

pub mod peak;
pub mod resample;
pub mod response;

pub use peak::*;
pub use resample::*;
pub use response::*;

use crate::error::{TreatError, TreatResult};

/// Average several rows of samples into one signal.
pub fn average_rows(rows: &[Vec<f64>]) -> TreatResult<Vec<f64>> {
    let Some(first) = rows.first() else {
        return Err(TreatError::configuration("No rows to average."));
    };
    let n = first.len();
    if let Some(bad) = rows.iter().find(|r| r.len() != n) {
        return Err(TreatError::configuration(format!(
            "Rows must have the same length (got {n} and {})",
            bad.len()
        )));
    }
    let mut out = vec![0.0; n];
    for row in rows {
        for (acc, v) in out.iter_mut().zip(row) {
            *acc += v;
        }
    }
    let count = rows.len() as f64;
    out.iter_mut().for_each(|v| *v /= count);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_averaged_column_wise() {
        let rows = vec![vec![1.0, 2.0, 3.0], vec![3.0, 4.0, 5.0]];
        assert_eq!(average_rows(&rows).unwrap(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(average_rows(&rows), Err(TreatError::Configuration(_))));
        assert!(average_rows(&[]).is_err());
    }
}
