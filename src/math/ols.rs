//! Linear least squares solver.
//!
//! Small overdetermined (or underdetermined) linear systems show up in two places:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! - quadratic fits for peak localization (3 columns)
//! - the pixel→frequency calibration equations (2 columns)
//!
//! Implementation choices:
//! - We use SVD so tall, square and wide systems are handled uniformly.
//!   For rank-deficient systems the SVD solve returns the minimum-norm solution.
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - Columns are scaled to unit norm before solving. Pixel positions enter the
//!   calibration squared, so raw columns can differ by several orders of magnitude.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() == 0 || x.ncols() == 0 || x.nrows() != y.len() {
        return None;
    }

    let scales: Vec<f64> = x
        .column_iter()
        .map(|c| {
            let n = c.norm();
            if n > 0.0 && n.is_finite() { n } else { 1.0 }
        })
        .collect();
    let mut xs = x.clone();
    for (j, s) in scales.iter().enumerate() {
        for i in 0..xs.nrows() {
            xs[(i, j)] /= s;
        }
    }

    let svd = xs.svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                let unscaled = DVector::from_iterator(
                    beta.len(),
                    beta.iter().zip(scales.iter()).map(|(b, s)| b / s),
                );
                return Some(unscaled);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn least_squares_handles_badly_scaled_columns() {
        // y = 1e-5 p^2 + 0.05 p on pixel-like abscissae.
        let p = [10.0, 250.0, 480.0, 730.0, 990.0];
        let mut rows = Vec::new();
        let mut ys = Vec::new();
        for &pi in &p {
            rows.extend_from_slice(&[pi * pi, pi]);
            ys.push(1e-5 * pi * pi + 0.05 * pi);
        }
        let x = DMatrix::from_row_slice(p.len(), 2, &rows);
        let y = DVector::from_vec(ys);
        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 1e-5).abs() < 1e-14);
        assert!((beta[1] - 0.05).abs() < 1e-11);
    }

    #[test]
    fn underdetermined_system_returns_minimum_norm() {
        // One equation, two unknowns: a + b = 2 -> minimum norm a = b = 1.
        let x = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
        let y = DVector::from_row_slice(&[2.0]);
        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 1.0).abs() < 1e-12);
        assert!((beta[1] - 1.0).abs() < 1e-12);
    }
}
