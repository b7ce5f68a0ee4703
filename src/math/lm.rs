//! Levenberg–Marquardt non-linear least squares.
//!
//! Minimizes `Σ (f(p)_i - y_i)²` for a model `f` evaluated on a fixed abscissa.
//!
//! - Jacobian by central finite differences (the line shapes are cheap, and the
//!   optional response convolution makes analytic derivatives awkward).
//! - Damping uses Marquardt scaling `JᵀJ + λ diag(JᵀJ)`; the damped system is
//!   solved by Cholesky, and λ grows until the step is downhill.
//! - The returned covariance follows the usual unweighted convention
//!   `(JᵀJ)⁻¹ · SSE / (n - p)`.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{TreatError, TreatResult};

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e16;
const DIAG_FLOOR: f64 = 1e-12;
/// Smallest accepted ratio of Jacobian singular values.
const RCOND: f64 = 1e-9;

/// Stopping criteria.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LmOptions {
    pub max_iter: usize,
    /// Relative reduction of the SSE below which we stop.
    pub ftol: f64,
    /// Relative step size below which we stop.
    pub xtol: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iter: 500,
            ftol: 1e-12,
            xtol: 1e-12,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LmReport {
    pub params: Vec<f64>,
    pub covariance: DMatrix<f64>,
    pub sse: f64,
    pub iterations: usize,
}

impl LmReport {
    pub fn std(&self) -> Vec<f64> {
        self.covariance.diagonal().iter().map(|v| v.max(0.0).sqrt()).collect()
    }
}

/// Fit `model(p)` to `y` starting from `p0`.
pub fn levenberg_marquardt<F>(model: F, y: &[f64], p0: &[f64], opts: &LmOptions) -> TreatResult<LmReport>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let n = y.len();
    let m = p0.len();
    if n <= m {
        return Err(TreatError::insufficient_window(format!(
            "{n} samples cannot constrain {m} parameters"
        )));
    }

    let residuals = |p: &[f64]| -> TreatResult<DVector<f64>> {
        let f = model(p);
        if f.len() != n {
            return Err(TreatError::fit_convergence(format!(
                "model returned {} values for {n} samples",
                f.len()
            )));
        }
        Ok(DVector::from_iterator(n, f.iter().zip(y).map(|(fi, yi)| fi - yi)))
    };

    let mut p = DVector::from_column_slice(p0);
    let mut r = residuals(p.as_slice())?;
    let mut sse = r.norm_squared();
    if !sse.is_finite() {
        return Err(TreatError::fit_convergence("non-finite residuals at the initial guess"));
    }

    let mut lambda = LAMBDA_INIT;
    let mut converged = false;
    let mut iterations = 0;

    while iterations < opts.max_iter {
        iterations += 1;
        let jac = jacobian(&residuals, &p, &r)?;
        let jtj = jac.transpose() * &jac;
        let grad = jac.transpose() * &r;

        // Inner loop: raise λ until the step reduces the SSE.
        let mut accepted = None;
        while lambda <= LAMBDA_MAX {
            let mut damped = jtj.clone();
            for i in 0..m {
                damped[(i, i)] += lambda * jtj[(i, i)].max(DIAG_FLOOR);
            }
            let Some(chol) = damped.cholesky() else {
                lambda *= 10.0;
                continue;
            };
            let delta = -chol.solve(&grad);
            let p_new = &p + &delta;
            let r_new = residuals(p_new.as_slice())?;
            let sse_new = r_new.norm_squared();
            if sse_new.is_finite() && sse_new <= sse {
                lambda = (lambda / 10.0).max(LAMBDA_MIN);
                accepted = Some((p_new, r_new, sse_new, delta));
                break;
            }
            lambda *= 10.0;
        }

        let Some((p_new, r_new, sse_new, delta)) = accepted else {
            // No downhill direction left at any damping: we sit in a minimum.
            log::debug!("LM stalled after {iterations} iterations (sse={sse:.3e})");
            converged = true;
            break;
        };

        let reduction = sse - sse_new;
        let step = delta.norm();
        let scale = p_new.norm();
        p = p_new;
        r = r_new;
        sse = sse_new;

        if reduction <= opts.ftol * sse.max(f64::MIN_POSITIVE) || step <= opts.xtol * (scale + opts.xtol) {
            converged = true;
            break;
        }
    }

    if !converged {
        return Err(TreatError::fit_convergence(format!(
            "no convergence after {} iterations (sse={sse:.3e})",
            opts.max_iter
        )));
    }

    let jac = jacobian(&residuals, &p, &r)?;
    let covariance = covariance(jac, sse / (n - m) as f64)?;
    if covariance.iter().any(|v| !v.is_finite()) {
        return Err(TreatError::fit_convergence("non-finite covariance"));
    }

    log::debug!("LM converged in {iterations} iterations (sse={sse:.3e})");
    Ok(LmReport {
        params: p.iter().copied().collect(),
        covariance,
        sse,
        iterations,
    })
}

/// `(JᵀJ)⁻¹ · s²` through the SVD of `J`, rejecting rank-deficient Jacobians.
fn covariance(jac: DMatrix<f64>, s2: f64) -> TreatResult<DMatrix<f64>> {
    let m = jac.ncols();
    let svd = jac.svd(false, true);
    let sv = &svd.singular_values;
    let sv_max = sv.max();
    if !(sv_max > 0.0) || sv.min() <= sv_max * RCOND {
        return Err(TreatError::fit_convergence(
            "singular Jacobian: parameters are not identifiable",
        ));
    }
    let v_t = svd
        .v_t
        .ok_or_else(|| TreatError::fit_convergence("SVD of the Jacobian failed"))?;
    let mut scaled = v_t.transpose();
    for j in 0..m {
        let inv = 1.0 / (sv[j] * sv[j]);
        for i in 0..m {
            scaled[(i, j)] *= inv;
        }
    }
    Ok(scaled * v_t * s2)
}

fn jacobian<R>(residuals: &R, p: &DVector<f64>, r: &DVector<f64>) -> TreatResult<DMatrix<f64>>
where
    R: Fn(&[f64]) -> TreatResult<DVector<f64>>,
{
    let m = p.len();
    let n = r.len();
    let mut jac = DMatrix::<f64>::zeros(n, m);
    let h_base = f64::EPSILON.cbrt();
    for j in 0..m {
        let h = h_base * p[j].abs().max(1.0);
        let mut hi = p.clone();
        let mut lo = p.clone();
        hi[j] += h;
        lo[j] -= h;
        let r_hi = residuals(hi.as_slice())?;
        let r_lo = residuals(lo.as_slice())?;
        for i in 0..n {
            jac[(i, j)] = (r_hi[i] - r_lo[i]) / (2.0 * h);
        }
    }
    if jac.iter().any(|v| !v.is_finite()) {
        return Err(TreatError::fit_convergence("non-finite Jacobian"));
    }
    Ok(jac)
}
