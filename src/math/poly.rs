//! Degree-2 polynomials.
//!
//! Both the resampler and the peak localizer fit parabolas to a handful of
//! samples. Fits are done in coordinates centred on the sample mean, which keeps
//! the normal equations well conditioned on pixel axes (x ~ 1e3, x² ~ 1e6).

use nalgebra::{DMatrix, DVector};

use crate::math::solve_least_squares;

/// `a (x - x0)² + b (x - x0) + c`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadratic {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub x0: f64,
}

impl Quadratic {
    pub fn eval(&self, x: f64) -> f64 {
        let t = x - self.x0;
        (self.a * t + self.b) * t + self.c
    }

    /// Abscissa of the extremum, `-b / (2a)`. `None` for a straight line.
    pub fn vertex(&self) -> Option<f64> {
        if self.a == 0.0 || !self.a.is_finite() {
            return None;
        }
        let v = self.x0 - self.b / (2.0 * self.a);
        v.is_finite().then_some(v)
    }

    /// Vertex of a parabola fitted over `[lo, hi]` to data of magnitude
    /// `y_scale`. `None` when the curvature is negligible over the span or the
    /// vertex lies outside it.
    pub fn extremum_in(&self, lo: f64, hi: f64, y_scale: f64) -> Option<f64> {
        let half = 0.5 * (hi - lo);
        if self.a.abs() * half * half <= 1e-10 * y_scale {
            return None;
        }
        self.vertex().filter(|v| *v >= lo && *v <= hi)
    }

    /// Coefficients in plain monomial form `(a, b, c)` for `a x² + b x + c`.
    pub fn monomial(&self) -> (f64, f64, f64) {
        let (a, b, c, s) = (self.a, self.b, self.c, self.x0);
        (a, b - 2.0 * a * s, a * s * s - b * s + c)
    }
}

/// Least-squares parabola through `(xs, ys)`. Requires at least 3 samples.
pub fn fit_quadratic(xs: &[f64], ys: &[f64]) -> Option<Quadratic> {
    if xs.len() < 3 || xs.len() != ys.len() {
        return None;
    }
    let x0 = xs.iter().sum::<f64>() / xs.len() as f64;
    let n = xs.len();
    let mut design = DMatrix::<f64>::zeros(n, 3);
    for (i, &x) in xs.iter().enumerate() {
        let t = x - x0;
        design[(i, 0)] = t * t;
        design[(i, 1)] = t;
        design[(i, 2)] = 1.0;
    }
    let rhs = DVector::from_column_slice(ys);
    let beta = solve_least_squares(&design, &rhs)?;
    Some(Quadratic {
        a: beta[0],
        b: beta[1],
        c: beta[2],
        x0,
    })
}

/// Value at `x` of the parabola through three points (Lagrange form).
///
/// Exact at the nodes, which keeps resampling a grid onto itself lossless.
pub fn lagrange3(xs: [f64; 3], ys: [f64; 3], x: f64) -> f64 {
    let [x0, x1, x2] = xs;
    let l0 = (x - x1) * (x - x2) / ((x0 - x1) * (x0 - x2));
    let l1 = (x - x0) * (x - x2) / ((x1 - x0) * (x1 - x2));
    let l2 = (x - x0) * (x - x1) / ((x2 - x0) * (x2 - x1));
    ys[0] * l0 + ys[1] * l1 + ys[2] * l2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadratic_fit_recovers_vertex() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let ys: Vec<f64> = xs.iter().map(|x| -2.0 * (x - 3.3_f64).powi(2) + 7.0).collect();
        let q = fit_quadratic(&xs, &ys).unwrap();
        assert!((q.vertex().unwrap() - 3.3).abs() < 1e-10);
        assert!((q.eval(3.3) - 7.0).abs() < 1e-10);
    }

    #[test]
    fn monomial_form_matches_centered_form() {
        let q = Quadratic { a: 0.5, b: -1.0, c: 2.0, x0: 10.0 };
        let (a, b, c) = q.monomial();
        for x in [-3.0, 0.0, 4.5, 12.0] {
            assert!((a * x * x + b * x + c - q.eval(x)).abs() < 1e-9);
        }
    }

    #[test]
    fn straight_line_has_no_vertex() {
        let q = fit_quadratic(&[0.0, 1.0, 2.0], &[1.0, 2.0, 3.0]).unwrap();
        assert!(q.a.abs() < 1e-12);
        assert!((q.b - 1.0).abs() < 1e-12);
        let line = Quadratic { a: 0.0, b: 1.0, c: 0.0, x0: 0.0 };
        assert_eq!(line.vertex(), None);
    }

    #[test]
    fn flat_or_out_of_span_fits_have_no_extremum() {
        let xs = [0.0, 0.1, 0.2, 0.3, 0.4, 0.5];
        let flat = fit_quadratic(&xs, &[2.0; 6]).unwrap();
        assert_eq!(flat.extremum_in(0.0, 0.5, 2.0), None);

        // Rising branch of a parabola whose top sits at x = 3.
        let ys: Vec<f64> = xs.iter().map(|x| 4.0 - (x - 3.0_f64).powi(2)).collect();
        let q = fit_quadratic(&xs, &ys).unwrap();
        assert!((q.vertex().unwrap() - 3.0).abs() < 1e-9);
        assert_eq!(q.extremum_in(0.0, 0.5, 4.0), None);
        assert!((q.extremum_in(0.0, 5.0, 4.0).unwrap() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn lagrange_is_exact_at_nodes() {
        let xs = [0.1, 0.7, 1.9];
        let ys = [3.0, -1.0, 4.0];
        for i in 0..3 {
            assert_eq!(lagrange3(xs, ys, xs[i]), ys[i]);
        }
    }
}
