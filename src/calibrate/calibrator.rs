//! Quadratic pixel→frequency calibration.
//!
//! We look for `f(p) = a p² + b p + c`. Every physical constraint is a
//! difference of two frequencies, so each one is linear in `(a, b)`:
//!
//! ```text
//! a (p₂² - p₁²) + b (p₂ - p₁) = target
//! ```
//!
//! - FSR known: consecutive peaks of one kind are `Δk · FSR` apart.
//! - shift known: the doublet of every order spans `2 · shift`.
//! - in both modes, the anti-Stokes/Stokes gap is the same on every order.
//!
//! The equations are solved by least squares around a linear seed; the
//! constant `c` is then set so the first elastic peak sits at zero frequency
//! (or, without elastic peaks, the middle of the first doublet).

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::calibrate::order::{MatchedOrders, PeakSet, match_orders};
use crate::error::{TreatError, TreatResult};
use crate::math::solve_least_squares;

/// Calibrated axis `f(p) = a p² + b p + c`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisMap {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl AxisMap {
    pub fn eval(&self, p: f64) -> f64 {
        (self.a * p + self.b) * p + self.c
    }

    pub fn apply(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|&p| self.eval(p)).collect()
    }

    /// `f'(p) = 2 a p + b`.
    pub fn slope(&self, p: f64) -> f64 {
        2.0 * self.a * p + self.b
    }
}

/// The known physical quantity the calibration is scaled by.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint {
    /// Free spectral range of the spectrometer.
    Fsr(f64),
    /// Brillouin shift of a reference sample.
    Shift(f64),
}

impl Constraint {
    /// FSR takes precedence when both are known.
    pub fn from_options(fsr: Option<f64>, shift: Option<f64>) -> TreatResult<Self> {
        let c = match (fsr, shift) {
            (Some(f), _) => Constraint::Fsr(f),
            (None, Some(s)) => Constraint::Shift(s),
            (None, None) => {
                return Err(TreatError::configuration(
                    "Either the FSR or the shift must be given to calibrate the axis.",
                ));
            }
        };
        let v = match c {
            Constraint::Fsr(v) | Constraint::Shift(v) => v,
        };
        if !(v.is_finite() && v != 0.0) {
            return Err(TreatError::configuration(format!("Invalid calibration constant {v}.")));
        }
        Ok(c)
    }
}

/// Rows of `a·A + b·B = C`.
#[derive(Debug, Default)]
struct Equations {
    a: Vec<f64>,
    b: Vec<f64>,
    rhs: Vec<f64>,
}

impl Equations {
    fn push_difference(&mut self, p1: f64, p2: f64, target: f64) {
        self.a.push(p2 * p2 - p1 * p1);
        self.b.push(p2 - p1);
        self.rhs.push(target);
    }

    fn len(&self) -> usize {
        self.rhs.len()
    }

    /// Best `b` for a fixed `a`.
    fn solve_b(&self, a: f64) -> Option<f64> {
        let den: f64 = self.b.iter().map(|v| v * v).sum();
        if den == 0.0 {
            return None;
        }
        let num: f64 = self
            .b
            .iter()
            .zip(&self.a)
            .zip(&self.rhs)
            .map(|((bi, ai), ci)| bi * (ci - a * ai))
            .sum();
        Some(num / den)
    }
}

/// Calibrate from elastic, Stokes and anti-Stokes points spread over any
/// number of orders.
///
/// `x_range` is the `(min, max)` of the axis being calibrated; with
/// `bound_curvature` the map is kept monotonic over it in FSR mode.
pub fn calibrate(peaks: &PeakSet, x_range: (f64, f64), constraint: Constraint, bound_curvature: bool) -> TreatResult<AxisMap> {
    let orders = match_orders(peaks)?;
    let mut eqs = Equations::default();
    let doublets = orders.doublets();

    for w in doublets.windows(2) {
        let (_, s0, a0) = w[0];
        let (_, s1, a1) = w[1];
        // (a1 - s1) - (a0 - s0) = 0 in frequency.
        eqs.a.push(a1 * a1 - s1 * s1 - a0 * a0 + s0 * s0);
        eqs.b.push(a1 - s1 - a0 + s0);
        eqs.rhs.push(0.0);
    }

    match constraint {
        Constraint::Fsr(fsr) => {
            for w in orders.elastic.windows(2) {
                eqs.push_difference(w[0], w[1], fsr);
            }
            for peaks in [&orders.stokes, &orders.anti_stokes] {
                for w in peaks.windows(2) {
                    let dk = w[1].order as f64 - w[0].order as f64;
                    eqs.push_difference(w[0].position, w[1].position, dk * fsr);
                }
            }
        }
        Constraint::Shift(shift) => {
            if doublets.is_empty() {
                return Err(TreatError::configuration(
                    "A shift calibration needs a Stokes and an anti-Stokes peak on the same order.",
                ));
            }
            for &(_, s, a) in &doublets {
                eqs.push_difference(s, a, 2.0 * shift);
            }
        }
    }

    if !eqs.rhs.iter().any(|c| *c != 0.0) {
        return Err(TreatError::configuration(
            "Not enough peaks to calibrate the axis: mark at least two peaks one order apart.",
        ));
    }

    let (mut a, mut b) = solve_around_seed(&eqs)?;
    log::debug!("calibration from {} equations: a={a:.6e}, b={b:.6e}", eqs.len());

    if bound_curvature {
        if let Constraint::Fsr(fsr) = constraint {
            if let Some(bounds) = curvature_bounds(&orders, fsr, x_range) {
                if a < bounds.a_min || a > bounds.a_max {
                    let clamped = a.clamp(bounds.a_min, bounds.a_max);
                    log::info!(
                        "curvature {a:.6e} outside [{:.6e}, {:.6e}], clamped",
                        bounds.a_min,
                        bounds.a_max
                    );
                    a = clamped;
                    b = bounds.slope_for(a);
                }
            }
        }
    }

    let c = zero_offset(&orders, a, b)?;
    finite_map(a, b, c)
}

/// Elastic peaks only, `FSR` apart.
pub fn elastic_only(elastic: &[f64], fsr: f64) -> TreatResult<AxisMap> {
    let mut sorted = elastic.to_vec();
    sorted.sort_by(f64::total_cmp);
    let range = (sorted.first().copied().unwrap_or(0.0), sorted.last().copied().unwrap_or(0.0));
    let peaks = PeakSet {
        elastic: sorted,
        ..PeakSet::default()
    };
    calibrate(&peaks, range, Constraint::Fsr(fsr), false)
}

/// Closed form for two elastic peaks one order apart with the anti-Stokes
/// peak of the first order and the Stokes peak of the second in between.
pub fn between_one_order(peaks: &PeakSet, fsr: f64) -> TreatResult<AxisMap> {
    if peaks.counts() != (2, 1, 1) {
        let (e, s, a) = peaks.counts();
        return Err(TreatError::configuration(format!(
            "Expected 2 elastic, 1 Stokes and 1 anti-Stokes peak, got {e}, {s} and {a}."
        )));
    }
    let x0 = peaks.elastic[0];
    let x3 = peaks.elastic[1];
    let (x1, x2) = (peaks.stokes[0], peaks.anti_stokes[0]);

    let t = x3 * x3 - x2 * x2 - x1 * x1 + x0 * x0;
    let den = (x3 * x3 - x0 * x0) * (x1 - x0 - x3 + x2) + (x3 - x0) * t;
    let b = fsr * t / den;
    let a = (fsr - b * (x3 - x0)) / (x3 * x3 - x0 * x0);
    let c = -(a * x0 * x0 + b * x0);
    finite_map(a, b, c)
}

/// Closed form for one elastic peak and its doublet with a known shift.
pub fn on_one_order(peaks: &PeakSet, shift: f64) -> TreatResult<AxisMap> {
    if peaks.counts() != (1, 1, 1) {
        let (e, s, a) = peaks.counts();
        return Err(TreatError::configuration(format!(
            "Expected 1 elastic, 1 Stokes and 1 anti-Stokes peak, got {e}, {s} and {a}."
        )));
    }
    let (s, r) = (peaks.stokes[0], peaks.anti_stokes[0]);
    let x0 = s.min(r);
    let x1 = peaks.elastic[0];
    let x2 = s.max(r);

    let a = shift * (x2 + x0 - 2.0 * x1) / ((x2 - x1) * (x1 - x0) * (x0 - x2));
    let b = (shift - a * (x2 * x2 - x1 * x1)) / (x2 - x1);
    let c = -(a * x1 * x1 + b * x1);
    finite_map(a, b, c)
}

fn finite_map(a: f64, b: f64, c: f64) -> TreatResult<AxisMap> {
    if a.is_finite() && b.is_finite() && c.is_finite() {
        Ok(AxisMap { a, b, c })
    } else {
        Err(TreatError::configuration(
            "Degenerate peak positions: the calibration has no finite solution.",
        ))
    }
}

/// Least squares for `(a, b)` as the minimum-norm correction of a linear seed.
fn solve_around_seed(eqs: &Equations) -> TreatResult<(f64, f64)> {
    let b_seed = eqs
        .solve_b(0.0)
        .ok_or_else(|| TreatError::configuration("Degenerate calibration equations."))?;
    let n = eqs.len();
    let mut m = DMatrix::<f64>::zeros(n, 2);
    for i in 0..n {
        m[(i, 0)] = eqs.a[i];
        m[(i, 1)] = eqs.b[i];
    }
    let residual = DVector::from_iterator(n, (0..n).map(|i| eqs.rhs[i] - b_seed * eqs.b[i]));
    let delta = solve_least_squares(&m, &residual)
        .ok_or_else(|| TreatError::configuration("The calibration equations could not be solved."))?;
    Ok((delta[0], b_seed + delta[1]))
}

/// Range of `a` keeping `f' > 0` at both ends of the axis.
///
/// Derived from the kind with the most peaks: its first and last peaks `p₀`,
/// `p₁` are `k` orders apart, which ties `b` to `a`.
#[derive(Debug, Clone, Copy)]
struct CurvatureBounds {
    a_min: f64,
    a_max: f64,
    p0: f64,
    p1: f64,
    k_fsr: f64,
}

impl CurvatureBounds {
    /// `b` such that `f(p₁) - f(p₀) = k · FSR` for the given `a`.
    fn slope_for(&self, a: f64) -> f64 {
        (self.k_fsr - a * (self.p1 * self.p1 - self.p0 * self.p0)) / (self.p1 - self.p0)
    }
}

fn curvature_bounds(orders: &MatchedOrders, fsr: f64, (x_lo, x_hi): (f64, f64)) -> Option<CurvatureBounds> {
    let elastic = (orders.elastic.len() >= 2).then(|| {
        let n = orders.elastic.len();
        (orders.elastic[0], orders.elastic[n - 1], (n - 1) as f64, n)
    });
    let inelastic = [&orders.stokes, &orders.anti_stokes].into_iter().filter_map(|v| {
        let (first, last) = (v.first()?, v.last()?);
        (v.len() >= 2).then(|| {
            (
                first.position,
                last.position,
                last.order as f64 - first.order as f64,
                v.len(),
            )
        })
    });
    // Elastic peaks win ties.
    let (p0, p1, k, _) = elastic
        .into_iter()
        .chain(inelastic)
        .reduce(|best, cand| if cand.3 > best.3 { cand } else { best })?;
    let span = p1 - p0;
    if !(span > 0.0 && k > 0.0) {
        return None;
    }
    let k_fsr = k * fsr;
    let lo_term = p0 + p1 - 2.0 * x_lo;
    let hi_term = 2.0 * x_hi - p0 - p1;
    Some(CurvatureBounds {
        a_min: if hi_term > 0.0 { -k_fsr / (span * hi_term) } else { f64::NEG_INFINITY },
        a_max: if lo_term > 0.0 { k_fsr / (span * lo_term) } else { f64::INFINITY },
        p0,
        p1,
        k_fsr,
    })
}

/// `c` placing the first elastic peak (or the first doublet's midpoint) at zero.
fn zero_offset(orders: &MatchedOrders, a: f64, b: f64) -> TreatResult<f64> {
    let f = |p: f64| a * p * p + b * p;
    if let Some(&e0) = orders.elastic.first() {
        return Ok(-f(e0));
    }
    orders
        .doublets()
        .first()
        .map(|&(_, s, r)| -0.5 * (f(s) + f(r)))
        .ok_or_else(|| TreatError::configuration("No reference peak to set the zero frequency."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample::{VipaSpec, synthetic_vipa};
    use crate::domain::PointKind;

    fn exact_peaks(spec: &VipaSpec) -> (PeakSet, (f64, f64, f64), usize) {
        let sample = synthetic_vipa(spec, 0).unwrap();
        let peaks = PeakSet {
            elastic: sample.pixels(PointKind::Elastic),
            stokes: sample.pixels(PointKind::Stokes),
            anti_stokes: sample.pixels(PointKind::AntiStokes),
        };
        (peaks, sample.map, spec.n_pixels)
    }

    #[test]
    fn fsr_calibration_recovers_the_order_spacing() {
        let spec = VipaSpec::default();
        let (peaks, (a_true, b_true, _), n) = exact_peaks(&spec);
        let map = calibrate(&peaks, (0.0, (n - 1) as f64), Constraint::Fsr(30.0), true).unwrap();
        assert!((map.a - a_true).abs() < 1e-9 * a_true.abs().max(1.0));
        assert!((map.b - b_true).abs() < 1e-9);
        for w in peaks.elastic.windows(2) {
            assert!((map.eval(w[1]) - map.eval(w[0]) - 30.0).abs() < 1e-6);
        }
        assert!(map.eval(peaks.elastic[0]).abs() < 1e-9);
    }

    #[test]
    fn shift_calibration_reproduces_the_doublet() {
        let spec = VipaSpec::default();
        let (peaks, _, n) = exact_peaks(&spec);
        let map = calibrate(&peaks, (0.0, (n - 1) as f64), Constraint::Shift(5.0), false).unwrap();
        let m = match_orders(&peaks).unwrap();
        for (_, s, r) in m.doublets() {
            assert!((map.eval(r) - map.eval(s) - 10.0).abs() < 1e-6);
        }
    }

    #[test]
    fn curvature_bound_clamps_and_keeps_fsr() {
        // Elastic peaks of a strongly curved map, f(p) = 1e-3 p² + 0.1 p: the
        // unconstrained fit bends back inside [0, 1000].
        let f = |p: f64| 1e-3 * p * p + 0.1 * p;
        let fsr = 30.0;
        let mut elastic = Vec::new();
        let mut target = 0.0;
        let mut p = 100.0_f64;
        for _ in 0..3 {
            // Invert f for successive multiples of the FSR.
            let c = -(f(100.0) + target);
            p = (-0.1 + (0.01 - 4.0 * 1e-3 * c).sqrt()) / 2e-3;
            elastic.push(p);
            target += fsr;
        }
        assert!(p > 100.0);
        let peaks = PeakSet { elastic, ..PeakSet::default() };
        let x_range = (-2000.0, 1000.0);
        let free = calibrate(&peaks, x_range, Constraint::Fsr(fsr), false).unwrap();
        assert!(free.slope(x_range.0) < 0.0);
        let bounded = calibrate(&peaks, x_range, Constraint::Fsr(fsr), true).unwrap();
        assert!(bounded.slope(x_range.0) >= -1e-9);
        assert!(bounded.slope(x_range.1) > 0.0);
    }

    #[test]
    fn elastic_only_calibration_is_linear_for_two_peaks() {
        let map = elastic_only(&[200.0, 500.0], 30.0).unwrap();
        assert!((map.eval(500.0) - map.eval(200.0) - 30.0).abs() < 1e-9);
        assert!(map.eval(200.0).abs() < 1e-9);
    }

    #[test]
    fn closed_form_one_order() {
        let (a, b) = (2e-4, 0.05);
        let f0 = |p: f64| a * p * p + b * p;
        let inv = |target: f64| (-b + (b * b + 4.0 * a * target).sqrt()) / (2.0 * a);
        let e = 300.0;
        let base = f0(e);
        let peaks = PeakSet {
            elastic: vec![e],
            stokes: vec![inv(base - 4.0)],
            anti_stokes: vec![inv(base + 4.0)],
        };
        let map = on_one_order(&peaks, 4.0).unwrap();
        assert!((map.a - a).abs() < 1e-12);
        assert!((map.b - b).abs() < 1e-10);
        assert!(map.eval(e).abs() < 1e-9);
    }

    #[test]
    fn closed_form_between_orders() {
        let (a, b) = (1e-4, 0.06);
        let f0 = |p: f64| a * p * p + b * p;
        let inv = |target: f64| (-b + (b * b + 4.0 * a * target).sqrt()) / (2.0 * a);
        let (fsr, shift) = (30.0, 5.0);
        let e0 = 100.0;
        let base = f0(e0);
        let peaks = PeakSet {
            elastic: vec![e0, inv(base + fsr)],
            stokes: vec![inv(base + fsr - shift)],
            anti_stokes: vec![inv(base + shift)],
        };
        let map = between_one_order(&peaks, fsr).unwrap();
        assert!((map.a - a).abs() < 1e-10);
        assert!((map.b - b).abs() < 1e-8);
        assert!(map.eval(e0).abs() < 1e-9);
    }

    #[test]
    fn wrong_point_counts_are_configuration_errors() {
        let peaks = PeakSet {
            elastic: vec![1.0],
            ..PeakSet::default()
        };
        assert!(matches!(on_one_order(&peaks, 1.0), Err(TreatError::Configuration(_))));
        assert!(matches!(between_one_order(&peaks, 1.0), Err(TreatError::Configuration(_))));
        assert!(matches!(
            calibrate(&peaks, (0.0, 10.0), Constraint::Fsr(30.0), false),
            Err(TreatError::Configuration(_))
        ));
        assert!(Constraint::from_options(None, None).is_err());
        assert_eq!(Constraint::from_options(Some(30.0), Some(5.0)).unwrap(), Constraint::Fsr(30.0));
    }
}
