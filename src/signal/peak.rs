//! Sub-sample peak localization.
//!
//! A parabola is least-squares fitted to the samples of a window and its vertex
//! is returned. The same routine refines maxima and minima.

use crate::domain::{Window, x_range};
use crate::error::{TreatError, TreatResult};
use crate::math::fit_quadratic;

/// Refine the extremum near `center` using samples with `|x - center| < width / 2`.
pub fn localize_peak(x: &[f64], y: &[f64], center: f64, width: f64) -> TreatResult<f64> {
    let half = width / 2.0;
    let (wx, wy) = select(x, y, |xi| (xi - center).abs() < half);
    vertex_of(&wx, &wy, || format!("around {center} (width {width})"))
}

/// Refine the extremum using samples inside the inclusive window.
pub fn localize_in_window(x: &[f64], y: &[f64], window: Window) -> TreatResult<f64> {
    let (wx, wy) = select(x, y, |xi| window.contains(xi));
    vertex_of(&wx, &wy, || format!("in [{}, {}]", window.start, window.end))
}

fn select(x: &[f64], y: &[f64], keep: impl Fn(f64) -> bool) -> (Vec<f64>, Vec<f64>) {
    x.iter()
        .zip(y)
        .filter(|(xi, _)| keep(**xi))
        .map(|(xi, yi)| (*xi, *yi))
        .unzip()
}

fn vertex_of(wx: &[f64], wy: &[f64], place: impl Fn() -> String) -> TreatResult<f64> {
    if wx.len() < 3 {
        return Err(TreatError::insufficient_window(format!(
            "{} samples {} are too few to fit a polynomial",
            wx.len(),
            place()
        )));
    }
    let (lo, hi) = x_range(wx);
    let y_scale = wy.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    fit_quadratic(wx, wy)
        .and_then(|q| q.extremum_in(lo, hi, y_scale))
        .ok_or_else(|| TreatError::insufficient_window(format!("no extremum {}", place())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::linspace;

    fn parabola(x: &[f64], top: f64) -> Vec<f64> {
        x.iter().map(|v| 4.0 - (v - top).powi(2)).collect()
    }

    #[test]
    fn vertex_is_found_between_samples() {
        let x = linspace(0.0, 10.0, 101);
        let y = parabola(&x, 4.337);
        let c = localize_peak(&x, &y, 4.3, 1.0).unwrap();
        assert!((c - 4.337).abs() < 1e-9);
    }

    #[test]
    fn window_outside_the_data_is_insufficient() {
        let x = linspace(0.0, 10.0, 101);
        let y = parabola(&x, 5.0);
        let err = localize_peak(&x, &y, 50.0, 2.0).unwrap_err();
        assert!(matches!(err, TreatError::InsufficientWindow(_)));
    }

    #[test]
    fn window_straddling_an_edge_uses_the_clipped_samples() {
        let x = linspace(0.0, 10.0, 101);
        let y = parabola(&x, 0.05);
        let c = localize_peak(&x, &y, 0.0, 1.0).unwrap();
        assert!((c - 0.05).abs() < 1e-9);
    }

    #[test]
    fn flat_window_has_no_extremum() {
        let x = linspace(0.0, 1.0, 11);
        let y = vec![2.0; 11];
        let err = localize_in_window(&x, &y, Window::new(0.0, 1.0)).unwrap_err();
        assert!(matches!(err, TreatError::InsufficientWindow(_)));
    }

    #[test]
    fn monotonic_window_has_no_extremum_inside() {
        let x = linspace(0.0, 1.0, 11);
        let y: Vec<f64> = x.iter().map(|v| 4.0 - (v - 3.0) * (v - 3.0)).collect();
        let err = localize_in_window(&x, &y, Window::new(0.0, 1.0)).unwrap_err();
        assert!(matches!(err, TreatError::InsufficientWindow(_)));
    }

    #[test]
    fn explicit_window_is_inclusive() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [0.0, 3.0, 4.0, 3.0, 0.0];
        let c = localize_in_window(&x, &y, Window::new(1.0, 3.0)).unwrap();
        assert!((c - 2.0).abs() < 1e-12);
    }
}
